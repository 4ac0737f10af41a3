//! ChordPro transform library - parses loosely formatted song text and renders
//! canonical ChordPro. Shared by the `chordpro-transform` binary.

pub mod chords;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod progress;
pub mod safety;
pub mod serialize;
pub mod validate;

pub use chords::{Anchored, CharacterClass, ChordLineClassifier};
pub use models::{
    Chord, ChordLineStrategy, ChordProPayload, LyricLine, ParsedSong, ParserConfig, Section,
    SectionName, SongMetadata, SongPayload,
};
pub use parser::{parse_original_format, SongParser};
pub use serialize::{generate_chordpro, lyrics_lines_to_chordpro, render_chord_sheet};
pub use validate::{validate_original_format, ValidationIssue, ValidationReport};

/// Parse raw song text and render it as canonical ChordPro.
pub fn transform_to_chordpro(raw: &str) -> String {
    generate_chordpro(&parse_original_format(raw))
}
