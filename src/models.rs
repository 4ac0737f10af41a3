//! Core data models for song parsing and ChordPro generation.
//!
//! This module contains the value types that flow through the pipeline
//! (metadata, chords, lines, sections) plus the request payloads the remote
//! song API accepts.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

// ============================================================================
// Metadata
// ============================================================================

/// Key used when the input does not declare one.
pub const DEFAULT_KEY: &str = "C";

/// Song header fields extracted from `title `, `artist ` and `key ` lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMetadata {
    pub title: String,
    pub artist: String,
    pub key: String,
    /// Free-form notes from a `{notes: ...}` directive (manual editor output).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Default for SongMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            key: DEFAULT_KEY.to_string(),
            notes: None,
        }
    }
}

// ============================================================================
// Lyric Models
// ============================================================================

/// A chord anchored at a character offset of a lyric line's plain text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub note: String,
    /// Zero-based offset in characters (not bytes). May equal or exceed the
    /// text length, meaning the chord sounds at/after the last character.
    pub index: usize,
}

impl Chord {
    pub fn new(note: impl Into<String>, index: usize) -> Self {
        Self {
            note: note.into(),
            index,
        }
    }
}

/// One lyric line with its chords, kept sorted ascending by `index`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    pub text: String,
    pub chords: Vec<Chord>,
    /// Section tag, only populated in the flat `lyricsLines` shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionName>,
}

impl LyricLine {
    /// Build a line, sorting `chords` by index (stable for equal indices).
    pub fn new(text: impl Into<String>, mut chords: Vec<Chord>) -> Self {
        chords.sort_by_key(|c| c.index);
        Self {
            text: text.into(),
            chords,
            section: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Add a chord and restore index order.
    pub fn push_chord(&mut self, chord: Chord) {
        self.chords.push(chord);
        self.chords.sort_by_key(|c| c.index);
    }

    pub fn with_section(mut self, section: SectionName) -> Self {
        self.section = Some(section);
        self
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Canonical section tags. Spanish and English header synonyms collapse onto
/// these; anything unrecognized becomes `Verse`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionName {
    Intro,
    Interlude,
    #[default]
    Verse,
    Chorus,
    Bridge,
    Outro,
    Instrumental,
    Solo,
    Break,
}

impl SectionName {
    pub const ALL: [SectionName; 9] = [
        SectionName::Intro,
        SectionName::Interlude,
        SectionName::Verse,
        SectionName::Chorus,
        SectionName::Bridge,
        SectionName::Outro,
        SectionName::Instrumental,
        SectionName::Solo,
        SectionName::Break,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::Intro => "intro",
            SectionName::Interlude => "interlude",
            SectionName::Verse => "verse",
            SectionName::Chorus => "chorus",
            SectionName::Bridge => "bridge",
            SectionName::Outro => "outro",
            SectionName::Instrumental => "instrumental",
            SectionName::Solo => "solo",
            SectionName::Break => "break",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, ordered group of lyric lines. Repeated headers produce separate
/// sections; they are never merged by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: SectionName,
    pub lines: Vec<LyricLine>,
}

impl Section {
    pub fn new(name: SectionName) -> Self {
        Self {
            name,
            lines: Vec::new(),
        }
    }
}

/// Result of one parse call: complete metadata plus ordered sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSong {
    pub metadata: SongMetadata,
    pub sections: Vec<Section>,
}

impl ParsedSong {
    /// Flatten into the API's `lyricsLines` shape, tagging each line with its
    /// section.
    pub fn to_lyrics_lines(&self) -> Vec<LyricLine> {
        self.sections
            .iter()
            .flat_map(|section| {
                section
                    .lines
                    .iter()
                    .map(move |line| line.clone().with_section(section.name))
            })
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.lines.len()).sum()
    }

    pub fn chord_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.lines.iter())
            .map(|l| l.chords.len())
            .sum()
    }
}

// ============================================================================
// Parser Configuration
// ============================================================================

/// Which heuristic decides that a line holds only chords.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ChordLineStrategy {
    /// Chord tokens plus anything that is not a letter (spaces, digits, `-`, `/`).
    #[default]
    CharacterClass,
    /// The whole line is one or two chord tokens separated by spaces/hyphens.
    Anchored,
}

impl FromStr for ChordLineStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "character-class" | "character_class" | "char-class" => {
                Ok(ChordLineStrategy::CharacterClass)
            }
            "anchored" | "legacy" => Ok(ChordLineStrategy::Anchored),
            other => bail!("Unknown chord line strategy: {}", other),
        }
    }
}

/// Parser settings. `Default` gives the character-class classifier with NFC
/// composition enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    pub chord_line_strategy: ChordLineStrategy,
    /// Compose input to NFC before measuring character offsets.
    pub compose_unicode: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            chord_line_strategy: ChordLineStrategy::default(),
            compose_unicode: true,
        }
    }
}

// ============================================================================
// API Payloads
// ============================================================================

/// Body of the song create/update endpoints (manual editor path).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPayload {
    pub title: String,
    pub artist: String,
    pub key: String,
    pub lyrics_lines: Vec<LyricLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&ParsedSong> for SongPayload {
    fn from(song: &ParsedSong) -> Self {
        Self {
            title: song.metadata.title.clone(),
            artist: song.metadata.artist.clone(),
            key: song.metadata.key.clone(),
            lyrics_lines: song.to_lyrics_lines(),
            notes: song.metadata.notes.clone(),
        }
    }
}

impl SongPayload {
    pub fn metadata(&self) -> SongMetadata {
        SongMetadata {
            title: self.title.clone(),
            artist: self.artist.clone(),
            key: self.key.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Body of the ChordPro create/update endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordProPayload {
    pub chord_pro_text: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_key_to_c() {
        let meta = SongMetadata::default();
        assert_eq!(meta.key, "C");
        assert!(meta.title.is_empty());
        assert!(meta.artist.is_empty());
        assert_eq!(meta.notes, None);
    }

    #[test]
    fn test_lyric_line_keeps_chords_sorted() {
        let mut line = LyricLine::new(
            "Santo es el Señor",
            vec![Chord::new("G", 9), Chord::new("C", 0)],
        );
        assert_eq!(line.chords[0], Chord::new("C", 0));
        line.push_chord(Chord::new("D", 3));
        let indices: Vec<usize> = line.chords.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 3, 9]);
    }

    #[test]
    fn test_section_name_display() {
        assert_eq!(SectionName::Chorus.to_string(), "chorus");
        assert_eq!(SectionName::default(), SectionName::Verse);
        assert_eq!(SectionName::ALL.len(), 9);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "character-class".parse::<ChordLineStrategy>().unwrap(),
            ChordLineStrategy::CharacterClass
        );
        assert_eq!(
            "Anchored".parse::<ChordLineStrategy>().unwrap(),
            ChordLineStrategy::Anchored
        );
        assert!("fuzzy".parse::<ChordLineStrategy>().is_err());
    }

    #[test]
    fn test_payload_json_shape() {
        let song = ParsedSong {
            metadata: SongMetadata {
                title: "Cuan grande es El".to_string(),
                artist: "Tradicional".to_string(),
                key: "G".to_string(),
                notes: None,
            },
            sections: vec![Section {
                name: SectionName::Chorus,
                lines: vec![LyricLine::new("Mi corazon", vec![Chord::new("G", 0)])],
            }],
        };
        let payload = SongPayload::from(&song);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["lyricsLines"][0]["section"], "chorus");
        assert_eq!(json["lyricsLines"][0]["chords"][0]["note"], "G");
        assert!(json.get("notes").is_none());

        let chordpro = ChordProPayload {
            chord_pro_text: "{title: X}".to_string(),
        };
        let json = serde_json::to_string(&chordpro).unwrap();
        assert_eq!(json, r#"{"chordProText":"{title: X}"}"#);
    }
}
