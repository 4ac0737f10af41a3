//! Rendering parsed songs back to text.
//!
//! - `generate_chordpro`: canonical ChordPro with inline `[chord]` markers
//! - `lyrics_lines_to_chordpro`: the same output from the API's flat
//!   `lyricsLines` shape
//! - `render_chord_sheet`: chords on their own line above the lyrics, in the
//!   loose input format
//!
//! All three place chords with the same character-offset model as the parser.

use crate::models::{Chord, LyricLine, ParsedSong, Section, SongMetadata};
use crate::normalize::{byte_offset, char_len};

// ============================================================================
// CHORD INSERTION
// ============================================================================

/// Insert `[note]` markers into `text` at each chord's index.
///
/// Chords are inserted from the highest index down so earlier insertions
/// never shift the positions of lower ones. Chords sharing an index come out
/// in their listed order. Indices past the end append at the end.
pub fn insert_chords(text: &str, chords: &[Chord]) -> String {
    let mut ordered: Vec<&Chord> = chords.iter().collect();
    ordered.sort_by_key(|c| c.index);

    let mut out = text.to_string();
    for chord in ordered.iter().rev() {
        // Everything before `at` is still untouched original text
        let at = byte_offset(text, chord.index);
        out.insert_str(at, &format!("[{}]", chord.note));
    }
    out
}

fn push_metadata_header(out: &mut String, metadata: &SongMetadata) {
    out.push_str(&format!("{{title: {}}}\n", metadata.title));
    out.push_str(&format!("{{artist: {}}}\n", metadata.artist));
    out.push_str(&format!("{{key: {}}}\n\n", metadata.key));
}

// ============================================================================
// CHORDPRO OUTPUT
// ============================================================================

/// Render canonical ChordPro: metadata directives, then one `{section}` block
/// per section. Lines with blank text are skipped. The result is trimmed.
pub fn generate_chordpro(song: &ParsedSong) -> String {
    let mut out = String::new();
    push_metadata_header(&mut out, &song.metadata);

    for section in &song.sections {
        out.push_str(&format!("{{{}}}\n", section.name));
        for line in &section.lines {
            if line.text.trim().is_empty() {
                continue;
            }
            out.push_str(&insert_chords(&line.text, &line.chords));
            out.push('\n');
        }
        out.push('\n');
    }

    if let Some(notes) = &song.metadata.notes {
        out.push_str(&format!("{{notes: {}}}\n", notes));
    }

    out.trim().to_string()
}

/// Regroup flat lines into sections. Consecutive lines with the same section
/// (missing means `verse`) share a block; a change of section opens a new one.
pub fn sections_from_lines(lines: &[LyricLine]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for line in lines {
        let name = line.section.unwrap_or_default();
        let mut line = line.clone();
        line.section = None;
        line.chords.sort_by_key(|c| c.index);

        match sections.last_mut() {
            Some(section) if section.name == name => section.lines.push(line),
            _ => {
                let mut section = Section::new(name);
                section.lines.push(line);
                sections.push(section);
            }
        }
    }

    sections
}

/// Render the manual editor's `lyricsLines` as ChordPro, identical to
/// `generate_chordpro` on the equivalent parsed song.
pub fn lyrics_lines_to_chordpro(metadata: &SongMetadata, lines: &[LyricLine]) -> String {
    let song = ParsedSong {
        metadata: metadata.clone(),
        sections: sections_from_lines(lines),
    };
    generate_chordpro(&song)
}

// ============================================================================
// CHORD SHEET OUTPUT
// ============================================================================

/// Lay chords out on one line, each at its index column. A chord that would
/// overlap the previous one is pushed right to leave one space.
pub fn chord_row(chords: &[Chord]) -> String {
    let mut row = String::new();
    let mut width = 0;

    for chord in chords {
        let column = if row.is_empty() {
            chord.index
        } else {
            chord.index.max(width + 1)
        };
        row.extend(std::iter::repeat(' ').take(column - width));
        row.push_str(&chord.note);
        width = column + char_len(&chord.note);
    }

    row
}

/// Render the display form: header lines, `name:` section headers, and each
/// chorded lyric preceded by its chord row. Empty metadata fields are omitted.
pub fn render_chord_sheet(song: &ParsedSong) -> String {
    let mut out = String::new();
    let meta = &song.metadata;

    for (prefix, value) in [("title", &meta.title), ("artist", &meta.artist), ("key", &meta.key)] {
        if !value.is_empty() {
            out.push_str(&format!("{} {}\n", prefix, value));
        }
    }
    out.push('\n');

    for section in &song.sections {
        out.push_str(&format!("{}:\n", section.name));
        for line in &section.lines {
            if line.text.trim().is_empty() {
                continue;
            }
            if !line.chords.is_empty() {
                out.push_str(&chord_row(&line.chords));
                out.push('\n');
            }
            out.push_str(&line.text);
            out.push('\n');
        }
        out.push('\n');
    }

    out.trim().to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionName;
    use crate::parser::parse_original_format;
    use pretty_assertions::assert_eq;

    fn song() -> ParsedSong {
        ParsedSong {
            metadata: SongMetadata {
                title: "Digno".to_string(),
                artist: "Coalo Zamorano".to_string(),
                key: "G".to_string(),
                notes: None,
            },
            sections: vec![
                Section {
                    name: SectionName::Verse,
                    lines: vec![
                        LyricLine::new(
                            "Digno es el Cordero",
                            vec![Chord::new("G", 0), Chord::new("D", 12)],
                        ),
                        LyricLine::plain("que fue inmolado"),
                    ],
                },
                Section {
                    name: SectionName::Chorus,
                    lines: vec![LyricLine::new("Santo", vec![Chord::new("C", 5)])],
                },
            ],
        }
    }

    #[test]
    fn test_insert_chords() {
        assert_eq!(
            insert_chords("Digno es el Cordero", &[Chord::new("G", 0), Chord::new("D", 12)]),
            "[G]Digno es el [D]Cordero"
        );
        // Past the end appends
        assert_eq!(insert_chords("Hi", &[Chord::new("G", 8)]), "Hi[G]");
        // Character offsets, not bytes
        assert_eq!(insert_chords("Señor", &[Chord::new("A", 3)]), "Señ[A]or");
    }

    #[test]
    fn test_insert_chords_same_index_keeps_order() {
        assert_eq!(
            insert_chords("Amen", &[Chord::new("C", 2), Chord::new("G", 2)]),
            "Am[C][G]en"
        );
    }

    #[test]
    fn test_generate_chordpro() {
        let expected = "{title: Digno}\n{artist: Coalo Zamorano}\n{key: G}\n\n{verse}\n[G]Digno es el [D]Cordero\nque fue inmolado\n\n{chorus}\nSanto[C]";
        assert_eq!(generate_chordpro(&song()), expected);
    }

    #[test]
    fn test_generate_skips_blank_lines_and_emits_notes() {
        let mut song = song();
        song.sections[1].lines.push(LyricLine::new("   ", vec![Chord::new("G", 0)]));
        song.metadata.notes = Some("capo 2".to_string());
        let out = generate_chordpro(&song);
        assert!(out.ends_with("{chorus}\nSanto[C]\n\n{notes: capo 2}"));
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let first = generate_chordpro(&song());
        let second = generate_chordpro(&parse_original_format(&first));
        assert_eq!(first, second);
        assert_eq!(parse_original_format(&first), song());
    }

    #[test]
    fn test_round_trip_keeps_plain_lines_plain() {
        // Chord letters, header words and metadata prefixes in lyric text
        let tricky = ParsedSong {
            metadata: SongMetadata::default(),
            sections: vec![
                Section {
                    name: SectionName::Verse,
                    lines: vec![
                        LyricLine::plain("A ti Señor"),
                        LyricLine::plain("E C G D"),
                        LyricLine::plain("title of the song"),
                        LyricLine::new("Santo, santo [Bis]", vec![Chord::new("C#m", 0)]),
                    ],
                },
                Section {
                    name: SectionName::Chorus,
                    lines: vec![LyricLine::plain("Coro"), LyricLine::plain("Este es el verse: final")],
                },
            ],
        };
        let first = generate_chordpro(&tricky);
        assert_eq!(parse_original_format(&first), tricky);
        assert_eq!(generate_chordpro(&parse_original_format(&first)), first);
    }

    #[test]
    fn test_lyrics_lines_match_generate() {
        let song = song();
        assert_eq!(
            lyrics_lines_to_chordpro(&song.metadata, &song.to_lyrics_lines()),
            generate_chordpro(&song)
        );
    }

    #[test]
    fn test_sections_from_lines_keeps_song_order() {
        let lines = vec![
            LyricLine::plain("uno"),
            LyricLine::plain("coro").with_section(SectionName::Chorus),
            LyricLine::plain("dos").with_section(SectionName::Verse),
            LyricLine::plain("tres"),
        ];
        let sections = sections_from_lines(&lines);
        let names: Vec<SectionName> = sections.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![SectionName::Verse, SectionName::Chorus, SectionName::Verse]
        );
        assert_eq!(sections[2].lines.len(), 2);
        assert_eq!(sections[2].lines[1].section, None);
    }

    #[test]
    fn test_chord_row() {
        assert_eq!(chord_row(&[Chord::new("C", 0), Chord::new("G", 8)]), "C       G");
        assert_eq!(chord_row(&[Chord::new("Am", 3)]), "   Am");
        // Collision: F#m ends at column 3, so G moves to 4
        assert_eq!(chord_row(&[Chord::new("F#m", 0), Chord::new("G", 2)]), "F#m G");
    }

    #[test]
    fn test_render_chord_sheet() {
        let expected = "title Digno\nartist Coalo Zamorano\nkey G\n\nverse:\nG           D\nDigno es el Cordero\nque fue inmolado\n\nchorus:\n     C\nSanto";
        assert_eq!(render_chord_sheet(&song()), expected);
    }

    #[test]
    fn test_chord_sheet_parses_back() {
        let mut song = song();
        song.sections[1].lines[0].chords[0].index = 0;
        let sheet = render_chord_sheet(&song);
        assert_eq!(parse_original_format(&sheet), song);
    }

    #[test]
    fn test_chord_sheet_loses_leading_indent() {
        // Parsed lines are trimmed, so a chord row's leading spaces are gone
        let sheet = render_chord_sheet(&song());
        let parsed = parse_original_format(&sheet);
        assert_eq!(parsed.sections[1].lines[0].chords, vec![Chord::new("C", 0)]);
    }
}
