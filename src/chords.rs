//! Chord detection and chord-to-lyric alignment.
//!
//! This module contains:
//! - The chord grammar and a boundary-aware token scanner
//! - The chord-only line classifiers (character-class and anchored)
//! - The three alignment treatments: chord line over lyric line, chords mixed
//!   into lyrics, and inline `[chord]` ChordPro brackets
//!
//! All offsets produced here are character offsets, never byte offsets.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Chord, ChordLineStrategy, LyricLine};
use crate::normalize::char_len;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Root, optional accidental, optional quality from the closed set.
/// Longer qualities come first so `Cmaj` is not read as `Cm` + `aj`.
const CHORD_BODY: &str = r"[A-G][#b]?(?:maj|min|dim|aug|sus|add|m|11|13|7|9)?";

/// Candidate chord token starting at a word boundary. The trailing boundary is
/// checked by hand in `find_chords` because `#` is not a word character.
pub static CHORD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b{}", CHORD_BODY)).unwrap());

/// One or two chord tokens separated by whitespace/hyphens, nothing else.
pub static ANCHORED_CHORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{body}(?:[\s-]+{body})?$", body = CHORD_BODY)).unwrap()
});

/// Inline ChordPro chord, e.g. `[Am7]` or `[D/F#]`: the chord grammar with an
/// optional numeric extension and bass note. Annotations such as `[Bis]` or
/// `[Coro]` do not match and stay in the lyric.
pub static BRACKET_CHORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([A-G][#b]?(?:maj|min|dim|aug|sus|add|m)?\d*(?:/[A-G][#b]?)?)\]").unwrap()
});

// ============================================================================
// TOKEN SCANNING
// ============================================================================

/// A chord token found in a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordMatch<'a> {
    pub note: &'a str,
    /// Byte span in the scanned line.
    pub start: usize,
    pub end: usize,
    /// Character offset of `start`.
    pub index: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find every chord token in `line`, left to right.
///
/// A token must begin at a word boundary and must not run into a following
/// word character, so `Cuando` and `Am7` yield nothing while `C#` and `F`
/// are whole tokens.
///
/// A trailing `\b` in the pattern would end `C# D` after the `C` and drop the
/// sharp. Checking the next character instead keeps `C#` whole, which
/// `generate_chordpro` then writes as `[C#]` and reads back unchanged.
pub fn find_chords(line: &str) -> Vec<ChordMatch<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;
    let mut char_pos = 0;

    while let Some(m) = CHORD_TOKEN.find_at(line, pos) {
        let index = char_pos + char_len(&line[pos..m.start()]);
        let bounded = line[m.end()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));

        if bounded {
            found.push(ChordMatch {
                note: m.as_str(),
                start: m.start(),
                end: m.end(),
                index,
            });
            char_pos = index + char_len(m.as_str());
            pos = m.end();
        } else {
            // Roots are ASCII, so stepping one byte stays on a char boundary
            char_pos = index + 1;
            pos = m.start() + 1;
        }
    }

    found
}

// ============================================================================
// CHORD-ONLY LINE CLASSIFIERS
// ============================================================================

/// Decides whether a line holds only chords and should be aligned over the
/// lyric line that follows it.
pub trait ChordLineClassifier: Send + Sync {
    fn is_chord_only_line(&self, line: &str) -> bool;

    fn name(&self) -> &'static str;
}

/// At least one chord token and no letters outside the tokens. Digits,
/// spaces, hyphens, slashes and bar lines are allowed.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharacterClass;

impl ChordLineClassifier for CharacterClass {
    fn is_chord_only_line(&self, line: &str) -> bool {
        let line = line.trim();
        let chords = find_chords(line);
        if chords.is_empty() {
            return false;
        }

        let mut last = 0;
        for m in &chords {
            if line[last..m.start].chars().any(char::is_alphabetic) {
                return false;
            }
            last = m.end;
        }
        !line[last..].chars().any(char::is_alphabetic)
    }

    fn name(&self) -> &'static str {
        "character-class"
    }
}

/// Legacy rule: the whole trimmed line is one or two chord tokens. Lines with
/// three or more chords are not chord lines under this rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct Anchored;

impl ChordLineClassifier for Anchored {
    fn is_chord_only_line(&self, line: &str) -> bool {
        ANCHORED_CHORD_LINE.is_match(line.trim())
    }

    fn name(&self) -> &'static str {
        "anchored"
    }
}

pub fn classifier_for(strategy: ChordLineStrategy) -> Box<dyn ChordLineClassifier> {
    match strategy {
        ChordLineStrategy::CharacterClass => Box::new(CharacterClass),
        ChordLineStrategy::Anchored => Box::new(Anchored),
    }
}

// ============================================================================
// ALIGNMENT
// ============================================================================

/// Align the chords of a chord-only line over `text_line`.
///
/// A chord's column in the chord line becomes its index in the lyric, clamped
/// to the lyric's length. Returns `None` for a blank lyric line.
pub fn pair_chord_line(chord_line: &str, text_line: &str) -> Option<LyricLine> {
    let text = text_line.trim();
    if text.is_empty() {
        return None;
    }

    let limit = char_len(text);
    let chords = find_chords(chord_line)
        .into_iter()
        .map(|m| Chord::new(m.note, m.index.min(limit)))
        .collect();

    Some(LyricLine::new(text, chords))
}

/// Extract chords written inline with the lyric, e.g. `Cuando Dios F nos ama`.
///
/// Each chord keeps its offset in the original line. Every token is then cut
/// out of the text exactly once, at the occurrence that produced it, so a
/// repeated symbol (`C Dios C`) loses both copies and a root letter inside a
/// word is left alone. Returns `None` when nothing but chords remains.
pub fn scan_mixed_line(line: &str) -> Option<LyricLine> {
    let matches = find_chords(line);

    let mut text = String::with_capacity(line.len());
    let mut last = 0;
    for m in &matches {
        text.push_str(&line[last..m.start]);
        last = m.end;
    }
    text.push_str(&line[last..]);

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let chords = matches
        .iter()
        .map(|m| Chord::new(m.note, m.index))
        .collect();
    Some(LyricLine::new(text, chords))
}

pub fn has_bracket_chords(line: &str) -> bool {
    BRACKET_CHORD.is_match(line)
}

/// Parse a canonical ChordPro lyric line such as `[G]Santo, [D]santo`.
///
/// Each chord is anchored at the text that followed its bracket. Offsets are
/// shifted by any leading whitespace that trimming removes and clamped to the
/// trimmed length.
pub fn extract_bracket_chords(line: &str) -> Option<LyricLine> {
    let mut text = String::with_capacity(line.len());
    let mut text_chars = 0;
    let mut chords = Vec::new();
    let mut last = 0;

    for caps in BRACKET_CHORD.captures_iter(line) {
        let (Some(whole), Some(note)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = &line[last..whole.start()];
        text.push_str(before);
        text_chars += char_len(before);
        chords.push(Chord::new(note.as_str(), text_chars));
        last = whole.end();
    }
    text.push_str(&line[last..]);

    let leading = char_len(&text) - char_len(text.trim_start());
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let limit = char_len(trimmed);
    for chord in &mut chords {
        chord.index = chord.index.saturating_sub(leading).min(limit);
    }
    Some(LyricLine::new(trimmed, chords))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(line: &str) -> Vec<(&str, usize)> {
        find_chords(line).iter().map(|m| (m.note, m.index)).collect()
    }

    #[test]
    fn test_find_chords_basic() {
        assert_eq!(notes("C   G   Am"), vec![("C", 0), ("G", 4), ("Am", 8)]);
        assert_eq!(notes("Bb  F#m  Cmaj  Dsus"), vec![("Bb", 0), ("F#m", 4), ("Cmaj", 9), ("Dsus", 15)]);
        assert_eq!(notes("G7 - D9 - E13"), vec![("G7", 0), ("D9", 5), ("E13", 10)]);
    }

    #[test]
    fn test_find_chords_respects_word_boundaries() {
        assert!(notes("Cuando el cielo").is_empty());
        assert!(notes("Dios Grande").is_empty());
        // Outside the closed grammar
        assert!(notes("Am7 Csus4").is_empty());
        // Sharp before a space is still part of the token
        assert_eq!(notes("C# D"), vec![("C#", 0), ("D", 3)]);
    }

    #[test]
    fn test_find_chords_char_offsets_after_accents() {
        // "ó" is one character but two bytes
        assert_eq!(notes("Canción G fin"), vec![("G", 8)]);
        let m = &find_chords("Canción G fin")[0];
        assert_eq!(m.start, 9);
    }

    #[test]
    fn test_character_class_classifier() {
        let c = CharacterClass;
        assert!(c.is_chord_only_line("C   G   Am"));
        assert!(c.is_chord_only_line("C - G - Am - F"));
        assert!(c.is_chord_only_line("C/G  D"));
        assert!(c.is_chord_only_line("| G | D | Em | C |"));
        assert!(!c.is_chord_only_line("Cuando el cielo truena"));
        assert!(!c.is_chord_only_line("A ti Señor"));
        assert!(!c.is_chord_only_line("   "));
        assert!(!c.is_chord_only_line("1 2 3 4"));
    }

    #[test]
    fn test_anchored_classifier() {
        let a = Anchored;
        assert!(a.is_chord_only_line("C"));
        assert!(a.is_chord_only_line("  Am - G "));
        assert!(a.is_chord_only_line("D   A"));
        // Three tokens fail the legacy rule
        assert!(!a.is_chord_only_line("C   G   Am"));
        assert!(!a.is_chord_only_line("C G bien"));
    }

    #[test]
    fn test_strategies_disagree_on_three_chords() {
        let line = "Em  C  G";
        assert!(classifier_for(ChordLineStrategy::CharacterClass).is_chord_only_line(line));
        assert!(!classifier_for(ChordLineStrategy::Anchored).is_chord_only_line(line));
        assert_eq!(classifier_for(ChordLineStrategy::Anchored).name(), "anchored");
    }

    #[test]
    fn test_pair_clamps_to_lyric_length() {
        let line = pair_chord_line("C       G", "Hi").unwrap();
        assert_eq!(line.text, "Hi");
        assert_eq!(line.chords, vec![Chord::new("C", 0), Chord::new("G", 2)]);
    }

    #[test]
    fn test_pair_keeps_columns() {
        let line = pair_chord_line("G       D/F#   Em", "Santo es el Señor Dios").unwrap();
        assert_eq!(
            line.chords,
            vec![
                Chord::new("G", 0),
                Chord::new("D", 8),
                Chord::new("F#", 10),
                Chord::new("Em", 15)
            ]
        );
    }

    #[test]
    fn test_pair_blank_text() {
        assert_eq!(pair_chord_line("C G", "   "), None);
    }

    #[test]
    fn test_mixed_line_offsets_are_pre_removal() {
        let line = scan_mixed_line("Cuando Dios F nos ama").unwrap();
        assert_eq!(line.text, "Cuando Dios  nos ama");
        assert_eq!(line.chords, vec![Chord::new("F", 12)]);
    }

    #[test]
    fn test_mixed_line_duplicate_symbol_removed_twice() {
        let line = scan_mixed_line("C Dios C").unwrap();
        assert_eq!(line.text, "Dios");
        assert_eq!(line.chords, vec![Chord::new("C", 0), Chord::new("C", 7)]);
    }

    #[test]
    fn test_mixed_line_does_not_eat_letters_inside_words() {
        // A first-occurrence search for "C" would hit "Cuando"
        let line = scan_mixed_line("Cuando C llega").unwrap();
        assert_eq!(line.text, "Cuando  llega");
        assert_eq!(line.chords, vec![Chord::new("C", 7)]);
    }

    #[test]
    fn test_mixed_line_without_chords_is_plain() {
        let line = scan_mixed_line("Cuan grande es El").unwrap();
        assert_eq!(line, LyricLine::plain("Cuan grande es El"));
    }

    #[test]
    fn test_mixed_line_of_only_chords_is_dropped() {
        assert_eq!(scan_mixed_line("C G Am F"), None);
    }

    #[test]
    fn test_bracket_chords() {
        assert!(has_bracket_chords("[G]Santo"));
        assert!(has_bracket_chords("Ho[Bbmaj7]sanna [Csus4] [Dm7/F#]"));
        assert!(!has_bracket_chords("Santo [x2]"));
        assert!(!has_bracket_chords("Santo, santo [Bis]"));
        assert!(!has_bracket_chords("[Coro] Aleluya"));
        assert!(!has_bracket_chords("[Am7 suave]"));

        let line = extract_bracket_chords("[G]Santo, [D/F#]santo [Em]").unwrap();
        assert_eq!(line.text, "Santo, santo");
        assert_eq!(
            line.chords,
            vec![Chord::new("G", 0), Chord::new("D/F#", 7), Chord::new("Em", 12)]
        );
    }

    #[test]
    fn test_bracket_chords_shift_for_leading_space() {
        let line = extract_bracket_chords("[C] Aleluya").unwrap();
        assert_eq!(line.text, "Aleluya");
        assert_eq!(line.chords, vec![Chord::new("C", 0)]);

        let line = extract_bracket_chords("Ho[Am7]sanna").unwrap();
        assert_eq!(line.chords, vec![Chord::new("Am7", 2)]);

        let line = extract_bracket_chords("[G]Santo, santo [Bis]").unwrap();
        assert_eq!(line.text, "Santo, santo [Bis]");
        assert_eq!(line.chords, vec![Chord::new("G", 0)]);
        assert_eq!(extract_bracket_chords("[C][G]"), None);
    }
}
