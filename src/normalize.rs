//! Input normalization and line vocabulary shared by the parser and validator.
//!
//! Raw song text is composed to NFC, split into trimmed non-blank lines, and
//! each line is classified as metadata, section header, directive or body.
//!
//! Input comes in two formats. Loose text uses `title ` prefixes, free header
//! text and chord lines; canonical ChordPro uses `{directive}` lines only. Both
//! `parser` and `validate` read metadata through `metadata_line`.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::models::SectionName;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// ChordPro directive: `{name}` or `{name: value}` filling the whole line.
pub static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\s*([A-Za-z_]+)\s*(?::(.*))?\}$").unwrap());

// ============================================================================
// SECTION VOCABULARY
// ============================================================================

/// Keyword+colon header forms, tested in this order with `contains`.
pub const COLON_HEADERS: &[(&str, SectionName)] = &[
    ("intro:", SectionName::Intro),
    ("interlude:", SectionName::Interlude),
    ("estrofa:", SectionName::Verse),
    ("verso:", SectionName::Verse),
    ("verse:", SectionName::Verse),
    ("coro:", SectionName::Chorus),
    ("chorus:", SectionName::Chorus),
    ("puente:", SectionName::Bridge),
    ("bridge:", SectionName::Bridge),
    ("outro:", SectionName::Outro),
    ("instrumental:", SectionName::Instrumental),
    ("solo:", SectionName::Solo),
    ("break:", SectionName::Break),
];

/// Bare keywords, matched only when they are the whole (lowercased) line.
pub static BARE_HEADERS: Lazy<FxHashMap<&'static str, SectionName>> = Lazy::new(|| {
    let mut m = FxHashMap::default();

    // === ENGLISH ===
    m.insert("intro", SectionName::Intro);
    m.insert("interlude", SectionName::Interlude);
    m.insert("verse", SectionName::Verse);
    m.insert("chorus", SectionName::Chorus);
    m.insert("bridge", SectionName::Bridge);
    m.insert("outro", SectionName::Outro);
    m.insert("instrumental", SectionName::Instrumental);
    m.insert("solo", SectionName::Solo);
    m.insert("break", SectionName::Break);

    // === SPANISH ===
    m.insert("estrofa", SectionName::Verse);
    m.insert("verso", SectionName::Verse);
    m.insert("coro", SectionName::Chorus);
    m.insert("puente", SectionName::Bridge);

    m
});

/// Short ChordPro environment directives.
static SHORT_SECTION_DIRECTIVES: Lazy<FxHashMap<&'static str, SectionName>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert("soc", SectionName::Chorus);
    m.insert("sov", SectionName::Verse);
    m.insert("sob", SectionName::Bridge);
    m
});

const START_OF: &str = "start_of_";

// ============================================================================
// LINE CLASSIFICATION
// ============================================================================

/// Metadata fields recognized in song headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Artist,
    Key,
    Notes,
}

/// Plain-text header prefixes. Case-sensitive; the trailing space is required.
const METADATA_PREFIXES: &[(&str, MetadataField)] = &[
    ("title ", MetadataField::Title),
    ("artist ", MetadataField::Artist),
    ("key ", MetadataField::Key),
];

/// What a single trimmed, non-blank line means to the segmenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    Metadata(MetadataField, &'a str),
    Header(SectionName),
    /// A directive that carries no lyric content (`{eoc}`, `{comment: ...}`).
    Ignored,
    Body,
}

/// Parsed `{name: value}` directive. `name` is lowercased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive<'a> {
    pub name: String,
    pub value: Option<&'a str>,
}

pub fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let caps = DIRECTIVE.captures(line)?;
    let name = caps.get(1)?.as_str().to_lowercase();
    let value = caps.get(2).map(|m| m.as_str().trim());
    Some(Directive { name, value })
}

/// How the body of a song is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// `title `/`artist ` lines, free header text, chord lines over lyrics.
    #[default]
    Loose,
    /// Canonical ChordPro: metadata and sections only as `{...}` directives,
    /// chords only as inline `[chord]` markers.
    ChordPro,
}

fn directive_metadata(directive: &Directive<'_>) -> Option<MetadataField> {
    match directive.name.as_str() {
        "title" | "t" => Some(MetadataField::Title),
        "artist" => Some(MetadataField::Artist),
        "key" => Some(MetadataField::Key),
        "notes" => Some(MetadataField::Notes),
        _ => None,
    }
}

/// Text with at least one metadata or section directive is canonical ChordPro.
pub fn detect_format(lines: &[&str]) -> InputFormat {
    let canonical = lines.iter().filter_map(|line| parse_directive(line)).any(|d| {
        directive_metadata(&d).is_some() || directive_section(&d).is_some()
    });
    if canonical {
        InputFormat::ChordPro
    } else {
        InputFormat::Loose
    }
}

/// Match a metadata line. Loose input also accepts `title Foo`, where the
/// first matching prefix wins; `{title: Foo}` is accepted in both formats.
pub fn metadata_line(line: &str, format: InputFormat) -> Option<(MetadataField, &str)> {
    if format == InputFormat::Loose {
        for &(prefix, field) in METADATA_PREFIXES {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Some((field, rest.trim()));
            }
        }
    }

    let directive = parse_directive(line)?;
    let field = directive_metadata(&directive)?;
    Some((field, directive.value.unwrap_or("")))
}

/// Section named by a directive, if it opens one. Unknown `start_of_*`
/// environments fall back to `verse`.
fn directive_section(directive: &Directive<'_>) -> Option<SectionName> {
    let name = directive.name.as_str();
    if let Some(env) = name.strip_prefix(START_OF) {
        return Some(BARE_HEADERS.get(env).copied().unwrap_or_default());
    }
    if let Some(&section) = SHORT_SECTION_DIRECTIVES.get(name) {
        return Some(section);
    }
    // `{chorus}` or `{verse: 2}`; the value is only a label
    BARE_HEADERS.get(name).copied()
}

/// Map free header text onto a canonical section. Colon forms are checked
/// first, in table order, then the bare keywords.
pub fn section_from_header_text(line: &str) -> Option<SectionName> {
    let lower = line.to_lowercase();
    if let Some(&(_, section)) = COLON_HEADERS.iter().find(|(kw, _)| lower.contains(*kw)) {
        return Some(section);
    }
    BARE_HEADERS.get(lower.trim()).copied()
}

/// Classify one trimmed line. Free header text only opens a section in
/// loose input.
pub fn classify_line(line: &str, format: InputFormat) -> LineKind<'_> {
    if let Some((field, value)) = metadata_line(line, format) {
        return LineKind::Metadata(field, value);
    }

    if let Some(directive) = parse_directive(line) {
        // `{end_of_*}`, `{eoc}`, `{comment: ...}` and the rest carry no lyrics
        return match directive_section(&directive) {
            Some(section) => LineKind::Header(section),
            None => LineKind::Ignored,
        };
    }

    if format == InputFormat::ChordPro {
        return LineKind::Body;
    }
    match section_from_header_text(line) {
        Some(section) => LineKind::Header(section),
        None => LineKind::Body,
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Compose to NFC so that "ó" counts as one character whichever way it was typed.
pub fn compose(text: &str) -> Cow<'_, str> {
    if is_nfc(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.nfc().collect())
    }
}

/// Split into trimmed lines, dropping blank ones.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Length in characters, the unit of every chord offset.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `char_index`-th character, or `s.len()` past the end.
pub fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

// ============================================================================
// TESTS
// ============================================================================
