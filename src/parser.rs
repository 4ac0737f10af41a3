//! Song text parser: metadata extraction, section segmentation and chord
//! alignment.
//!
//! The body walk is a small state machine folded over the line list. The only
//! state carried between lines is an optional chord-only line waiting for the
//! lyric line it annotates.
//!
//! Canonical ChordPro input (any metadata or section directive present) skips
//! the loose rules: lines without `[chord]` markers are plain lyrics, and only
//! directives open sections or set metadata. `generate_chordpro` output always
//! takes this path.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use tracing::{debug, instrument};

use crate::chords::{
    classifier_for, extract_bracket_chords, has_bracket_chords, pair_chord_line,
    scan_mixed_line, ChordLineClassifier,
};
use crate::models::{LyricLine, ParsedSong, ParserConfig, Section, SectionName, SongMetadata};
use crate::normalize::{
    classify_line, compose, detect_format, metadata_line, split_lines, InputFormat, LineKind,
    MetadataField,
};

/// Parser with the default configuration, shared by the free functions.
static DEFAULT_PARSER: Lazy<SongParser> = Lazy::new(SongParser::default);

/// Parse loosely formatted song text (or canonical ChordPro) with the default
/// character-class chord line rule.
pub fn parse_original_format(text: &str) -> ParsedSong {
    DEFAULT_PARSER.parse(text)
}

// ============================================================================
// Metadata Extraction
// ============================================================================

/// Pull `title`/`artist`/`key`/`notes` out of the line list.
///
/// Returns the metadata and the remaining body lines in order. A later line
/// for the same field overwrites an earlier one.
pub fn extract_metadata<'a>(
    lines: &[&'a str],
    format: InputFormat,
) -> (SongMetadata, Vec<&'a str>) {
    let mut metadata = SongMetadata::default();
    let mut body = Vec::with_capacity(lines.len());

    for &line in lines {
        match metadata_line(line, format) {
            Some((field, value)) => {
                let value = value.to_string();
                match field {
                    MetadataField::Title => metadata.title = value,
                    MetadataField::Artist => metadata.artist = value,
                    MetadataField::Key => metadata.key = value,
                    MetadataField::Notes => metadata.notes = Some(value),
                }
            }
            None => body.push(line),
        }
    }

    (metadata, body)
}

// ============================================================================
// Section Segmentation
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineState<'a> {
    AwaitingLine,
    HaveChordLine(&'a str),
}

struct Segmenter<'a, 'c> {
    classifier: &'c dyn ChordLineClassifier,
    format: InputFormat,
    sections: Vec<Section>,
    current: Option<Section>,
    state: LineState<'a>,
}

impl<'a, 'c> Segmenter<'a, 'c> {
    fn new(classifier: &'c dyn ChordLineClassifier, format: InputFormat) -> Self {
        Self {
            classifier,
            format,
            sections: Vec::new(),
            current: None,
            state: LineState::AwaitingLine,
        }
    }

    fn step(mut self, line: &'a str) -> Self {
        match classify_line(line, self.format) {
            LineKind::Header(name) => self.open(name),
            LineKind::Body => self.body(line),
            LineKind::Metadata(..) | LineKind::Ignored => {
                debug!(line, "skipping directive");
            }
        }
        self
    }

    fn open(&mut self, name: SectionName) {
        self.drop_pending("section header");
        self.close();
        self.current = Some(Section::new(name));
    }

    fn close(&mut self) {
        if let Some(section) = self.current.take() {
            if section.lines.is_empty() {
                debug!(section = %section.name, "dropping empty section");
            } else {
                self.sections.push(section);
            }
        }
    }

    fn drop_pending(&mut self, reason: &str) {
        if let LineState::HaveChordLine(chord_line) = self.state {
            debug!(chord_line, reason, "dropping chord line with no lyric below it");
        }
        self.state = LineState::AwaitingLine;
    }

    fn body(&mut self, line: &'a str) {
        if self.current.is_none() {
            debug!(line, "discarding line before first section header");
            return;
        }

        if self.format == InputFormat::ChordPro {
            let lyric = if has_bracket_chords(line) {
                extract_bracket_chords(line)
            } else {
                Some(LyricLine::plain(line))
            };
            if let (Some(lyric), Some(section)) = (lyric, self.current.as_mut()) {
                section.lines.push(lyric);
            }
            return;
        }

        let state = self.state;
        let emitted = match state {
            LineState::HaveChordLine(chord_line) => {
                self.state = LineState::AwaitingLine;
                pair_chord_line(chord_line, line)
            }
            LineState::AwaitingLine if has_bracket_chords(line) => extract_bracket_chords(line),
            LineState::AwaitingLine if self.classifier.is_chord_only_line(line) => {
                self.state = LineState::HaveChordLine(line);
                None
            }
            LineState::AwaitingLine => scan_mixed_line(line),
        };

        if let (Some(lyric), Some(section)) = (emitted, self.current.as_mut()) {
            section.lines.push(lyric);
        }
    }

    fn finish(mut self) -> Vec<Section> {
        self.drop_pending("end of input");
        self.close();
        self.sections
    }
}

/// Split body lines into sections. Lines before the first header are
/// discarded, as is a chord-only line that never meets its lyric.
pub fn segment(
    body: &[&str],
    classifier: &dyn ChordLineClassifier,
    format: InputFormat,
) -> Vec<Section> {
    body.iter()
        .copied()
        .fold(Segmenter::new(classifier, format), |segmenter, line| {
            segmenter.step(line)
        })
        .finish()
}

// ============================================================================
// Parser
// ============================================================================

/// Song parser with a chosen chord-only line classifier.
///
/// Holds no per-call state, so one parser can serve many threads.
pub struct SongParser {
    classifier: Box<dyn ChordLineClassifier>,
    compose_unicode: bool,
}

impl Default for SongParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl SongParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            classifier: classifier_for(config.chord_line_strategy),
            compose_unicode: config.compose_unicode,
        }
    }

    /// Use a custom classifier instead of one of the built-in strategies.
    pub fn with_classifier(classifier: Box<dyn ChordLineClassifier>) -> Self {
        Self {
            classifier,
            compose_unicode: true,
        }
    }

    pub fn classifier(&self) -> &dyn ChordLineClassifier {
        self.classifier.as_ref()
    }

    #[instrument(skip_all, fields(classifier = self.classifier.name()))]
    pub fn parse(&self, text: &str) -> ParsedSong {
        let text = if self.compose_unicode {
            compose(text)
        } else {
            Cow::Borrowed(text)
        };

        let lines = split_lines(&text);
        let format = detect_format(&lines);
        let (metadata, body) = extract_metadata(&lines, format);
        let sections = segment(&body, self.classifier(), format);

        let song = ParsedSong { metadata, sections };
        debug!(
            ?format,
            sections = song.sections.len(),
            lines = song.line_count(),
            chords = song.chord_count(),
            "parsed song"
        );
        song
    }
}

// ============================================================================
// TESTS
// ============================================================================
