//! Pre-submission checks for loosely formatted song text.
//!
//! Parsing never fails; this is the only place that tells the caller whether
//! the input is acceptable. Every check runs, so one report can carry several
//! problems at once.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::normalize::{compose, detect_format, metadata_line, split_lines, MetadataField};

/// A single problem found in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyText,
    MissingTitle,
    MissingArtist,
    MissingContent,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ValidationIssue::EmptyText => "text is empty",
            ValidationIssue::MissingTitle => "no title found",
            ValidationIssue::MissingArtist => "no artist found",
            ValidationIssue::MissingContent => "no content found",
        };
        f.write_str(msg)
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Error messages in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Check that `text` has a title line, an artist line and some content.
///
/// Blank input short-circuits with a single `EmptyText` error. Otherwise all
/// three checks accumulate. Metadata is recognized the same way the parser
/// recognizes it, so `{title: X}` counts as a title and, in ChordPro input,
/// a `title ` lyric line does not.
pub fn validate_original_format(text: &str) -> ValidationReport {
    if text.trim().is_empty() {
        return ValidationReport::from_errors(vec![ValidationIssue::EmptyText]);
    }

    let text = compose(text);
    let mut has_title = false;
    let mut has_artist = false;
    let mut has_content = false;

    let lines = split_lines(&text);
    let format = detect_format(&lines);
    for line in lines {
        match metadata_line(line, format) {
            Some((MetadataField::Title, _)) => has_title = true,
            Some((MetadataField::Artist, _)) => has_artist = true,
            Some(_) => {}
            None => has_content = true,
        }
    }

    let mut errors = Vec::new();
    if !has_title {
        errors.push(ValidationIssue::MissingTitle);
    }
    if !has_artist {
        errors.push(ValidationIssue::MissingArtist);
    }
    if !has_content {
        errors.push(ValidationIssue::MissingContent);
    }

    ValidationReport::from_errors(errors)
}
