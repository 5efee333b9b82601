//! MIME-type eligibility.
//!
//! A [`MimeClassifier`] answers one question: is this MIME type declared
//! previewable at all? It says nothing about *how* the preview is produced;
//! route selection is a separate, ordered decision in
//! [`crate::pipeline::ConversionPipeline`]. Keeping the two apart lets a host
//! advertise a format before a route for it exists, and get a distinct
//! [`crate::PreviewError::UnimplementedRoute`] instead of a wrong conversion.
//!
//! Patterns are either exact (`application/pdf`) or wildcard (`image/*`).
//! The legacy `(.*)` spelling is accepted as a synonym for `*`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type of PDF documents.
pub const PDF: &str = "application/pdf";

/// MIME type of OpenXML word-processing documents (`.docx`).
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// OpenXML spreadsheet (`.xlsx`).
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// OpenXML presentation (`.pptx`).
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// MIME type family prefix for raster images.
pub const IMAGE_PREFIX: &str = "image/";

/// Content type attached to every built-in preview.
pub const JPEG_CONTENT_TYPE: &str = "image/jpg";

/// Patterns every classifier starts with, in order.
pub const BUILTIN_PATTERNS: [&str; 3] = ["image/*", PDF, DOCX];

/// Office suite families and their MIME types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfficeFamily {
    WordProcessing,
    Spreadsheet,
    Presentation,
}

impl OfficeFamily {
    /// Every MIME type belonging to the family.
    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            OfficeFamily::WordProcessing => &[
                "application/msword",
                DOCX,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.template",
            ],
            OfficeFamily::Spreadsheet => &[
                "application/vnd.ms-excel",
                XLSX,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.template",
            ],
            OfficeFamily::Presentation => &[
                "application/vnd.ms-powerpoint",
                PPTX,
            ],
        }
    }

    /// Family a MIME type belongs to, if any.
    pub fn of(mime: &str) -> Option<Self> {
        [
            OfficeFamily::WordProcessing,
            OfficeFamily::Spreadsheet,
            OfficeFamily::Presentation,
        ]
        .into_iter()
        .find(|family| family.mime_types().contains(&mime))
    }
}

/// A single eligibility pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePattern {
    /// Matches one MIME value verbatim.
    Exact(String),
    /// Literal segments separated by wildcards. The first segment is anchored
    /// at the start, the last at the end.
    Wildcard(Vec<String>),
}

impl MimePattern {
    /// Parse a pattern string. Anything without `*` or `(.*)` is exact.
    pub fn parse(pattern: &str) -> Self {
        let normalised = pattern.replace("(.*)", "*");
        if normalised.contains('*') {
            MimePattern::Wildcard(normalised.split('*').map(str::to_string).collect())
        } else {
            MimePattern::Exact(normalised)
        }
    }

    /// Whether `mime` matches this pattern.
    pub fn matches(&self, mime: &str) -> bool {
        match self {
            MimePattern::Exact(expected) => expected == mime,
            MimePattern::Wildcard(segments) => wildcard_match(segments, mime),
        }
    }
}

impl fmt::Display for MimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MimePattern::Exact(s) => f.write_str(s),
            MimePattern::Wildcard(segments) => f.write_str(&segments.join("*")),
        }
    }
}

fn wildcard_match(segments: &[String], mime: &str) -> bool {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some(mut remaining) = mime.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };

    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(at) => remaining = &remaining[at + segment.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

/// Ordered list of eligibility patterns.
#[derive(Debug, Clone)]
pub struct MimeClassifier {
    patterns: Vec<MimePattern>,
}

impl Default for MimeClassifier {
    fn default() -> Self {
        Self {
            patterns: BUILTIN_PATTERNS.iter().map(|p| MimePattern::parse(p)).collect(),
        }
    }
}

impl MimeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern. Duplicates are kept.
    pub fn allow(&mut self, pattern: &str) {
        self.patterns.push(MimePattern::parse(pattern));
    }

    /// Append every MIME type of an office family as exact patterns.
    pub fn allow_family(&mut self, family: OfficeFamily) {
        for mime in family.mime_types() {
            self.allow(mime);
        }
    }

    /// Whether the MIME type is previewable. Empty values never are.
    pub fn is_eligible(&self, mime: &str) -> bool {
        if mime.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| p.matches(mime))
    }

    pub fn patterns(&self) -> &[MimePattern] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exact_and_wildcard() {
        assert_eq!(MimePattern::parse(PDF), MimePattern::Exact(PDF.into()));
        assert_eq!(
            MimePattern::parse("image/*"),
            MimePattern::Wildcard(vec!["image/".into(), "".into()])
        );
        assert_eq!(MimePattern::parse("image/(.*)"), MimePattern::parse("image/*"));
    }

    #[test]
    fn wildcard_is_anchored() {
        let p = MimePattern::parse("image/*");
        assert!(p.matches("image/png"));
        assert!(p.matches("image/"));
        assert!(!p.matches("x-image/png"));
        assert!(!p.matches("application/pdf"));

        let p = MimePattern::parse("application/*+xml");
        assert!(p.matches("application/svg+xml"));
        assert!(!p.matches("application/svg+xml; charset=utf-8"));
        assert!(!p.matches("application/json"));
    }

    #[test]
    fn multiple_wildcards() {
        let p = MimePattern::parse("application/vnd.*.sheet*");
        assert!(p.matches("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"));
        assert!(!p.matches("application/vnd.ms-excel"));
    }

    #[test]
    fn builtins_are_eligible() {
        let c = MimeClassifier::new();
        assert!(c.is_eligible("image/png"));
        assert!(c.is_eligible("image/jpeg"));
        assert!(c.is_eligible(PDF));
        assert!(c.is_eligible(DOCX));
        assert!(!c.is_eligible("application/zip"));
        assert!(!c.is_eligible("application/msword"));
        assert!(!c.is_eligible(""));
    }

    #[test]
    fn allow_does_not_leak_to_other_types() {
        let mut c = MimeClassifier::new();
        c.allow("application/x-custom");
        assert!(c.is_eligible("application/x-custom"));
        assert!(!c.is_eligible("application/other"));
    }

    #[test]
    fn allow_family_adds_every_member() {
        let mut c = MimeClassifier::new();
        c.allow_family(OfficeFamily::Spreadsheet);
        for mime in OfficeFamily::Spreadsheet.mime_types() {
            assert!(c.is_eligible(mime), "{mime}");
        }
        assert!(!c.is_eligible("application/vnd.ms-powerpoint"));
    }

    #[test]
    fn family_lookup() {
        assert_eq!(OfficeFamily::of("application/msword"), Some(OfficeFamily::WordProcessing));
        assert_eq!(OfficeFamily::of("application/vnd.ms-powerpoint"), Some(OfficeFamily::Presentation));
        assert_eq!(OfficeFamily::of(PDF), None);
    }

    #[test]
    fn display_round_trips_pattern_text() {
        assert_eq!(MimePattern::parse("image/(.*)").to_string(), "image/*");
        assert_eq!(MimePattern::parse(PDF).to_string(), PDF);
    }
}
