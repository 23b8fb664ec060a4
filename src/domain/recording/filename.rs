//! Recording file names
//!
//! A name is built from a template such as `{timestamp}_{label}`, where
//! `{timestamp}` is rendered with a strftime pattern and `{label}` is the
//! sanitized user label, then suffixed with the format's extension.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::error::FilenameError;

/// Label used when the user gives none
pub const DEFAULT_LABEL: &str = "memo";

/// Default filename template
pub const DEFAULT_TEMPLATE: &str = "{timestamp}_{label}";

/// Default strftime pattern for `{timestamp}`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Timestamp,
    Label,
}

/// Validated filename template plus its timestamp pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    template: String,
    timestamp_format: String,
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    /// Parse and validate a template and timestamp pattern.
    ///
    /// Fails on unknown placeholders, unterminated `{`, strftime patterns
    /// chrono can't render, and anything that would put a path separator
    /// into the file name.
    pub fn new(
        template: impl Into<String>,
        timestamp_format: impl Into<String>,
    ) -> Result<Self, FilenameError> {
        let template = template.into();
        let timestamp_format = timestamp_format.into();
        let segments = parse_template(&template)?;

        let parsed = Self {
            template,
            timestamp_format,
            segments,
        };

        let has_bad_item = StrftimeItems::new(&parsed.timestamp_format)
            .any(|item| matches!(item, Item::Error));
        if has_bad_item {
            return Err(FilenameError::InvalidTimestampFormat(
                parsed.timestamp_format.clone(),
            ));
        }

        // Render once so patterns needing data a local timestamp lacks (%z)
        // are rejected here rather than at the start of a recording.
        if let Some(sample) = NaiveDate::from_ymd_opt(2000, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            parsed.format_timestamp(&sample)?;
        }

        Ok(parsed)
    }

    /// The raw template string
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The raw strftime pattern
    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Build `<rendered template>.<extension>`
    pub fn generate(
        &self,
        timestamp: &NaiveDateTime,
        label: &str,
        extension: &str,
    ) -> Result<String, FilenameError> {
        let stamp = self.format_timestamp(timestamp)?;
        let label = sanitize_label(label);

        let mut stem = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => stem.push_str(text),
                Segment::Timestamp => stem.push_str(&stamp),
                Segment::Label => stem.push_str(&label),
            }
        }

        if stem.trim().is_empty() {
            return Err(FilenameError::Empty);
        }

        Ok(format!("{}.{}", stem, extension))
    }

    fn format_timestamp(&self, timestamp: &NaiveDateTime) -> Result<String, FilenameError> {
        let mut out = String::new();
        write!(out, "{}", timestamp.format(&self.timestamp_format))
            .map_err(|_| FilenameError::InvalidTimestampFormat(self.timestamp_format.clone()))?;

        if contains_separator(&out) {
            return Err(FilenameError::PathSeparator(out));
        }
        Ok(out)
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            segments: vec![
                Segment::Timestamp,
                Segment::Literal("_".to_string()),
                Segment::Label,
            ],
        }
    }
}

/// Generate a file name in one call.
pub fn generate_filename(
    timestamp: &NaiveDateTime,
    label: &str,
    template: &str,
    timestamp_format: &str,
    extension: &str,
) -> Result<String, FilenameError> {
    FilenameTemplate::new(template, timestamp_format)?.generate(timestamp, label, extension)
}

/// Trim the label and replace everything except alphanumerics, `-` and `_`
/// with `_`. An empty label becomes [`DEFAULT_LABEL`].
pub fn sanitize_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return DEFAULT_LABEL.to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Join selected tags and a free-form label with `_`.
/// Returns an empty string when both are empty.
pub fn compose_label<S: AsRef<str>>(tags: &[S], extra: &str) -> String {
    let mut parts: Vec<&str> = tags
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();
    let extra = extra.trim();
    if !extra.is_empty() {
        parts.push(extra);
    }
    parts.join("_")
}

/// Return `dir/file_name`, or `dir/<stem>-N.<ext>` with the smallest N >= 2
/// that doesn't exist yet.
pub fn resolve_collision(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let mut n: u32 = 2;
    loop {
        let name = match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, FilenameError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| FilenameError::UnclosedPlaceholder(template.to_string()))?;
        segments.push(match &after[..close] {
            "timestamp" => Segment::Timestamp,
            "label" => Segment::Label,
            other => return Err(FilenameError::UnknownPlaceholder(other.to_string())),
        });
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    let bad_literal = segments.iter().any(|s| match s {
        Segment::Literal(text) => contains_separator(text),
        _ => false,
    });
    if bad_literal {
        return Err(FilenameError::PathSeparator(template.to_string()));
    }

    Ok(segments)
}

fn contains_separator(s: &str) -> bool {
    s.contains('/') || s.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn generates_sanitized_name() {
        let name =
            generate_filename(&ts(), "Team Sync!", "{timestamp}_{label}", "%Y%m%d_%H%M%S", "wav")
                .unwrap();
        assert_eq!(name, "20240102_030405_Team_Sync_.wav");
    }

    #[test]
    fn empty_label_uses_placeholder() {
        let template = FilenameTemplate::default();
        assert_eq!(
            template.generate(&ts(), "", "flac").unwrap(),
            "20240102_030405_memo.flac"
        );
        assert_eq!(
            template.generate(&ts(), "   ", "flac").unwrap(),
            "20240102_030405_memo.flac"
        );
    }

    #[test]
    fn label_is_trimmed_before_sanitizing() {
        assert_eq!(sanitize_label("  idea  "), "idea");
        assert_eq!(sanitize_label("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_label("keep-this_one"), "keep-this_one");
        assert_eq!(sanitize_label("café"), "café");
    }

    #[test]
    fn template_can_reorder_and_repeat() {
        let template = FilenameTemplate::new("{label}-{timestamp}-{label}", "%H%M").unwrap();
        assert_eq!(
            template.generate(&ts(), "x", "ogg").unwrap(),
            "x-0304-x.ogg"
        );
    }

    #[test]
    fn default_matches_parsed_default() {
        let parsed = FilenameTemplate::new(DEFAULT_TEMPLATE, DEFAULT_TIMESTAMP_FORMAT).unwrap();
        assert_eq!(parsed, FilenameTemplate::default());
    }

    #[test]
    fn unknown_placeholder_rejected() {
        assert_eq!(
            FilenameTemplate::new("{date}_{label}", DEFAULT_TIMESTAMP_FORMAT).unwrap_err(),
            FilenameError::UnknownPlaceholder("date".to_string())
        );
    }

    #[test]
    fn unclosed_placeholder_rejected() {
        assert!(matches!(
            FilenameTemplate::new("{timestamp", DEFAULT_TIMESTAMP_FORMAT),
            Err(FilenameError::UnclosedPlaceholder(_))
        ));
    }

    #[test]
    fn separators_rejected() {
        assert!(matches!(
            FilenameTemplate::new("memos/{label}", DEFAULT_TIMESTAMP_FORMAT),
            Err(FilenameError::PathSeparator(_))
        ));
        assert!(matches!(
            FilenameTemplate::new(DEFAULT_TEMPLATE, "%Y/%m/%d"),
            Err(FilenameError::PathSeparator(_))
        ));
    }

    #[test]
    fn invalid_timestamp_format_rejected() {
        assert!(matches!(
            FilenameTemplate::new(DEFAULT_TEMPLATE, "%Q"),
            Err(FilenameError::InvalidTimestampFormat(_))
        ));
        // Needs an offset, which a naive local timestamp doesn't have
        assert!(matches!(
            FilenameTemplate::new(DEFAULT_TEMPLATE, "%z"),
            Err(FilenameError::InvalidTimestampFormat(_))
        ));
    }

    #[test]
    fn literal_only_template_still_gets_extension() {
        let template = FilenameTemplate::new("memo", DEFAULT_TIMESTAMP_FORMAT).unwrap();
        assert_eq!(template.generate(&ts(), "ignored", "wav").unwrap(), "memo.wav");
    }

    #[test]
    fn empty_template_rejected_at_generate() {
        let template = FilenameTemplate::new("", DEFAULT_TIMESTAMP_FORMAT).unwrap();
        assert_eq!(
            template.generate(&ts(), "x", "wav").unwrap_err(),
            FilenameError::Empty
        );
    }

    #[test]
    fn compose_label_joins_tags_then_label() {
        let tags = vec!["IDEA".to_string(), "TODO".to_string()];
        assert_eq!(compose_label(&tags, " call back "), "IDEA_TODO_call back");
        assert_eq!(compose_label(&tags, ""), "IDEA_TODO");
        assert_eq!(compose_label::<String>(&[], "solo"), "solo");
        assert_eq!(compose_label::<String>(&[], "  "), "");
    }

    #[test]
    fn collision_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        let first = resolve_collision(dir.path(), "a_memo.wav");
        assert_eq!(first, dir.path().join("a_memo.wav"));

        std::fs::write(&first, b"x").unwrap();
        let second = resolve_collision(dir.path(), "a_memo.wav");
        assert_eq!(second, dir.path().join("a_memo-2.wav"));

        std::fs::write(&second, b"x").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "a_memo.wav"),
            dir.path().join("a_memo-3.wav")
        );
    }
}
