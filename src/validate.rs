//! Input validation and sanitization for user-supplied fields.
//!
//! Content and tag limits mirror what the UI promises; notes pass through
//! a markup stripper so stored text is safe to echo into any page.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

const CONTENT_MIN: usize = 2;
const CONTENT_MAX: usize = 500;
const TAG_MAX: usize = 20;
const NOTES_MAX: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("content must not be empty")]
    EmptyContent,
    #[error("content must be at least {CONTENT_MIN} characters")]
    ContentTooShort,
    #[error("content must be at most {CONTENT_MAX} characters")]
    ContentTooLong,
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),
    #[error("unrecognized due date: {0:?}")]
    InvalidDueDate(String),
}

/// Trim and length-check todo content. Returns the trimmed string.
pub fn validate_content(content: &str) -> Result<String, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = content.chars().count();
    if len < CONTENT_MIN {
        return Err(ValidationError::ContentTooShort);
    }
    if len > CONTENT_MAX {
        return Err(ValidationError::ContentTooLong);
    }
    Ok(content.to_string())
}

/// Trim each tag and enforce 1..=20 characters.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        let len = tag.chars().count();
        if len == 0 || len > TAG_MAX {
            return Err(ValidationError::InvalidTag(tag.to_string()));
        }
        out.push(tag.to_string());
    }
    Ok(out)
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script.*?</script>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Strip script blocks and residual markup from free text, cap the length.
/// Sanitization never fails; garbage in, plain text out.
pub fn sanitize_text(text: &str) -> String {
    let text = script_re().replace_all(text, "");
    let text = tag_re().replace_all(&text, "");
    let mut text = text.trim().to_string();
    if text.chars().count() > NOTES_MAX {
        text = text.chars().take(NOTES_MAX).collect();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        assert_eq!(validate_content("  buy milk  ").unwrap(), "buy milk");
    }

    #[test]
    fn content_bounds() {
        assert_eq!(validate_content(""), Err(ValidationError::EmptyContent));
        assert_eq!(validate_content("   "), Err(ValidationError::EmptyContent));
        assert_eq!(validate_content("x"), Err(ValidationError::ContentTooShort));
        assert!(validate_content("ok").is_ok());
        assert!(validate_content(&"a".repeat(500)).is_ok());
        assert_eq!(
            validate_content(&"a".repeat(501)),
            Err(ValidationError::ContentTooLong)
        );
    }

    #[test]
    fn content_length_counts_chars_not_bytes() {
        // 500 multibyte characters is still within bounds.
        assert!(validate_content(&"日".repeat(500)).is_ok());
    }

    #[test]
    fn tags_trimmed_and_bounded() {
        let tags = vec![" work ".to_string(), "q1".to_string()];
        assert_eq!(validate_tags(&tags).unwrap(), vec!["work", "q1"]);

        assert!(validate_tags(&["".to_string()]).is_err());
        assert!(validate_tags(&["x".repeat(21)]).is_err());
        assert!(validate_tags(&["x".repeat(20)]).is_ok());
    }

    #[test]
    fn sanitize_strips_script_blocks() {
        let input = "before<script>alert('xss')</script>after";
        assert_eq!(sanitize_text(input), "beforeafter");
        // Case-insensitive, spanning lines.
        let input = "a<SCRIPT>\nbad()\n</SCRIPT>b";
        assert_eq!(sanitize_text(input), "ab");
    }

    #[test]
    fn sanitize_strips_remaining_markup() {
        assert_eq!(sanitize_text("<b>bold</b> text"), "bold text");
        assert_eq!(sanitize_text("plain"), "plain");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(1500);
        assert_eq!(sanitize_text(&long).chars().count(), 1000);
    }
}
