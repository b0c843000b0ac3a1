use std::{collections::BTreeMap, fmt};

use lazy_static::lazy_static;
use regex::Regex;

use crate::submit::Draft;

pub const FIELD_TEXT: &str = "text";

pub const MAX_TEXT_LEN: usize = 500;

lazy_static! {
    static ref SCRIPT_TAG: Regex = Regex::new(r"(?i)<script").unwrap();
    static ref EVENT_HANDLER: Regex = Regex::new(r"(?i)\bon\w+\s*=").unwrap();
    static ref JAVASCRIPT_URL: Regex = Regex::new(r"(?i)javascript:").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HtmlViolation {
    ScriptTag,
    EventHandler,
    JavascriptUrl,
}

impl fmt::Display for HtmlViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ScriptTag => "Script tags are not allowed",
            Self::EventHandler => "Event handlers are not allowed",
            Self::JavascriptUrl => "JavaScript URLs are not allowed",
        };
        f.write_str(msg)
    }
}

/// Outcome of a single validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Error message per field name.
    pub errors: BTreeMap<String, String>,
    pub html_violations: Vec<HtmlViolation>,
}

impl Validation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.html_violations.is_empty()
    }

    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

#[must_use]
pub fn html_violations(text: &str) -> Vec<HtmlViolation> {
    [
        (&*SCRIPT_TAG, HtmlViolation::ScriptTag),
        (&*EVENT_HANDLER, HtmlViolation::EventHandler),
        (&*JAVASCRIPT_URL, HtmlViolation::JavascriptUrl),
    ]
    .into_iter()
    .filter(|(pattern, _)| pattern.is_match(text))
    .map(|(_, violation)| violation)
    .collect()
}

/// Checks the raw draft text without touching it.
#[must_use]
pub fn validate_draft(draft: &Draft) -> Validation {
    let mut validation = Validation::default();
    let text = draft.text.trim();
    if text.is_empty() {
        validation
            .errors
            .insert(FIELD_TEXT.to_string(), "Comment text is required.".to_string());
    } else if text.chars().count() > MAX_TEXT_LEN {
        validation.errors.insert(
            FIELD_TEXT.to_string(),
            format!("Comment text must be at most {MAX_TEXT_LEN} characters."),
        );
    }
    validation.html_violations = html_violations(&draft.text);
    validation
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn draft(text: &str) -> Draft {
        Draft {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn require_text() {
        for text in ["", "   ", "\n\t"] {
            let validation = validate_draft(&draft(text));
            assert!(!validation.is_valid());
            assert_eq!(validation.error(FIELD_TEXT), Some("Comment text is required."));
        }
    }

    #[test]
    fn accept_plain_text() {
        let validation = validate_draft(&draft("Nice article, <b>thanks</b>!"));
        assert!(validation.is_valid());
        assert_eq!(validation, Validation::default());
    }

    #[test]
    fn reject_too_long_text() {
        let validation = validate_draft(&draft(&"x".repeat(MAX_TEXT_LEN + 1)));
        assert_eq!(
            validation.error(FIELD_TEXT),
            Some("Comment text must be at most 500 characters.")
        );
        assert!(validate_draft(&draft(&"ü".repeat(MAX_TEXT_LEN))).is_valid());
    }

    #[test]
    fn detect_script_tags() {
        let validation = validate_draft(&draft("hi <SCRIPT>alert(1)</SCRIPT>"));
        assert_eq!(validation.html_violations, vec![HtmlViolation::ScriptTag]);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn detect_event_handlers() {
        let validation = validate_draft(&draft(r#"<b onclick="x()">hi</b>"#));
        assert_eq!(validation.html_violations, vec![HtmlViolation::EventHandler]);
        assert_eq!(
            html_violations("<img src=x OnError = y>"),
            vec![HtmlViolation::EventHandler]
        );
    }

    #[test]
    fn ignore_words_containing_on() {
        assert!(html_violations("the condition = true").is_empty());
        assert!(html_violations("once upon a time").is_empty());
    }

    #[test]
    fn detect_javascript_urls() {
        let validation = validate_draft(&draft(r#"<a href="JavaScript:alert(1)">x</a>"#));
        assert_eq!(validation.html_violations, vec![HtmlViolation::JavascriptUrl]);
    }

    #[test]
    fn violations_can_co_occur() {
        let validation = validate_draft(&draft(
            r#"<script></script><a href="javascript:x" onclick="y">z</a>"#,
        ));
        assert_eq!(
            validation.html_violations,
            vec![
                HtmlViolation::ScriptTag,
                HtmlViolation::EventHandler,
                HtmlViolation::JavascriptUrl
            ]
        );
        let messages: Vec<_> = validation
            .html_violations
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Script tags are not allowed",
                "Event handlers are not allowed",
                "JavaScript URLs are not allowed"
            ]
        );
    }

    #[test]
    fn validation_does_not_touch_the_draft() {
        let d = draft(" <script>x</script> ");
        let before = d.clone();
        let _ = validate_draft(&d);
        assert_eq!(d, before);
    }
}
