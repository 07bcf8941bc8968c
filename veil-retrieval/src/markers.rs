//! Citation marker syntax: rendering `[PREFIX-n]`, recognising marker-like
//! brackets, and neutralising them inside stored content.

use regex::Regex;
use veil_core::errors::{ConfigError, VeilResult};

/// Marker rendering and recognition for one configured prefix.
#[derive(Debug, Clone)]
pub struct MarkerSyntax {
    prefix: String,
    marker_like: Regex,
}

impl MarkerSyntax {
    pub fn new(prefix: &str) -> VeilResult<Self> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::InvalidValue {
                field: "context.marker_prefix".to_string(),
                reason: "must be non-empty ASCII alphanumeric".to_string(),
            }
            .into());
        }
        // Anything a model (or a stored document) could pass off as a source
        // reference: the configured prefix, common reference words, or a bare
        // number, with an optional trailing identifier.
        let pattern = format!(
            r"(?i)\[\s*(?:(?:{}|citable|learn[\s_-]*only|learn|private|source|src|chunk|ref|cite|doc)(?:[\s_:#-]*[a-z0-9_-]+)?|\d+)\s*\]",
            regex::escape(prefix)
        );
        let marker_like = Regex::new(&pattern).map_err(|e| ConfigError::InvalidValue {
            field: "context.marker_prefix".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            prefix: prefix.to_string(),
            marker_like,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Index key for the n-th citable chunk, e.g. `CITABLE-0`.
    pub fn key(&self, n: usize) -> String {
        format!("{}-{n}", self.prefix)
    }

    /// Marker as it appears in the prompt, e.g. `[CITABLE-0]`.
    pub fn render(&self, n: usize) -> String {
        format!("[{}]", self.key(n))
    }

    /// Whether a complete bracketed segment (brackets included) looks like a
    /// source reference.
    pub fn is_marker_like(&self, segment: &str) -> bool {
        self.marker_like
            .find(segment)
            .is_some_and(|m| m.start() == 0 && m.end() == segment.len())
    }

    /// Index key for a bracketed segment: trimmed inner text, prefix
    /// upper-cased so `[citable-0]` and `[CITABLE-0]` resolve alike.
    pub fn normalise_key(&self, segment: &str) -> String {
        let inner = segment
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        match inner.get(..self.prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(&self.prefix) => {
                format!("{}{}", self.prefix, &inner[self.prefix.len()..])
            }
            _ => inner.to_string(),
        }
    }

    /// Strip the brackets from every marker-like segment so stored text can
    /// never forge a citation.
    pub fn neutralise(&self, text: &str) -> String {
        self.marker_like
            .replace_all(text, |caps: &regex::Captures<'_>| {
                caps[0]
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .trim()
                    .to_string()
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax() -> MarkerSyntax {
        MarkerSyntax::new("CITABLE").unwrap()
    }

    #[test]
    fn renders_markers() {
        assert_eq!(syntax().key(3), "CITABLE-3");
        assert_eq!(syntax().render(0), "[CITABLE-0]");
    }

    #[test]
    fn recognises_marker_like_segments() {
        let s = syntax();
        for seg in [
            "[CITABLE-0]",
            "[citable-12]",
            "[LEARN-ONLY-0]",
            "[learn_only 2]",
            "[source: pricing]",
            "[3]",
            "[ CITABLE-1 ]",
            "[chunk-b]",
        ] {
            assert!(s.is_marker_like(seg), "{seg}");
        }
        for seg in ["[optional]", "[see above]", "[x]", "CITABLE-0", "[CITABLE-0] tail"] {
            assert!(!s.is_marker_like(seg), "{seg}");
        }
    }

    #[test]
    fn normalises_case_of_prefix() {
        let s = syntax();
        assert_eq!(s.normalise_key("[citable-2]"), "CITABLE-2");
        assert_eq!(s.normalise_key("[ CITABLE-0 ]"), "CITABLE-0");
        assert_eq!(s.normalise_key("[LEARN-ONLY-0]"), "LEARN-ONLY-0");
    }

    #[test]
    fn neutralise_removes_brackets_from_forged_markers() {
        let s = syntax();
        let out = s.neutralise("See [CITABLE-9] and [learn-only-1] but keep [optional] text.");
        assert_eq!(out, "See CITABLE-9 and learn-only-1 but keep [optional] text.");
    }

    #[test]
    fn rejects_bad_prefix() {
        assert!(MarkerSyntax::new("").is_err());
        assert!(MarkerSyntax::new("CIT]").is_err());
    }

    #[test]
    fn custom_prefix_is_recognised() {
        let s = MarkerSyntax::new("REF").unwrap();
        assert!(s.is_marker_like("[REF-4]"));
        assert_eq!(s.render(1), "[REF-1]");
    }
}
