//! Incremental citation extraction over the model token stream.
//!
//! Markers can be split across tokens (`"[CIT"`, `"ABLE-0]"`), so any text
//! from an opening `[` onwards is held back until the bracket closes or
//! grows too long to be a marker. A closed segment is then:
//! - a known citable marker: kept visible, recorded once per source;
//! - any other marker-like segment (unknown number, learn-only reference,
//!   bare `[3]`): stripped and reported as rejected;
//! - ordinary bracketed text: released unchanged.

use std::collections::{BTreeMap, HashSet};

use veil_core::models::{AssembledContext, Citation, CitationTarget};
use veil_retrieval::MarkerSyntax;

/// Longest bracketed run held back while waiting for `]`.
const MAX_PENDING_CHARS: usize = 48;

pub struct CitationExtractor {
    markers: MarkerSyntax,
    index: BTreeMap<String, CitationTarget>,
    pending: String,
    citations: Vec<Citation>,
    cited_sources: HashSet<String>,
    rejected: Vec<String>,
}

impl CitationExtractor {
    pub fn new(markers: MarkerSyntax, context: &AssembledContext) -> Self {
        Self {
            markers,
            index: context.citation_index.clone(),
            pending: String::new(),
            citations: Vec::new(),
            cited_sources: HashSet::new(),
            rejected: Vec::new(),
        }
    }

    /// Feed one token; returns the text that is safe to show now.
    pub fn push(&mut self, token: &str) -> String {
        let mut out = String::with_capacity(token.len());
        for c in token.chars() {
            self.feed(c, &mut out);
        }
        out
    }

    /// End of stream: release whatever is still held back. An unterminated
    /// segment that would be a marker once closed is dropped.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return pending;
        }
        let closed = format!("{pending}]");
        if self.markers.is_marker_like(&closed) {
            self.rejected.push(self.markers.normalise_key(&closed));
            return String::new();
        }
        pending
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn into_citations(self) -> Vec<Citation> {
        self.citations
    }

    /// Marker keys stripped since the last call.
    pub fn take_rejected(&mut self) -> Vec<String> {
        std::mem::take(&mut self.rejected)
    }

    /// Forget all output, keeping the citation index. Used before a retry.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.citations.clear();
        self.cited_sources.clear();
        self.rejected.clear();
    }

    fn feed(&mut self, c: char, out: &mut String) {
        if self.pending.is_empty() {
            if c == '[' {
                self.pending.push(c);
            } else {
                out.push(c);
            }
            return;
        }

        if c == '[' {
            // Nested bracket: what was held back is not a marker.
            out.push_str(&std::mem::take(&mut self.pending));
            self.pending.push(c);
            return;
        }

        self.pending.push(c);
        if c == ']' {
            let segment = std::mem::take(&mut self.pending);
            self.resolve(segment, out);
        } else if self.pending.chars().count() > MAX_PENDING_CHARS {
            out.push_str(&std::mem::take(&mut self.pending));
        }
    }

    fn resolve(&mut self, segment: String, out: &mut String) {
        if !self.markers.is_marker_like(&segment) {
            out.push_str(&segment);
            return;
        }
        let key = self.markers.normalise_key(&segment);
        match self.index.get(&key) {
            Some(target) => {
                if self.cited_sources.insert(target.source_id.clone()) {
                    self.citations.push(Citation {
                        marker: key.clone(),
                        source_id: target.source_id.clone(),
                        chunk_id: target.chunk_id.clone(),
                        label: target.label.clone(),
                    });
                }
                out.push('[');
                out.push_str(&key);
                out.push(']');
            }
            None => self.rejected.push(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(entries: &[(&str, &str, &str)]) -> AssembledContext {
        let mut ctx = AssembledContext::default();
        for (key, chunk, source) in entries {
            ctx.citation_index.insert(
                key.to_string(),
                CitationTarget {
                    chunk_id: chunk.to_string(),
                    source_id: source.to_string(),
                    label: format!("{source} label"),
                },
            );
        }
        ctx
    }

    fn extractor(entries: &[(&str, &str, &str)]) -> CitationExtractor {
        CitationExtractor::new(MarkerSyntax::new("CITABLE").unwrap(), &context(entries))
    }

    fn run(ex: &mut CitationExtractor, tokens: &[&str]) -> String {
        let mut out: String = tokens.iter().map(|t| ex.push(t)).collect();
        out.push_str(&ex.finish());
        out
    }

    #[test]
    fn marker_split_across_tokens_resolves() {
        let mut ex = extractor(&[("CITABLE-0", "A", "returns-faq")]);
        let out = run(&mut ex, &["30 days ", "[CIT", "ABLE-", "0]", "."]);
        assert_eq!(out, "30 days [CITABLE-0].");
        assert_eq!(ex.citations().len(), 1);
        assert_eq!(ex.citations()[0].chunk_id, "A");
        assert_eq!(ex.citations()[0].marker, "CITABLE-0");
    }

    #[test]
    fn held_back_text_is_not_released_early() {
        let mut ex = extractor(&[("CITABLE-0", "A", "returns-faq")]);
        assert_eq!(ex.push("see [CITA"), "see ");
        assert_eq!(ex.push("BLE-0] ok"), "[CITABLE-0] ok");
    }

    #[test]
    fn unknown_and_learn_only_markers_are_stripped() {
        let mut ex = extractor(&[("CITABLE-0", "A", "returns-faq")]);
        let out = run(&mut ex, &["a [LEARN-ONLY-0] b [CITABLE-7] c [2] d"]);
        assert_eq!(out, "a  b  c  d");
        assert!(ex.citations().is_empty());
        assert_eq!(
            ex.take_rejected(),
            vec!["LEARN-ONLY-0".to_string(), "CITABLE-7".to_string(), "2".to_string()]
        );
        assert!(ex.take_rejected().is_empty());
    }

    #[test]
    fn lowercase_marker_is_canonicalised() {
        let mut ex = extractor(&[("CITABLE-1", "C", "shipping")]);
        assert_eq!(run(&mut ex, &["[citable-1]"]), "[CITABLE-1]");
        assert_eq!(ex.citations().len(), 1);
    }

    #[test]
    fn citations_deduplicate_by_source() {
        let mut ex = extractor(&[
            ("CITABLE-0", "A1", "faq"),
            ("CITABLE-1", "A2", "faq"),
            ("CITABLE-2", "C", "shipping"),
        ]);
        let out = run(&mut ex, &["[CITABLE-0][CITABLE-1] and [CITABLE-2][CITABLE-0]"]);
        assert_eq!(out, "[CITABLE-0][CITABLE-1] and [CITABLE-2][CITABLE-0]");
        let sources: Vec<&str> = ex.citations().iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(sources, vec!["faq", "shipping"]);
    }

    #[test]
    fn ordinary_brackets_pass_through() {
        let mut ex = extractor(&[]);
        assert_eq!(run(&mut ex, &["an array [a, b] and [note]"]), "an array [a, b] and [note]");
    }

    #[test]
    fn overlong_bracket_is_flushed_as_text() {
        let mut ex = extractor(&[]);
        let long = format!("[{}", "x".repeat(60));
        let out = ex.push(&long);
        assert!(out.starts_with("[xxx"));
        assert_eq!(ex.finish(), "");
    }

    #[test]
    fn unterminated_marker_at_end_is_dropped() {
        let mut ex = extractor(&[("CITABLE-0", "A", "faq")]);
        assert_eq!(run(&mut ex, &["done [LEARN-ONLY-3"]), "done ");
        let mut ex = extractor(&[]);
        assert_eq!(run(&mut ex, &["price [approx"]), "price [approx");
    }

    #[test]
    fn nested_open_bracket_releases_previous() {
        let mut ex = extractor(&[("CITABLE-0", "A", "faq")]);
        assert_eq!(run(&mut ex, &["x [[CITABLE-0]"]), "x [[CITABLE-0]");
        assert_eq!(ex.citations().len(), 1);
    }
}
