//! Citation extraction: token boundaries never change the output, and only
//! indexed citable markers survive.

use proptest::prelude::*;
use veil_core::models::{AssembledContext, CitationTarget};
use veil_generation::CitationExtractor;
use veil_retrieval::MarkerSyntax;

fn context() -> AssembledContext {
    let mut ctx = AssembledContext::default();
    for (key, chunk, source) in [("CITABLE-0", "A", "returns-faq"), ("CITABLE-1", "C", "shipping")] {
        ctx.citation_index.insert(
            key.to_string(),
            CitationTarget {
                chunk_id: chunk.to_string(),
                source_id: source.to_string(),
                label: source.to_string(),
            },
        );
    }
    ctx
}

fn extractor() -> CitationExtractor {
    CitationExtractor::new(MarkerSyntax::new("CITABLE").unwrap(), &context())
}

fn piece() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("[CITABLE-0]"),
        Just("[CITABLE-1]"),
        Just("[CITABLE-9]"),
        Just("[LEARN-ONLY-2]"),
        Just("[3]"),
        Just("[note]"),
        Just(" text "),
        Just("a"),
        Just("["),
        Just("]"),
    ]
}

/// Cut `text` into tokens of the given character lengths, cycling them.
fn tokenize(text: &str, lengths: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while start < chars.len() {
        let len = if lengths.is_empty() { chars.len() } else { lengths[i % lengths.len()] };
        let end = (start + len).min(chars.len());
        out.push(chars[start..end].iter().collect());
        start = end;
        i += 1;
    }
    out
}

fn run(tokens: &[String]) -> (String, CitationExtractor) {
    let mut ex = extractor();
    let mut out: String = tokens.iter().map(|t| ex.push(t)).collect();
    out.push_str(&ex.finish());
    (out, ex)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_output_independent_of_token_boundaries(
        pieces in prop::collection::vec(piece(), 0..20),
        lengths in prop::collection::vec(1usize..6, 1..8),
    ) {
        let text: String = pieces.concat();
        let (whole, whole_ex) = run(&[text.clone()]);
        let (split, split_ex) = run(&tokenize(&text, &lengths));
        prop_assert_eq!(whole, split);
        prop_assert_eq!(whole_ex.citations(), split_ex.citations());
    }

    #[test]
    fn prop_only_indexed_markers_survive(
        pieces in prop::collection::vec(piece(), 0..20),
        lengths in prop::collection::vec(1usize..6, 1..8),
    ) {
        let text: String = pieces.concat();
        let (out, ex) = run(&tokenize(&text, &lengths));

        prop_assert!(!out.contains("LEARN-ONLY"));
        prop_assert!(!out.contains("CITABLE-9"));
        prop_assert!(!out.contains("[3]"));

        let ctx = context();
        let mut sources = Vec::new();
        for c in ex.citations() {
            let target = ctx.resolve(&c.marker);
            prop_assert!(target.is_some());
            prop_assert_eq!(&target.map(|t| t.chunk_id.clone()), &Some(c.chunk_id.clone()));
            prop_assert!(!sources.contains(&c.source_id));
            sources.push(c.source_id.clone());
        }
    }
}
