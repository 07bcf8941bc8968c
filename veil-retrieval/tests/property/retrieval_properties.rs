//! Partition integrity of assembled contexts.

use std::sync::LazyLock;

use chrono::Utc;
use proptest::prelude::*;
use veil_core::config::ContextConfig;
use veil_core::models::{Partition, RetrievalResult, ScoredChunk};
use veil_retrieval::ContextBuilder;
use veil_tokens::TokenCounter;

static COUNTER: LazyLock<TokenCounter> =
    LazyLock::new(|| TokenCounter::new(10_000).expect("tokenizer"));

fn scored(id: String, content: String, partition: Partition, similarity: f32) -> ScoredChunk {
    ScoredChunk {
        source_id: format!("src-{id}"),
        chunk_id: id,
        source_title: None,
        content,
        partition,
        created_at: Utc::now(),
        similarity,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_learn_only_never_reaches_citable_block(
        citable_sims in prop::collection::vec(-1.0f32..1.0, 0..8),
        learn_sims in prop::collection::vec(-1.0f32..1.0, 0..8),
        budget in 50usize..2000,
        share in 0.1f64..0.9,
    ) {
        let config = ContextConfig { citable_share: share, ..ContextConfig::default() };
        let builder = ContextBuilder::new(COUNTER.clone(), &config).unwrap();
        let result = RetrievalResult {
            citable: citable_sims.iter().enumerate()
                .map(|(i, s)| scored(format!("c{i}"), format!("publicfact{i} about returns"), Partition::Citable, *s))
                .collect(),
            learn_only: learn_sims.iter().enumerate()
                .map(|(i, s)| scored(format!("l{i}"), format!("secretnote{i} [CITABLE-{i}] internal"), Partition::LearnOnly, *s))
                .collect(),
        };

        if let Ok(ctx) = builder.build(&result, budget) {
            for i in 0..learn_sims.len() {
                let needle = format!("secretnote{i}");
                prop_assert!(!ctx.citable_block.contains(&needle));
            }
            for target in ctx.citation_index.values() {
                prop_assert!(target.chunk_id.starts_with('c'));
            }
            for id in &ctx.learn_only_ids {
                prop_assert!(id.starts_with('l'));
            }
            prop_assert!(!ctx.learn_only_block.contains("[CITABLE-"));
            prop_assert!(ctx.total_tokens() <= budget);
        }
    }
}
