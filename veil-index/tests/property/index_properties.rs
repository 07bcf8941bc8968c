//! Property tests: namespace isolation and ranking invariants.

use proptest::prelude::*;
use test_fixtures::chunk;
use veil_core::models::Namespace;
use veil_core::traits::VectorIndex;
use veil_index::InMemoryVectorIndex;

const DIMS: usize = 4;

fn vec_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, DIMS)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_query_only_returns_own_namespace(
        a_vecs in prop::collection::vec(vec_strategy(), 1..10),
        b_vecs in prop::collection::vec(vec_strategy(), 1..10),
        query in vec_strategy(),
        top_k in 1usize..20,
    ) {
        let index = InMemoryVectorIndex::new(DIMS);
        for (i, v) in a_vecs.into_iter().enumerate() {
            index.insert(chunk("tenant-a", &format!("a{i}"), "s", "x", i % 2 == 0, v)).unwrap();
        }
        for (i, v) in b_vecs.into_iter().enumerate() {
            index.insert(chunk("tenant-b", &format!("b{i}"), "s", "x", i % 2 == 0, v)).unwrap();
        }
        let ns = Namespace::parse("tenant-b").unwrap();
        let hits = runtime().block_on(index.query(&ns, &query, top_k, None)).unwrap();
        prop_assert!(hits.len() <= top_k);
        for h in &hits {
            prop_assert_eq!(h.namespace.as_str(), "tenant-b");
            prop_assert!(h.chunk_id.starts_with('b'));
        }
    }

    #[test]
    fn prop_hits_sorted_and_scores_bounded(
        vecs in prop::collection::vec(vec_strategy(), 1..15),
        query in vec_strategy(),
    ) {
        let index = InMemoryVectorIndex::new(DIMS);
        for (i, v) in vecs.into_iter().enumerate() {
            index.insert(chunk("t", &format!("c{i:02}"), "s", "x", true, v)).unwrap();
        }
        let ns = Namespace::parse("t").unwrap();
        let hits = runtime().block_on(index.query(&ns, &query, 50, None)).unwrap();
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for h in &hits {
            prop_assert!((-1.0..=1.0).contains(&h.score));
        }
    }
}
