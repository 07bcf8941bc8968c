//! PrivacyRetriever: two independent partition queries within one namespace.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};
use veil_core::config::VeilConfig;
use veil_core::errors::{RetrievalError, VeilError, VeilResult};
use veil_core::models::{IndexHit, Namespace, Partition, RetrievalResult, ScoredChunk};
use veil_core::traits::VectorIndex;
use veil_embeddings::validation::validate_embedding;
use veil_resilience::{CircuitBreaker, Guard, RetryPolicy};

/// Wraps a [`VectorIndex`] and enforces namespace and partition boundaries.
///
/// The citable and learn-only partitions are separate index queries, each
/// asking for `top_k`, so a skewed or failing partition cannot starve the
/// other. A failure in either fails the whole retrieval.
pub struct PrivacyRetriever {
    index: Arc<dyn VectorIndex>,
    guard: Guard,
    dimensions: usize,
}

impl PrivacyRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, guard: Guard, dimensions: usize) -> Self {
        Self {
            index,
            guard,
            dimensions,
        }
    }

    /// Index guard built from the resilience config.
    pub fn from_config(index: Arc<dyn VectorIndex>, config: &VeilConfig) -> Self {
        let res = &config.resilience;
        let breaker = Arc::new(CircuitBreaker::new(
            "vector_index",
            res.breaker_failure_threshold,
            res.breaker_cooldown(),
        ));
        let guard = Guard::new(breaker, res.index_timeout(), RetryPolicy::from_config(res));
        Self::new(index, guard, config.retrieval.dimensions)
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub async fn retrieve(
        &self,
        embedding: &[f32],
        namespace: &str,
        top_k: usize,
    ) -> VeilResult<RetrievalResult> {
        let namespace = Namespace::parse(namespace)?;
        validate_embedding(embedding, self.dimensions)?;
        if top_k == 0 {
            return Ok(RetrievalResult::default());
        }

        let (citable, learn_only) = tokio::join!(
            self.query_partition(&namespace, embedding, top_k, Partition::Citable),
            self.query_partition(&namespace, embedding, top_k, Partition::LearnOnly),
        );
        let citable = citable?;
        let learn_only = learn_only?;

        // A chunk reported under both partitions is treated as learn-only.
        let learn_ids: HashSet<&str> = learn_only.iter().map(|h| h.chunk_id.as_str()).collect();
        let (citable, conflicted): (Vec<IndexHit>, Vec<IndexHit>) = citable
            .into_iter()
            .partition(|h| !learn_ids.contains(h.chunk_id.as_str()));
        for hit in &conflicted {
            warn!(
                event = "partition_conflict",
                chunk_id = %hit.chunk_id,
                "chunk reported in both partitions, treating as learn-only"
            );
        }

        let result = RetrievalResult {
            citable: finalise(citable, Partition::Citable, top_k),
            learn_only: finalise(learn_only, Partition::LearnOnly, top_k),
        };
        debug!(
            event = "retrieval_completed",
            namespace = %namespace,
            citable = result.citable.len(),
            learn_only = result.learn_only.len(),
        );
        Ok(result)
    }

    /// One guarded partition query, with out-of-namespace and wrong-partition
    /// hits dropped.
    async fn query_partition(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Partition,
    ) -> VeilResult<Vec<IndexHit>> {
        let index = &self.index;
        let hits = self
            .guard
            .call(
                move || index.query(namespace, embedding, top_k, Some(partition)),
                || {
                    RetrievalError::IndexUnavailable {
                        reason: format!("{} query timed out", partition.as_str()),
                    }
                    .into()
                },
            )
            .await
            .map_err(|e| as_index_unavailable(e, partition))?;

        Ok(hits
            .into_iter()
            .filter(|hit| {
                if &hit.namespace != namespace {
                    warn!(
                        event = "foreign_namespace_hit_dropped",
                        chunk_id = %hit.chunk_id,
                        expected = %namespace,
                        actual = %hit.namespace,
                    );
                    return false;
                }
                if Partition::from_citable(hit.is_citable) != partition {
                    warn!(
                        event = "wrong_partition_hit_dropped",
                        chunk_id = %hit.chunk_id,
                        requested = partition.as_str(),
                    );
                    return false;
                }
                if !hit.score.is_finite() {
                    warn!(event = "non_finite_score_dropped", chunk_id = %hit.chunk_id);
                    return false;
                }
                true
            })
            .collect())
    }
}

/// Caller bugs pass through; everything else about the index is reported as
/// `IndexUnavailable`.
fn as_index_unavailable(err: VeilError, partition: Partition) -> VeilError {
    match err {
        VeilError::Retrieval(
            RetrievalError::InvalidEmbedding { .. }
            | RetrievalError::InvalidNamespace { .. }
            | RetrievalError::IndexUnavailable { .. },
        ) => err,
        other => RetrievalError::IndexUnavailable {
            reason: format!("{} partition: {other}", partition.as_str()),
        }
        .into(),
    }
}

/// Dedup by chunk id (best score wins), order by score then id, keep `top_k`.
fn finalise(hits: Vec<IndexHit>, partition: Partition, top_k: usize) -> Vec<ScoredChunk> {
    let mut best: BTreeMap<String, IndexHit> = BTreeMap::new();
    for hit in hits {
        match best.get(&hit.chunk_id) {
            Some(existing) if existing.score >= hit.score => {}
            _ => {
                best.insert(hit.chunk_id.clone(), hit);
            }
        }
    }
    let mut out: Vec<ScoredChunk> = best
        .into_values()
        .map(|hit| ScoredChunk::from_hit(hit, partition))
        .collect();
    out.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    out.truncate(top_k);
    out
}

impl std::fmt::Debug for PrivacyRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivacyRetriever")
            .field("index", &self.index.name())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
