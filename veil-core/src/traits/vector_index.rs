use async_trait::async_trait;

use crate::errors::VeilResult;
use crate::models::{IndexHit, Namespace, Partition};

/// Similarity search over stored knowledge chunks.
///
/// Contract: results come only from `namespace`, are ordered by score
/// descending, hold at most `top_k` entries, and, when `partition` is set,
/// contain only chunks of that disclosure class. Identical inputs over an
/// unchanged index return identical output.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Option<Partition>,
    ) -> VeilResult<Vec<IndexHit>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
