use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a citation marker resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationTarget {
    pub chunk_id: String,
    pub source_id: String,
    pub label: String,
}

/// Token-bounded prompt material built once per query.
///
/// `citation_index` only ever holds citable chunks. Learn-only content lives
/// in `learn_only_block` and nowhere else.
#[derive(Clone, Default)]
pub struct AssembledContext {
    pub citable_block: String,
    pub learn_only_block: String,
    /// Marker text (e.g. `CITABLE-0`, without brackets) to its citable source.
    pub citation_index: BTreeMap<String, CitationTarget>,
    pub citable_tokens: usize,
    pub learn_only_tokens: usize,
    /// Ids of learn-only chunks admitted into the prompt.
    pub learn_only_ids: Vec<String>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.citation_index.is_empty() && self.learn_only_ids.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.citable_tokens + self.learn_only_tokens
    }

    pub fn resolve(&self, marker: &str) -> Option<&CitationTarget> {
        self.citation_index.get(marker)
    }
}

impl fmt::Debug for AssembledContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembledContext")
            .field("markers", &self.citation_index.keys().collect::<Vec<_>>())
            .field("learn_only_ids", &self.learn_only_ids)
            .field("citable_tokens", &self.citable_tokens)
            .field("learn_only_tokens", &self.learn_only_tokens)
            .finish()
    }
}
