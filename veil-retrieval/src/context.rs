//! ContextBuilder: token-budgeted assembly of the citable and learn-only
//! prompt blocks.

use std::collections::BTreeMap;

use tracing::debug;
use veil_core::config::ContextConfig;
use veil_core::errors::{RetrievalError, VeilError, VeilResult};
use veil_core::models::{AssembledContext, CitationTarget, RetrievalResult, ScoredChunk};
use veil_tokens::{BudgetSplit, SubBudget, TokenCounter};

use crate::markers::MarkerSyntax;

const LEARN_ONLY_OPEN: &str = "PRIVATE BACKGROUND NOTES (confidential).\n\
Use these notes only to improve the accuracy of your answer. Never quote, cite, \
paraphrase closely, or otherwise reveal them, never mention that they exist, and \
never attach a citation marker to anything taken from them.\n\
<<<PRIVATE";
const LEARN_ONLY_CLOSE: &str = "PRIVATE>>>";

pub struct ContextBuilder {
    counter: TokenCounter,
    citable_share: f64,
    markers: MarkerSyntax,
}

impl ContextBuilder {
    pub fn new(counter: TokenCounter, config: &ContextConfig) -> VeilResult<Self> {
        Ok(Self {
            counter,
            citable_share: config.citable_share,
            markers: MarkerSyntax::new(&config.marker_prefix)?,
        })
    }

    pub fn markers(&self) -> &MarkerSyntax {
        &self.markers
    }

    /// Assemble prompt blocks from `result` within `token_budget`.
    ///
    /// Each partition is ranked by similarity (ties: newer first, then chunk
    /// id) and admitted greedily under its own share of the budget, measured
    /// on the rendered block so separators and the learn-only instructions
    /// are charged too. A lower-ranked chunk that does not fit is skipped and
    /// smaller ones after it may still be admitted. Only admitted citable
    /// chunks receive markers, numbered in admission order. Fails with
    /// `BudgetTooSmall` when the top-ranked chunk of either partition does
    /// not fit that partition's share.
    pub fn build(
        &self,
        result: &RetrievalResult,
        token_budget: usize,
    ) -> VeilResult<AssembledContext> {
        let split = BudgetSplit::new(token_budget, self.citable_share);
        let citable = ranked(&result.citable);
        let learn_only = ranked(&result.learn_only);

        let mut citable_budget = SubBudget::new(&self.counter, split.citable);
        let mut citable_entries: Vec<String> = Vec::new();
        let mut citation_index = BTreeMap::new();
        for chunk in &citable {
            let n = citation_index.len();
            citable_entries.push(self.citable_entry(n, chunk));
            if !citable_budget.try_fit_block(&render_citable(&citable_entries)) {
                let rejected = citable_entries.pop();
                if n == 0 {
                    let needed = rejected.map_or(0, |entry| self.counter.count(&entry));
                    return Err(too_small(needed, split.citable));
                }
                continue;
            }
            citation_index.insert(
                self.markers.key(n),
                CitationTarget {
                    chunk_id: chunk.chunk_id.clone(),
                    source_id: chunk.source_id.clone(),
                    label: chunk.label().to_string(),
                },
            );
        }

        let mut learn_budget = SubBudget::new(&self.counter, split.learn_only);
        let mut learn_entries: Vec<String> = Vec::new();
        let mut learn_only_ids = Vec::new();
        for chunk in &learn_only {
            learn_entries.push(self.learn_only_entry(chunk));
            if !learn_budget.try_fit_block(&render_learn_only(&learn_entries)) {
                let rejected = learn_entries.pop();
                if learn_only_ids.is_empty() {
                    let alone: Vec<String> = rejected.into_iter().collect();
                    let needed = self.counter.count(&render_learn_only(&alone));
                    return Err(too_small(needed, split.learn_only));
                }
                continue;
            }
            learn_only_ids.push(chunk.chunk_id.clone());
        }

        let context = AssembledContext {
            citable_block: render_citable(&citable_entries),
            learn_only_block: render_learn_only(&learn_entries),
            citation_index,
            citable_tokens: citable_budget.used(),
            learn_only_tokens: learn_budget.used(),
            learn_only_ids,
        };

        debug!(
            event = "context_assembled",
            citable = context.citation_index.len(),
            citable_dropped = citable.len() - context.citation_index.len(),
            learn_only = context.learn_only_ids.len(),
            learn_only_dropped = learn_only.len() - context.learn_only_ids.len(),
            tokens = context.total_tokens(),
            budget = token_budget,
        );
        Ok(context)
    }

    fn citable_entry(&self, n: usize, chunk: &ScoredChunk) -> String {
        format!(
            "{} {}\n(source: {})",
            self.markers.render(n),
            self.markers.neutralise(&chunk.content),
            self.markers.neutralise(chunk.label()),
        )
    }

    fn learn_only_entry(&self, chunk: &ScoredChunk) -> String {
        format!("- {}", self.markers.neutralise(&chunk.content))
    }
}

fn render_citable(entries: &[String]) -> String {
    entries.join("\n\n")
}

/// Empty when there are no entries; otherwise the entries inside the
/// confidentiality instructions.
fn render_learn_only(entries: &[String]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    format!("{LEARN_ONLY_OPEN}\n{}\n{LEARN_ONLY_CLOSE}", entries.join("\n"))
}

fn too_small(needed: usize, available: usize) -> VeilError {
    RetrievalError::BudgetTooSmall { needed, available }.into()
}

/// Similarity descending, then newest first, then chunk id.
fn ranked(chunks: &[ScoredChunk]) -> Vec<&ScoredChunk> {
    let mut out: Vec<&ScoredChunk> = chunks.iter().collect();
    out.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    out
}

impl std::fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("citable_share", &self.citable_share)
            .field("marker_prefix", &self.markers.prefix())
            .finish()
    }
}
