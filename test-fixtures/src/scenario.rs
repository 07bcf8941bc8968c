//! Typed scenario fixtures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use veil_core::models::{KnowledgeChunk, Namespace};

use crate::doubles::KeywordEmbedder;

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkFixture {
    pub id: String,
    /// Overrides the scenario namespace, for cross-tenant chunks.
    #[serde(default)]
    pub namespace: Option<String>,
    pub source_id: String,
    #[serde(default)]
    pub source_title: Option<String>,
    pub content: String,
    pub is_citable: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub chatbot_id: String,
    pub namespace: String,
    pub vocabulary: Vec<String>,
    pub chunks: Vec<ChunkFixture>,
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
    /// Scripted model outputs, one token per element.
    #[serde(default)]
    pub answers: BTreeMap<String, Vec<String>>,
}

impl Scenario {
    pub fn namespace(&self) -> Namespace {
        Namespace::parse(&self.namespace)
            .unwrap_or_else(|e| panic!("scenario namespace invalid: {e}"))
    }

    /// Embedder whose dimensions are this scenario's vocabulary.
    pub fn embedder(&self) -> KeywordEmbedder {
        KeywordEmbedder::new(self.vocabulary.iter().map(String::as_str))
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    /// Every chunk, embedded with [`Scenario::embedder`].
    pub fn knowledge_chunks(&self) -> Vec<KnowledgeChunk> {
        let embedder = self.embedder();
        self.chunks
            .iter()
            .map(|c| {
                let ns = c.namespace.as_deref().unwrap_or(&self.namespace);
                KnowledgeChunk {
                    id: c.id.clone(),
                    source_id: c.source_id.clone(),
                    namespace: Namespace::parse(ns)
                        .unwrap_or_else(|e| panic!("chunk {} namespace invalid: {e}", c.id)),
                    embedding: embedder.vector(&c.content),
                    content: c.content.clone(),
                    is_citable: c.is_citable,
                    source_title: c.source_title.clone(),
                    created_at: c.created_at,
                }
            })
            .collect()
    }

    pub fn chunk(&self, id: &str) -> &ChunkFixture {
        self.chunks
            .iter()
            .find(|c| c.id == id)
            .unwrap_or_else(|| panic!("scenario has no chunk '{id}'"))
    }

    pub fn query(&self, name: &str) -> &str {
        self.queries
            .get(name)
            .unwrap_or_else(|| panic!("scenario has no query '{name}'"))
    }

    pub fn answer(&self, name: &str) -> Vec<String> {
        self.answers
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("scenario has no answer '{name}'"))
    }
}
