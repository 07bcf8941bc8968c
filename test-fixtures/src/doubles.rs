//! Collaborator doubles: embedder, streaming model, vector indexes, and a
//! recording message store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use veil_core::errors::{GenerationError, RetrievalError, VeilResult};
use veil_core::models::{
    CompletionRequest, IndexHit, KnowledgeChunk, Message, ModelEvent, Namespace, Partition,
    ViolationRecord,
};
use veil_core::traits::{EmbeddingProvider, LanguageModel, MessageStore, VectorIndex};

/// Build a chunk with an explicit embedding.
pub fn chunk(
    namespace: &str,
    id: &str,
    source_id: &str,
    content: &str,
    is_citable: bool,
    embedding: Vec<f32>,
) -> KnowledgeChunk {
    KnowledgeChunk {
        id: id.to_string(),
        source_id: source_id.to_string(),
        namespace: Namespace::parse(namespace)
            .unwrap_or_else(|e| panic!("bad test namespace '{namespace}': {e}")),
        embedding,
        content: content.to_string(),
        is_citable,
        source_title: Some(format!("{source_id} title")),
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Embedding
// ---------------------------------------------------------------------------

/// Bag-of-keywords embedder: one dimension per vocabulary word.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    vocabulary: HashMap<String, usize>,
    dims: usize,
    calls: Arc<AtomicUsize>,
}

impl KeywordEmbedder {
    pub fn new<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocabulary = HashMap::new();
        for w in words {
            let next = vocabulary.len();
            vocabulary.entry(w.to_lowercase()).or_insert(next);
        }
        let dims = vocabulary.len();
        Self {
            vocabulary,
            dims,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(&i) = self.vocabulary.get(&word.to_lowercase()) {
                v[i] += 1.0;
            }
        }
        v
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> VeilResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// Streams a fixed token script. Can fail before the first token for the
/// first N calls, fail after K tokens, pace tokens, or end without `Done`.
pub struct ScriptedModel {
    tokens: Vec<String>,
    token_delay: Duration,
    fail_first_calls: usize,
    fail_after_tokens: Option<usize>,
    send_done: bool,
    calls: AtomicUsize,
    tokens_sent: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<S: AsRef<str>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| t.as_ref().to_string()).collect(),
            token_delay: Duration::ZERO,
            fail_first_calls: 0,
            fail_after_tokens: None,
            send_done: true,
            calls: AtomicUsize::new(0),
            tokens_sent: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// The first `n` calls fail with `ModelUnavailable` before streaming.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first_calls = n;
        self
    }

    /// Every call fails with `ModelUnavailable` after sending `k` tokens.
    pub fn failing_after(mut self, k: usize) -> Self {
        self.fail_after_tokens = Some(k);
        self
    }

    /// End the stream without the explicit end-of-stream event.
    pub fn without_done(mut self) -> Self {
        self.send_done = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens accepted by the consumer across all calls.
    pub fn tokens_sent(&self) -> usize {
        self.tokens_sent.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn model_down(reason: &str) -> veil_core::VeilError {
    GenerationError::ModelUnavailable {
        reason: reason.to_string(),
    }
    .into()
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn stream(
        &self,
        request: CompletionRequest,
        sink: mpsc::Sender<ModelEvent>,
    ) -> VeilResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);
        if call < self.fail_first_calls {
            return Err(model_down("scripted failure before first token"));
        }

        for (i, token) in self.tokens.iter().enumerate() {
            if self.fail_after_tokens == Some(i) {
                return Err(model_down("scripted failure mid-stream"));
            }
            if !self.token_delay.is_zero() {
                tokio::time::sleep(self.token_delay).await;
            }
            if sink.send(ModelEvent::Token(token.clone())).await.is_err() {
                return Ok(());
            }
            self.tokens_sent.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_after_tokens == Some(self.tokens.len()) {
            return Err(model_down("scripted failure mid-stream"));
        }
        if self.send_done {
            let _ = sink.send(ModelEvent::Done).await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Vector indexes
// ---------------------------------------------------------------------------

/// Always fails with `IndexUnavailable`, optionally only for one partition.
/// Queries for other partitions are delegated to `inner` when present.
pub struct FailingIndex {
    only: Option<Partition>,
    inner: Option<Arc<dyn VectorIndex>>,
    calls: AtomicUsize,
}

impl FailingIndex {
    pub fn new() -> Self {
        Self {
            only: None,
            inner: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail only `partition`; everything else goes to `inner`.
    pub fn for_partition(partition: Partition, inner: Arc<dyn VectorIndex>) -> Self {
        Self {
            only: Some(partition),
            inner: Some(inner),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn query(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Option<Partition>,
    ) -> VeilResult<Vec<IndexHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fails = match self.only {
            None => true,
            Some(p) => partition == Some(p),
        };
        match (&self.inner, fails) {
            (Some(inner), false) => inner.query(namespace, embedding, top_k, partition).await,
            _ => Err(RetrievalError::IndexUnavailable {
                reason: "index offline".to_string(),
            }
            .into()),
        }
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Delays every query before delegating.
pub struct SlowIndex {
    inner: Arc<dyn VectorIndex>,
    delay: Duration,
}

impl SlowIndex {
    pub fn new(inner: Arc<dyn VectorIndex>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl VectorIndex for SlowIndex {
    async fn query(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Option<Partition>,
    ) -> VeilResult<Vec<IndexHit>> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(namespace, embedding, top_k, partition).await
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Fails the first `failures` queries, then delegates.
pub struct FlakyIndex {
    inner: Arc<dyn VectorIndex>,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyIndex {
    pub fn new(inner: Arc<dyn VectorIndex>, failures: usize) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn query(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Option<Partition>,
    ) -> VeilResult<Vec<IndexHit>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(RetrievalError::IndexUnavailable {
                reason: "transient".to_string(),
            }
            .into());
        }
        self.inner.query(namespace, embedding, top_k, partition).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ---------------------------------------------------------------------------
// Message store
// ---------------------------------------------------------------------------

/// Keeps everything in memory and lets tests inspect what was persisted.
#[derive(Default)]
pub struct RecordingMessageStore {
    messages: Mutex<Vec<Message>>,
    violations: Mutex<Vec<ViolationRecord>>,
}

impl RecordingMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed history without going through the trait.
    pub fn seed(&self, messages: Vec<Message>) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(messages);
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn recorded_violations(&self) -> Vec<ViolationRecord> {
        self.violations.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MessageStore for RecordingMessageStore {
    async fn append(&self, messages: &[Message]) -> VeilResult<()> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(messages);
        Ok(())
    }

    async fn recent(&self, conversation_id: &str, limit: usize) -> VeilResult<Vec<Message>> {
        let all = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        let matching: Vec<Message> = all
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn record_violations(&self, records: &[ViolationRecord]) -> VeilResult<()> {
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(records);
        Ok(())
    }

    async fn violations(&self, conversation_id: &str) -> VeilResult<Vec<ViolationRecord>> {
        Ok(self
            .violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}
