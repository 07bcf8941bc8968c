//! GenerationOrchestrator: one chat turn from query receipt to a terminal
//! state.
//!
//! ```text
//! Idle → Retrieving → ContextBuilding → Generating → Auditing → Delivered | Blocked
//!   any non-terminal state → Failed | Cancelled
//! ```
//!
//! The model is a producer task feeding a bounded channel; the orchestrator
//! forwards each token before asking for the next, so a slow client slows
//! the model down. Only audited text is ever persisted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use veil_core::config::{GenerationConfig, VeilConfig};
use veil_core::errors::{GenerationError, RetrievalError, VeilError, VeilResult};
use veil_core::models::{
    AssembledContext, AuditVerdict, ChatTurnRequest, CitationRef, CompletionRequest,
    GenerationState, Message, ModelEvent, Namespace, StreamEvent, Violation, ViolationRecord,
};
use veil_core::traits::{
    EmbeddingCache, EmbeddingProvider, LanguageModel, MessageStore, VectorIndex,
};
use veil_embeddings::{MokaEmbeddingCache, QueryEmbedder};
use veil_observability::{events, MetricsSnapshot, PipelineMetrics};
use veil_privacy::{PreparedAudit, PrivacyAuditor};
use veil_resilience::{CircuitBreaker, Guard, RetryPolicy};
use veil_retrieval::{ContextBuilder, PrivacyRetriever};
use veil_tokens::TokenCounter;

use crate::cancel::CancellationToken;
use crate::citation::CitationExtractor;
use crate::prompt;
use crate::session::GenerationSession;

const TOKEN_COUNT_CACHE_CAPACITY: u64 = 10_000;

/// The external services one orchestrator talks to.
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub model: Arc<dyn LanguageModel>,
    pub store: Arc<dyn MessageStore>,
    /// Query embedding cache. `None` builds a moka cache from `[embedding]`.
    pub cache: Option<Arc<dyn EmbeddingCache>>,
}

/// How a turn ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Audit passed; the assistant message was persisted.
    Delivered { message: Message },
    /// Audit caught learn-only content; the fallback was delivered instead.
    Blocked { violations: Vec<Violation> },
    /// Cancelled or disconnected; nothing was persisted.
    Cancelled,
}

impl TurnOutcome {
    pub fn state(&self) -> GenerationState {
        match self {
            Self::Delivered { .. } => GenerationState::Delivered,
            Self::Blocked { .. } => GenerationState::Blocked,
            Self::Cancelled => GenerationState::Cancelled,
        }
    }

    /// The violation behind a blocked turn, as `VeilError::PrivacyViolation`.
    pub fn violation_error(&self) -> Option<VeilError> {
        match self {
            Self::Blocked { violations } => Some(VeilError::PrivacyViolation {
                chunk_ids: violations.iter().map(|v| v.chunk_id.clone()).collect(),
            }),
            _ => None,
        }
    }
}

enum StreamEnd {
    Completed,
    Cancelled,
}

pub struct GenerationOrchestrator {
    embedder: QueryEmbedder,
    retriever: PrivacyRetriever,
    context: ContextBuilder,
    auditor: PrivacyAuditor,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn MessageStore>,
    model_breaker: Arc<CircuitBreaker>,
    model_retry: RetryPolicy,
    first_token_timeout: Duration,
    token_idle_timeout: Duration,
    top_k: usize,
    token_budget: usize,
    generation: GenerationConfig,
    metrics: Arc<PipelineMetrics>,
}

impl GenerationOrchestrator {
    /// Validate `config` and wire every stage. Each collaborator gets its own
    /// circuit breaker.
    pub fn new(collaborators: Collaborators, config: &VeilConfig) -> VeilResult<Self> {
        config.validate()?;
        let res = &config.resilience;

        let embedding_guard = Guard::new(
            Arc::new(CircuitBreaker::new(
                "embedding",
                res.breaker_failure_threshold,
                res.breaker_cooldown(),
            )),
            res.embedding_timeout(),
            RetryPolicy::from_config(res),
        );
        let cache = collaborators.cache.unwrap_or_else(|| {
            Arc::new(MokaEmbeddingCache::from_config(&config.embedding)) as Arc<dyn EmbeddingCache>
        });
        let embedder = QueryEmbedder::new(
            collaborators.embedder,
            cache,
            embedding_guard,
            config.retrieval.dimensions,
        )?;
        let retriever = PrivacyRetriever::from_config(collaborators.index, config);
        let context = ContextBuilder::new(
            TokenCounter::new(TOKEN_COUNT_CACHE_CAPACITY)?,
            &config.context,
        )?;

        Ok(Self {
            embedder,
            retriever,
            context,
            auditor: PrivacyAuditor::new(config.audit.clone()),
            model: collaborators.model,
            store: collaborators.store,
            model_breaker: Arc::new(CircuitBreaker::new(
                "model",
                res.breaker_failure_threshold,
                res.breaker_cooldown(),
            )),
            model_retry: RetryPolicy::from_config(res),
            first_token_timeout: res.first_token_timeout(),
            token_idle_timeout: res.token_idle_timeout(),
            top_k: config.retrieval.top_k,
            token_budget: config.context.token_budget,
            generation: config.generation.clone(),
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn model_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.model_breaker
    }

    pub fn fallback_message(&self) -> &str {
        &self.generation.fallback_message
    }

    /// Run one turn in a fresh session.
    pub async fn run(
        &self,
        request: &ChatTurnRequest,
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<TurnOutcome> {
        let mut session = GenerationSession::new(uuid::Uuid::new_v4().to_string());
        self.run_session(&mut session, request, events, cancel).await
    }

    /// Run one turn in `session`, which must be `Idle`. On return the session
    /// is terminal and holds no generated text unless it was delivered.
    ///
    /// Emits `TypingStart`, provisional `MessageToken`s, then exactly one of
    /// `MessageComplete`, `MessageBlocked`, or `MessageError`. A cancelled turn
    /// emits no terminal event. A closed `events` receiver cancels the turn.
    pub async fn run_session(
        &self,
        session: &mut GenerationSession,
        request: &ChatTurnRequest,
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<TurnOutcome> {
        self.metrics.record_turn_started();
        events::turn_started(session.id(), &request.chatbot_id, &request.conversation_id);

        let result = match self.drive(session, request, events, cancel).await {
            Ok(TurnOutcome::Cancelled) => {
                let _ = session.transition(GenerationState::Cancelled);
                session.discard_output();
                Ok(TurnOutcome::Cancelled)
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let _ = session.transition(GenerationState::Failed);
                session.discard_output();
                events::turn_failed(session.id(), err.kind(), err.is_retryable());
                self.emit(
                    events,
                    cancel,
                    StreamEvent::MessageError {
                        message: err.user_message().to_string(),
                        retryable: err.is_retryable(),
                    },
                )
                .await;
                Err(err)
            }
        };

        self.metrics.record_terminal(session.state());
        events::turn_finished(
            session.id(),
            session.state(),
            session.elapsed().as_millis() as u64,
            session.emitted_citations().len(),
        );
        result
    }

    async fn drive(
        &self,
        session: &mut GenerationSession,
        request: &ChatTurnRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<TurnOutcome> {
        session.transition(GenerationState::Retrieving)?;
        Namespace::parse(&request.chatbot_id)?;
        if !self.emit(tx, cancel, StreamEvent::TypingStart).await {
            return Ok(TurnOutcome::Cancelled);
        }

        let Some(embedding) = or_cancel(cancel, self.embedder.embed(&request.user_text)).await
        else {
            return Ok(TurnOutcome::Cancelled);
        };
        let embedding = embedding?;
        let Some(retrieved) = or_cancel(
            cancel,
            self.retriever
                .retrieve(&embedding, &request.chatbot_id, self.top_k),
        )
        .await
        else {
            return Ok(TurnOutcome::Cancelled);
        };
        let retrieved = retrieved?;
        events::retrieval_completed(
            session.id(),
            retrieved.citable.len(),
            retrieved.learn_only.len(),
        );

        session.transition(GenerationState::ContextBuilding)?;
        // Fingerprint everything retrieved, not only what fits the budget.
        let audit = self.auditor.prepare(&retrieved.learn_only, &retrieved.citable);
        let context = match self.context.build(&retrieved, self.token_budget) {
            Ok(context) => context,
            Err(VeilError::Retrieval(RetrievalError::BudgetTooSmall { needed, available })) => {
                events::context_skipped(session.id(), needed, available);
                AssembledContext::default()
            }
            Err(err) => return Err(err),
        };
        drop(retrieved);
        events::context_assembled(
            session.id(),
            context.citation_index.len(),
            context.learn_only_ids.len(),
            context.total_tokens(),
            self.token_budget,
        );

        let Some(history) = or_cancel(
            cancel,
            self.store
                .recent(&request.conversation_id, self.generation.history_turns),
        )
        .await
        else {
            return Ok(TurnOutcome::Cancelled);
        };
        let history = history?;
        let completion = prompt::completion_request(
            self.context.markers(),
            &context,
            &history,
            &request.user_text,
            &self.generation,
        );

        session.transition(GenerationState::Generating)?;
        let mut extractor = CitationExtractor::new(self.context.markers().clone(), &context);
        if let StreamEnd::Cancelled = self
            .generate(session, &mut extractor, completion, tx, cancel)
            .await?
        {
            return Ok(TurnOutcome::Cancelled);
        }
        if cancel.is_cancelled() {
            return Ok(TurnOutcome::Cancelled);
        }

        session.transition(GenerationState::Auditing)?;
        session.set_citations(extractor.into_citations());
        match audit_output(&audit, session) {
            AuditVerdict::Clean => self.deliver(session, request, tx, cancel).await,
            AuditVerdict::Violations(violations) => {
                self.block(session, request, violations, tx, cancel).await
            }
        }
    }

    /// Stream the completion, retrying retryable failures while nothing has
    /// reached the caller yet.
    async fn generate(
        &self,
        session: &mut GenerationSession,
        extractor: &mut CitationExtractor,
        completion: CompletionRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<StreamEnd> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.model_breaker.allow()?;

            let err = match self
                .stream_once(session, extractor, completion.clone(), tx, cancel)
                .await
            {
                Ok(StreamEnd::Completed) => {
                    self.model_breaker.record_success();
                    return Ok(StreamEnd::Completed);
                }
                Ok(StreamEnd::Cancelled) => return Ok(StreamEnd::Cancelled),
                Err(err) => err,
            };

            if err.is_retryable() {
                self.model_breaker.record_failure();
            }
            let may_retry = err.is_retryable()
                && session.tokens_forwarded() == 0
                && attempt < self.model_retry.max_attempts;
            if !may_retry {
                return Err(err);
            }

            session.discard_output();
            extractor.reset();
            let delay = self.model_retry.delay_for(attempt);
            self.metrics.record_model_retry();
            events::retry_scheduled(
                self.model_breaker.component(),
                attempt,
                delay.as_millis() as u64,
                err.kind(),
            );
            if or_cancel(cancel, tokio::time::sleep(delay)).await.is_none() {
                return Ok(StreamEnd::Cancelled);
            }
        }
    }

    async fn stream_once(
        &self,
        session: &mut GenerationSession,
        extractor: &mut CitationExtractor,
        completion: CompletionRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<StreamEnd> {
        let (sink, mut tokens) = mpsc::channel(self.generation.stream_channel_capacity);
        let model = Arc::clone(&self.model);
        let producer = Producer(Some(tokio::spawn(async move {
            model.stream(completion, sink).await
        })));

        loop {
            let first = session.tokens_received() == 0;
            let wait = if first {
                self.first_token_timeout
            } else {
                self.token_idle_timeout
            };
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = tokio::time::timeout(wait, tokens.recv()) => next,
            };

            match next {
                Err(_) => {
                    let reason = if first {
                        "no token before the first-token deadline"
                    } else {
                        "token stream stalled"
                    };
                    return Err(GenerationError::ModelUnavailable {
                        reason: reason.to_string(),
                    }
                    .into());
                }
                Ok(Some(ModelEvent::Token(token))) => {
                    if !self.on_token(session, extractor, &token, tx, cancel).await {
                        return Ok(StreamEnd::Cancelled);
                    }
                }
                Ok(Some(ModelEvent::Done)) => {
                    let tail = extractor.finish();
                    self.report_rejected(session, extractor);
                    if !tail.is_empty() && !self.forward(session, &tail, tx, cancel).await {
                        return Ok(StreamEnd::Cancelled);
                    }
                    return Ok(StreamEnd::Completed);
                }
                Ok(None) => {
                    return Err(match producer.join().await {
                        Ok(Err(err)) => err,
                        Ok(Ok(())) => GenerationError::StreamProtocol {
                            reason: "stream ended without end-of-stream signal".to_string(),
                        }
                        .into(),
                        Err(join) => GenerationError::ModelUnavailable {
                            reason: format!("model task ended abnormally: {join}"),
                        }
                        .into(),
                    });
                }
            }
        }
    }

    /// Buffer one raw token and forward whatever the extractor releases.
    /// Returns false when the turn must stop.
    async fn on_token(
        &self,
        session: &mut GenerationSession,
        extractor: &mut CitationExtractor,
        token: &str,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        if session.push_token(token) {
            if let Some(latency) = session.time_to_first_token() {
                self.metrics.record_first_token(latency);
            }
        }
        let visible = extractor.push(token);
        self.report_rejected(session, extractor);
        if visible.is_empty() {
            return true;
        }
        self.forward(session, &visible, tx, cancel).await
    }

    async fn forward(
        &self,
        session: &mut GenerationSession,
        text: &str,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        session.push_visible(text);
        if !self.generation.stream_provisional_tokens {
            return true;
        }
        let event = StreamEvent::MessageToken {
            content: text.to_string(),
        };
        if !self.emit(tx, cancel, event).await {
            return false;
        }
        session.mark_forwarded();
        true
    }

    fn report_rejected(&self, session: &GenerationSession, extractor: &mut CitationExtractor) {
        for marker in extractor.take_rejected() {
            events::citation_rejected(session.id(), &marker);
            self.metrics.record_rejected_citation();
        }
    }

    async fn deliver(
        &self,
        session: &mut GenerationSession,
        request: &ChatTurnRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<TurnOutcome> {
        let user = Message::user(&request.conversation_id, &request.user_text);
        let reply = Message::assistant(
            &request.conversation_id,
            session.visible_text().to_string(),
            session.emitted_citations().to_vec(),
        );
        self.store.append(&[user, reply.clone()]).await?;
        session.transition(GenerationState::Delivered)?;

        if !self.generation.stream_provisional_tokens && !reply.content.is_empty() {
            let event = StreamEvent::MessageToken {
                content: reply.content.clone(),
            };
            self.emit(tx, cancel, event).await;
        }
        let citations = reply
            .citations
            .iter()
            .map(|c| CitationRef {
                source_id: c.source_id.clone(),
                label: c.label.clone(),
            })
            .collect();
        let complete = StreamEvent::MessageComplete {
            message_id: reply.id.clone(),
            citations,
        };
        self.emit(tx, cancel, complete).await;
        Ok(TurnOutcome::Delivered { message: reply })
    }

    /// Discard the generated text, log and record every violation, and
    /// persist the fallback in its place.
    async fn block(
        &self,
        session: &mut GenerationSession,
        request: &ChatTurnRequest,
        violations: Vec<Violation>,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> VeilResult<TurnOutcome> {
        session.discard_output();
        let now = Utc::now();
        let records: Vec<ViolationRecord> = violations
            .iter()
            .map(|v| {
                events::privacy_violation(
                    session.id(),
                    &request.conversation_id,
                    &v.chunk_id,
                    &v.source_id,
                    v.kind,
                );
                ViolationRecord {
                    session_id: session.id().to_string(),
                    conversation_id: request.conversation_id.clone(),
                    chatbot_id: request.chatbot_id.clone(),
                    chunk_id: v.chunk_id.clone(),
                    source_id: v.source_id.clone(),
                    kind: v.kind,
                    recorded_at: now,
                }
            })
            .collect();
        self.metrics.record_violations(records.len());
        self.store.record_violations(&records).await?;

        let fallback = self.generation.fallback_message.clone();
        let user = Message::user(&request.conversation_id, &request.user_text);
        let reply = Message::assistant(&request.conversation_id, fallback.clone(), Vec::new());
        self.store.append(&[user, reply]).await?;
        session.transition(GenerationState::Blocked)?;

        self.emit(tx, cancel, StreamEvent::MessageBlocked { reason: fallback })
            .await;
        let outcome = TurnOutcome::Blocked { violations };
        if let Some(err) = outcome.violation_error() {
            events::turn_blocked(session.id(), err.kind(), &err.to_string());
        }
        Ok(outcome)
    }

    /// Send one event to the caller. A closed receiver is a disconnect and
    /// cancels the turn. Returns false when the event was not delivered.
    async fn emit(
        &self,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
        event: StreamEvent,
    ) -> bool {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            sent = tx.send(event) => sent,
        };
        if sent.is_err() {
            cancel.cancel();
            return false;
        }
        true
    }
}

/// Raw model output first, then the visible text, so neither stripping a
/// marker nor the raw token boundaries can hide a leak.
fn audit_output(audit: &PreparedAudit, session: &GenerationSession) -> AuditVerdict {
    let raw = audit.audit(session.token_buffer());
    if !raw.is_clean() {
        return raw;
    }
    audit.audit(session.visible_text())
}

async fn or_cancel<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}

/// Model producer task, aborted if the turn stops listening.
struct Producer(Option<JoinHandle<VeilResult<()>>>);

impl Producer {
    async fn join(mut self) -> Result<VeilResult<()>, JoinError> {
        match self.0.take() {
            Some(handle) => handle.await,
            None => Ok(Ok(())),
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}
