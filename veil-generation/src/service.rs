//! ChatService: the inbound face of the pipeline.
//!
//! Streaming mode (`start_turn`) hands back the event receiver as the turn
//! runs; request/response mode (`respond`) drains it and returns the final
//! answer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use veil_core::config::VeilConfig;
use veil_core::errors::{GenerationError, VeilResult};
use veil_core::models::{ChatTurnRequest, CitationRef, StreamEvent};
use veil_observability::MetricsSnapshot;

use crate::cancel::CancellationToken;
use crate::orchestrator::{Collaborators, GenerationOrchestrator, TurnOutcome};
use crate::registry::SessionRegistry;
use crate::session::GenerationSession;

pub struct ChatService {
    orchestrator: Arc<GenerationOrchestrator>,
    registry: SessionRegistry,
    event_capacity: usize,
}

impl ChatService {
    pub fn new(orchestrator: GenerationOrchestrator, event_capacity: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            registry: SessionRegistry::new(),
            event_capacity: event_capacity.max(1),
        }
    }

    pub fn from_config(collaborators: Collaborators, config: &VeilConfig) -> VeilResult<Self> {
        let orchestrator = GenerationOrchestrator::new(collaborators, config)?;
        Ok(Self::new(orchestrator, config.generation.event_channel_capacity))
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.orchestrator.metrics()
    }

    /// Spawn the turn on its own task. The session is registered until the
    /// task finishes.
    pub fn start_turn(&self, request: ChatTurnRequest) -> TurnHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.event_capacity);
        self.registry.register(&session_id, cancel.clone());

        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = self.registry.clone();
        let task_cancel = cancel.clone();
        let id = session_id.clone();
        let join = tokio::spawn(async move {
            let mut session = GenerationSession::new(id.clone());
            let outcome = orchestrator
                .run_session(&mut session, &request, &tx, &task_cancel)
                .await;
            registry.remove(&id);
            outcome
        });

        TurnHandle {
            session_id,
            events: rx,
            cancel,
            join,
        }
    }

    /// Run a turn to completion. Failures come back as the turn's error;
    /// its user-facing text is `VeilError::user_message`.
    pub async fn respond(&self, request: ChatTurnRequest) -> VeilResult<ChatResponse> {
        let mut handle = self.start_turn(request);
        while handle.next_event().await.is_some() {}
        let session_id = handle.session_id().to_string();

        Ok(match handle.wait().await? {
            TurnOutcome::Delivered { message } => ChatResponse {
                session_id,
                status: ResponseStatus::Delivered,
                message_id: Some(message.id),
                content: message.content,
                citations: message
                    .citations
                    .into_iter()
                    .map(|c| CitationRef {
                        source_id: c.source_id,
                        label: c.label,
                    })
                    .collect(),
            },
            TurnOutcome::Blocked { .. } => ChatResponse {
                session_id,
                status: ResponseStatus::Blocked,
                message_id: None,
                content: self.orchestrator.fallback_message().to_string(),
                citations: Vec::new(),
            },
            TurnOutcome::Cancelled => ChatResponse {
                session_id,
                status: ResponseStatus::Cancelled,
                message_id: None,
                content: String::new(),
                citations: Vec::new(),
            },
        })
    }
}

/// A running turn.
///
/// Dropping the handle, or calling [`wait`](Self::wait) before the event
/// stream is drained, closes the receiver and cancels the turn like a client
/// disconnect.
pub struct TurnHandle {
    session_id: String,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    join: JoinHandle<VeilResult<TurnOutcome>>,
}

impl TurnHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> VeilResult<TurnOutcome> {
        let Self { events, join, .. } = self;
        drop(events);
        match join.await {
            Ok(outcome) => outcome,
            Err(e) => Err(GenerationError::StreamProtocol {
                reason: format!("turn task ended abnormally: {e}"),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Delivered,
    Blocked,
    Cancelled,
}

/// Request/response result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub session_id: String,
    pub status: ResponseStatus,
    /// Persisted assistant message, when delivered.
    pub message_id: Option<String>,
    /// Audited answer, the fallback when blocked, empty when cancelled.
    pub content: String,
    pub citations: Vec<CitationRef>,
}
