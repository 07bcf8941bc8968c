//! End-to-end turns through the orchestrator against the bot-42 scenario.

use std::sync::Arc;
use std::time::Duration;

use test_fixtures::{KeywordEmbedder, RecordingMessageStore, Scenario, ScriptedModel};
use tokio::sync::mpsc;
use veil_core::config::defaults::DEFAULT_FALLBACK_MESSAGE;
use veil_core::errors::{VeilError, GENERIC_FAILURE_MESSAGE};
use veil_core::models::{
    ChatTurnRequest, CitationRef, FingerprintKind, GenerationState, Message, Role, StreamEvent,
};
use veil_core::traits::EmbeddingCache;
use veil_core::{VeilConfig, VeilResult};
use veil_embeddings::{cache_key, MokaEmbeddingCache};
use veil_generation::{
    CancellationToken, Collaborators, GenerationOrchestrator, GenerationSession, TurnOutcome,
};
use veil_index::InMemoryVectorIndex;

struct Harness {
    scenario: Scenario,
    orchestrator: GenerationOrchestrator,
    model: Arc<ScriptedModel>,
    store: Arc<RecordingMessageStore>,
    embedder: KeywordEmbedder,
}

fn harness(model: ScriptedModel) -> Harness {
    harness_with(model, |_| {})
}

fn harness_with(model: ScriptedModel, tweak: impl FnOnce(&mut VeilConfig)) -> Harness {
    build_harness(model, tweak, None)
}

fn build_harness(
    model: ScriptedModel,
    tweak: impl FnOnce(&mut VeilConfig),
    cache: Option<Arc<dyn EmbeddingCache>>,
) -> Harness {
    let scenario = test_fixtures::load_scenario("bot42");
    let mut config = VeilConfig::default();
    config.retrieval.dimensions = scenario.dimensions();
    config.resilience.first_token_timeout_ms = 2_000;
    config.resilience.token_idle_timeout_ms = 2_000;
    config.resilience.backoff_base_ms = 1;
    config.resilience.backoff_max_ms = 5;
    tweak(&mut config);

    let index = InMemoryVectorIndex::new(scenario.dimensions());
    index.insert_all(scenario.knowledge_chunks()).unwrap();
    let model = Arc::new(model);
    let store = Arc::new(RecordingMessageStore::new());
    let embedder = scenario.embedder();

    let orchestrator = GenerationOrchestrator::new(
        Collaborators {
            embedder: Arc::new(embedder.clone()),
            index: Arc::new(index),
            model: model.clone(),
            store: store.clone(),
            cache,
        },
        &config,
    )
    .unwrap();

    Harness {
        scenario,
        orchestrator,
        model,
        store,
        embedder,
    }
}

fn request(chatbot_id: &str, text: &str) -> ChatTurnRequest {
    ChatTurnRequest {
        chatbot_id: chatbot_id.to_string(),
        conversation_id: "conv-1".to_string(),
        user_text: text.to_string(),
    }
}

async fn run_turn(
    h: &Harness,
    req: &ChatTurnRequest,
) -> (VeilResult<TurnOutcome>, Vec<StreamEvent>) {
    let (tx, mut rx) = mpsc::channel(256);
    let outcome = h.orchestrator.run(req, &tx, &CancellationToken::new()).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

fn streamed_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::MessageToken { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn return_policy_turn_is_delivered_with_citation() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let TurnOutcome::Delivered { message } = outcome.unwrap() else {
        panic!("expected a delivered turn");
    };
    assert_eq!(message.content, "Our return policy is 30 days [CITABLE-0].");
    assert_eq!(message.citations.len(), 1);
    assert_eq!(message.citations[0].chunk_id, "A");
    assert_eq!(message.citations[0].source_id, "returns-faq");
    assert_eq!(message.citations[0].label, "Returns FAQ");

    assert_eq!(events.first(), Some(&StreamEvent::TypingStart));
    assert_eq!(streamed_text(&events), message.content);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::MessageComplete {
            message_id: message.id.clone(),
            citations: vec![CitationRef {
                source_id: "returns-faq".to_string(),
                label: "Returns FAQ".to_string(),
            }],
        })
    );
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let persisted = h.store.messages();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0].role, Role::User);
    assert_eq!(persisted[1], message);
    assert!(h.store.recorded_violations().is_empty());

    let sent = h.model.last_request().unwrap();
    assert!(sent.citable_block.contains("[CITABLE-0] Return policy is 30 days"));
    assert!(!sent.citable_block.contains("ZX-91-PRIVATE"));
    assert!(sent.learn_only_block.contains("ZX-91-PRIVATE"));
    assert!(!sent.citable_block.contains("90 days"));

    let metrics = h.orchestrator.metrics();
    assert_eq!(metrics.turns_started, 1);
    assert_eq!(metrics.delivered, 1);
    assert_eq!(metrics.first_token_samples, 1);
}

#[tokio::test]
async fn leaked_discount_code_is_blocked() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("leak")));
    let req = request("bot-42", h.scenario.query("discount"));

    let (outcome, events) = run_turn(&h, &req).await;
    let TurnOutcome::Blocked { violations } = outcome.unwrap() else {
        panic!("expected a blocked turn");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].chunk_id, "B");
    assert_eq!(violations[0].source_id, "sales-playbook");
    assert_eq!(violations[0].kind, FingerprintKind::DistinctiveToken);

    let err = TurnOutcome::Blocked { violations: violations.clone() }
        .violation_error()
        .unwrap();
    assert!(matches!(&err, VeilError::PrivacyViolation { chunk_ids } if chunk_ids == &["B"]));
    assert_eq!(err.kind(), "privacy_violation");
    assert!(!err.is_retryable());
    assert!(!err.to_string().contains("ZX-91"));

    assert_eq!(
        events.last(),
        Some(&StreamEvent::MessageBlocked {
            reason: DEFAULT_FALLBACK_MESSAGE.to_string(),
        })
    );

    let persisted = h.store.messages();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[1].content, DEFAULT_FALLBACK_MESSAGE);
    assert!(persisted[1].citations.is_empty());
    assert!(persisted.iter().all(|m| !m.content.contains("ZX-91")));

    let records = h.store.recorded_violations();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].chunk_id, "B");
    assert_eq!(records[0].chatbot_id, "bot-42");
    assert_eq!(records[0].conversation_id, "conv-1");

    let metrics = h.orchestrator.metrics();
    assert_eq!(metrics.blocked, 1);
    assert_eq!(metrics.violations, 1);
}

#[tokio::test]
async fn forged_markers_are_stripped_before_the_client_sees_them() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("forged_citation")));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let TurnOutcome::Delivered { message } = outcome.unwrap() else {
        panic!("expected a delivered turn");
    };
    assert_eq!(
        message.content,
        "Discounts exist  and returns take 30 days [CITABLE-0]."
    );
    assert_eq!(message.citations.len(), 1);
    assert_eq!(message.citations[0].chunk_id, "A");

    let streamed = streamed_text(&events);
    assert!(!streamed.contains("LEARN-ONLY"));
    assert!(!streamed.contains("CITABLE-7"));
    assert_eq!(h.orchestrator.metrics().rejected_citations, 2);
}

#[tokio::test]
async fn cancellation_mid_stream_persists_nothing() {
    let scenario = test_fixtures::load_scenario("bot42");
    let answer = scenario.answer("return_policy");
    let total = answer.len();
    let h = harness(ScriptedModel::new(answer).with_token_delay(Duration::from_millis(30)));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (tx, mut rx) = mpsc::channel(256);
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = rx.recv().await {
                if matches!(event, StreamEvent::MessageToken { .. }) {
                    cancel.cancel();
                }
                seen.push(event);
            }
            seen
        })
    };

    let mut session = GenerationSession::new("s-cancel");
    let outcome = h
        .orchestrator
        .run_session(&mut session, &req, &tx, &cancel)
        .await
        .unwrap();
    drop(tx);
    let seen = watcher.await.unwrap();

    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert_eq!(session.state(), GenerationState::Cancelled);
    assert!(session.token_buffer().is_empty());
    assert!(session.visible_text().is_empty());
    assert!(h.store.messages().is_empty());
    assert!(seen.iter().all(|e| !e.is_terminal()));
    assert!(h.model.tokens_sent() < total);
    assert_eq!(h.orchestrator.metrics().cancelled, 1);
}

#[tokio::test]
async fn closed_event_receiver_cancels_the_turn() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(
        ScriptedModel::new(scenario.answer("return_policy"))
            .with_token_delay(Duration::from_millis(10)),
    );
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (tx, rx) = mpsc::channel(256);
    drop(rx);
    let cancel = CancellationToken::new();
    let outcome = h.orchestrator.run(&req, &tx, &cancel).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert!(cancel.is_cancelled());
    assert_eq!(h.model.calls(), 0);
    assert!(h.store.messages().is_empty());
}

#[tokio::test]
async fn failures_before_the_first_token_are_retried() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")).failing_first(2));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    assert!(matches!(outcome.unwrap(), TurnOutcome::Delivered { .. }));
    assert_eq!(h.model.calls(), 3);
    assert_eq!(h.orchestrator.metrics().model_retries, 2);
    assert_eq!(
        events.iter().filter(|e| **e == StreamEvent::TypingStart).count(),
        1
    );
    assert!(events
        .iter()
        .all(|e| !matches!(e, StreamEvent::MessageError { .. })));
}

#[tokio::test]
async fn exhausted_retries_fail_with_generic_message() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")).failing_first(10));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "model_unavailable");
    assert!(err.is_retryable());
    assert_eq!(h.model.calls(), 3);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::MessageError {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            retryable: true,
        })
    );
    assert!(h.store.messages().is_empty());
    assert_eq!(h.orchestrator.metrics().failed, 1);
}

#[tokio::test]
async fn failure_after_forwarded_tokens_is_not_retried() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")).failing_after(3));
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    assert_eq!(outcome.unwrap_err().kind(), "model_unavailable");
    assert_eq!(h.model.calls(), 1);
    assert_eq!(streamed_text(&events), "Our return policy ");
    assert!(matches!(
        events.last(),
        Some(StreamEvent::MessageError {
            retryable: true,
            ..
        })
    ));
    assert!(h.store.messages().is_empty());
}

#[tokio::test]
async fn stream_without_end_signal_is_a_protocol_error() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")).without_done());
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "stream_protocol");
    assert!(!err.is_retryable());
    assert!(matches!(
        events.last(),
        Some(StreamEvent::MessageError {
            retryable: false,
            ..
        })
    ));
    assert!(h.store.messages().is_empty());
}

#[tokio::test]
async fn silent_model_hits_the_first_token_deadline() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness_with(
        ScriptedModel::new(scenario.answer("return_policy"))
            .with_token_delay(Duration::from_millis(500)),
        |c| {
            c.resilience.first_token_timeout_ms = 30;
            c.resilience.max_attempts = 1;
        },
    );
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "model_unavailable");
    assert!(streamed_text(&events).is_empty());
}

#[tokio::test]
async fn model_breaker_opens_after_repeated_failures() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness_with(
        ScriptedModel::new(scenario.answer("return_policy")).failing_first(100),
        |c| {
            c.resilience.max_attempts = 1;
            c.resilience.breaker_failure_threshold = 2;
        },
    );
    let req = request("bot-42", h.scenario.query("return_policy"));

    for _ in 0..2 {
        let (outcome, _) = run_turn(&h, &req).await;
        assert_eq!(outcome.unwrap_err().kind(), "model_unavailable");
    }
    let (outcome, _) = run_turn(&h, &req).await;
    assert_eq!(outcome.unwrap_err().kind(), "circuit_open");
    assert_eq!(h.model.calls(), 2);
}

#[tokio::test]
async fn conversation_history_reaches_the_model() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")));
    h.store.seed(vec![
        Message::user("conv-1", "earlier question"),
        Message::assistant("conv-1", "earlier answer".to_string(), Vec::new()),
        Message::user("conv-2", "someone else"),
    ]);
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, _) = run_turn(&h, &req).await;
    assert!(outcome.is_ok());
    let sent = h.model.last_request().unwrap();
    assert_eq!(sent.history.len(), 2);
    assert_eq!(sent.history[0].content, "earlier question");
    assert_eq!(sent.history[1].role, Role::Assistant);
    assert_eq!(sent.user_text, "what is your return policy?");
}

#[tokio::test]
async fn without_provisional_tokens_only_audited_text_is_sent() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness_with(ScriptedModel::new(scenario.answer("return_policy")), |c| {
        c.generation.stream_provisional_tokens = false;
    });
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    assert!(matches!(outcome.unwrap(), TurnOutcome::Delivered { .. }));
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[1],
        StreamEvent::MessageToken {
            content: "Our return policy is 30 days [CITABLE-0].".to_string(),
        }
    );
    assert!(matches!(events[2], StreamEvent::MessageComplete { .. }));
}

#[tokio::test]
async fn without_provisional_tokens_a_blocked_turn_sends_no_text() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness_with(ScriptedModel::new(scenario.answer("leak")), |c| {
        c.generation.stream_provisional_tokens = false;
    });
    let req = request("bot-42", h.scenario.query("discount"));

    let (outcome, events) = run_turn(&h, &req).await;
    assert!(matches!(outcome.unwrap(), TurnOutcome::Blocked { .. }));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::TypingStart);
    assert!(matches!(events[1], StreamEvent::MessageBlocked { .. }));
}

#[tokio::test]
async fn other_tenants_chunks_never_reach_the_prompt() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(["Returns are 90 days."]));
    let req = request("bot-7", h.scenario.query("return_policy"));

    let (outcome, _) = run_turn(&h, &req).await;
    assert!(outcome.is_ok());
    let sent = h.model.last_request().unwrap();
    assert!(sent.citable_block.contains("90 days"));
    assert!(!sent.citable_block.contains("30 days"));
    assert!(!sent.learn_only_block.contains("ZX-91-PRIVATE"));
}

#[tokio::test]
async fn invalid_namespace_fails_before_embedding() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness(ScriptedModel::new(scenario.answer("return_policy")));
    let req = request("", h.scenario.query("return_policy"));

    let (outcome, events) = run_turn(&h, &req).await;
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "invalid_namespace");
    assert!(!err.is_retryable());
    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.model.calls(), 0);
    assert_eq!(
        events,
        vec![StreamEvent::MessageError {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            retryable: false,
        }]
    );
}

#[tokio::test]
async fn budget_too_small_still_answers_without_sources() {
    let scenario = test_fixtures::load_scenario("bot42");
    let h = harness_with(ScriptedModel::new(scenario.answer("return_policy")), |c| {
        c.context.token_budget = 1;
    });
    let req = request("bot-42", h.scenario.query("return_policy"));

    let (outcome, _) = run_turn(&h, &req).await;
    let TurnOutcome::Delivered { message } = outcome.unwrap() else {
        panic!("expected a delivered turn");
    };
    assert!(message.citations.is_empty());
    assert!(!message.content.contains("CITABLE"));
    let sent = h.model.last_request().unwrap();
    assert!(sent.citable_block.is_empty());
    assert!(sent.learn_only_block.is_empty());
}

#[tokio::test]
async fn injected_embedding_cache_serves_the_query() {
    let scenario = test_fixtures::load_scenario("bot42");
    let query = scenario.query("return_policy");
    let cache = Arc::new(MokaEmbeddingCache::new(16, Duration::from_secs(60)));
    cache.put(
        cache_key("keyword", query),
        scenario.embedder().vector(query),
    );
    let injected: Arc<dyn EmbeddingCache> = cache.clone();
    let h = build_harness(
        ScriptedModel::new(scenario.answer("return_policy")),
        |_| {},
        Some(injected),
    );

    let (outcome, _) = run_turn(&h, &request("bot-42", query)).await;
    assert!(matches!(outcome.unwrap(), TurnOutcome::Delivered { .. }));
    assert_eq!(h.embedder.calls(), 0);

    let other = "what is the warranty?";
    let (outcome, _) = run_turn(&h, &request("bot-42", other)).await;
    assert!(outcome.is_ok());
    assert_eq!(h.embedder.calls(), 1);
    assert!(cache.get(&cache_key("keyword", other)).is_some());
}
