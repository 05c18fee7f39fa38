use std::{sync::Arc, time::Duration};

use color_eyre::eyre;
use time::OffsetDateTime;

use mesh_config::Config;
use mesh_domain::{AgentMessage, ConsensusStrategy, MessageKind, RecallStrategy};
use mesh_engine::{
	AgentProvider, ContinueRequest, Deadline, EmbeddingProvider, Error, ExecuteRequest,
	MeshEngine, Providers, RecallRequest,
};
use mesh_store::{BoxFuture, MemoryEventSink};

const GOOD_ANSWER: &str = "To reset your password open account settings, choose security, and \
	press reset password.";

struct FixedEmbedding(Vec<f32>);
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a mesh_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors = vec![self.0.clone(); texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a mesh_config::EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(eyre::eyre!("embedding backend offline")) })
	}
}

#[derive(Clone)]
enum AgentScript {
	Answer(String),
	Reject(String),
	Fail,
	Sleep(Duration, String),
}

struct ScriptedAgent(AgentScript);
impl AgentProvider for ScriptedAgent {
	fn dispatch<'a>(
		&'a self,
		cfg: &'a mesh_config::AgentProviderConfig,
		critic_agent: &'a str,
		strategy: ConsensusStrategy,
		_goal: &'a str,
		_context: &'a [String],
		_hints: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<AgentMessage>>> {
		let script = self.0.clone();
		let solver = cfg.solver_agent.clone();
		let critic = critic_agent.to_string();

		Box::pin(async move {
			match script {
				AgentScript::Fail => Err(eyre::eyre!("agent backend offline")),
				AgentScript::Sleep(delay, answer) => {
					tokio::time::sleep(delay).await;

					Ok(trace(strategy, &solver, &critic, &answer, true))
				},
				AgentScript::Answer(answer) => Ok(trace(strategy, &solver, &critic, &answer, true)),
				AgentScript::Reject(notes) => Ok(trace(strategy, &solver, &critic, &notes, false)),
			}
		})
	}
}

fn trace(
	strategy: ConsensusStrategy,
	solver: &str,
	critic: &str,
	content: &str,
	approve: bool,
) -> Vec<AgentMessage> {
	let message = |from: &str, kind: MessageKind| AgentMessage {
		from: from.to_string(),
		kind,
		content: content.to_string(),
		ts: OffsetDateTime::now_utc(),
	};

	match strategy {
		ConsensusStrategy::Majority => vec![message(solver, MessageKind::Final)],
		ConsensusStrategy::Critic => vec![
			message(solver, MessageKind::Hypothesis),
			if approve {
				message(critic, MessageKind::Final)
			} else {
				message(critic, MessageKind::Critique)
			},
		],
	}
}

struct Harness {
	engine: MeshEngine,
	sink: Arc<MemoryEventSink>,
}

fn harness(cfg: Config, script: AgentScript) -> Harness {
	harness_with_embedding(cfg, script, Arc::new(FixedEmbedding(vec![1.0, 0.0, 0.0])))
}

fn harness_with_embedding(
	cfg: Config,
	script: AgentScript,
	embedding: Arc<dyn EmbeddingProvider>,
) -> Harness {
	let sink = Arc::new(MemoryEventSink::new());
	let engine = MeshEngine::with_providers(
		cfg,
		Arc::new(mesh_testkit::seeded_store()),
		Arc::clone(&sink) as Arc<dyn mesh_store::EventSink>,
		Providers { embedding, agent: Arc::new(ScriptedAgent(script)) },
	);

	Harness { engine, sink }
}

fn recall_request(q: &str, workspace_id: &str) -> RecallRequest {
	RecallRequest {
		q: q.to_string(),
		workspace_id: workspace_id.to_string(),
		top_k: None,
		strategy: None,
		use_mmr: None,
		mmr_lambda: None,
		budget_tokens: None,
	}
}

fn deadline() -> Deadline {
	Deadline::after(Duration::from_secs(5))
}

async fn wait_for_events(sink: &MemoryEventSink, expected: usize) {
	for _ in 0..100 {
		if sink.len() >= expected {
			return;
		}

		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	panic!("sink never reached {expected} events");
}

#[tokio::test]
async fn sparse_recall_isolates_the_relevant_document() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let mut req = recall_request("reset password", mesh_testkit::WORKSPACE);

	req.strategy = Some("sparse".to_string());

	let response = engine.recall(&req, &deadline()).await.unwrap();

	assert_eq!(response.diagnostics.strategy_used, RecallStrategy::Sparse);
	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, "reset-guide");
	assert!(response.items[0].score > 0.0);
	assert!(response.diagnostics.tokens_used > 0);
}

#[tokio::test]
async fn dense_recall_ranks_by_embedding_similarity() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let mut req = recall_request("reset password", mesh_testkit::WORKSPACE);

	req.strategy = Some("dense".to_string());

	let response = engine.recall(&req, &deadline()).await.unwrap();

	assert_eq!(response.diagnostics.strategy_used, RecallStrategy::Dense);
	assert_eq!(response.items[0].id, "reset-guide");
}

#[tokio::test]
async fn auto_routes_short_queries_to_hybrid() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let response = engine
		.recall(&recall_request("reset password", mesh_testkit::WORKSPACE), &deadline())
		.await
		.unwrap();

	assert_eq!(response.diagnostics.strategy_used, RecallStrategy::Hybrid);
	assert_eq!(response.items[0].id, "reset-guide");
}

#[tokio::test]
async fn hybrid_degrades_to_sparse_when_embeddings_fail() {
	let Harness { engine, .. } = harness_with_embedding(
		mesh_testkit::test_config(),
		AgentScript::Answer(GOOD_ANSWER.to_string()),
		Arc::new(FailingEmbedding),
	);
	let mut req = recall_request("reset password", mesh_testkit::WORKSPACE);

	req.strategy = Some("hybrid".to_string());

	let response = engine.recall(&req, &deadline()).await.unwrap();

	assert_eq!(response.diagnostics.degraded, vec!["dense".to_string()]);
	assert_eq!(response.items[0].id, "reset-guide");
}

#[tokio::test]
async fn dense_recall_fails_hard_when_embeddings_fail() {
	let Harness { engine, .. } = harness_with_embedding(
		mesh_testkit::test_config(),
		AgentScript::Answer(GOOD_ANSWER.to_string()),
		Arc::new(FailingEmbedding),
	);
	let mut req = recall_request("reset password", mesh_testkit::WORKSPACE);

	req.strategy = Some("dense".to_string());

	assert!(matches!(
		engine.recall(&req, &deadline()).await,
		Err(Error::ProviderUnavailable { .. })
	));
}

#[tokio::test]
async fn diversity_drops_the_near_duplicate() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let mut req = recall_request("reset password", mesh_testkit::DUPLICATES_WORKSPACE);

	req.strategy = Some("sparse".to_string());

	let response = engine.recall(&req, &deadline()).await.unwrap();
	let ids: Vec<&str> = response.items.iter().map(|item| item.id.as_str()).collect();

	assert!(ids.contains(&"reset-guide"));
	assert!(!ids.contains(&"reset-guide-copy"));
	assert!(response.diagnostics.mmr_applied);
}

#[tokio::test]
async fn blank_query_is_rejected() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let result = engine.recall(&recall_request("   ", mesh_testkit::WORKSPACE), &deadline()).await;

	assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[tokio::test]
async fn unknown_workspace_recalls_nothing() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let response =
		engine.recall(&recall_request("reset password", "missing"), &deadline()).await.unwrap();

	assert!(response.items.is_empty());
	assert_eq!(response.diagnostics.selected, 0);
	assert_eq!(response.diagnostics.tokens_used, 0);
}

#[tokio::test]
async fn diagnostics_count_the_full_ranked_pool() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let mut req = recall_request("zebra xylophone", mesh_testkit::WORKSPACE);

	req.strategy = Some("sparse".to_string());

	let response = engine.recall(&req, &deadline()).await.unwrap();

	// Every corpus document is ranked and counted, even when none of
	// them scores above zero for the query.
	assert_eq!(response.diagnostics.candidates_considered, 10);
	assert!(response.items.is_empty());
	assert_eq!(response.diagnostics.selected, 0);
}

#[tokio::test]
async fn execute_majority_produces_a_validated_answer() {
	let Harness { engine, sink } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let outcome = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password for my account?".to_string(),
			hints: Vec::new(),
			cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
			strategy: None,
		})
		.await
		.unwrap();

	assert!(outcome.consensus.accepted);
	assert_eq!(outcome.final_answer.as_deref(), Some(GOOD_ANSWER));
	assert!(!outcome.trace.is_empty());
	assert!(outcome.metrics.citations_count >= 1);

	let validation = outcome.validation.expect("accepted outcome must be scored");

	assert_eq!(validation.model_version, "scorer-v1");
	assert_eq!(validation.strategy, ConsensusStrategy::Majority);
	assert!(validation.score > 0.0);

	wait_for_events(&sink, 1).await;

	let recent = sink.recent_validations(10, None);

	assert_eq!(recent.len(), 1);
	assert_eq!(recent[0].record.session_id, outcome.session_id);
}

#[tokio::test]
async fn critic_rejection_is_an_ordinary_outcome() {
	let Harness { engine, sink } = harness(
		mesh_testkit::test_config(),
		AgentScript::Reject("cites nothing from the context".to_string()),
	);
	let outcome = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password?".to_string(),
			hints: Vec::new(),
			cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
			strategy: Some("critic".to_string()),
		})
		.await
		.unwrap();

	assert!(!outcome.consensus.accepted);
	assert!(outcome.final_answer.is_none());
	assert!(outcome.validation.is_none());
	assert_eq!(outcome.consensus.disagreements, Some(1));

	// Rejected outcomes are never scored, so nothing is emitted.
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert!(sink.is_empty());
}

#[tokio::test]
async fn deadline_expiry_yields_a_timeout_outcome() {
	let mut cfg = mesh_testkit::test_config();

	cfg.session.deadline_ms = 20;

	let Harness { engine, .. } = harness(
		cfg,
		AgentScript::Sleep(Duration::from_millis(300), GOOD_ANSWER.to_string()),
	);
	let outcome = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password?".to_string(),
			hints: Vec::new(),
			cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
			strategy: None,
		})
		.await
		.unwrap();

	assert!(!outcome.consensus.accepted);
	assert_eq!(outcome.consensus.reason.as_deref(), Some("timeout"));
	assert!(outcome.validation.is_none());
}

#[tokio::test]
async fn agent_failure_is_a_provider_error() {
	let Harness { engine, .. } = harness(mesh_testkit::test_config(), AgentScript::Fail);
	let result = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password?".to_string(),
			hints: Vec::new(),
			cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
			strategy: None,
		})
		.await;

	assert!(matches!(result, Err(Error::Provider { .. })));
}

#[tokio::test]
async fn blank_goal_is_rejected() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let result = engine
		.execute(&ExecuteRequest {
			goal: "  ".to_string(),
			hints: Vec::new(),
			cluster_ids: Vec::new(),
			strategy: None,
		})
		.await;

	assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[tokio::test]
async fn unknown_strategy_is_rejected() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let result = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password?".to_string(),
			hints: Vec::new(),
			cluster_ids: Vec::new(),
			strategy: Some("unanimous".to_string()),
		})
		.await;

	assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[tokio::test]
async fn continuation_extends_the_archived_trace() {
	let Harness { engine, sink } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let first = engine
		.execute(&ExecuteRequest {
			goal: "How do I reset my password?".to_string(),
			hints: Vec::new(),
			cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
			strategy: None,
		})
		.await
		.unwrap();
	let second = engine
		.continue_session(&ContinueRequest {
			session_id: first.session_id,
			feedback: "Mention how long the reset email takes.".to_string(),
		})
		.await
		.unwrap();

	assert_eq!(second.session_id, first.session_id);
	assert!(second.trace.len() > first.trace.len());
	assert!(second.trace.iter().any(|message| {
		message.from == "user" && message.kind == MessageKind::Critique
	}));
	assert!(second.consensus.accepted);

	wait_for_events(&sink, 2).await;

	assert_eq!(sink.recent_validations(10, None).len(), 2);
}

#[tokio::test]
async fn continuing_an_unknown_session_is_not_found() {
	let Harness { engine, .. } =
		harness(mesh_testkit::test_config(), AgentScript::Answer(GOOD_ANSWER.to_string()));
	let result = engine
		.continue_session(&ContinueRequest {
			session_id: uuid::Uuid::new_v4(),
			feedback: "anything".to_string(),
		})
		.await;

	assert!(matches!(result, Err(Error::SessionNotFound { .. })));
}

#[tokio::test]
async fn evicted_sessions_cannot_be_continued() {
	let mut cfg = mesh_testkit::test_config();

	cfg.session.max_sessions = 1;

	let Harness { engine, .. } = harness(cfg, AgentScript::Answer(GOOD_ANSWER.to_string()));
	let request = ExecuteRequest {
		goal: "How do I reset my password?".to_string(),
		hints: Vec::new(),
		cluster_ids: vec![mesh_testkit::WORKSPACE.to_string()],
		strategy: None,
	};
	let first = engine.execute(&request).await.unwrap();
	let _second = engine.execute(&request).await.unwrap();
	let result = engine
		.continue_session(&ContinueRequest {
			session_id: first.session_id,
			feedback: "still waiting".to_string(),
		})
		.await;

	assert!(matches!(result, Err(Error::SessionNotFound { .. })));
}
