use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mesh_domain::{
	AgentMessage, Citation, ConsensusResult, ConsensusStrategy, MessageKind, ValidationRecord,
	build_citations, consensus, enrich_documents,
	model::{CorpusDoc, RankedDoc, RecallItem},
	scoring,
};
use mesh_store::{TelemetryEvent, VALIDATE_EVENT};

use crate::{
	MeshEngine,
	deadline::Deadline,
	error::{Error, Result},
	recall,
	session::MeshSession,
};

/// Cluster key used when a request names none.
pub const DEFAULT_WORKSPACE: &str = "default";
/// Consensus reason for a deadline that expired mid-session. A timeout
/// is an ordinary rejected outcome, not a transport error.
pub const TIMEOUT_REASON: &str = "timeout";
/// Attribution for continuation feedback injected into the trace.
pub const FEEDBACK_AGENT: &str = "user";

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
	pub goal: String,
	#[serde(default)]
	pub hints: Vec<String>,
	#[serde(default)]
	pub cluster_ids: Vec<String>,
	#[serde(default)]
	pub strategy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContinueRequest {
	pub session_id: Uuid,
	pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeshMetrics {
	pub total_ms: u64,
	pub tokens_used: u32,
	pub citations_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeshOutcome {
	pub session_id: Uuid,
	#[serde(rename = "final", skip_serializing_if = "Option::is_none")]
	pub final_answer: Option<String>,
	pub trace: Vec<AgentMessage>,
	pub consensus: ConsensusResult,
	pub metrics: MeshMetrics,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub validation: Option<ValidationRecord>,
}

impl MeshEngine {
	/// One full mesh round: retrieve context for the goal, dispatch
	/// agents, validate consensus, score the accepted answer, and
	/// archive the session for continuation.
	pub async fn execute(&self, req: &ExecuteRequest) -> Result<MeshOutcome> {
		let started = Instant::now();
		let goal = req.goal.trim();

		if goal.is_empty() {
			return Err(Error::InvalidArgument { message: "Goal must not be empty.".to_string() });
		}

		let strategy = self.resolve_consensus_strategy(req.strategy.as_deref())?;
		let deadline = self.session_deadline();
		let session_id = Uuid::new_v4();
		let corpus = self.gather_corpus(&req.cluster_ids).await?;
		let opts = recall::default_options(&self.cfg.recall);
		let (items, tokens_used) = match self.recall_from_corpus(goal, &corpus, &opts, &deadline).await
		{
			Ok(response) => {
				let tokens_used = response.diagnostics.tokens_used;

				(response.items, tokens_used)
			},
			// A deadline that expires during retrieval still yields a
			// session, just one with nothing retrieved.
			Err(Error::Timeout { .. }) => (Vec::new(), 0),
			Err(err) => return Err(err),
		};
		let now = OffsetDateTime::now_utc();
		let docs =
			enrich_documents(items.iter().map(RecallItem::ranked_doc).collect(), now);
		let citations = build_citations(&docs);
		let context: Vec<String> = citations.iter().map(|citation| citation.snippet.clone()).collect();
		let mut trace = Vec::new();
		let consensus = match self.dispatch_turn(strategy, goal, &context, &req.hints, &deadline).await?
		{
			Some(messages) => {
				trace.extend(messages);

				consensus::validate(&trace, strategy, &self.cfg.consensus.critic_agent)
			},
			None => ConsensusResult::rejected(TIMEOUT_REASON),
		};
		let validation = self.score_and_emit(session_id, goal, strategy, &consensus, &docs, &citations);

		self.sessions.insert(session_id, MeshSession {
			goal: goal.to_string(),
			strategy,
			docs,
			citations: citations.clone(),
			trace: trace.clone(),
			tokens_used,
			consensus: Some(consensus.clone()),
			validation: validation.clone(),
			created_at: now,
		});

		tracing::info!(
			session_id = %session_id,
			strategy = strategy.as_str(),
			accepted = consensus.accepted,
			"Mesh session executed.",
		);

		Ok(MeshOutcome {
			session_id,
			final_answer: consensus.final_message.as_ref().map(|message| message.content.clone()),
			trace,
			consensus,
			metrics: MeshMetrics {
				total_ms: started.elapsed().as_millis() as u64,
				tokens_used,
				citations_count: citations.len() as u32,
			},
			validation,
		})
	}

	/// Resume an archived session with caller feedback. Turns on the
	/// same session serialize on its lock; distinct sessions do not
	/// contend.
	pub async fn continue_session(&self, req: &ContinueRequest) -> Result<MeshOutcome> {
		let started = Instant::now();
		let feedback = req.feedback.trim();

		if feedback.is_empty() {
			return Err(Error::InvalidArgument {
				message: "Feedback must not be empty.".to_string(),
			});
		}

		let handle = self
			.sessions
			.get(&req.session_id)
			.ok_or(Error::SessionNotFound { session_id: req.session_id })?;
		let mut session = handle.lock().await;
		let deadline = self.session_deadline();

		session.trace.push(AgentMessage {
			from: FEEDBACK_AGENT.to_string(),
			kind: MessageKind::Critique,
			content: feedback.to_string(),
			ts: OffsetDateTime::now_utc(),
		});

		let context: Vec<String> =
			session.citations.iter().map(|citation| citation.snippet.clone()).collect();
		let hints = vec![feedback.to_string()];
		let strategy = session.strategy;
		let consensus = match self
			.dispatch_turn(strategy, &session.goal, &context, &hints, &deadline)
			.await?
		{
			Some(messages) => {
				session.trace.extend(messages);

				consensus::validate(&session.trace, strategy, &self.cfg.consensus.critic_agent)
			},
			None => ConsensusResult::rejected(TIMEOUT_REASON),
		};
		let validation = self.score_and_emit(
			req.session_id,
			&session.goal,
			strategy,
			&consensus,
			&session.docs,
			&session.citations,
		);

		session.consensus = Some(consensus.clone());

		if validation.is_some() {
			session.validation = validation.clone();
		}

		Ok(MeshOutcome {
			session_id: req.session_id,
			final_answer: consensus.final_message.as_ref().map(|message| message.content.clone()),
			trace: session.trace.clone(),
			consensus,
			metrics: MeshMetrics {
				total_ms: started.elapsed().as_millis() as u64,
				tokens_used: session.tokens_used,
				citations_count: session.citations.len() as u32,
			},
			validation,
		})
	}

	fn resolve_consensus_strategy(&self, requested: Option<&str>) -> Result<ConsensusStrategy> {
		match requested {
			Some(value) => ConsensusStrategy::parse(value).ok_or_else(|| Error::InvalidArgument {
				message: format!("Unknown consensus strategy: {value}."),
			}),
			None => Ok(ConsensusStrategy::parse(&self.cfg.consensus.default_strategy)
				.unwrap_or(ConsensusStrategy::Majority)),
		}
	}

	fn session_deadline(&self) -> Deadline {
		Deadline::after(Duration::from_millis(self.cfg.session.deadline_ms))
	}

	async fn gather_corpus(&self, cluster_ids: &[String]) -> Result<Vec<CorpusDoc>> {
		if cluster_ids.is_empty() {
			return Ok(self.store.fetch(DEFAULT_WORKSPACE).await?);
		}

		let mut corpus = Vec::new();

		for cluster_id in cluster_ids {
			corpus.extend(self.store.fetch(cluster_id).await?);
		}

		Ok(corpus)
	}

	/// Run one agent round under the remaining deadline. `None` means
	/// the deadline expired; provider failures are hard errors.
	async fn dispatch_turn(
		&self,
		strategy: ConsensusStrategy,
		goal: &str,
		context: &[String],
		hints: &[String],
		deadline: &Deadline,
	) -> Result<Option<Vec<AgentMessage>>> {
		let Some(remaining) = deadline.remaining() else {
			return Ok(None);
		};
		let dispatch = self.providers.agent.dispatch(
			&self.cfg.providers.agent,
			&self.cfg.consensus.critic_agent,
			strategy,
			goal,
			context,
			hints,
		);

		match tokio::time::timeout(remaining, dispatch).await {
			Err(_elapsed) => Ok(None),
			Ok(Err(err)) => Err(Error::Provider { message: err.to_string() }),
			Ok(Ok(messages)) => Ok(Some(messages)),
		}
	}

	/// Score an accepted consensus and emit its validation record
	/// without blocking the response. Sink failures are logged, never
	/// surfaced.
	fn score_and_emit(
		&self,
		session_id: Uuid,
		goal: &str,
		strategy: ConsensusStrategy,
		consensus: &ConsensusResult,
		docs: &[RankedDoc],
		citations: &[Citation],
	) -> Option<ValidationRecord> {
		if !consensus.accepted {
			return None;
		}

		let answer = consensus.final_message.as_ref()?;
		let subscores = scoring::compute_subscores(goal, &answer.content, docs, citations);
		let score = scoring::composite_score(subscores, self.cfg.scoring.weights.as_ref());
		let passed = score >= scoring::pass_threshold(strategy, &self.cfg.scoring);
		let record = ValidationRecord {
			session_id,
			ts: OffsetDateTime::now_utc(),
			score,
			subscores,
			model_version: self.cfg.scoring.model_version.clone(),
			strategy,
			passed,
		};

		match serde_json::to_value(&record) {
			Ok(payload) => {
				let sink = Arc::clone(&self.sink);

				tokio::spawn(async move {
					let event =
						TelemetryEvent::new(VALIDATE_EVENT, OffsetDateTime::now_utc(), payload);

					if let Err(err) = sink.append(event).await {
						tracing::warn!(error = %err, "Failed to append validation event.");
					}
				});
			},
			Err(err) => tracing::warn!(error = %err, "Failed to encode validation record."),
		}

		Some(record)
	}
}
