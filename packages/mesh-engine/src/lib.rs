//! Retrieval and consensus engine. Owns the recall pipeline (strategy
//! dispatch, fusion, diversity selection) and the mesh orchestrator
//! (agent turns, consensus validation, quality scoring, sessions).
//! Transport lives elsewhere; everything here is plain async Rust.

pub mod deadline;
mod error;
pub mod orchestrate;
pub mod recall;
pub mod session;

pub use deadline::Deadline;
pub use error::{Error, Result};
pub use orchestrate::{ContinueRequest, ExecuteRequest, MeshMetrics, MeshOutcome};
pub use recall::{RecallRequest, RecallResponse};

use std::sync::Arc;

use mesh_config::{AgentProviderConfig, Config, EmbeddingProviderConfig};
use mesh_domain::{AgentMessage, ConsensusStrategy};
use mesh_store::{BoxFuture, DocumentStore, EventSink};

use session::SessionRegistry;

/// Turns texts into vectors. The default implementation calls the
/// configured HTTP endpoint; tests substitute a deterministic one.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Runs one round of agent turns for a goal and returns the resulting
/// trace messages.
pub trait AgentProvider
where
	Self: Send + Sync,
{
	fn dispatch<'a>(
		&'a self,
		cfg: &'a AgentProviderConfig,
		critic_agent: &'a str,
		strategy: ConsensusStrategy,
		goal: &'a str,
		context: &'a [String],
		hints: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<AgentMessage>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub agent: Arc<dyn AgentProvider>,
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(HttpEmbedding), agent: Arc::new(HttpAgent) }
	}
}

struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(mesh_providers::embedding::embed(cfg, texts))
	}
}

struct HttpAgent;
impl AgentProvider for HttpAgent {
	fn dispatch<'a>(
		&'a self,
		cfg: &'a AgentProviderConfig,
		critic_agent: &'a str,
		strategy: ConsensusStrategy,
		goal: &'a str,
		context: &'a [String],
		hints: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<AgentMessage>>> {
		Box::pin(mesh_providers::agent::dispatch(cfg, critic_agent, strategy, goal, context, hints))
	}
}

pub struct MeshEngine {
	pub(crate) cfg: Config,
	pub(crate) store: Arc<dyn DocumentStore>,
	pub(crate) sink: Arc<dyn EventSink>,
	pub(crate) providers: Providers,
	pub(crate) sessions: SessionRegistry,
}
impl MeshEngine {
	pub fn new(cfg: Config, store: Arc<dyn DocumentStore>, sink: Arc<dyn EventSink>) -> Self {
		Self::with_providers(cfg, store, sink, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn DocumentStore>,
		sink: Arc<dyn EventSink>,
		providers: Providers,
	) -> Self {
		let sessions = SessionRegistry::new(cfg.session.max_sessions as usize);

		Self { cfg, store, sink, providers, sessions }
	}

	pub fn config(&self) -> &Config {
		&self.cfg
	}
}
