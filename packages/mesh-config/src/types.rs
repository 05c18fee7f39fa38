use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub recall: Recall,
	pub consensus: Consensus,
	pub scoring: Scoring,
	pub session: Session,
	pub providers: Providers,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub ops_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Recall {
	pub top_k: u32,
	pub candidate_k: u32,
	pub default_strategy: String,
	pub use_mmr: bool,
	pub mmr_lambda: f32,
	pub budget_tokens: u32,
	#[serde(default)]
	pub fusion: RecallFusion,
	#[serde(default)]
	pub auto: RecallAuto,
	#[serde(default)]
	pub diversity: RecallDiversity,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecallFusion {
	pub dense_weight: f32,
	pub sparse_weight: f32,
}
impl Default for RecallFusion {
	fn default() -> Self {
		Self { dense_weight: 0.5, sparse_weight: 0.5 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecallAuto {
	/// Queries with at least this many words classify as dense when no
	/// exact-match signal is present.
	pub dense_min_words: u32,
}
impl Default for RecallAuto {
	fn default() -> Self {
		Self { dense_min_words: 6 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecallDiversity {
	pub sim_threshold: f32,
}
impl Default for RecallDiversity {
	fn default() -> Self {
		Self { sim_threshold: 0.92 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Consensus {
	pub default_strategy: String,
	#[serde(default = "default_critic_agent")]
	pub critic_agent: String,
}

#[derive(Debug, Deserialize)]
pub struct Scoring {
	pub majority_pass_threshold: f32,
	pub critic_pass_threshold: f32,
	pub model_version: String,
	pub weights: Option<ScoringWeights>,
}

#[derive(Debug, Deserialize)]
pub struct ScoringWeights {
	pub citation: f32,
	pub context: f32,
	pub source: f32,
	pub relevance: f32,
}

#[derive(Debug, Deserialize)]
pub struct Session {
	pub deadline_ms: u64,
	pub max_sessions: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub agent: AgentProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct AgentProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	#[serde(default = "default_solver_agent")]
	pub solver_agent: String,
}

fn default_critic_agent() -> String {
	"critic".to_string()
}

fn default_solver_agent() -> String {
	"solver".to_string()
}
