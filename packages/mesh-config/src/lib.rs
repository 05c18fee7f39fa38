mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	AgentProviderConfig, Config, Consensus, EmbeddingProviderConfig, Providers, Recall, RecallAuto,
	RecallDiversity, RecallFusion, Scoring, ScoringWeights, Service, Session,
};

use std::{fs, path::Path};

pub const RECALL_STRATEGIES: [&str; 4] = ["auto", "dense", "sparse", "hybrid"];
pub const CONSENSUS_STRATEGIES: [&str; 2] = ["majority", "critic"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.ops_bind.trim().is_empty() {
		return Err(Error::Validation { message: "service.ops_bind must be non-empty.".to_string() });
	}
	if cfg.recall.top_k == 0 {
		return Err(Error::Validation {
			message: "recall.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.recall.candidate_k < cfg.recall.top_k {
		return Err(Error::Validation {
			message: "recall.candidate_k must be at least recall.top_k.".to_string(),
		});
	}
	if !RECALL_STRATEGIES.contains(&cfg.recall.default_strategy.as_str()) {
		return Err(Error::Validation {
			message: "recall.default_strategy must be one of auto, dense, sparse, or hybrid."
				.to_string(),
		});
	}
	if !cfg.recall.mmr_lambda.is_finite() || !(0.0..=1.0).contains(&cfg.recall.mmr_lambda) {
		return Err(Error::Validation {
			message: "recall.mmr_lambda must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.recall.budget_tokens == 0 {
		return Err(Error::Validation {
			message: "recall.budget_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("recall.fusion.dense_weight", cfg.recall.fusion.dense_weight),
		("recall.fusion.sparse_weight", cfg.recall.fusion.sparse_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number of zero or greater."),
			});
		}
	}

	if cfg.recall.fusion.dense_weight + cfg.recall.fusion.sparse_weight <= 0.0 {
		return Err(Error::Validation {
			message: "recall.fusion weights must not both be zero.".to_string(),
		});
	}
	if cfg.recall.auto.dense_min_words == 0 {
		return Err(Error::Validation {
			message: "recall.auto.dense_min_words must be greater than zero.".to_string(),
		});
	}
	if !cfg.recall.diversity.sim_threshold.is_finite()
		|| !(0.0..=1.0).contains(&cfg.recall.diversity.sim_threshold)
	{
		return Err(Error::Validation {
			message: "recall.diversity.sim_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !CONSENSUS_STRATEGIES.contains(&cfg.consensus.default_strategy.as_str()) {
		return Err(Error::Validation {
			message: "consensus.default_strategy must be one of majority or critic.".to_string(),
		});
	}
	if cfg.consensus.critic_agent.trim().is_empty() {
		return Err(Error::Validation {
			message: "consensus.critic_agent must be non-empty.".to_string(),
		});
	}

	for (label, threshold) in [
		("scoring.majority_pass_threshold", cfg.scoring.majority_pass_threshold),
		("scoring.critic_pass_threshold", cfg.scoring.critic_pass_threshold),
	] {
		if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.scoring.model_version.trim().is_empty() {
		return Err(Error::Validation {
			message: "scoring.model_version must be non-empty.".to_string(),
		});
	}
	if let Some(weights) = cfg.scoring.weights.as_ref() {
		for (label, weight) in [
			("scoring.weights.citation", weights.citation),
			("scoring.weights.context", weights.context),
			("scoring.weights.source", weights.source),
			("scoring.weights.relevance", weights.relevance),
		] {
			if !weight.is_finite() || weight < 0.0 {
				return Err(Error::Validation {
					message: format!("{label} must be a finite number of zero or greater."),
				});
			}
		}

		if weights.citation + weights.context + weights.source + weights.relevance <= 0.0 {
			return Err(Error::Validation {
				message: "scoring.weights must not all be zero.".to_string(),
			});
		}
	}
	if cfg.session.deadline_ms == 0 {
		return Err(Error::Validation {
			message: "session.deadline_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.session.max_sessions == 0 {
		return Err(Error::Validation {
			message: "session.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("agent", &cfg.providers.agent.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.providers.agent.solver_agent.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.agent.solver_agent must be non-empty.".to_string(),
		});
	}
	if cfg.providers.agent.solver_agent == cfg.consensus.critic_agent {
		return Err(Error::Validation {
			message: "providers.agent.solver_agent must differ from consensus.critic_agent."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.recall.default_strategy = cfg.recall.default_strategy.trim().to_lowercase();
	cfg.consensus.default_strategy = cfg.consensus.default_strategy.trim().to_lowercase();
	cfg.consensus.critic_agent = cfg.consensus.critic_agent.trim().to_string();
	cfg.providers.agent.solver_agent = cfg.providers.agent.solver_agent.trim().to_string();
}
