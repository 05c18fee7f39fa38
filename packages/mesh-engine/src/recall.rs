pub mod classify;
pub mod diversity;
pub mod fusion;

use color_eyre::eyre;
use serde::{Deserialize, Serialize};

use mesh_domain::{
	RecallDiagnostics, RecallItem, RecallStrategy,
	model::CorpusDoc,
	rank::{self, ScoredDoc},
	tokens,
};

use crate::{
	MeshEngine,
	deadline::Deadline,
	error::{Error, Result},
};

#[derive(Debug, Clone, Deserialize)]
pub struct RecallRequest {
	pub q: String,
	pub workspace_id: String,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub strategy: Option<String>,
	#[serde(default)]
	pub use_mmr: Option<bool>,
	#[serde(default)]
	pub mmr_lambda: Option<f32>,
	#[serde(default)]
	pub budget_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallResponse {
	pub items: Vec<RecallItem>,
	pub diagnostics: RecallDiagnostics,
}

/// Request options merged with config defaults and range-checked.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedOptions {
	pub top_k: u32,
	pub strategy: RecallStrategy,
	pub use_mmr: bool,
	pub mmr_lambda: f32,
	pub budget_tokens: u32,
}

pub(crate) fn resolve_options(
	req: &RecallRequest,
	cfg: &mesh_config::Recall,
) -> Result<ResolvedOptions> {
	let strategy = match req.strategy.as_deref() {
		Some(value) => RecallStrategy::parse(value).ok_or_else(|| Error::InvalidArgument {
			message: format!("Unknown recall strategy: {value}."),
		})?,
		None => default_strategy(cfg),
	};
	let top_k = req.top_k.unwrap_or(cfg.top_k);

	if top_k == 0 {
		return Err(Error::InvalidArgument { message: "top_k must be at least 1.".to_string() });
	}

	let mmr_lambda = req.mmr_lambda.unwrap_or(cfg.mmr_lambda);

	if !mmr_lambda.is_finite() || !(0.0..=1.0).contains(&mmr_lambda) {
		return Err(Error::InvalidArgument {
			message: "mmr_lambda must be within [0, 1].".to_string(),
		});
	}

	let budget_tokens = req.budget_tokens.unwrap_or(cfg.budget_tokens);

	if budget_tokens == 0 {
		return Err(Error::InvalidArgument {
			message: "budget_tokens must be at least 1.".to_string(),
		});
	}

	Ok(ResolvedOptions {
		top_k,
		strategy,
		use_mmr: req.use_mmr.unwrap_or(cfg.use_mmr),
		mmr_lambda,
		budget_tokens,
	})
}

/// Config-only options for callers that carry no per-request overrides,
/// such as the orchestrator's context retrieval.
pub(crate) fn default_options(cfg: &mesh_config::Recall) -> ResolvedOptions {
	ResolvedOptions {
		top_k: cfg.top_k,
		strategy: default_strategy(cfg),
		use_mmr: cfg.use_mmr,
		mmr_lambda: cfg.mmr_lambda,
		budget_tokens: cfg.budget_tokens,
	}
}

// Config validation already vets the name; the fallback is unreachable
// for a loaded config.
fn default_strategy(cfg: &mesh_config::Recall) -> RecallStrategy {
	RecallStrategy::parse(&cfg.default_strategy).unwrap_or(RecallStrategy::Auto)
}

impl MeshEngine {
	/// Multi-strategy retrieval over one workspace. Returns diagnostics
	/// even for an empty result set.
	pub async fn recall(&self, req: &RecallRequest, deadline: &Deadline) -> Result<RecallResponse> {
		if req.q.trim().is_empty() {
			return Err(Error::InvalidArgument { message: "Query must not be empty.".to_string() });
		}
		if req.workspace_id.trim().is_empty() {
			return Err(Error::InvalidArgument {
				message: "workspace_id must not be empty.".to_string(),
			});
		}

		let opts = resolve_options(req, &self.cfg.recall)?;

		deadline.check("fetch")?;

		let corpus = self.store.fetch(&req.workspace_id).await?;

		self.recall_from_corpus(&req.q, &corpus, &opts, deadline).await
	}

	pub(crate) async fn recall_from_corpus(
		&self,
		query: &str,
		corpus: &[CorpusDoc],
		opts: &ResolvedOptions,
		deadline: &Deadline,
	) -> Result<RecallResponse> {
		let mut degraded = Vec::new();
		let strategy_used = match opts.strategy {
			RecallStrategy::Auto => classify::classify(query, &self.cfg.recall.auto),
			other => other,
		};

		if corpus.is_empty() {
			return Ok(empty_response(strategy_used, opts.use_mmr));
		}

		deadline.check("ranking")?;

		let scored = match strategy_used {
			RecallStrategy::Sparse => rank::rank_sparse(query, corpus),
			RecallStrategy::Dense => self
				.dense_scores(query, corpus)
				.await
				.map_err(|err| Error::ProviderUnavailable { message: err.to_string() })?,
			RecallStrategy::Auto | RecallStrategy::Hybrid => {
				let (dense, sparse) = tokio::join!(self.dense_scores(query, corpus), async {
					rank::rank_sparse(query, corpus)
				});

				match dense {
					Ok(dense) => fusion::fuse(&dense, &sparse, &self.cfg.recall.fusion),
					Err(err) => {
						tracing::warn!(
							error = %err,
							"Dense branch failed; continuing with sparse ranking only.",
						);
						degraded.push("dense".to_string());

						sparse
					},
				}
			},
		};
		// The pool examined by ranking, before zero-score candidates are
		// dropped from selection.
		let candidates_considered = scored.len() as u32;
		let mut scored: Vec<ScoredDoc> =
			scored.into_iter().filter(|entry| entry.score > 0.0).collect();

		scored.truncate(self.cfg.recall.candidate_k as usize);
		deadline.check("selection")?;

		let items = if opts.use_mmr {
			diversity::select(
				corpus,
				&scored,
				&diversity::DiversityParams {
					lambda: opts.mmr_lambda,
					top_k: opts.top_k,
					budget_tokens: opts.budget_tokens,
					sim_threshold: self.cfg.recall.diversity.sim_threshold,
				},
				tokens::estimate_tokens,
			)
		} else {
			truncate_by_budget(corpus, &scored, opts.top_k, opts.budget_tokens)
		};
		let tokens_used = items.last().map(|item| item.tokens_used).unwrap_or(0);
		let diagnostics = RecallDiagnostics {
			strategy_used,
			candidates_considered,
			selected: items.len() as u32,
			tokens_used,
			mmr_applied: opts.use_mmr,
			degraded,
		};

		Ok(RecallResponse { items, diagnostics })
	}

	async fn dense_scores(
		&self,
		query: &str,
		corpus: &[CorpusDoc],
	) -> color_eyre::Result<Vec<ScoredDoc>> {
		let vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &[query.to_string()]).await?;
		let query_vector = vectors
			.first()
			.ok_or_else(|| eyre::eyre!("Embedding provider returned no vector for the query."))?;

		Ok(rank::rank_dense(query_vector, corpus))
	}
}

fn empty_response(strategy_used: RecallStrategy, mmr_applied: bool) -> RecallResponse {
	RecallResponse {
		items: Vec::new(),
		diagnostics: RecallDiagnostics {
			strategy_used,
			candidates_considered: 0,
			selected: 0,
			tokens_used: 0,
			mmr_applied,
			degraded: Vec::new(),
		},
	}
}

/// Score-ordered truncation for callers that opt out of diversity. The
/// top candidate is always kept, even when it alone exceeds the budget.
fn truncate_by_budget(
	corpus: &[CorpusDoc],
	scored: &[ScoredDoc],
	top_k: u32,
	budget_tokens: u32,
) -> Vec<RecallItem> {
	let mut items = Vec::new();
	let mut total = 0_u32;

	for entry in scored.iter().take(top_k as usize) {
		let Some(doc) = corpus.get(entry.corpus_idx) else {
			continue;
		};
		let cost = tokens::estimate_tokens(&doc.text);

		if !items.is_empty() && total + cost > budget_tokens {
			break;
		}

		total += cost;

		items.push(RecallItem {
			id: doc.id.clone(),
			text: doc.text.clone(),
			score: entry.score,
			meta: doc.meta.clone(),
			tokens_used: total,
		});
	}

	items
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::Map;

	fn doc(id: &str, text: &str) -> CorpusDoc {
		CorpusDoc { id: id.to_string(), text: text.to_string(), embedding: None, meta: Map::new() }
	}

	fn recall_cfg() -> mesh_config::Recall {
		mesh_config::Recall {
			top_k: 8,
			candidate_k: 50,
			default_strategy: "auto".to_string(),
			use_mmr: true,
			mmr_lambda: 0.65,
			budget_tokens: 1_200,
			fusion: Default::default(),
			auto: Default::default(),
			diversity: Default::default(),
		}
	}

	fn request(q: &str) -> RecallRequest {
		RecallRequest {
			q: q.to_string(),
			workspace_id: "w1".to_string(),
			top_k: None,
			strategy: None,
			use_mmr: None,
			mmr_lambda: None,
			budget_tokens: None,
		}
	}

	#[test]
	fn options_default_from_config() {
		let opts = resolve_options(&request("reset password"), &recall_cfg()).unwrap();

		assert_eq!(opts.top_k, 8);
		assert_eq!(opts.strategy, RecallStrategy::Auto);
		assert!(opts.use_mmr);
	}

	#[test]
	fn unknown_strategy_is_invalid() {
		let mut req = request("reset password");

		req.strategy = Some("semantic".to_string());

		assert!(matches!(
			resolve_options(&req, &recall_cfg()),
			Err(Error::InvalidArgument { .. })
		));
	}

	#[test]
	fn out_of_range_lambda_is_invalid() {
		let mut req = request("reset password");

		req.mmr_lambda = Some(1.5);

		assert!(matches!(
			resolve_options(&req, &recall_cfg()),
			Err(Error::InvalidArgument { .. })
		));
	}

	#[test]
	fn zero_top_k_is_invalid() {
		let mut req = request("reset password");

		req.top_k = Some(0);

		assert!(matches!(
			resolve_options(&req, &recall_cfg()),
			Err(Error::InvalidArgument { .. })
		));
	}

	#[test]
	fn budget_truncation_always_keeps_the_top_candidate() {
		let corpus = vec![doc("a", &"word ".repeat(100)), doc("b", "short text")];
		let scored = vec![
			ScoredDoc { corpus_idx: 0, score: 0.9 },
			ScoredDoc { corpus_idx: 1, score: 0.5 },
		];
		let items = truncate_by_budget(&corpus, &scored, 8, 10);

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].id, "a");
		assert!(items[0].tokens_used > 10);
	}

	#[test]
	fn budget_truncation_respects_top_k() {
		let corpus = vec![doc("a", "one"), doc("b", "two"), doc("c", "three")];
		let scored = vec![
			ScoredDoc { corpus_idx: 0, score: 0.9 },
			ScoredDoc { corpus_idx: 1, score: 0.8 },
			ScoredDoc { corpus_idx: 2, score: 0.7 },
		];
		let items = truncate_by_budget(&corpus, &scored, 2, 1_000);

		assert_eq!(items.len(), 2);
	}
}
