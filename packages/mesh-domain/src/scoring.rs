use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::{
	consensus::ConsensusStrategy,
	model::{Citation, RankedDoc},
	text,
};

/// Minimum fraction of a sentence's terms a snippet must contain to
/// count that sentence as supported.
const CLAIM_SUPPORT_MIN_RATIO: f32 = 0.3;
const MAX_SENTENCE_TERMS: usize = 16;
const DEFAULT_TRUST: f64 = 0.5;
const URL_BACKED_TRUST: f64 = 0.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Subscores {
	pub citation: f32,
	pub context: f32,
	pub source: f32,
	pub relevance: f32,
}

/// One immutable record per validated mesh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
	pub session_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub ts: OffsetDateTime,
	pub score: f32,
	pub subscores: Subscores,
	pub model_version: String,
	pub strategy: ConsensusStrategy,
	pub passed: bool,
}

/// Four quality dimensions of a final answer, each in [0, 1].
pub fn compute_subscores(
	goal: &str,
	answer: &str,
	docs: &[RankedDoc],
	citations: &[Citation],
) -> Subscores {
	Subscores {
		citation: citation_score(answer, citations),
		context: context_score(answer, citations),
		source: source_score(docs),
		relevance: relevance_score(goal, answer),
	}
}

/// Weighted mean of the sub-scores; equal weights unless configured.
pub fn composite_score(subscores: Subscores, weights: Option<&mesh_config::ScoringWeights>) -> f32 {
	let (wc, wx, ws, wr) = match weights {
		Some(weights) => (weights.citation, weights.context, weights.source, weights.relevance),
		None => (1.0, 1.0, 1.0, 1.0),
	};
	let total = wc + wx + ws + wr;

	if total <= 0.0 {
		return 0.0;
	}

	let weighted = wc * subscores.citation
		+ wx * subscores.context
		+ ws * subscores.source
		+ wr * subscores.relevance;

	(weighted / total).clamp(0.0, 1.0)
}

/// The critic strategy is already adversarially checked, so it may use
/// the lower numeric gate. Both come from config, never hard-coded.
pub fn pass_threshold(strategy: ConsensusStrategy, cfg: &mesh_config::Scoring) -> f32 {
	match strategy {
		ConsensusStrategy::Majority => cfg.majority_pass_threshold,
		ConsensusStrategy::Critic => cfg.critic_pass_threshold,
	}
}

/// Fraction of claim sentences in the answer backed by at least one
/// citation snippet.
fn citation_score(answer: &str, citations: &[Citation]) -> f32 {
	if citations.is_empty() {
		return 0.0;
	}

	let sentences = claim_sentences(answer);

	if sentences.is_empty() {
		return 0.0;
	}

	let mut supported = 0_usize;

	for sentence in &sentences {
		let terms = text::tokenize_query(sentence, MAX_SENTENCE_TERMS);

		if terms.is_empty() {
			continue;
		}

		let backed = citations.iter().any(|citation| {
			text::lexical_overlap_ratio(&terms, &citation.snippet, text::MAX_TEXT_TERMS)
				>= CLAIM_SUPPORT_MIN_RATIO
		});

		if backed {
			supported += 1;
		}
	}

	supported as f32 / sentences.len() as f32
}

/// Fraction of the retrieved context window the answer actually drew
/// on.
fn context_score(answer: &str, citations: &[Citation]) -> f32 {
	if citations.is_empty() || answer.trim().is_empty() {
		return 0.0;
	}

	let mut used = 0_usize;

	for citation in citations {
		let terms = text::tokenize_query(&citation.snippet, MAX_SENTENCE_TERMS);

		if terms.is_empty() {
			continue;
		}

		if text::lexical_overlap_ratio(&terms, answer, text::MAX_TEXT_TERMS)
			>= CLAIM_SUPPORT_MIN_RATIO
		{
			used += 1;
		}
	}

	used as f32 / citations.len() as f32
}

/// Mean provenance trust of the cited documents. `meta.source_trust`
/// wins when present; url-backed documents default higher than bare
/// text.
fn source_score(docs: &[RankedDoc]) -> f32 {
	if docs.is_empty() {
		return 0.0;
	}

	let total: f64 = docs
		.iter()
		.map(|doc| {
			doc.meta
				.get("source_trust")
				.and_then(|value| value.as_f64())
				.map(|trust| trust.clamp(0.0, 1.0))
				.unwrap_or(if doc.meta.contains_key("url") { URL_BACKED_TRUST } else { DEFAULT_TRUST })
		})
		.sum();

	(total / docs.len() as f64) as f32
}

fn relevance_score(goal: &str, answer: &str) -> f32 {
	let goal_terms = text::tokenize_query(goal, text::MAX_QUERY_TERMS);

	text::lexical_overlap_ratio(&goal_terms, answer, text::MAX_TEXT_TERMS)
}

fn claim_sentences(answer: &str) -> Vec<&str> {
	answer
		.split_sentence_bounds()
		.map(str::trim)
		.filter(|sentence| !sentence.is_empty())
		.collect()
}
