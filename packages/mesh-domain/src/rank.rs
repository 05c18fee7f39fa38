use std::cmp::Ordering;

use crate::{
	model::{CorpusDoc, RankedDoc},
	text,
};

/// A corpus position paired with its score for one ranking call.
/// Ties are broken by corpus order so retrieval stays deterministic
/// across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
	pub corpus_idx: usize,
	pub score: f32,
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine mapped onto the unit interval so dense scores are comparable
/// with lexical ones.
pub fn unit_cosine(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	cosine_similarity(lhs, rhs).map(|cos| ((cos + 1.0) / 2.0).clamp(0.0, 1.0))
}

/// Lexical ranking: fraction of query terms present in each document.
/// Pure, side-effect free; empty candidates return an empty vec.
pub fn rank_sparse(query: &str, docs: &[CorpusDoc]) -> Vec<ScoredDoc> {
	let query_tokens = text::tokenize_query(query, text::MAX_QUERY_TERMS);
	let mut out: Vec<ScoredDoc> = docs
		.iter()
		.enumerate()
		.map(|(corpus_idx, doc)| ScoredDoc {
			corpus_idx,
			score: text::lexical_overlap_ratio(&query_tokens, &doc.text, text::MAX_TEXT_TERMS),
		})
		.collect();

	sort_by_score(&mut out);

	out
}

/// Embedding ranking against a query vector. Documents without an
/// embedding score zero rather than erroring.
pub fn rank_dense(query_vector: &[f32], docs: &[CorpusDoc]) -> Vec<ScoredDoc> {
	let mut out: Vec<ScoredDoc> = docs
		.iter()
		.enumerate()
		.map(|(corpus_idx, doc)| ScoredDoc {
			corpus_idx,
			score: doc
				.embedding
				.as_deref()
				.and_then(|embedding| unit_cosine(query_vector, embedding))
				.unwrap_or(0.0),
		})
		.collect();

	sort_by_score(&mut out);

	out
}

pub fn sort_by_score(scored: &mut [ScoredDoc]) {
	scored.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score)
			.then_with(|| left.corpus_idx.cmp(&right.corpus_idx))
	});
}

pub fn to_ranked(docs: &[CorpusDoc], scored: &[ScoredDoc]) -> Vec<RankedDoc> {
	scored
		.iter()
		.filter_map(|entry| {
			docs.get(entry.corpus_idx).map(|doc| RankedDoc {
				id: doc.id.clone(),
				text: doc.text.clone(),
				score: entry.score,
				meta: doc.meta.clone(),
			})
		})
		.collect()
}
