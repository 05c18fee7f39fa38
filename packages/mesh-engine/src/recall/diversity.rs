use mesh_domain::{
	RecallItem,
	model::CorpusDoc,
	rank::{ScoredDoc, cosine_similarity},
	text, tokens,
};

#[derive(Debug, Clone, Copy)]
pub struct DiversityParams {
	pub lambda: f32,
	pub top_k: u32,
	pub budget_tokens: u32,
	pub sim_threshold: f32,
}

/// Maximal-marginal-relevance selection under a token budget.
///
/// The top-ranked candidate is always selected, even when it alone
/// exceeds the budget. After that, each round picks the remaining
/// candidate maximizing `lambda * score - (1 - lambda) * max_sim`,
/// where `max_sim` is its highest similarity to anything already
/// selected. Candidates above `sim_threshold` are near-duplicates and
/// are dropped outright. Selection stops at `top_k` items or when the
/// next pick would overrun the budget. Given the same inputs the
/// output is identical across runs; MMR ties go to the better-ranked
/// candidate.
///
/// `estimate` is the token-cost estimator; callers with a real
/// tokenizer can inject an exact count.
pub fn select(
	corpus: &[CorpusDoc],
	ranked: &[ScoredDoc],
	params: &DiversityParams,
	estimate: impl Fn(&str) -> u32,
) -> Vec<RecallItem> {
	let mut items = Vec::new();

	if params.top_k == 0 {
		return items;
	}

	let Some((first, rest)) = ranked.split_first() else {
		return items;
	};
	let Some(first_doc) = corpus.get(first.corpus_idx) else {
		return items;
	};
	let mut total = estimate(&first_doc.text);

	items.push(RecallItem {
		id: first_doc.id.clone(),
		text: first_doc.text.clone(),
		score: first.score,
		meta: first_doc.meta.clone(),
		tokens_used: total,
	});

	let mut selected: Vec<usize> = vec![first.corpus_idx];
	// Positions into `ranked`, so earlier means better rank.
	let mut remaining: Vec<usize> = (0..rest.len())
		.map(|offset| offset + 1)
		.filter(|position| corpus.get(ranked[*position].corpus_idx).is_some())
		.collect();

	while items.len() < params.top_k as usize && !remaining.is_empty() {
		let mut best: Option<(usize, f32)> = None;
		let mut survivors = Vec::with_capacity(remaining.len());

		for position in remaining {
			let entry = ranked[position];
			let max_sim = selected
				.iter()
				.map(|idx| pair_similarity(&corpus[entry.corpus_idx], &corpus[*idx]))
				.fold(0.0_f32, f32::max);

			// Near-duplicates never re-enter: similarity to the
			// selected set only grows as it does.
			if max_sim > params.sim_threshold {
				continue;
			}

			survivors.push(position);

			let marginal = params.lambda * entry.score - (1.0 - params.lambda) * max_sim;

			if best.is_none_or(|(_, best_marginal)| marginal > best_marginal) {
				best = Some((position, marginal));
			}
		}

		let Some((position, _)) = best else {
			break;
		};
		let entry = ranked[position];
		let doc = &corpus[entry.corpus_idx];
		let cost = estimate(&doc.text);

		if total + cost > params.budget_tokens {
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
		selected.push(entry.corpus_idx);
		survivors.retain(|kept| *kept != position);

		remaining = survivors;
	}

	items
}

/// Pairwise redundancy: raw cosine (negatives clamped to zero) when
/// both documents carry embeddings, lexical jaccard otherwise.
fn pair_similarity(lhs: &CorpusDoc, rhs: &CorpusDoc) -> f32 {
	if let (Some(lhs_embedding), Some(rhs_embedding)) =
		(lhs.embedding.as_deref(), rhs.embedding.as_deref())
		&& let Some(cos) = cosine_similarity(lhs_embedding, rhs_embedding)
	{
		return cos.max(0.0);
	}

	text::jaccard_overlap(&lhs.text, &rhs.text, text::MAX_TEXT_TERMS)
}
