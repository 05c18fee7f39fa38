use std::collections::HashMap;

use mesh_domain::rank::{self, ScoredDoc};

/// Weighted-sum fusion of dense and sparse rankings over the candidate
/// union. A document present in only one list enters at that single
/// score unweighted, so a degraded branch cannot halve everything.
pub fn fuse(
	dense: &[ScoredDoc],
	sparse: &[ScoredDoc],
	cfg: &mesh_config::RecallFusion,
) -> Vec<ScoredDoc> {
	let total_weight = cfg.dense_weight + cfg.sparse_weight;
	let mut by_idx: HashMap<usize, (Option<f32>, Option<f32>)> = HashMap::new();

	for entry in dense {
		by_idx.entry(entry.corpus_idx).or_default().0 = Some(entry.score);
	}
	for entry in sparse {
		by_idx.entry(entry.corpus_idx).or_default().1 = Some(entry.score);
	}

	let mut out: Vec<ScoredDoc> = by_idx
		.into_iter()
		.filter_map(|(corpus_idx, scores)| {
			let score = match scores {
				(Some(dense), Some(sparse)) => {
					if total_weight <= 0.0 {
						return None;
					}

					(cfg.dense_weight * dense + cfg.sparse_weight * sparse) / total_weight
				},
				(Some(dense), None) => dense,
				(None, Some(sparse)) => sparse,
				(None, None) => return None,
			};

			Some(ScoredDoc { corpus_idx, score })
		})
		.collect();

	rank::sort_by_score(&mut out);

	out
}
