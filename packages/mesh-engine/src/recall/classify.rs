use std::sync::LazyLock;

use regex::Regex;

use mesh_domain::RecallStrategy;

static QUOTED_PHRASE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#""[^"]+""#).expect("regex must compile"));
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[A-Za-z0-9]+(?:[_./:][A-Za-z0-9]+)+|\b[a-z][a-z0-9]*[A-Z][A-Za-z0-9]*")
		.expect("regex must compile")
});

/// Pick a concrete strategy for an `auto` query. Exact-match signals
/// (quoted phrases, code-shaped identifiers) route to sparse, long
/// natural-language queries to dense, everything else to hybrid.
pub fn classify(query: &str, cfg: &mesh_config::RecallAuto) -> RecallStrategy {
	if QUOTED_PHRASE.is_match(query) || IDENTIFIER.is_match(query) {
		return RecallStrategy::Sparse;
	}
	if query.split_whitespace().count() as u32 >= cfg.dense_min_words {
		return RecallStrategy::Dense;
	}

	RecallStrategy::Hybrid
}
