use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use unicode_segmentation::UnicodeSegmentation;

use crate::model::{Citation, RankedDoc};

pub const SNIPPET_MAX_CHARS: usize = 200;

/// Augment ranked documents with derived metadata. An empty input
/// yields an empty output, never an error.
pub fn enrich_documents(docs: Vec<RankedDoc>, now: OffsetDateTime) -> Vec<RankedDoc> {
	let enriched_at = now.format(&Rfc3339).unwrap_or_default();

	docs.into_iter()
		.map(|mut doc| {
			let word_count = doc.text.unicode_words().count();

			doc.meta.insert("word_count".to_string(), json!(word_count));
			doc.meta.insert("enriched_at".to_string(), json!(enriched_at));
			doc.meta.insert("enriched".to_string(), json!(true));

			doc
		})
		.collect()
}

/// One citation per document, snippet truncated to at most
/// `SNIPPET_MAX_CHARS` characters (character count, not tokens).
pub fn build_citations(docs: &[RankedDoc]) -> Vec<Citation> {
	docs.iter()
		.map(|doc| Citation {
			doc_id: doc.id.clone(),
			score: doc.score,
			snippet: truncate_snippet(&doc.text),
			url: doc.meta.get("url").and_then(|value| value.as_str()).map(str::to_string),
		})
		.collect()
}

fn truncate_snippet(text: &str) -> String {
	if text.chars().count() <= SNIPPET_MAX_CHARS {
		return text.to_string();
	}

	text.chars().take(SNIPPET_MAX_CHARS).collect()
}
