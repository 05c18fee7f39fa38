use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document as the `DocumentStore` yields it, in corpus order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDoc {
	pub id: String,
	pub text: String,
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub meta: Map<String, Value>,
}

/// A document scored against one query. Scores are comparable within a
/// single ranking call only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDoc {
	pub id: String,
	pub text: String,
	pub score: f32,
	#[serde(default)]
	pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallStrategy {
	Auto,
	Dense,
	Sparse,
	Hybrid,
}
impl RecallStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Auto => "auto",
			Self::Dense => "dense",
			Self::Sparse => "sparse",
			Self::Hybrid => "hybrid",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"auto" => Some(Self::Auto),
			"dense" => Some(Self::Dense),
			"sparse" => Some(Self::Sparse),
			"hybrid" => Some(Self::Hybrid),
			_ => None,
		}
	}
}

/// A ranked document that survived diversity selection and budget
/// truncation. `tokens_used` is the running total at inclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallItem {
	pub id: String,
	pub text: String,
	pub score: f32,
	#[serde(default)]
	pub meta: Map<String, Value>,
	pub tokens_used: u32,
}
impl RecallItem {
	pub fn ranked_doc(&self) -> RankedDoc {
		RankedDoc {
			id: self.id.clone(),
			text: self.text.clone(),
			score: self.score,
			meta: self.meta.clone(),
		}
	}
}

/// Always returned by recall, even for an empty result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallDiagnostics {
	pub strategy_used: RecallStrategy,
	pub candidates_considered: u32,
	pub selected: u32,
	pub tokens_used: u32,
	pub mmr_applied: bool,
	#[serde(default)]
	pub degraded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
	pub doc_id: String,
	pub score: f32,
	pub snippet: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}
