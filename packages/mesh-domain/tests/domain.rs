use serde_json::{Map, json};
use time::OffsetDateTime;

use mesh_domain::{
	AgentMessage, ConsensusStrategy, MessageKind, RankedDoc, RecallStrategy, build_citations,
	consensus, enrich_documents, scoring,
};

#[test]
fn message_kind_uses_wire_casing() {
	let message = AgentMessage {
		from: "solver".to_string(),
		kind: MessageKind::Hypothesis,
		content: "draft".to_string(),
		ts: OffsetDateTime::UNIX_EPOCH,
	};
	let value = serde_json::to_value(&message).unwrap();

	assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("HYPOTHESIS"));
	assert_eq!(value.get("from").and_then(|v| v.as_str()), Some("solver"));
}

#[test]
fn strategies_parse_lowercase_only() {
	assert_eq!(RecallStrategy::parse("hybrid"), Some(RecallStrategy::Hybrid));
	assert_eq!(RecallStrategy::parse("Hybrid"), None);
	assert_eq!(ConsensusStrategy::parse("critic"), Some(ConsensusStrategy::Critic));
	assert_eq!(ConsensusStrategy::parse("unanimous"), None);

	let err = serde_json::from_value::<RecallStrategy>(json!("semantic"));

	assert!(err.is_err());
}

#[test]
fn enrichment_then_citation_preserves_doc_count_and_url() {
	let mut meta = Map::new();

	meta.insert("url".to_string(), json!("https://docs.example/reset"));

	let docs = vec![
		RankedDoc {
			id: "reset".to_string(),
			text: "To reset a password, open settings and choose reset.".to_string(),
			score: 0.91,
			meta,
		},
		RankedDoc {
			id: "billing".to_string(),
			text: "Invoices are generated monthly.".to_string(),
			score: 0.12,
			meta: Map::new(),
		},
	];
	let enriched = enrich_documents(docs, OffsetDateTime::UNIX_EPOCH);
	let citations = build_citations(&enriched);

	assert_eq!(citations.len(), 2);
	assert_eq!(citations[0].url.as_deref(), Some("https://docs.example/reset"));
	assert!(citations[1].url.is_none());
	assert!(citations.iter().all(|citation| citation.snippet.chars().count() <= 200));
}

#[test]
fn accepted_trace_scores_and_gates() {
	let trace = vec![
		AgentMessage {
			from: "solver".to_string(),
			kind: MessageKind::Hypothesis,
			content: "Reset the password from account settings.".to_string(),
			ts: OffsetDateTime::UNIX_EPOCH,
		},
		AgentMessage {
			from: "critic".to_string(),
			kind: MessageKind::Final,
			content: "Reset the password from account settings.".to_string(),
			ts: OffsetDateTime::UNIX_EPOCH,
		},
	];
	let consensus = consensus::validate(&trace, ConsensusStrategy::Critic, "critic");

	assert!(consensus.accepted);

	let docs = vec![RankedDoc {
		id: "reset".to_string(),
		text: "Reset the password from account settings.".to_string(),
		score: 0.95,
		meta: Map::new(),
	}];
	let citations = build_citations(&docs);
	let answer = consensus.final_message.unwrap().content;
	let subscores =
		scoring::compute_subscores("How do I reset a password?", &answer, &docs, &citations);

	assert!(subscores.citation > 0.9);
	assert!(subscores.relevance >= 0.5);

	let cfg = mesh_config::Scoring {
		majority_pass_threshold: 0.75,
		critic_pass_threshold: 0.6,
		model_version: "mesh-scorer-v1".to_string(),
		weights: None,
	};
	let score = scoring::composite_score(subscores, cfg.weights.as_ref());

	assert!(score >= scoring::pass_threshold(ConsensusStrategy::Critic, &cfg));
}
