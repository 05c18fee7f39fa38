//! Deterministic fixtures shared by the engine and API test suites.

use serde_json::{Map, Value, json};

use mesh_config::Config;
use mesh_domain::CorpusDoc;
use mesh_store::MemoryStore;

/// Workspace holding the password-reset corpus.
pub const WORKSPACE: &str = "w1";
/// Workspace holding the near-duplicate corpus.
pub const DUPLICATES_WORKSPACE: &str = "dups";

/// One relevant document and nine distractors that share no password
/// vocabulary, so lexical ranking isolates the relevant one.
pub fn password_reset_corpus() -> Vec<CorpusDoc> {
	vec![
		doc(
			"reset-guide",
			"To reset your password open account settings, choose security, and press reset \
			password. A reset email arrives within a minute.",
			Some(vec![1.0, 0.0, 0.0]),
			meta(&[("url", json!("https://docs.example/reset")), ("source_trust", json!(0.9))]),
		),
		doc("billing", "Invoices are issued on the first of each month.", Some(vec![0.0, 1.0, 0.0]), Map::new()),
		doc("onboarding", "New teammates get workspace access from their manager.", Some(vec![0.0, 0.9, 0.1]), Map::new()),
		doc("quotas", "GPU quotas renew weekly and overage requests need approval.", Some(vec![0.0, 0.8, 0.2]), Map::new()),
		doc("backups", "Nightly snapshots are retained for thirty days.", Some(vec![0.1, 0.7, 0.3]), Map::new()),
		doc("oncall", "The rotation hands over every Monday at nine.", Some(vec![0.0, 0.6, 0.4]), Map::new()),
		doc("branding", "Use the dark logo variant on light backgrounds.", Some(vec![0.0, 0.5, 0.5]), Map::new()),
		doc("travel", "Book flights through the corporate portal for insurance coverage.", Some(vec![0.0, 0.4, 0.6]), Map::new()),
		doc("catering", "Lunch orders close at ten thirty on weekdays.", Some(vec![0.0, 0.3, 0.7]), Map::new()),
		doc("parking", "Visitor spots require a pass from the front desk.", Some(vec![0.0, 0.2, 0.8]), Map::new()),
	]
}

/// The relevant document, a near-verbatim copy of it, and one distinct
/// document. The copy's embedding sits above any sensible duplicate
/// threshold against the original.
pub fn near_duplicate_corpus() -> Vec<CorpusDoc> {
	vec![
		doc(
			"reset-guide",
			"To reset your password open account settings, choose security, and press reset \
			password.",
			Some(vec![1.0, 0.0, 0.0]),
			Map::new(),
		),
		doc(
			"reset-guide-copy",
			"To reset your password open the account settings, choose security, and press reset \
			password.",
			Some(vec![0.999, 0.04, 0.0]),
			Map::new(),
		),
		doc(
			"billing",
			"Invoices are issued on the first of each month.",
			Some(vec![0.0, 1.0, 0.0]),
			Map::new(),
		),
	]
}

/// Memory store pre-seeded with both fixture workspaces. The default
/// cluster mirrors the password-reset corpus.
pub fn seeded_store() -> MemoryStore {
	let store = MemoryStore::default();

	store.insert_workspace(WORKSPACE, password_reset_corpus());
	store.insert_workspace(DUPLICATES_WORKSPACE, near_duplicate_corpus());
	store.insert_workspace("default", password_reset_corpus());

	store
}

/// Complete config with small, test-friendly limits. Provider
/// endpoints point at an unroutable port so a test that accidentally
/// reaches the network fails fast.
pub fn test_config() -> Config {
	Config {
		service: mesh_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			ops_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		recall: mesh_config::Recall {
			top_k: 3,
			candidate_k: 50,
			default_strategy: "auto".to_string(),
			use_mmr: true,
			mmr_lambda: 0.65,
			budget_tokens: 1_200,
			fusion: Default::default(),
			auto: Default::default(),
			diversity: Default::default(),
		},
		consensus: mesh_config::Consensus {
			default_strategy: "majority".to_string(),
			critic_agent: "critic".to_string(),
		},
		scoring: mesh_config::Scoring {
			majority_pass_threshold: 0.75,
			critic_pass_threshold: 0.6,
			model_version: "scorer-v1".to_string(),
			weights: None,
		},
		session: mesh_config::Session { deadline_ms: 5_000, max_sessions: 64 },
		providers: mesh_config::Providers {
			embedding: mesh_config::EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: 3,
				timeout_ms: 200,
				default_headers: Map::new(),
			},
			agent: mesh_config::AgentProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-agent".to_string(),
				temperature: 0.2,
				timeout_ms: 200,
				default_headers: Map::new(),
				solver_agent: "solver".to_string(),
			},
		},
	}
}

fn doc(id: &str, text: &str, embedding: Option<Vec<f32>>, meta: Map<String, Value>) -> CorpusDoc {
	CorpusDoc { id: id.to_string(), text: text.to_string(), embedding, meta }
}

fn meta(entries: &[(&str, Value)]) -> Map<String, Value> {
	entries.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
}
