use std::sync::Arc;

use mesh_engine::MeshEngine;
use mesh_store::{EventSink, MemoryEventSink, MemoryStore};

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<MeshEngine>,
	pub sink: Arc<MemoryEventSink>,
}
impl AppState {
	pub fn new(config: mesh_config::Config) -> Self {
		Self::with_store(config, Arc::new(MemoryStore::new()))
	}

	/// Build the state over a pre-seeded store. The engine and the ops
	/// surface share one event sink, so validations emitted by the
	/// engine are readable from `/ops/validate/recent`.
	pub fn with_store(config: mesh_config::Config, store: Arc<MemoryStore>) -> Self {
		let sink = Arc::new(MemoryEventSink::new());
		let engine =
			MeshEngine::new(config, store, Arc::clone(&sink) as Arc<dyn EventSink>);

		Self { engine: Arc::new(engine), sink }
	}
}
