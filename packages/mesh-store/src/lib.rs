mod error;
pub mod memory;

pub use error::{Error, Result};
pub use memory::{MemoryEventSink, MemoryStore, RecordedValidation};

use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mesh_domain::CorpusDoc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Event type emitted once per validated mesh session.
pub const VALIDATE_EVENT: &str = "rag.validate";

/// Supplies a workspace's candidate documents in corpus order. Any
/// backend (embedded index, vector database, relational store) can
/// stand behind this.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self, workspace_id: &'a str) -> BoxFuture<'a, Result<Vec<CorpusDoc>>>;
}

/// Fire-and-forget telemetry append. Sink failures must never fail the
/// caller.
pub trait EventSink
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, event: TelemetryEvent) -> BoxFuture<'a, Result<()>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
	pub id: Uuid,
	pub kind: String,
	#[serde(with = "time::serde::rfc3339")]
	pub ts: OffsetDateTime,
	pub payload: serde_json::Value,
}
impl TelemetryEvent {
	pub fn new(kind: impl Into<String>, ts: OffsetDateTime, payload: serde_json::Value) -> Self {
		Self { id: Uuid::new_v4(), kind: kind.into(), ts, payload }
	}
}
