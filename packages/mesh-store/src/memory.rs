use std::{
	collections::HashMap,
	sync::{Mutex, RwLock},
};

use serde::Serialize;
use uuid::Uuid;

use crate::{BoxFuture, DocumentStore, Error, EventSink, Result, TelemetryEvent, VALIDATE_EVENT};
use mesh_domain::{ConsensusStrategy, CorpusDoc, ValidationRecord};

/// Embedded document index keyed by workspace. Doubles as the fixture
/// backend for tests; production deployments put a real store behind
/// the `DocumentStore` trait instead.
#[derive(Default)]
pub struct MemoryStore {
	workspaces: RwLock<HashMap<String, Vec<CorpusDoc>>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_workspace(&self, workspace_id: impl Into<String>, docs: Vec<CorpusDoc>) {
		let mut workspaces = self.workspaces.write().unwrap_or_else(|err| err.into_inner());

		workspaces.insert(workspace_id.into(), docs);
	}
}
impl DocumentStore for MemoryStore {
	fn fetch<'a>(&'a self, workspace_id: &'a str) -> BoxFuture<'a, Result<Vec<CorpusDoc>>> {
		let docs = {
			let workspaces = self.workspaces.read().unwrap_or_else(|err| err.into_inner());

			workspaces.get(workspace_id).cloned().unwrap_or_default()
		};

		Box::pin(async move { Ok(docs) })
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedValidation {
	pub id: Uuid,
	#[serde(flatten)]
	pub record: ValidationRecord,
}

/// In-memory event log. `append` satisfies the `EventSink` contract;
/// `recent_validations` backs the ops surface.
#[derive(Default)]
pub struct MemoryEventSink {
	events: Mutex<Vec<TelemetryEvent>>,
}
impl MemoryEventSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.events.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Most recent validation records first, optionally filtered by
	/// strategy.
	pub fn recent_validations(
		&self,
		limit: usize,
		strategy: Option<ConsensusStrategy>,
	) -> Vec<RecordedValidation> {
		let events = self.events.lock().unwrap_or_else(|err| err.into_inner());
		let mut out = Vec::new();

		for event in events.iter().rev() {
			if event.kind != VALIDATE_EVENT {
				continue;
			}

			let Ok(record) = serde_json::from_value::<ValidationRecord>(event.payload.clone())
			else {
				continue;
			};

			if let Some(strategy) = strategy
				&& record.strategy != strategy
			{
				continue;
			}

			out.push(RecordedValidation { id: event.id, record });

			if out.len() >= limit {
				break;
			}
		}

		out
	}
}
impl EventSink for MemoryEventSink {
	fn append<'a>(&'a self, event: TelemetryEvent) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut events = self
				.events
				.lock()
				.map_err(|_| Error::Storage { message: "Event log lock poisoned.".to_string() })?;

			events.push(event);

			Ok(())
		})
	}
}
