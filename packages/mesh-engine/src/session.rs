use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex},
};

use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use mesh_domain::{AgentMessage, Citation, ConsensusResult, ConsensusStrategy, RankedDoc, ValidationRecord};

/// Mutable state of one mesh conversation. Continuations lock the
/// session's own mutex, so turns on a single session serialize while
/// distinct sessions proceed concurrently.
#[derive(Debug)]
pub struct MeshSession {
	pub goal: String,
	pub strategy: ConsensusStrategy,
	pub docs: Vec<RankedDoc>,
	pub citations: Vec<Citation>,
	pub trace: Vec<AgentMessage>,
	pub tokens_used: u32,
	pub consensus: Option<ConsensusResult>,
	pub validation: Option<ValidationRecord>,
	pub created_at: OffsetDateTime,
}

/// In-process session table with bounded capacity. Inserting past
/// `max` evicts the oldest session, whose id then resolves to
/// `SessionNotFound` like any unknown id.
#[derive(Debug)]
pub struct SessionRegistry {
	max: usize,
	inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	order: VecDeque<Uuid>,
	sessions: HashMap<Uuid, Arc<AsyncMutex<MeshSession>>>,
}

impl SessionRegistry {
	pub fn new(max: usize) -> Self {
		Self { max: max.max(1), inner: Mutex::new(Inner::default()) }
	}

	pub fn insert(&self, id: Uuid, session: MeshSession) {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		while inner.order.len() >= self.max {
			if let Some(evicted) = inner.order.pop_front() {
				inner.sessions.remove(&evicted);

				tracing::debug!(session_id = %evicted, "Evicted oldest mesh session.");
			}
		}

		inner.order.push_back(id);
		inner.sessions.insert(id, Arc::new(AsyncMutex::new(session)));
	}

	pub fn get(&self, id: &Uuid) -> Option<Arc<AsyncMutex<MeshSession>>> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).sessions.get(id).cloned()
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
