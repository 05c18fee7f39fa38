use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Caller-facing cancellation boundary. Retrieval rounds and agent
/// turns check it cooperatively instead of being killed mid-step.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
	at: Instant,
}
impl Deadline {
	pub fn after(duration: Duration) -> Self {
		Self { at: Instant::now() + duration }
	}

	pub fn remaining(&self) -> Option<Duration> {
		self.at.checked_duration_since(Instant::now())
	}

	pub fn check(&self, stage: &str) -> Result<()> {
		if self.remaining().is_none() {
			return Err(Error::Timeout { stage: stage.to_string() });
		}

		Ok(())
	}
}
