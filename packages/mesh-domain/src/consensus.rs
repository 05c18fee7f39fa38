use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const EMPTY_TRACE_REASON: &str = "No messages to validate";
pub const CRITIC_REJECTED_REASON: &str = "Critic rejected hypothesis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
	Hypothesis,
	Critique,
	Final,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
	pub from: String,
	#[serde(rename = "type")]
	pub kind: MessageKind,
	pub content: String,
	#[serde(with = "time::serde::rfc3339")]
	pub ts: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStrategy {
	Majority,
	Critic,
}
impl ConsensusStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Majority => "majority",
			Self::Critic => "critic",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"majority" => Some(Self::Majority),
			"critic" => Some(Self::Critic),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
	pub accepted: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub final_message: Option<AgentMessage>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub disagreements: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}
impl ConsensusResult {
	pub fn rejected(reason: impl Into<String>) -> Self {
		Self { accepted: false, final_message: None, disagreements: None, reason: Some(reason.into()) }
	}
}

/// Evaluate a trace under the chosen strategy. Strategy dispatch is a
/// closed enum, so unrecognized names fail at the wire boundary rather
/// than defaulting here.
pub fn validate(
	trace: &[AgentMessage],
	strategy: ConsensusStrategy,
	critic_agent: &str,
) -> ConsensusResult {
	if trace.is_empty() {
		return ConsensusResult::rejected(EMPTY_TRACE_REASON);
	}

	match strategy {
		ConsensusStrategy::Majority => validate_majority(trace),
		ConsensusStrategy::Critic => validate_critic(trace, critic_agent),
	}
}

fn validate_majority(trace: &[AgentMessage]) -> ConsensusResult {
	let final_message = trace.iter().find(|message| message.kind == MessageKind::Final);
	let disagreements =
		trace.iter().filter(|message| message.kind != MessageKind::Final).count() as u32;

	match final_message {
		Some(message) => ConsensusResult {
			accepted: true,
			final_message: Some(message.clone()),
			disagreements: Some(disagreements),
			reason: None,
		},
		None => ConsensusResult {
			accepted: false,
			final_message: None,
			disagreements: Some(disagreements),
			reason: Some("No final message in trace".to_string()),
		},
	}
}

fn validate_critic(trace: &[AgentMessage], critic_agent: &str) -> ConsensusResult {
	let critic_final = trace
		.iter()
		.find(|message| message.from == critic_agent && message.kind == MessageKind::Final);
	let critiques = trace
		.iter()
		.filter(|message| message.from == critic_agent && message.kind == MessageKind::Critique)
		.count() as u32;

	match critic_final {
		Some(message) => ConsensusResult {
			accepted: true,
			final_message: Some(message.clone()),
			disagreements: Some(critiques),
			reason: None,
		},
		None => ConsensusResult {
			accepted: false,
			final_message: None,
			disagreements: Some(critiques),
			reason: Some(CRITIC_REJECTED_REASON.to_string()),
		},
	}
}
