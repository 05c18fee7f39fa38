use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;
use time::OffsetDateTime;

use mesh_domain::{AgentMessage, ConsensusStrategy, MessageKind};

/// Turn a goal plus retrieved context into an agent trace. Under the
/// majority strategy a single solver turn produces the FINAL message;
/// under the critic strategy the solver's HYPOTHESIS is submitted to a
/// second, adversarial review turn that either finalizes or critiques.
pub async fn dispatch(
	cfg: &mesh_config::AgentProviderConfig,
	critic_agent: &str,
	strategy: ConsensusStrategy,
	goal: &str,
	context: &[String],
	hints: &[String],
) -> Result<Vec<AgentMessage>> {
	let answer = chat(cfg, &solver_messages(goal, context, hints)).await?;
	let now = OffsetDateTime::now_utc();

	match strategy {
		ConsensusStrategy::Majority => Ok(vec![AgentMessage {
			from: cfg.solver_agent.clone(),
			kind: MessageKind::Final,
			content: answer,
			ts: now,
		}]),
		ConsensusStrategy::Critic => {
			let hypothesis = AgentMessage {
				from: cfg.solver_agent.clone(),
				kind: MessageKind::Hypothesis,
				content: answer.clone(),
				ts: now,
			};
			let review = chat(cfg, &critic_messages(goal, &answer)).await?;
			let (approved, notes) = parse_verdict(&review);
			let verdict = if approved {
				AgentMessage {
					from: critic_agent.to_string(),
					kind: MessageKind::Final,
					content: answer,
					ts: OffsetDateTime::now_utc(),
				}
			} else {
				AgentMessage {
					from: critic_agent.to_string(),
					kind: MessageKind::Critique,
					content: notes,
					ts: OffsetDateTime::now_utc(),
				}
			};

			Ok(vec![hypothesis, verdict])
		},
	}
}

async fn chat(cfg: &mesh_config::AgentProviderConfig, messages: &[Value]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_chat_content(json)
}

fn solver_messages(goal: &str, context: &[String], hints: &[String]) -> Vec<Value> {
	let mut system = String::from(
		"Answer the goal using only the provided context. Cite nothing outside it.",
	);

	if !context.is_empty() {
		system.push_str("\n\nContext:\n");

		for (idx, block) in context.iter().enumerate() {
			system.push_str(&format!("[{}] {}\n", idx + 1, block));
		}
	}
	if !hints.is_empty() {
		system.push_str("\nHints:\n");

		for hint in hints {
			system.push_str(&format!("- {hint}\n"));
		}
	}

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": goal }),
	]
}

fn critic_messages(goal: &str, hypothesis: &str) -> Vec<Value> {
	let system = "You are an adversarial reviewer. Given a goal and a candidate answer, reply \
		with JSON {\"verdict\": \"approve\"|\"reject\", \"notes\": \"...\"}.";

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({
			"role": "user",
			"content": format!("Goal: {goal}\n\nCandidate answer:\n{hypothesis}"),
		}),
	]
}

fn parse_chat_content(json: Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Chat response is missing message content."))
}

/// A review that is not well-formed JSON counts as a rejection with
/// the raw text as notes, so a confused critic can never approve by
/// accident.
fn parse_verdict(review: &str) -> (bool, String) {
	let Ok(parsed) = serde_json::from_str::<Value>(review) else {
		return (false, review.to_string());
	};
	let verdict = parsed.get("verdict").and_then(|v| v.as_str()).unwrap_or("reject");
	let notes = parsed
		.get("notes")
		.and_then(|v| v.as_str())
		.map(str::to_string)
		.unwrap_or_else(|| review.to_string());

	(verdict == "approve", notes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "Reset it from settings." } }
			]
		});
		let content = parse_chat_content(json).expect("parse failed");
		assert_eq!(content, "Reset it from settings.");
	}

	#[test]
	fn missing_content_is_an_error() {
		assert!(parse_chat_content(serde_json::json!({ "choices": [] })).is_err());
	}

	#[test]
	fn approve_verdict_parses() {
		let (approved, notes) = parse_verdict(r#"{"verdict": "approve", "notes": "solid"}"#);

		assert!(approved);
		assert_eq!(notes, "solid");
	}

	#[test]
	fn malformed_review_rejects() {
		let (approved, notes) = parse_verdict("I guess it is fine?");

		assert!(!approved);
		assert_eq!(notes, "I guess it is fine?");
	}

	#[test]
	fn solver_prompt_numbers_context_blocks() {
		let messages = solver_messages(
			"goal",
			&["first".to_string(), "second".to_string()],
			&["be brief".to_string()],
		);
		let system = messages[0].get("content").and_then(|v| v.as_str()).unwrap();

		assert!(system.contains("[1] first"));
		assert!(system.contains("[2] second"));
		assert!(system.contains("- be brief"));
	}
}
