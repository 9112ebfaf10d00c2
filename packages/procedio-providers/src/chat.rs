use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
	pub system: String,
	pub user: String,
	/// Overrides the provider's configured temperature when set.
	pub temperature: Option<f32>,
	/// Asks the provider for a JSON object response.
	pub json_mode: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
	choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
	message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
	content: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
	Text(String),
	Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
struct ContentPart {
	#[serde(default)]
	text: Option<String>,
}

pub async fn complete(
	cfg: &procedio_config::LlmProviderConfig,
	req: &ChatRequest,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": req.temperature.unwrap_or(cfg.temperature),
		"messages": [
			{ "role": "system", "content": req.system },
			{ "role": "user", "content": req.user },
		],
	});

	if req.json_mode {
		body["response_format"] = serde_json::json!({ "type": "json_object" });
	}

	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let res = crate::ensure_success("Chat", res).await?;
	let bytes = res.bytes().await?;

	parse_chat_response(&bytes)
}

/// Strips a Markdown code fence some models wrap around JSON-mode output.
pub fn json_payload(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_chat_response(bytes: &[u8]) -> Result<String> {
	let parsed: ChatResponse = serde_json::from_slice(bytes)
		.map_err(|err| eyre::eyre!("Chat response is malformed: {err}"))?;
	let content = parsed
		.choices
		.into_iter()
		.next()
		.and_then(|choice| choice.message.content)
		.ok_or_else(|| eyre::eyre!("Chat response is missing message content."))?;
	let text = match content {
		MessageContent::Text(text) => text,
		MessageContent::Parts(parts) =>
			parts.into_iter().filter_map(|part| part.text).collect::<Vec<_>>().join(""),
	};

	if text.trim().is_empty() {
		return Err(eyre::eyre!("Chat response content is empty."));
	}

	Ok(text)
}
