use serde_json::Value;

use crate::{Error, Result};

/// Sends a chat-completions request and returns the first choice's text content.
pub async fn complete(cfg: &lexa_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_text(json)
}

fn parse_completion_text(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})?;

	if content.trim().is_empty() {
		return Err(Error::InvalidResponse {
			message: "Completion response content is empty.".to_string(),
		});
	}

	Ok(content.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"answer\": \"yes\"}" } }
			]
		});
		let text = parse_completion_text(json).expect("parse failed");

		assert_eq!(text, "{\"answer\": \"yes\"}");
	}

	#[test]
	fn rejects_blank_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "   " } }]
		});

		assert!(parse_completion_text(json).is_err());
	}
}
