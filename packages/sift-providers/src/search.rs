use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use sift_config::SearchProviderConfig;
use sift_domain::{Location, RawResult};

use crate::{Error, Result};

const TOOL_NAME: &str = "web_search";

/// Runs one web search through a chat-completions endpoint that exposes a `web_search` tool.
pub async fn search(
	cfg: &SearchProviderConfig,
	query: &str,
	location: Option<&Location>,
) -> Result<Vec<RawResult>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = request_body(cfg, query, location);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(&json)
}

fn request_body(cfg: &SearchProviderConfig, query: &str, location: Option<&Location>) -> Value {
	let suffix = location.and_then(Location::search_suffix).unwrap_or_default();

	serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "user", "content": format!("Search for information about: {query}{suffix}") }
		],
		"tools": [
			{
				"type": TOOL_NAME,
				"function": {
					"name": TOOL_NAME,
					"description": "Search the web for current information",
				},
			}
		],
		"tool_choice": "required",
	})
}

/// Collects results from every `web_search` tool call. Calls with malformed arguments are skipped.
fn parse_search_response(json: &Value) -> Result<Vec<RawResult>> {
	let choices = json.get("choices").and_then(Value::as_array).ok_or_else(|| {
		Error::InvalidResponse { message: "Search response is missing choices array.".to_string() }
	})?;
	let mut results = Vec::new();

	for choice in choices {
		let calls = choice
			.get("message")
			.and_then(|message| message.get("tool_calls"))
			.or_else(|| choice.get("tool_calls"))
			.and_then(Value::as_array);

		for call in calls.into_iter().flatten() {
			let Some(function) = call.get("function") else { continue };

			if function.get("name").and_then(Value::as_str) != Some(TOOL_NAME) {
				continue;
			}

			let Some(arguments) = function.get("arguments").and_then(Value::as_str) else {
				continue;
			};

			match serde_json::from_str::<Vec<RawResult>>(arguments) {
				Ok(parsed) => results.extend(parsed),
				Err(err) => {
					tracing::debug!(error = %err, "Skipping malformed web_search arguments.");
				},
			}
		}
	}

	Ok(results)
}
