use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};
use tokio::time;

use crate::{Error, Result};
use sift_config::ClassifierProviderConfig;

const RETRY_BACKOFF_MS: u64 = 200;

/// Token ids the classifier is restricted to, with the bias applied to each.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogitBias {
	pub yes_token_id: u32,
	pub no_token_id: u32,
	pub bias: f32,
}
impl LogitBias {
	pub fn to_json(&self) -> Value {
		let mut map = Map::new();

		map.insert(self.yes_token_id.to_string(), Value::from(self.bias));
		map.insert(self.no_token_id.to_string(), Value::from(self.bias));

		Value::Object(map)
	}
}

#[derive(Clone, Debug)]
pub struct ClassificationRequest {
	pub messages: Vec<Value>,
	pub logit_bias: LogitBias,
	pub max_tokens: u32,
}

/// Sends one chat completion and returns the raw content of the first choice.
pub async fn classify(
	cfg: &ClassifierProviderConfig,
	request: &ClassificationRequest,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": request.messages,
		"logit_bias": request.logit_bias.to_json(),
		"max_tokens": request.max_tokens,
	});
	let mut last_err = None;
	let mut backoff = Duration::from_millis(RETRY_BACKOFF_MS);

	for attempt in 1..=cfg.max_attempts.max(1) {
		if attempt > 1 {
			time::sleep(backoff).await;

			backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
		}

		let sent = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await
			.and_then(|res| res.error_for_status());
		let res = match sent {
			Ok(res) => res,
			Err(err) => {
				tracing::warn!(
					error = %err,
					attempt,
					max_attempts = cfg.max_attempts,
					"Classifier request failed."
				);

				last_err = Some(err);

				continue;
			},
		};
		let json: Value = res.json().await?;

		return parse_classifier_content(&json);
	}

	match last_err {
		Some(err) => Err(err.into()),
		None => Err(Error::InvalidConfig {
			message: "Classifier max_attempts must be greater than zero.".to_string(),
		}),
	}
}

fn parse_classifier_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(ToString::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Classifier response is missing message content.".to_string(),
		})
}
