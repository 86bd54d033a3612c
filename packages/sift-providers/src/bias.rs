use tokenizers::Tokenizer;

use crate::{Error, Result, classify::LogitBias};
use sift_config::ClassifierProviderConfig;

pub const YES_TOKEN: &str = "Yes";
pub const NO_TOKEN: &str = "No";

/// Resolves the verdict token ids, downloading the configured tokenizer when the ids are not set.
pub fn resolve_logit_bias(cfg: &ClassifierProviderConfig) -> Result<LogitBias> {
	if let (Some(yes_token_id), Some(no_token_id)) = (cfg.yes_token_id, cfg.no_token_id) {
		return Ok(LogitBias { yes_token_id, no_token_id, bias: cfg.select_logit_bias });
	}

	let repo = cfg.tokenizer_repo.as_deref().ok_or_else(|| Error::InvalidConfig {
		message: "Classifier tokenizer_repo is required when token ids are not set.".to_string(),
	})?;
	let tokenizer = Tokenizer::from_pretrained(repo, None)
		.map_err(|err| Error::Tokenizer { message: err.to_string() })?;

	tracing::info!(tokenizer_repo = repo, "Loaded tokenizer for verdict tokens.");

	logit_bias_from_tokenizer(&tokenizer, cfg.select_logit_bias)
}

pub fn logit_bias_from_tokenizer(tokenizer: &Tokenizer, bias: f32) -> Result<LogitBias> {
	let yes_token_id = first_token_id(tokenizer, YES_TOKEN)?;
	let no_token_id = first_token_id(tokenizer, NO_TOKEN)?;

	if yes_token_id == no_token_id {
		return Err(Error::Tokenizer {
			message: format!("Tokens {YES_TOKEN:?} and {NO_TOKEN:?} share id {yes_token_id}."),
		});
	}

	Ok(LogitBias { yes_token_id, no_token_id, bias })
}

fn first_token_id(tokenizer: &Tokenizer, word: &str) -> Result<u32> {
	let encoding = tokenizer
		.encode(word, false)
		.map_err(|err| Error::Tokenizer { message: err.to_string() })?;

	encoding.get_ids().first().copied().ok_or_else(|| Error::Tokenizer {
		message: format!("Tokenizer produced no tokens for {word:?}."),
	})
}
