mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ClassifierProviderConfig, Config, EmbeddingProviderConfig, Providers, Search, Service,
};

use std::{fs, path::Path};

const MAX_LOGIT_BIAS: f32 = 100.0;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("classifier", &cfg.providers.classifier.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	validate_classifier(&cfg.providers.classifier)?;
	validate_search(&cfg.search)?;

	Ok(())
}

/// Checks the search settings alone.
///
/// The search core calls this before issuing any relevance test, so configs assembled in code get
/// the same checks as configs loaded from disk.
pub fn validate_search(search: &Search) -> Result<()> {
	for (label, value) in [
		("search.relevance_test_budget", search.relevance_test_budget),
		("search.relevance_test_batch_size", search.relevance_test_batch_size),
		("search.community_ranking_chunks", search.community_ranking_chunks),
		("search.irrelevant_community_restart", search.irrelevant_community_restart),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn validate_classifier(classifier: &ClassifierProviderConfig) -> Result<()> {
	if classifier.max_attempts == 0 {
		return Err(Error::Validation {
			message: "providers.classifier.max_attempts must be greater than zero.".to_string(),
		});
	}
	if !classifier.temperature.is_finite() || classifier.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.classifier.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}
	if !classifier.select_logit_bias.is_finite() {
		return Err(Error::Validation {
			message: "providers.classifier.select_logit_bias must be a finite number.".to_string(),
		});
	}
	if !(-MAX_LOGIT_BIAS..=MAX_LOGIT_BIAS).contains(&classifier.select_logit_bias) {
		return Err(Error::Validation {
			message: "providers.classifier.select_logit_bias must be in the range -100.0-100.0."
				.to_string(),
		});
	}

	match (classifier.yes_token_id, classifier.no_token_id) {
		(Some(yes), Some(no)) if yes == no => Err(Error::Validation {
			message: "providers.classifier.yes_token_id and no_token_id must differ.".to_string(),
		}),
		(Some(_), Some(_)) => Ok(()),
		(None, None) if classifier.tokenizer_repo.is_some() => Ok(()),
		(None, None) => Err(Error::Validation {
			message: "providers.classifier.tokenizer_repo is required when token ids are not set."
				.to_string(),
		}),
		_ => Err(Error::Validation {
			message: "providers.classifier.yes_token_id and no_token_id must be set together."
				.to_string(),
		}),
	}
}

fn normalize(cfg: &mut Config) {
	let classifier = &mut cfg.providers.classifier;

	if classifier.tokenizer_repo.as_deref().map(|repo| repo.trim().is_empty()).unwrap_or(false) {
		classifier.tokenizer_repo = None;
	}
	if cfg
		.providers
		.embedding
		.cache_path
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.embedding.cache_path = None;
	}
}
