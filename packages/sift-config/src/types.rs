use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub classifier: ClassifierProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	/// Optional. JSON file the embedding cache is loaded from and saved back to.
	pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifierProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	pub default_headers: Map<String, Value>,
	/// Bias added to both verdict tokens so the classifier can emit nothing else.
	pub select_logit_bias: f32,
	pub yes_token_id: Option<u32>,
	pub no_token_id: Option<u32>,
	/// Optional. Hugging Face tokenizer used to look up the verdict token ids when they are not
	/// configured explicitly.
	pub tokenizer_repo: Option<String>,
}

/// Relevance search budget and traversal settings.
///
/// Every value is supplied by the caller; none of them has a default.
#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	pub relevance_test_budget: u32,
	pub relevance_test_batch_size: u32,
	/// Cap on chunks tested per community per level.
	pub community_relevance_tests: u32,
	/// Top-K member chunks whose mean semantic rank orders communities.
	pub community_ranking_chunks: u32,
	pub adjacent_search_steps: u32,
	/// Consecutive irrelevant communities after which the rest of a level is abandoned.
	pub irrelevant_community_restart: u32,
}

fn default_max_attempts() -> u32 {
	3
}
