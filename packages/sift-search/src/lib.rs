pub mod community;
pub mod corpus;
pub mod detect;
pub mod embedding;
pub mod expansion;
pub mod ledger;
pub mod observer;
pub mod prompt;
pub mod ranking;
pub mod tester;
pub mod traversal;

mod error;

pub use community::{CommunityIndex, CommunityKey, ROOT_COMMUNITY, ROOT_LEVEL};
pub use corpus::{Chunk, ChunkId, Corpus, HierarchicalCommunity};
pub use detect::{DetectRequest, DetectResponse};
pub use error::{Error, Result};
pub use ledger::{LabelProgress, TestLedger, TestProgress, TestRecord, Verdict};
pub use observer::{NoopObserver, SearchObserver};
pub use ranking::SemanticRanking;
pub use tester::RelevanceTester;
pub use traversal::{LevelReport, LevelTraversal, TraversalState};

use std::{future::Future, pin::Pin, sync::Arc};

use sift_config::{ClassifierProviderConfig, Config, EmbeddingProviderConfig};
use sift_providers::classify::{self, ClassificationRequest, LogitBias};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>>;
}

pub trait ClassifierProvider
where
	Self: Send + Sync,
{
	/// Returns the raw single-token answer for one request.
	fn classify<'a>(
		&'a self,
		cfg: &'a ClassifierProviderConfig,
		request: &'a ClassificationRequest,
	) -> BoxFuture<'a, sift_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub classifier: Arc<dyn ClassifierProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		classifier: Arc<dyn ClassifierProvider>,
	) -> Self {
		Self { embedding, classifier }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let providers = Arc::new(DefaultProviders);

		Self { embedding: providers.clone(), classifier: providers }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
	pub logit_bias: LogitBias,
}
impl SiftService {
	pub fn new(cfg: Config, logit_bias: LogitBias) -> Self {
		Self::with_providers(cfg, Providers::default(), logit_bias)
	}

	pub fn with_providers(cfg: Config, providers: Providers, logit_bias: LogitBias) -> Self {
		Self { cfg, providers, logit_bias }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(sift_providers::embedding::embed(cfg, texts))
	}
}
impl ClassifierProvider for DefaultProviders {
	fn classify<'a>(
		&'a self,
		cfg: &'a ClassifierProviderConfig,
		request: &'a ClassificationRequest,
	) -> BoxFuture<'a, sift_providers::Result<String>> {
		Box::pin(classify::classify(cfg, request))
	}
}
