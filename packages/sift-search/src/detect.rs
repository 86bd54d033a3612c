use serde::{Deserialize, Serialize};

use sift_providers::cache::EmbeddingCache;

use crate::{
	Error, Result, SiftService,
	community::CommunityIndex,
	corpus::{ChunkId, Corpus, HierarchicalCommunity},
	expansion,
	ledger::{TestLedger, TestProgress, TestRecord},
	observer::SearchObserver,
	ranking::SemanticRanking,
	tester::RelevanceTester,
	traversal::{LevelReport, LevelTraversal},
};

pub struct DetectRequest<'a> {
	pub question: &'a str,
	pub corpus: &'a Corpus,
	pub communities: &'a [HierarchicalCommunity],
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectResponse {
	/// Relevant chunk ids, ascending.
	pub relevant: Vec<ChunkId>,
	pub progress: TestProgress,
	pub levels: Vec<LevelReport>,
	/// Every test in the order it was recorded.
	pub tests: Vec<TestRecord>,
}

impl SiftService {
	pub async fn detect_relevant_chunks(
		&self,
		req: DetectRequest<'_>,
		cache: &EmbeddingCache,
		observer: &dyn SearchObserver,
	) -> Result<DetectResponse> {
		sift_config::validate_search(&self.cfg.search)?;

		let search = &self.cfg.search;
		let budget = search.relevance_test_budget as usize;
		let mut ledger = TestLedger::new();

		observer.on_progress(&ledger.progress(budget));

		if req.corpus.is_empty() {
			tracing::info!("Corpus is empty; nothing to search.");

			return Ok(DetectResponse { progress: ledger.progress(budget), ..Default::default() });
		}

		let question_embedding = self
			.embed_cached(cache, &[req.question.to_string()])
			.await?
			.pop()
			.ok_or_else(|| Error::Embedding {
				message: "Question embedding is missing.".to_string(),
			})?;
		let ranking = SemanticRanking::rank(&question_embedding, req.corpus, ledger.seen())?;
		let index = CommunityIndex::build(
			req.communities,
			req.corpus,
			&ranking,
			search.community_ranking_chunks as usize,
		);

		tracing::info!(
			chunks = req.corpus.len(),
			ranked = ranking.len(),
			max_level = index.max_level(),
			budget,
			"Starting relevance search."
		);

		let tester = RelevanceTester {
			providers: &self.providers,
			cfg: &self.cfg.providers.classifier,
			logit_bias: self.logit_bias,
			corpus: req.corpus,
			question: req.question,
			batch_size: search.relevance_test_batch_size as usize,
			budget,
			observer,
		};
		let mut traversal = LevelTraversal::new(&tester, &index, search);

		traversal.run(&mut ledger).await?;

		let levels = traversal.into_reports();

		expansion::expand_neighbours(&tester, &mut ledger, search.adjacent_search_steps as usize)
			.await?;

		let mut relevant = ledger.relevant();

		relevant.sort_unstable();

		let progress = ledger.progress(budget);

		tracing::info!(
			relevant = relevant.len(),
			tested = progress.tested,
			budget,
			"Relevance search finished."
		);

		Ok(DetectResponse { relevant, progress, levels, tests: ledger.entries().to_vec() })
	}
}
