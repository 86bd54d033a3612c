use std::collections::HashSet;

use futures::future::join_all;

use sift_config::ClassifierProviderConfig;
use sift_providers::classify::{ClassificationRequest, LogitBias};

use crate::{
	Error, Providers, Result,
	corpus::{ChunkId, Corpus},
	ledger::{TestLedger, Verdict},
	observer::SearchObserver,
	prompt,
};

/// Runs budgeted, batched relevance tests against the classifier.
///
/// Requests inside a batch run concurrently; batches run one after another so the budget and the
/// early stop see every verdict of the previous batch.
pub struct RelevanceTester<'a> {
	pub providers: &'a Providers,
	pub cfg: &'a ClassifierProviderConfig,
	pub logit_bias: LogitBias,
	pub corpus: &'a Corpus,
	pub question: &'a str,
	pub batch_size: usize,
	pub budget: usize,
	pub observer: &'a dyn SearchObserver,
}
impl RelevanceTester<'_> {
	/// Tests `candidates` in batches under `label` and reports whether any batch found a
	/// relevant chunk.
	///
	/// Already tested and repeated candidates are skipped. Each batch is cut so that the ledger
	/// plus `reserved` never exceeds the budget, and testing stops after the first batch without
	/// a relevant verdict. When a request fails, the verdicts of its batch that did succeed are
	/// still recorded before the error is returned.
	pub async fn assess(
		&self,
		ledger: &mut TestLedger,
		label: &str,
		candidates: &[ChunkId],
		reserved: usize,
	) -> Result<bool> {
		let mut queued = HashSet::new();
		let pending: Vec<ChunkId> = candidates
			.iter()
			.copied()
			.filter(|id| !ledger.contains(*id) && queued.insert(*id))
			.collect();
		let batches: Vec<&[ChunkId]> = pending.chunks(self.batch_size.max(1)).collect();
		let total = batches.len();
		let mut any_relevant = false;

		for (index, batch) in batches.into_iter().enumerate() {
			let allowed = self.budget.saturating_sub(ledger.len() + reserved);
			let batch = &batch[..batch.len().min(allowed)];

			if batch.is_empty() {
				tracing::info!(
					label,
					tested = ledger.len(),
					reserved,
					"Relevance test budget exhausted."
				);

				break;
			}

			let relevant = self.assess_batch(ledger, label, index + 1, batch).await?;

			tracing::info!(
				label,
				batch = index + 1,
				batches = total,
				size = batch.len(),
				relevant,
				"Relevance batch assessed."
			);

			if relevant == 0 {
				break;
			}

			any_relevant = true;
		}

		Ok(any_relevant)
	}

	async fn assess_batch(
		&self,
		ledger: &mut TestLedger,
		label: &str,
		batch_number: usize,
		batch: &[ChunkId],
	) -> Result<usize> {
		let requests = batch
			.iter()
			.map(|id| self.request_for(*id))
			.collect::<Result<Vec<ClassificationRequest>>>()?;
		let responses = join_all(
			requests.iter().map(|request| self.providers.classifier.classify(self.cfg, request)),
		)
		.await;
		let mut relevant = 0;
		let mut failure = None;

		for (id, response) in batch.iter().zip(responses) {
			let outcome = match response {
				Ok(raw) => Verdict::parse(&raw).ok_or_else(|| Error::UnparseableVerdict {
					label: label.to_string(),
					batch: batch_number,
					chunk_id: *id,
					response: raw.clone(),
				}),
				Err(err) => Err(Error::Classification {
					label: label.to_string(),
					batch: batch_number,
					chunk_id: *id,
					message: err.to_string(),
				}),
			};

			match outcome {
				Ok(verdict) =>
					if ledger.record(label, *id, verdict) && verdict.is_relevant() {
						relevant += 1;
					},
				Err(err) => {
					tracing::warn!(
						label,
						batch = batch_number,
						chunk_id = %id,
						error = %err,
						"Relevance test failed."
					);

					if failure.is_none() {
						failure = Some(err);
					}
				},
			}
		}

		debug_assert!(ledger.len() <= self.budget);

		self.notify(ledger);

		match failure {
			Some(err) => Err(err),
			None => Ok(relevant),
		}
	}

	fn request_for(&self, id: ChunkId) -> Result<ClassificationRequest> {
		let text = self.corpus.text(id).ok_or(Error::UnknownChunk { chunk_id: id })?;

		Ok(ClassificationRequest {
			messages: prompt::relevance_messages(self.question, text),
			logit_bias: self.logit_bias,
			max_tokens: 1,
		})
	}

	fn notify(&self, ledger: &TestLedger) {
		let texts: Vec<&str> =
			ledger.relevant().into_iter().filter_map(|id| self.corpus.text(id)).collect();

		self.observer.on_progress(&ledger.progress(self.budget));
		self.observer.on_relevant_chunks(&texts);
	}
}
