use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::corpus::{ChunkId, Corpus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
	Yes,
	No,
}
impl Verdict {
	/// Parses a single-token classifier answer. Anything other than yes/no is rejected.
	pub fn parse(raw: &str) -> Option<Self> {
		let token = raw.trim();

		if token.eq_ignore_ascii_case("yes") {
			Some(Self::Yes)
		} else if token.eq_ignore_ascii_case("no") {
			Some(Self::No)
		} else {
			None
		}
	}

	pub fn is_relevant(self) -> bool {
		matches!(self, Self::Yes)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
	pub label: String,
	pub chunk_id: ChunkId,
	pub verdict: Verdict,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelProgress {
	pub label: String,
	pub tested: usize,
	pub relevant: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestProgress {
	pub tested: usize,
	pub relevant: usize,
	pub budget: usize,
	/// Per-label breakdown in first-use order.
	pub labels: Vec<LabelProgress>,
}
impl fmt::Display for TestProgress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} relevant of {}/{} tests", self.relevant, self.tested, self.budget)
	}
}

/// Append-only record of relevance tests. A chunk is tested at most once; the first verdict wins.
#[derive(Debug, Default)]
pub struct TestLedger {
	entries: Vec<TestRecord>,
	seen: HashSet<ChunkId>,
}
impl TestLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `false` and leaves the ledger untouched when the chunk was already tested.
	pub fn record(&mut self, label: &str, chunk_id: ChunkId, verdict: Verdict) -> bool {
		if !self.seen.insert(chunk_id) {
			return false;
		}

		self.entries.push(TestRecord { label: label.to_string(), chunk_id, verdict });

		true
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[TestRecord] {
		&self.entries
	}

	pub fn contains(&self, chunk_id: ChunkId) -> bool {
		self.seen.contains(&chunk_id)
	}

	pub fn seen(&self) -> &HashSet<ChunkId> {
		&self.seen
	}

	/// Relevant chunk ids in the order they were tested.
	pub fn relevant(&self) -> Vec<ChunkId> {
		self.entries
			.iter()
			.filter(|entry| entry.verdict.is_relevant())
			.map(|entry| entry.chunk_id)
			.collect()
	}

	/// Untested chunks within `radius` corpus steps of a relevant chunk.
	///
	/// Walks backward then forward from each relevant chunk, passing through tested chunks, and
	/// returns ids in discovery order without duplicates.
	pub fn adjacent(&self, corpus: &Corpus, radius: usize) -> Vec<ChunkId> {
		let steps: [fn(&Corpus, ChunkId) -> Option<ChunkId>; 2] = [Corpus::previous, Corpus::next];
		let mut found = Vec::new();
		let mut queued = HashSet::new();

		for relevant in self.relevant() {
			for step in steps {
				let mut cursor = relevant;

				for _ in 0..radius {
					let Some(neighbour) = step(corpus, cursor) else {
						break;
					};

					if !self.seen.contains(&neighbour) && queued.insert(neighbour) {
						found.push(neighbour);
					}

					cursor = neighbour;
				}
			}
		}

		found
	}

	pub fn progress(&self, budget: usize) -> TestProgress {
		let mut labels: Vec<LabelProgress> = Vec::new();

		for entry in &self.entries {
			let position = match labels.iter().position(|label| label.label == entry.label) {
				Some(position) => position,
				None => {
					labels.push(LabelProgress { label: entry.label.clone(), ..Default::default() });

					labels.len() - 1
				},
			};
			let label = &mut labels[position];

			label.tested += 1;

			if entry.verdict.is_relevant() {
				label.relevant += 1;
			}
		}

		TestProgress {
			tested: self.entries.len(),
			relevant: labels.iter().map(|label| label.relevant).sum(),
			budget,
			labels,
		}
	}
}
