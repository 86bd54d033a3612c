use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use sift_config::Search;

use crate::{
	Result,
	community::{CommunityIndex, CommunityKey, ROOT_LEVEL},
	corpus::ChunkId,
	ledger::TestLedger,
	tester::RelevanceTester,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalState {
	AtLevel(i32),
	Done,
}

/// What happened at one visited level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
	pub level: i32,
	pub communities_tested: usize,
	pub communities_relevant: usize,
	pub communities_eliminated: usize,
	/// Set when a run of irrelevant communities cut the level short.
	pub restarted: bool,
}

/// Walks the community hierarchy from the root level down, spending relevance tests on the
/// best-ranked unseen members of each community.
///
/// A community whose sample holds no relevant chunk is eliminated, and so is every descendant of
/// an eliminated community. The walk ends when a level below the root finds nothing relevant,
/// when the deepest level has been visited, or when the budget is spent.
pub struct LevelTraversal<'a> {
	tester: &'a RelevanceTester<'a>,
	index: &'a CommunityIndex,
	community_tests: usize,
	adjacent_steps: usize,
	restart_after: usize,
	eliminated: HashSet<CommunityKey>,
	successive_irrelevant: usize,
	reports: Vec<LevelReport>,
}
impl<'a> LevelTraversal<'a> {
	pub fn new(
		tester: &'a RelevanceTester<'a>,
		index: &'a CommunityIndex,
		search: &Search,
	) -> Self {
		Self {
			tester,
			index,
			community_tests: search.community_relevance_tests as usize,
			adjacent_steps: search.adjacent_search_steps as usize,
			restart_after: search.irrelevant_community_restart as usize,
			eliminated: HashSet::new(),
			successive_irrelevant: 0,
			reports: Vec::new(),
		}
	}

	pub async fn run(&mut self, ledger: &mut TestLedger) -> Result<()> {
		let mut state = TraversalState::AtLevel(ROOT_LEVEL);

		while let TraversalState::AtLevel(level) = state {
			state = self.step(ledger, level).await?;
		}

		tracing::info!(
			levels = self.reports.len(),
			tested = ledger.len(),
			eliminated = self.eliminated.len(),
			"Community traversal finished."
		);

		Ok(())
	}

	/// Visits one level and returns the next state.
	pub async fn step(&mut self, ledger: &mut TestLedger, level: i32) -> Result<TraversalState> {
		if !self.budget_remains(ledger) {
			return Ok(TraversalState::Done);
		}
		if level == ROOT_LEVEL {
			self.successive_irrelevant = 0;
		}

		let index = self.index;

		tracing::info!(
			level,
			tests = ledger.len(),
			communities = index.sequence(level).len(),
			"Entering community level."
		);

		let mut report = LevelReport { level, ..Default::default() };

		for label in index.sequence(level) {
			if !self.budget_remains(ledger) {
				break;
			}

			let key = CommunityKey::new(level, label.clone());

			if let Some(parent) = self.eliminated_parent(level, label) {
				tracing::debug!(
					level,
					community = %label,
					parent = %parent.label,
					"Community skipped under an eliminated parent."
				);

				self.eliminated.insert(key);

				report.communities_eliminated += 1;

				continue;
			}

			let candidates: Vec<ChunkId> = index
				.members(level, label)
				.iter()
				.copied()
				.filter(|id| !ledger.contains(*id))
				.take(self.community_tests)
				.collect();

			if candidates.is_empty() {
				continue;
			}

			let reserved = ledger.adjacent(self.tester.corpus, self.adjacent_steps).len();
			let relevant = self
				.tester
				.assess(ledger, &format!("topic {label}"), &candidates, reserved)
				.await?;

			report.communities_tested += 1;

			if relevant {
				report.communities_relevant += 1;
				self.successive_irrelevant = 0;

				continue;
			}
			if level == ROOT_LEVEL {
				continue;
			}

			tracing::debug!(level, community = %label, "Community eliminated.");

			self.eliminated.insert(key);

			report.communities_eliminated += 1;
			self.successive_irrelevant += 1;

			if self.successive_irrelevant >= self.restart_after {
				tracing::info!(
					level,
					successive_irrelevant = self.successive_irrelevant,
					"Too many irrelevant communities in a row; moving to the next level."
				);

				self.successive_irrelevant = 0;
				report.restarted = true;

				break;
			}
		}

		tracing::info!(
			level,
			tested = report.communities_tested,
			relevant = report.communities_relevant,
			eliminated = report.communities_eliminated,
			"Community level visited."
		);

		let found_relevant = report.communities_relevant > 0;

		self.reports.push(report);

		if level > ROOT_LEVEL && !found_relevant {
			return Ok(TraversalState::Done);
		}
		if index.has_level(level + 1) {
			Ok(TraversalState::AtLevel(level + 1))
		} else {
			Ok(TraversalState::Done)
		}
	}

	pub fn reports(&self) -> &[LevelReport] {
		&self.reports
	}

	pub fn into_reports(self) -> Vec<LevelReport> {
		self.reports
	}

	pub fn is_eliminated(&self, level: i32, label: &str) -> bool {
		self.eliminated.contains(&CommunityKey::new(level, label))
	}

	fn eliminated_parent(&self, level: i32, label: &str) -> Option<CommunityKey> {
		self.index.parent(level, label).filter(|parent| self.eliminated.contains(parent))
	}

	// The neighbour pass needs room for every chunk adjacent to a relevant one.
	fn budget_remains(&self, ledger: &TestLedger) -> bool {
		let reserved = ledger.adjacent(self.tester.corpus, self.adjacent_steps).len();

		ledger.len() + reserved < self.tester.budget
	}
}
