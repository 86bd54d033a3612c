use crate::{Result, ledger::TestLedger, tester::RelevanceTester};

pub const NEIGHBOURS_LABEL: &str = "neighbours";

/// Tests every untested chunk within `steps` corpus positions of a relevant chunk.
///
/// Runs once after the traversal; the budget reservation kept during the traversal makes room for
/// the whole neighbourhood.
pub async fn expand_neighbours(
	tester: &RelevanceTester<'_>,
	ledger: &mut TestLedger,
	steps: usize,
) -> Result<bool> {
	let neighbours = ledger.adjacent(tester.corpus, steps);

	if neighbours.is_empty() {
		tracing::debug!(steps, "No untested neighbours of relevant chunks.");

		return Ok(false);
	}

	tracing::info!(candidates = neighbours.len(), steps, "Testing neighbours of relevant chunks.");

	tester.assess(ledger, NEIGHBOURS_LABEL, &neighbours, 0).await
}
