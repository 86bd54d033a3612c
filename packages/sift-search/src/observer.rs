use crate::ledger::TestProgress;

/// Receives search progress after every classification batch.
pub trait SearchObserver
where
	Self: Send + Sync,
{
	fn on_progress(&self, _progress: &TestProgress) {}

	/// Texts of every chunk found relevant so far, in test order.
	fn on_relevant_chunks(&self, _texts: &[&str]) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl SearchObserver for NoopObserver {}
