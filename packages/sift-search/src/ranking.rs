use std::collections::{HashMap, HashSet};

use crate::{
	Error, Result,
	corpus::{ChunkId, Corpus},
};

/// Chunk ids ordered by cosine distance to the question, nearest first.
#[derive(Debug, Default)]
pub struct SemanticRanking {
	order: Vec<ChunkId>,
	ranks: HashMap<ChunkId, usize>,
}
impl SemanticRanking {
	/// Ranks every chunk not in `exclude`, breaking distance ties by chunk id.
	///
	/// Chunks without an embedding take no part in the ranking. An embedding whose dimension
	/// differs from the question's is an error.
	pub fn rank(question: &[f32], corpus: &Corpus, exclude: &HashSet<ChunkId>) -> Result<Self> {
		let mut scored: Vec<(ChunkId, f64)> = Vec::with_capacity(corpus.len());
		let mut skipped = 0_usize;

		for chunk in corpus.chunks() {
			if exclude.contains(&chunk.id) {
				continue;
			}
			if chunk.embedding.is_empty() {
				skipped += 1;

				continue;
			}
			if chunk.embedding.len() != question.len() {
				return Err(Error::EmbeddingDimension {
					chunk_id: chunk.id,
					expected: question.len(),
					found: chunk.embedding.len(),
				});
			}

			scored.push((chunk.id, cosine_distance(question, &chunk.embedding)));
		}

		if skipped > 0 {
			tracing::warn!(skipped, "Chunks without an embedding were not ranked.");
		}

		scored.sort_by(|left, right| left.1.total_cmp(&right.1).then_with(|| left.0.cmp(&right.0)));

		Ok(Self::from_order(scored.into_iter().map(|(id, _)| id).collect()))
	}

	pub fn from_order(order: Vec<ChunkId>) -> Self {
		let ranks = order.iter().enumerate().map(|(rank, id)| (*id, rank)).collect();

		Self { order, ranks }
	}

	pub fn order(&self) -> &[ChunkId] {
		&self.order
	}

	pub fn rank_of(&self, id: ChunkId) -> Option<usize> {
		self.ranks.get(&id).copied()
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

pub fn cosine_distance(left: &[f32], right: &[f32]) -> f64 {
	let mut dot = 0.0_f64;
	let mut left_norm = 0.0_f64;
	let mut right_norm = 0.0_f64;

	for (a, b) in left.iter().zip(right) {
		let (a, b) = (f64::from(*a), f64::from(*b));

		dot += a * b;
		left_norm += a * a;
		right_norm += b * b;
	}

	if left_norm == 0.0 || right_norm == 0.0 {
		return 1.0;
	}

	1.0 - dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;
	use crate::corpus::Chunk;

	fn chunk(id: u64, embedding: Vec<f32>) -> Chunk {
		Chunk {
			id: ChunkId(id),
			text: format!("chunk {id}"),
			concepts: BTreeSet::new(),
			embedding,
			document: None,
		}
	}

	#[test]
	fn distance_is_zero_for_parallel_vectors() {
		assert!(cosine_distance(&[1.0, 2.0], &[2.0, 4.0]).abs() < 1e-9);
		assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
		assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
	}

	#[test]
	fn orders_nearest_first_with_id_tie_break() {
		let corpus = Corpus::new([
			chunk(1, vec![0.0, 1.0]),
			chunk(2, vec![1.0, 0.0]),
			chunk(3, vec![1.0, 1.0]),
			chunk(4, vec![2.0, 0.0]),
		]);
		let ranking = SemanticRanking::rank(&[1.0, 0.0], &corpus, &HashSet::new())
			.expect("Ranking failed.");

		assert_eq!(ranking.order(), &[ChunkId(2), ChunkId(4), ChunkId(3), ChunkId(1)]);
		assert_eq!(ranking.rank_of(ChunkId(3)), Some(2));
		assert_eq!(ranking.rank_of(ChunkId(9)), None);
	}

	#[test]
	fn excludes_seen_and_unembedded_chunks() {
		let corpus = Corpus::new([
			chunk(1, vec![1.0, 0.0]),
			chunk(2, vec![1.0, 0.0]),
			chunk(3, Vec::new()),
		]);
		let exclude = HashSet::from([ChunkId(1)]);
		let ranking =
			SemanticRanking::rank(&[1.0, 0.0], &corpus, &exclude).expect("Ranking failed.");

		assert_eq!(ranking.order(), &[ChunkId(2)]);
	}

	#[test]
	fn mismatched_dimension_names_the_chunk() {
		let corpus = Corpus::new([chunk(1, vec![1.0, 0.0]), chunk(2, vec![1.0, 0.0, 0.0])]);
		let err = SemanticRanking::rank(&[1.0, 0.0], &corpus, &HashSet::new())
			.expect_err("Expected a dimension error.");

		assert!(matches!(
			err,
			Error::EmbeddingDimension { chunk_id: ChunkId(2), expected: 2, found: 3 }
		));
	}

	#[test]
	fn excluded_chunks_are_not_checked_for_dimension() {
		let corpus = Corpus::new([chunk(1, vec![1.0, 0.0, 0.0]), chunk(2, vec![0.0, 1.0])]);
		let exclude = HashSet::from([ChunkId(1)]);
		let ranking =
			SemanticRanking::rank(&[1.0, 0.0], &corpus, &exclude).expect("Ranking failed.");

		assert_eq!(ranking.order(), &[ChunkId(2)]);
	}
}
