use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
	corpus::{ChunkId, Corpus, HierarchicalCommunity},
	ranking::SemanticRanking,
};

/// Synthetic level holding one community with every ranked chunk.
pub const ROOT_LEVEL: i32 = -1;
pub const ROOT_COMMUNITY: &str = "root";

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommunityKey {
	pub level: i32,
	pub label: String,
}
impl CommunityKey {
	pub fn new(level: i32, label: impl Into<String>) -> Self {
		Self { level, label: label.into() }
	}
}

#[derive(Debug, Default)]
struct LevelCommunities {
	sequence: Vec<String>,
	members: HashMap<String, Vec<ChunkId>>,
}

/// Per-level community order and membership for one question.
///
/// Levels run from [`ROOT_LEVEL`] to the deepest clustering level. At every level a chunk belongs
/// to at most one community, and member lists follow semantic rank.
#[derive(Debug)]
pub struct CommunityIndex {
	// Slot 0 is the root level.
	levels: Vec<LevelCommunities>,
	parents: HashMap<CommunityKey, String>,
}
impl CommunityIndex {
	pub fn build(
		records: &[HierarchicalCommunity],
		corpus: &Corpus,
		ranking: &SemanticRanking,
		ranking_chunks: usize,
	) -> Self {
		let root = LevelCommunities {
			sequence: vec![ROOT_COMMUNITY.to_string()],
			members: HashMap::from([(ROOT_COMMUNITY.to_string(), ranking.order().to_vec())]),
		};
		let mut index = Self { levels: vec![root], parents: HashMap::new() };
		let Some(max_level) = records.iter().map(|record| record.level).max() else {
			return index;
		};
		let effective = forward_fill(records, max_level);
		let explicit_parents = explicit_parents(records);

		for level in 0..=max_level {
			let communities = build_level(corpus, ranking, &effective, level, ranking_chunks);
			let level = level as i32;

			for label in &communities.sequence {
				let parent = explicit_parents
					.get(&(level, label.as_str()))
					.map(|parent| parent.to_string())
					.or_else(|| {
						index
							.level(level - 1)
							.filter(|previous| level > 0 && previous.sequence.contains(label))
							.map(|_| label.clone())
					});

				if let Some(parent) = parent {
					index.parents.insert(CommunityKey::new(level, label.clone()), parent);
				}
			}

			tracing::debug!(
				level,
				communities = communities.sequence.len(),
				"Built community sequence."
			);

			index.levels.push(communities);
		}

		index
	}

	/// Deepest level, or [`ROOT_LEVEL`] when the clustering is empty.
	pub fn max_level(&self) -> i32 {
		self.levels.len() as i32 - 2
	}

	pub fn has_level(&self, level: i32) -> bool {
		self.level(level).is_some()
	}

	pub fn sequence(&self, level: i32) -> &[String] {
		self.level(level).map(|communities| communities.sequence.as_slice()).unwrap_or(&[])
	}

	pub fn members(&self, level: i32, label: &str) -> &[ChunkId] {
		self.level(level)
			.and_then(|communities| communities.members.get(label))
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	pub fn parent(&self, level: i32, label: &str) -> Option<CommunityKey> {
		self.parents
			.get(&CommunityKey::new(level, label))
			.map(|parent| CommunityKey::new(level - 1, parent.clone()))
	}

	fn level(&self, level: i32) -> Option<&LevelCommunities> {
		usize::try_from(level - ROOT_LEVEL).ok().and_then(|slot| self.levels.get(slot))
	}
}

fn build_level(
	corpus: &Corpus,
	ranking: &SemanticRanking,
	effective: &HashMap<&str, Vec<Option<&str>>>,
	level: u32,
	ranking_chunks: usize,
) -> LevelCommunities {
	let mut candidate_ranks: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
	let mut chunk_communities: Vec<(ChunkId, BTreeSet<&str>)> = Vec::new();

	// Ranking order keeps every rank list sorted.
	for (rank, id) in ranking.order().iter().enumerate() {
		let Some(chunk) = corpus.get(*id) else {
			continue;
		};
		let communities: BTreeSet<&str> = chunk
			.concepts
			.iter()
			.filter_map(|concept| effective.get(concept.as_str()))
			.filter_map(|by_level| by_level[level as usize])
			.collect();

		if communities.is_empty() {
			continue;
		}

		for community in &communities {
			candidate_ranks.entry(*community).or_default().push(rank);
		}

		chunk_communities.push((*id, communities));
	}

	let mut scored: Vec<(&str, f64)> = candidate_ranks
		.iter()
		.map(|(community, ranks)| (*community, mean_rank(ranks, ranking_chunks)))
		.collect();

	scored.sort_by(|left, right| left.1.total_cmp(&right.1).then_with(|| left.0.cmp(right.0)));

	let position: HashMap<&str, usize> = scored
		.iter()
		.enumerate()
		.map(|(position, (community, _))| (*community, position))
		.collect();
	let mut members: HashMap<String, Vec<ChunkId>> = HashMap::new();

	for (id, communities) in chunk_communities {
		let assigned = communities
			.into_iter()
			.min_by_key(|community| (position[community], *community));

		if let Some(assigned) = assigned {
			members.entry(assigned.to_string()).or_default().push(id);
		}
	}

	LevelCommunities {
		sequence: scored.into_iter().map(|(community, _)| community.to_string()).collect(),
		members,
	}
}

fn mean_rank(ranks: &[usize], ranking_chunks: usize) -> f64 {
	let top = &ranks[..ranks.len().min(ranking_chunks.max(1))];

	top.iter().sum::<usize>() as f64 / top.len() as f64
}

/// Effective community per concept per level; a missing level inherits the previous one.
fn forward_fill(
	records: &[HierarchicalCommunity],
	max_level: u32,
) -> HashMap<&str, Vec<Option<&str>>> {
	let mut explicit: HashMap<&str, BTreeMap<u32, &str>> = HashMap::new();

	for record in records {
		explicit
			.entry(record.concept.as_str())
			.or_default()
			.insert(record.level, record.community.as_str());
	}

	explicit
		.into_iter()
		.map(|(concept, by_level)| {
			let mut filled = Vec::with_capacity(max_level as usize + 1);
			let mut current = None;

			for level in 0..=max_level {
				if let Some(community) = by_level.get(&level) {
					current = Some(*community);
				}

				filled.push(current);
			}

			(concept, filled)
		})
		.collect()
}

fn explicit_parents(records: &[HierarchicalCommunity]) -> HashMap<(i32, &str), &str> {
	records
		.iter()
		.filter_map(|record| {
			record
				.parent
				.as_deref()
				.map(|parent| ((record.level as i32, record.community.as_str()), parent))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Chunk;

	fn chunk(id: u64, concepts: &[&str]) -> Chunk {
		Chunk {
			id: ChunkId(id),
			text: format!("chunk {id}"),
			concepts: concepts.iter().map(|concept| concept.to_string()).collect(),
			embedding: Vec::new(),
			document: None,
		}
	}

	fn record(
		concept: &str,
		level: u32,
		community: &str,
		parent: Option<&str>,
	) -> HierarchicalCommunity {
		HierarchicalCommunity {
			concept: concept.to_string(),
			level,
			community: community.to_string(),
			parent: parent.map(ToString::to_string),
		}
	}

	fn ids(raw: &[u64]) -> Vec<ChunkId> {
		raw.iter().copied().map(ChunkId).collect()
	}

	#[test]
	fn root_level_holds_every_ranked_chunk() {
		let corpus = Corpus::new([chunk(1, &[]), chunk(2, &[]), chunk(3, &[])]);
		let ranking = SemanticRanking::from_order(ids(&[3, 1, 2]));
		let index = CommunityIndex::build(&[], &corpus, &ranking, 3);

		assert_eq!(index.max_level(), ROOT_LEVEL);
		assert_eq!(index.sequence(ROOT_LEVEL), &[ROOT_COMMUNITY.to_string()]);
		assert_eq!(index.members(ROOT_LEVEL, ROOT_COMMUNITY), ids(&[3, 1, 2]).as_slice());
		assert!(index.parent(ROOT_LEVEL, ROOT_COMMUNITY).is_none());
		assert!(!index.has_level(0));
	}

	#[test]
	fn orders_communities_by_mean_rank_of_top_chunks() {
		let corpus = Corpus::new([
			chunk(1, &["x"]),
			chunk(2, &["y"]),
			chunk(3, &["y"]),
			chunk(4, &["x"]),
		]);
		// A holds ranks 1 and 2, B holds ranks 0 and 3.
		let ranking = SemanticRanking::from_order(ids(&[2, 1, 4, 3]));
		let records = [record("x", 0, "A", None), record("y", 0, "B", None)];

		let top_one = CommunityIndex::build(&records, &corpus, &ranking, 1);

		assert_eq!(top_one.sequence(0), &["B".to_string(), "A".to_string()]);

		// Both means are 1.5, so the label decides.
		let top_two = CommunityIndex::build(&records, &corpus, &ranking, 2);

		assert_eq!(top_two.sequence(0), &["A".to_string(), "B".to_string()]);
		assert_eq!(top_two.members(0, "A"), ids(&[1, 4]).as_slice());
		assert_eq!(top_two.members(0, "B"), ids(&[2, 3]).as_slice());
	}

	#[test]
	fn chunk_is_assigned_to_earliest_community_only() {
		let corpus = Corpus::new([chunk(1, &["x", "y"]), chunk(2, &["y"]), chunk(3, &["x"])]);
		let ranking = SemanticRanking::from_order(ids(&[2, 1, 3]));
		let records = [record("x", 0, "A", None), record("y", 0, "B", None)];
		let index = CommunityIndex::build(&records, &corpus, &ranking, 5);

		// B: mean(0, 1) = 0.5 comes before A: mean(1, 2) = 1.5.
		assert_eq!(index.sequence(0), &["B".to_string(), "A".to_string()]);
		assert_eq!(index.members(0, "B"), ids(&[2, 1]).as_slice());
		assert_eq!(index.members(0, "A"), ids(&[3]).as_slice());
	}

	#[test]
	fn equal_mean_rank_breaks_ties_by_label() {
		let corpus = Corpus::new([chunk(1, &["x", "y"])]);
		let ranking = SemanticRanking::from_order(ids(&[1]));
		let records = [record("x", 0, "Q", None), record("y", 0, "P", None)];
		let index = CommunityIndex::build(&records, &corpus, &ranking, 5);

		assert_eq!(index.sequence(0), &["P".to_string(), "Q".to_string()]);
		assert_eq!(index.members(0, "P"), ids(&[1]).as_slice());
		assert!(index.members(0, "Q").is_empty());
	}

	#[test]
	fn concepts_forward_fill_missing_levels() {
		let corpus = Corpus::new([chunk(1, &["x"]), chunk(2, &["y"])]);
		let ranking = SemanticRanking::from_order(ids(&[1, 2]));
		let records = [
			record("x", 0, "A", None),
			record("y", 0, "B", None),
			record("y", 1, "B1", Some("B")),
			record("y", 2, "B2", Some("B1")),
		];
		let index = CommunityIndex::build(&records, &corpus, &ranking, 5);

		assert_eq!(index.max_level(), 2);
		assert_eq!(index.members(1, "A"), ids(&[1]).as_slice());
		assert_eq!(index.members(2, "A"), ids(&[1]).as_slice());
		assert_eq!(index.parent(2, "A"), Some(CommunityKey::new(1, "A")));
		assert_eq!(index.parent(2, "B2"), Some(CommunityKey::new(1, "B1")));
		assert_eq!(index.parent(1, "B1"), Some(CommunityKey::new(0, "B")));
		assert!(index.parent(0, "A").is_none());
	}

	#[test]
	fn unranked_chunks_are_left_out() {
		let corpus = Corpus::new([chunk(1, &["x"]), chunk(2, &["x"])]);
		let ranking = SemanticRanking::from_order(ids(&[2]));
		let records = [record("x", 0, "A", None)];
		let index = CommunityIndex::build(&records, &corpus, &ranking, 5);

		assert_eq!(index.members(0, "A"), ids(&[2]).as_slice());
		assert_eq!(index.members(ROOT_LEVEL, ROOT_COMMUNITY), ids(&[2]).as_slice());
	}
}
