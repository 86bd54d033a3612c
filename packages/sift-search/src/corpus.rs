use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	fmt,
};

use serde::{Deserialize, Serialize};

/// Chunk identity. Ordering follows corpus position.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub u64);
impl fmt::Display for ChunkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
	pub id: ChunkId,
	pub text: String,
	#[serde(default)]
	pub concepts: BTreeSet<String>,
	#[serde(default)]
	pub embedding: Vec<f32>,
	/// Source document. Adjacency never crosses a document boundary.
	#[serde(default)]
	pub document: Option<String>,
}

/// One row of the hierarchical clustering: a concept's community at a level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HierarchicalCommunity {
	pub concept: String,
	pub level: u32,
	pub community: String,
	#[serde(default)]
	pub parent: Option<String>,
}

/// Immutable chunk store with linear adjacency links.
#[derive(Debug, Default)]
pub struct Corpus {
	chunks: BTreeMap<ChunkId, Chunk>,
	previous: HashMap<ChunkId, ChunkId>,
	next: HashMap<ChunkId, ChunkId>,
}
impl Corpus {
	/// Builds the corpus, linking consecutive chunks of the same document in id order.
	///
	/// A later chunk with a duplicate id replaces the earlier one.
	pub fn new(chunks: impl IntoIterator<Item = Chunk>) -> Self {
		let chunks: BTreeMap<ChunkId, Chunk> =
			chunks.into_iter().map(|chunk| (chunk.id, chunk)).collect();
		let mut previous = HashMap::new();
		let mut next = HashMap::new();

		{
			let mut last_by_document: HashMap<Option<&str>, ChunkId> = HashMap::new();

			for chunk in chunks.values() {
				if let Some(prev) = last_by_document.insert(chunk.document.as_deref(), chunk.id) {
					previous.insert(chunk.id, prev);
					next.insert(prev, chunk.id);
				}
			}
		}

		Self { chunks, previous, next }
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
		self.chunks.get(&id)
	}

	pub fn text(&self, id: ChunkId) -> Option<&str> {
		self.chunks.get(&id).map(|chunk| chunk.text.as_str())
	}

	pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
		self.chunks.values()
	}

	pub fn previous(&self, id: ChunkId) -> Option<ChunkId> {
		self.previous.get(&id).copied()
	}

	pub fn next(&self, id: ChunkId) -> Option<ChunkId> {
		self.next.get(&id).copied()
	}
}
