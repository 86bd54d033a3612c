use std::{
	collections::{BTreeMap, HashMap},
	fs,
	path::Path,
	sync::Mutex,
};

use crate::{Error, Result};

/// Text-keyed embedding cache shared by reference across one process.
///
/// Keys are blake3 digests of the embedding model and the text, so the same text embedded by two
/// models never collides.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
	entries: Mutex<HashMap<String, Vec<f32>>>,
}
impl EmbeddingCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Loads a cache file written by [`EmbeddingCache::save`].
	///
	/// A missing file yields an empty cache.
	pub fn load(path: &Path) -> Result<Self> {
		if !path.exists() {
			return Ok(Self::new());
		}

		let raw = fs::read_to_string(path)
			.map_err(|err| Error::CacheIo { path: path.to_path_buf(), source: err })?;
		let entries: HashMap<String, Vec<f32>> = serde_json::from_str(&raw)?;

		Ok(Self { entries: Mutex::new(entries) })
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		let sorted: BTreeMap<String, Vec<f32>> = self
			.entries
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.map(|(key, vector)| (key.clone(), vector.clone()))
			.collect();
		let raw = serde_json::to_string(&sorted)?;

		fs::write(path, raw).map_err(|err| Error::CacheIo { path: path.to_path_buf(), source: err })
	}

	pub fn key(model: &str, text: &str) -> String {
		let mut hasher = blake3::Hasher::new();

		hasher.update(model.as_bytes());
		hasher.update(&[0]);
		hasher.update(text.as_bytes());

		hasher.finalize().to_hex().to_string()
	}

	pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
		let key = Self::key(model, text);

		self.entries.lock().unwrap_or_else(|err| err.into_inner()).get(&key).cloned()
	}

	pub fn insert(&self, model: &str, text: &str, vector: Vec<f32>) {
		let key = Self::key(model, text);

		self.entries.lock().unwrap_or_else(|err| err.into_inner()).insert(key, vector);
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
