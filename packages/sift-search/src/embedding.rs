use sift_providers::cache::EmbeddingCache;

use crate::{Error, Result, SiftService};

impl SiftService {
	/// Embeds `texts` in order, fetching only cache misses and in a single provider call.
	pub async fn embed_cached(
		&self,
		cache: &EmbeddingCache,
		texts: &[String],
	) -> Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let mut vectors: Vec<Option<Vec<f32>>> =
			texts.iter().map(|text| cache.get(&cfg.model, text)).collect();
		let misses: Vec<String> = texts
			.iter()
			.zip(&vectors)
			.filter(|(_, vector)| vector.is_none())
			.map(|(text, _)| text.clone())
			.collect();

		tracing::debug!(
			hits = texts.len() - misses.len(),
			misses = misses.len(),
			"Embedding cache lookup."
		);

		if !misses.is_empty() {
			let fetched = self
				.providers
				.embedding
				.embed(cfg, &misses)
				.await
				.map_err(|err| Error::Embedding { message: err.to_string() })?;

			if fetched.len() != misses.len() {
				return Err(Error::Embedding {
					message: format!(
						"Expected {} embeddings, received {}.",
						misses.len(),
						fetched.len()
					),
				});
			}

			let mut fetched = fetched.into_iter();

			for (text, slot) in texts.iter().zip(vectors.iter_mut()) {
				if slot.is_some() {
					continue;
				}

				if let Some(vector) = fetched.next() {
					cache.insert(&cfg.model, text, vector.clone());

					*slot = Some(vector);
				}
			}
		}

		Ok(vectors.into_iter().map(Option::unwrap_or_default).collect())
	}
}
