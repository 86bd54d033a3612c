use crate::corpus::ChunkId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid configuration: {message}")]
	InvalidConfig { message: String },
	#[error("Embedding error: {message}")]
	Embedding { message: String },
	#[error("Chunk {chunk_id} embedding has {found} dimensions; the question has {expected}.")]
	EmbeddingDimension { chunk_id: ChunkId, expected: usize, found: usize },
	#[error("Classification failed for chunk {chunk_id} in {label} batch {batch}: {message}")]
	Classification { label: String, batch: usize, chunk_id: ChunkId, message: String },
	#[error("Unparseable verdict {response:?} for chunk {chunk_id} in {label} batch {batch}.")]
	UnparseableVerdict { label: String, batch: usize, chunk_id: ChunkId, response: String },
	#[error("Chunk {chunk_id} is not part of the corpus.")]
	UnknownChunk { chunk_id: ChunkId },
}
impl From<sift_config::Error> for Error {
	fn from(err: sift_config::Error) -> Self {
		Self::InvalidConfig { message: err.to_string() }
	}
}
