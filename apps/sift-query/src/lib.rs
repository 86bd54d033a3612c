use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use sift_providers::{bias, cache::EmbeddingCache};
use sift_search::{
	Chunk, ChunkId, Corpus, DetectRequest, DetectResponse, HierarchicalCommunity, LevelReport,
	SearchObserver, SiftService, TestProgress,
};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON file with `chunks` and `communities`.
	#[arg(long, value_name = "FILE")]
	pub corpus: PathBuf,
	#[arg(long, short = 'q', value_name = "TEXT")]
	pub question: String,
	/// Writes the result here instead of stdout.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
	/// Includes the text of every relevant chunk in the result.
	#[arg(long)]
	pub with_text: bool,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
	chunks: Vec<Chunk>,
	#[serde(default)]
	communities: Vec<HierarchicalCommunity>,
}

#[derive(Debug, Serialize)]
struct QueryOutput {
	question: String,
	relevant: Vec<ChunkId>,
	progress: TestProgress,
	levels: Vec<LevelReport>,
	#[serde(skip_serializing_if = "Option::is_none")]
	chunks: Option<Vec<RelevantChunk>>,
}

#[derive(Debug, Serialize)]
struct RelevantChunk {
	id: ChunkId,
	text: String,
}

struct LoggingObserver;
impl SearchObserver for LoggingObserver {
	fn on_progress(&self, progress: &TestProgress) {
		tracing::info!(
			tested = progress.tested,
			relevant = progress.relevant,
			budget = progress.budget,
			"Search progress."
		);
	}

	fn on_relevant_chunks(&self, texts: &[&str]) {
		tracing::debug!(relevant = texts.len(), "Relevant chunks updated.");
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = sift_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let corpus_file = load_corpus(&args.corpus)?;
	let cache_path = cfg.providers.embedding.cache_path.clone();
	let cache = match &cache_path {
		Some(path) => EmbeddingCache::load(path)?,
		None => EmbeddingCache::new(),
	};
	let logit_bias = bias::resolve_logit_bias(&cfg.providers.classifier)?;
	let service = SiftService::new(cfg, logit_bias);
	let result = search(&service, &cache, corpus_file, &args.question).await;

	// Embeddings fetched before a failure are still worth keeping.
	if let Some(path) = &cache_path {
		cache.save(path)?;

		tracing::info!(path = %path.display(), entries = cache.len(), "Saved embedding cache.");
	}

	let (corpus, response) = result?;
	let output = build_output(&args.question, &corpus, response, args.with_text);
	let json = serde_json::to_string_pretty(&output)?;

	match &args.output {
		Some(path) => fs::write(path, json)?,
		None => println!("{json}"),
	}

	Ok(())
}

async fn search(
	service: &SiftService,
	cache: &EmbeddingCache,
	corpus_file: CorpusFile,
	question: &str,
) -> color_eyre::Result<(Corpus, DetectResponse)> {
	let chunks = embed_missing(service, cache, corpus_file.chunks).await?;
	let corpus = Corpus::new(chunks);
	let req = DetectRequest { question, corpus: &corpus, communities: &corpus_file.communities };
	let response = service.detect_relevant_chunks(req, cache, &LoggingObserver).await?;

	Ok((corpus, response))
}

fn load_corpus(path: &Path) -> color_eyre::Result<CorpusFile> {
	let raw = fs::read_to_string(path)?;
	let corpus: CorpusFile = serde_json::from_str(&raw)?;

	if corpus.chunks.is_empty() {
		tracing::warn!(path = %path.display(), "Corpus file holds no chunks.");
	}

	Ok(corpus)
}

async fn embed_missing(
	service: &SiftService,
	cache: &EmbeddingCache,
	mut chunks: Vec<Chunk>,
) -> color_eyre::Result<Vec<Chunk>> {
	let missing: Vec<usize> = chunks
		.iter()
		.enumerate()
		.filter(|(_, chunk)| chunk.embedding.is_empty())
		.map(|(position, _)| position)
		.collect();

	if missing.is_empty() {
		return Ok(chunks);
	}

	tracing::info!(missing = missing.len(), "Embedding chunks without vectors.");

	let texts: Vec<String> =
		missing.iter().map(|position| chunks[*position].text.clone()).collect();
	let vectors = service.embed_cached(cache, &texts).await?;

	if vectors.len() != missing.len() {
		return Err(eyre::eyre!(
			"Expected {} chunk embeddings, received {}.",
			missing.len(),
			vectors.len()
		));
	}

	for (position, vector) in missing.into_iter().zip(vectors) {
		chunks[position].embedding = vector;
	}

	Ok(chunks)
}

fn build_output(
	question: &str,
	corpus: &Corpus,
	response: DetectResponse,
	with_text: bool,
) -> QueryOutput {
	let chunks = with_text.then(|| {
		response
			.relevant
			.iter()
			.filter_map(|id| {
				corpus.text(*id).map(|text| RelevantChunk { id: *id, text: text.to_string() })
			})
			.collect()
	});

	QueryOutput {
		question: question.to_string(),
		relevant: response.relevant,
		progress: response.progress,
		levels: response.levels,
		chunks,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const CORPUS: &str = r#"{
		"chunks": [
			{ "id": 1, "text": "Kick-off was delayed.", "concepts": ["match"] },
			{ "id": 2, "text": "The home team won 3-1.", "concepts": ["match", "score"], "embedding": [1.0, 0.0] }
		],
		"communities": [
			{ "concept": "match", "level": 0, "community": "sport" },
			{ "concept": "score", "level": 1, "community": "results", "parent": "sport" }
		]
	}"#;

	#[test]
	fn parses_corpus_files() {
		let corpus: CorpusFile = serde_json::from_str(CORPUS).expect("Failed to parse corpus.");

		assert_eq!(corpus.chunks.len(), 2);
		assert!(corpus.chunks[0].embedding.is_empty());
		assert_eq!(corpus.chunks[1].embedding, vec![1.0, 0.0]);
		assert_eq!(corpus.communities[1].parent.as_deref(), Some("sport"));
		assert!(corpus.chunks[0].document.is_none());
	}

	#[test]
	fn output_carries_texts_only_when_asked() {
		let file: CorpusFile = serde_json::from_str(CORPUS).expect("Failed to parse corpus.");
		let corpus = Corpus::new(file.chunks);
		let response = || DetectResponse { relevant: vec![ChunkId(2)], ..Default::default() };
		let with_text = build_output("Who won?", &corpus, response(), true);
		let without_text = build_output("Who won?", &corpus, response(), false);
		let chunks = with_text.chunks.expect("Missing chunk texts.");

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].text, "The home team won 3-1.");
		assert!(without_text.chunks.is_none());

		let json = serde_json::to_value(&without_text).expect("Failed to serialize output.");

		assert!(json.get("chunks").is_none());
		assert_eq!(json["relevant"], serde_json::json!([2]));
	}

	#[test]
	fn parses_command_line() {
		let args = Args::try_parse_from([
			"sift-query",
			"--config",
			"sift.toml",
			"--corpus",
			"corpus.json",
			"-q",
			"Who won?",
			"--with-text",
		])
		.expect("Failed to parse arguments.");

		assert_eq!(args.config, PathBuf::from("sift.toml"));
		assert_eq!(args.question, "Who won?");
		assert!(args.with_text);
		assert!(args.output.is_none());
	}
}
