use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use pdr_core::config::{expand_path, Config, Settings};
use pdr_core::processor::DataProcessor;
use pdr_core::{EmbedProvider, SearchScope};
use pdr_embed::{embedder_from_settings, SidecarEntityExtractor, SidecarReranker};
use pdr_hybrid::{rerank_results, EnsembleRetriever};
use pdr_vector::{LanceChunkStore, LanceChunkWriter, LanceVectorStore};
use pdr_websearch::{HttpSearchProvider, PlannedQuery, RetryPolicy, SearchExecutor};

const USAGE: &str = "Usage:
  pdr ingest <dir> <company_id>
  pdr query document <document_id> <query> [--top-k N]
  pdr query company <company_id> <query> [--top-k N]
  pdr query docs <id1,id2,..> <query> [--top-k N]
  pdr websearch <plan.json>
  pdr entities <file.txt>
  pdr health";

fn usage() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { usage(); }
    let cmd = args.remove(0);
    match cmd.as_str() {
        "ingest" => ingest(&settings, &args).await,
        "query" => query(&settings, &args).await,
        "websearch" => websearch(&settings, &args).await,
        "entities" => entities(&settings, &args).await,
        "health" => health(&settings).await,
        "-h" | "--help" | "help" => { println!("{USAGE}"); Ok(()) }
        _ => { eprintln!("Unknown command: {}", cmd); usage() }
    }
}

async fn ingest(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let (Some(dir), Some(company_id)) = (args.first(), args.get(1)) else { usage() };
    let data_dir = PathBuf::from(dir);
    let chunks = DataProcessor::new().process_directory(&data_dir, company_id)?;
    if chunks.is_empty() {
        println!("No chunks produced from {}", data_dir.display());
        return Ok(());
    }

    let dim = settings.data.embedding_dim;
    let embedder = embedder_from_settings(&settings.embedding, dim)?;
    embedder.health().await.context("embedding provider is not ready")?;
    tracing::info!(embedder = embedder.embedder_id(), chunks = chunks.len(), "embedding chunks");
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let uri = lancedb_uri(settings)?;
    let writer = LanceChunkWriter::new(&uri, &settings.data.chunk_table, dim).await?;
    let written = writer.write(&chunks, &embeddings).await?;
    println!("Ingest complete: {} chunks for company {} into {}", written, company_id, uri);
    Ok(())
}

async fn query(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let mut positional = Vec::new();
    let mut top_k = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => {
                let value = args.get(i + 1).context("--top-k requires a number")?;
                top_k = Some(value.parse::<usize>().context("--top-k requires a number")?);
                i += 1;
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }
    let [kind, target, query_text] = positional.as_slice() else { usage() };
    let scope = match kind.as_str() {
        "document" => SearchScope::Document(target.clone()),
        "company" => SearchScope::Company(target.clone()),
        "docs" => SearchScope::MultiDocument(
            target.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
        ),
        other => bail!("unknown query scope '{other}' (expected document, company or docs)"),
    };

    let uri = lancedb_uri(settings)?;
    let table = &settings.data.chunk_table;
    let store = LanceChunkStore::new(&uri, table).await?;
    let vectors = LanceVectorStore::new(&uri, table).await?;
    let embedder = embedder_from_settings(&settings.embedding, settings.data.embedding_dim)?;
    let retriever = EnsembleRetriever::new(store, vectors, embedder, settings.retrieval.clone())?;

    let deadline = Duration::from_secs(settings.retrieval.timeout_secs);
    let outcome = retriever.search_within(deadline, query_text, scope, top_k, None).await;
    if let pdr_hybrid::FusionOutcome::Degraded { reason, .. } = &outcome {
        tracing::warn!(%reason, "returning lexical-only results");
    }
    let mut results = outcome.into_results();
    if settings.rerank.enabled {
        let reranker = SidecarReranker::new(&settings.rerank.sidecar_url, Duration::from_secs(settings.rerank.timeout_secs))?;
        results = rerank_results(&reranker, query_text, results).await;
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn websearch(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let Some(plan_path) = args.first() else { usage() };
    let raw = fs::read_to_string(plan_path).with_context(|| format!("reading {plan_path}"))?;
    let plan: Vec<PlannedQuery> = serde_json::from_str(&raw).with_context(|| format!("parsing {plan_path}"))?;

    let ws = &settings.web_search;
    let executor = SearchExecutor::new(HttpSearchProvider::from_settings(ws)?, RetryPolicy::from_settings(ws));
    let deadline = Duration::from_secs(ws.batch_timeout_secs);
    let batch = tokio::time::timeout(deadline, executor.execute_search_detailed(&plan))
        .await
        .with_context(|| format!("web search batch exceeded {}s", ws.batch_timeout_secs))?;
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}

async fn entities(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else { usage() };
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let chunks: Vec<String> =
        text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).map(String::from).collect();
    let extractor =
        SidecarEntityExtractor::new(&settings.embedding.sidecar_url, Duration::from_secs(settings.embedding.timeout_secs))?;
    let results = extractor.extract(&chunks).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn health(settings: &Settings) -> anyhow::Result<()> {
    let embedder = embedder_from_settings(&settings.embedding, settings.data.embedding_dim)?;
    embedder.health().await.with_context(|| format!("{} is not ready", embedder.embedder_id()))?;
    println!("ok: {}", embedder.embedder_id());
    Ok(())
}

fn lancedb_uri(settings: &Settings) -> anyhow::Result<String> {
    let path = expand_path(&settings.data.lancedb_dir);
    fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
    Ok(path.to_string_lossy().into_owned())
}
