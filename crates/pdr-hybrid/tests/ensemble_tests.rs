use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pdr_core::config::RetrievalSettings;
use pdr_core::{
    Chunk, ChunkStore, EmbedProvider, Error, MemoryChunkStore, Reranker, Result, RetrievalMethod, ScopeKind, SearchResult,
    SearchScope, VectorHit, VectorStore,
};
use pdr_embed::HashEmbedder;
use pdr_hybrid::{
    rerank_results, CompanySearch, DocumentSearch, EnsembleRetriever, FusionOutcome, FusionWeights, MultiDocumentSearch,
};
use pdr_vector::MemoryVectorStore;

const DIM: usize = 128;

/// Counts every store call; delegates to an in-memory store.
#[derive(Clone, Default)]
struct CountingStore {
    inner: Arc<MemoryChunkStore>,
    calls: Arc<AtomicUsize>,
}

impl ChunkStore for CountingStore {
    async fn get_chunks_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_chunks_by_document(document_id).await
    }
    async fn get_chunks_by_company(&self, company_id: &str) -> Result<Vec<Chunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_chunks_by_company(company_id).await
    }
    async fn get_chunks_by_document_set(&self, document_ids: &[String]) -> Result<Vec<Chunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_chunks_by_document_set(document_ids).await
    }
}

struct BrokenStore;

impl ChunkStore for BrokenStore {
    async fn get_chunks_by_document(&self, _: &str) -> Result<Vec<Chunk>> { Err(Error::Store("connection refused".into())) }
    async fn get_chunks_by_company(&self, _: &str) -> Result<Vec<Chunk>> { Err(Error::Store("connection refused".into())) }
    async fn get_chunks_by_document_set(&self, _: &[String]) -> Result<Vec<Chunk>> {
        Err(Error::Store("connection refused".into()))
    }
}

struct BrokenVectorStore;

impl VectorStore for BrokenVectorStore {
    async fn nearest(&self, _: &SearchScope, _: &[f32], _: usize) -> Result<Vec<VectorHit>> {
        Err(Error::VectorStore("index unavailable".into()))
    }
}

/// Hash embedder that counts calls and can be switched off.
#[derive(Clone)]
struct TestEmbedder {
    inner: Arc<HashEmbedder>,
    calls: Arc<AtomicUsize>,
    down: bool,
}

impl TestEmbedder {
    fn up() -> Self { Self { inner: Arc::new(HashEmbedder::new(DIM)), calls: Arc::default(), down: false } }
    fn down() -> Self { Self { down: true, ..Self::up() } }
}

impl EmbedProvider for TestEmbedder {
    fn embedder_id(&self) -> &str { "test" }
    fn dim(&self) -> usize { DIM }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(Error::Provider { status: 503, message: "embedding sidecar down".into() });
        }
        self.inner.embed_batch(texts).await
    }
}

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("handbook:0", "handbook", "employees may work remotely two days per week").with_company("acme"),
        Chunk::new("handbook:1", "handbook", "remote work requires manager approval").with_index(1).with_company("acme"),
        Chunk::new("handbook:2", "handbook", "the cafeteria opens at eight").with_index(2).with_company("acme"),
        Chunk::new("report:0", "report", "quarterly revenue grew twelve percent").with_page(1).with_company("acme"),
        Chunk::new("report:1", "report", "apparel margins improved in the fall season").with_page(2).with_index(1).with_company("acme"),
        Chunk::new("memo:0", "memo", "remote work is not permitted at globex").with_company("globex"),
    ]
}

async fn vector_store(embedder: &HashEmbedder, chunks: &[Chunk]) -> MemoryVectorStore {
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let store = MemoryVectorStore::new();
    store.insert(chunks, &embedder.embed_batch(&texts).await.unwrap()).unwrap();
    store
}

async fn retriever(embedder: TestEmbedder) -> (EnsembleRetriever<CountingStore, MemoryVectorStore, TestEmbedder>, CountingStore) {
    let chunks = corpus();
    let store = CountingStore { inner: Arc::new(MemoryChunkStore::from_chunks(chunks.clone())), calls: Arc::default() };
    let vectors = vector_store(&HashEmbedder::new(DIM), &chunks).await;
    (EnsembleRetriever::new(store.clone(), vectors, embedder, RetrievalSettings::default()).unwrap(), store)
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.metadata.chunk_id.as_str()).collect()
}

#[tokio::test]
async fn company_search_fuses_both_rankers() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let outcome = engine.search("remote work", SearchScope::Company("acme".into()), Some(3), None).await;

    let FusionOutcome::Fused(results) = outcome else { panic!("expected fused outcome") };
    assert!(!results.is_empty() && results.len() <= 3);
    assert_eq!(results[0].metadata.chunk_id, "handbook:1", "matched by both rankers");
    assert!(results.iter().all(|r| r.metadata.document_id != "memo"), "other company never leaks in");

    let ts = results[0].metadata.timestamp;
    for pair in results.windows(2) { assert!(pair[0].score >= pair[1].score); }
    for r in &results {
        assert_eq!(r.metadata.retrieval_method, RetrievalMethod::EnsembleRrf);
        assert_eq!(r.metadata.search_scope, ScopeKind::Company);
        assert_eq!(r.metadata.timestamp, ts);
        assert!(r.score.is_finite() && r.score > 0.0);
        assert!(r.metadata.lexical_rank.is_some() || r.metadata.vector_rank.is_some());
    }
}

#[tokio::test]
async fn fused_score_matches_rrf_formula() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let results = engine.document_ensemble_search("remote work", DocumentSearch::new("handbook")).await;
    for r in &results {
        let expected = r.metadata.lexical_rank.map_or(0.0, |rank| 0.4 / (60.0 + rank as f32))
            + r.metadata.vector_rank.map_or(0.0, |rank| 0.6 / (60.0 + rank as f32));
        assert!((r.score - expected).abs() < 1e-6, "{}: {} vs {}", r.metadata.chunk_id, r.score, expected);
    }
}

#[tokio::test]
async fn failing_embedder_falls_back_to_bm25() {
    let (engine, _) = retriever(TestEmbedder::down()).await;
    let outcome = engine.search("remote work", SearchScope::Company("acme".into()), Some(2), None).await;

    let FusionOutcome::Degraded { reason, results } = outcome else { panic!("expected degraded outcome") };
    assert!(reason.contains("503"));
    assert!(!results.is_empty() && results.len() <= 2);
    for r in &results {
        assert_eq!(r.metadata.retrieval_method, RetrievalMethod::Bm25Fallback);
        assert!(r.metadata.vector_rank.is_none());
        assert!(r.content.contains("remote"));
    }

    // the entry points hand back the same fallback list
    let plain = engine.company_ensemble_search("remote work", CompanySearch { top_k: Some(2), ..CompanySearch::new("acme") }).await;
    assert_eq!(ids(&plain), ids(&results));
}

#[tokio::test]
async fn failing_vector_store_falls_back_to_bm25() {
    let chunks = corpus();
    let store = MemoryChunkStore::from_chunks(chunks);
    let engine = EnsembleRetriever::new(store, BrokenVectorStore, HashEmbedder::new(DIM), RetrievalSettings::default()).unwrap();

    let outcome = engine.search("revenue", SearchScope::Document("report".into()), None, None).await;
    assert!(outcome.is_degraded());
    assert_eq!(outcome.method(), Some(RetrievalMethod::Bm25Fallback));
    assert_eq!(ids(outcome.results()), ["report:0"]);
    assert_eq!(outcome.results()[0].metadata.page, Some(1));
}

#[tokio::test]
async fn empty_document_set_short_circuits() {
    let embedder = TestEmbedder::up();
    let (engine, store) = retriever(embedder.clone()).await;

    let outcome = engine.search("remote work", SearchScope::MultiDocument(vec![]), None, None).await;
    assert_eq!(outcome, FusionOutcome::Empty);
    let results = engine.multi_doc_ensemble_search("remote work", MultiDocumentSearch::default()).await;
    assert!(results.is_empty());

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn multi_document_scope_spans_listed_documents() {
    let (engine, store) = retriever(TestEmbedder::up()).await;
    let results = engine
        .multi_doc_ensemble_search("remote revenue", MultiDocumentSearch::new(["report", "memo"]))
        .await;
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.metadata.document_id == "report" || r.metadata.document_id == "memo"));
    assert!(results.iter().all(|r| r.metadata.search_scope == ScopeKind::MultiDocument));
}

#[tokio::test]
async fn repeated_queries_return_the_same_ranking() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let scope = SearchScope::Company("acme".into());
    let first = engine.search("remote work approval", scope.clone(), None, None).await.into_results();
    let second = engine.search("remote work approval", scope, None, None).await.into_results();

    assert_eq!(ids(&first), ids(&second));
    let scores = |rs: &[SearchResult]| rs.iter().map(|r| r.score).collect::<Vec<_>>();
    assert_eq!(scores(&first), scores(&second));
}

#[tokio::test]
async fn chunk_fetch_failure_is_empty() {
    let engine = EnsembleRetriever::new(BrokenStore, MemoryVectorStore::new(), HashEmbedder::new(DIM), RetrievalSettings::default()).unwrap();
    let outcome = engine.search("remote", SearchScope::Company("acme".into()), None, None).await;
    assert_eq!(outcome, FusionOutcome::Empty);
}

#[tokio::test]
async fn unknown_document_is_empty() {
    let embedder = TestEmbedder::up();
    let (engine, _) = retriever(embedder.clone()).await;
    let results = engine.document_ensemble_search("remote", DocumentSearch::new("nope")).await;
    assert!(results.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0, "nothing to rank, no embedding call");
}

#[tokio::test]
async fn zero_top_k_uses_scope_default() {
    let chunks: Vec<Chunk> =
        (0..12).map(|i| Chunk::new(format!("long:{i}"), "long", format!("section {i} of the travel policy")).with_index(i)).collect();
    let vectors = vector_store(&HashEmbedder::new(DIM), &chunks).await;
    let engine =
        EnsembleRetriever::new(MemoryChunkStore::from_chunks(chunks), vectors, HashEmbedder::new(DIM), RetrievalSettings::default())
            .unwrap();

    let results = engine.document_ensemble_search("travel policy", DocumentSearch { top_k: Some(0), ..DocumentSearch::new("long") }).await;
    assert_eq!(results.len(), 8);
}

#[tokio::test]
async fn invalid_weights_use_configured_default() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let scope = SearchScope::Company("acme".into());
    let default = engine.search("remote work", scope.clone(), None, None).await.into_results();
    let invalid = engine.search("remote work", scope.clone(), None, Some(FusionWeights::new(-1.0, 0.0))).await.into_results();
    assert_eq!(ids(&default), ids(&invalid));
    assert_eq!(default.iter().map(|r| r.score).collect::<Vec<_>>(), invalid.iter().map(|r| r.score).collect::<Vec<_>>());

    let lexical_only = engine.search("remote work", scope, None, Some(FusionWeights::new(1.0, 0.0))).await.into_results();
    for r in &lexical_only {
        if r.metadata.lexical_rank.is_none() { assert_eq!(r.score, 0.0); }
    }
}

#[tokio::test]
async fn vector_only_hits_are_kept() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    // no indexable term matches, so only the vector ranker contributes
    let results = engine.document_ensemble_search("zzzz", DocumentSearch::new("handbook")).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.metadata.lexical_rank.is_none() && r.metadata.vector_rank.is_some()));
    assert_eq!(results.iter().map(|r| r.metadata.vector_rank).collect::<Vec<_>>(), [Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn results_serialize_in_camel_case() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let results = engine.document_ensemble_search("revenue", DocumentSearch::new("report")).await;
    let json = serde_json::to_value(&results[0]).unwrap();
    assert_eq!(json["metadata"]["retrievalMethod"], "ensemble_rrf");
    assert_eq!(json["metadata"]["searchScope"], "document");
    assert_eq!(json["metadata"]["chunkId"], "report:0");
}

struct ReverseReranker;

impl Reranker for ReverseReranker {
    async fn rerank(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok((0..documents.len()).map(|i| i as f32).collect())
    }
}

struct DownReranker;

impl Reranker for DownReranker {
    async fn rerank(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Err(Error::Timeout("rerank".into()))
    }
}

#[tokio::test]
async fn rerank_reorders_and_keeps_fused_scores() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let fused = engine.company_ensemble_search("remote work", CompanySearch::new("acme")).await;
    assert!(fused.len() >= 2);

    let reranked = rerank_results(&ReverseReranker, "remote work", fused.clone()).await;
    let mut reversed = ids(&fused);
    reversed.reverse();
    assert_eq!(ids(&reranked), reversed);
    assert!(reranked.iter().all(|r| r.metadata.rerank_score.is_some()));
    assert_eq!(reranked.last().unwrap().score, fused[0].score);

    let unchanged = rerank_results(&DownReranker, "remote work", fused.clone()).await;
    assert_eq!(unchanged, fused);
}

/// Answers like the in-memory store, but only after `delay`.
struct SlowVectorStore {
    inner: MemoryVectorStore,
    delay: Duration,
}

impl VectorStore for SlowVectorStore {
    async fn nearest(&self, scope: &SearchScope, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        tokio::time::sleep(self.delay).await;
        self.inner.nearest(scope, query, k).await
    }
}

#[tokio::test]
async fn deadline_gives_up_on_slow_ranker() {
    let chunks = corpus();
    let vectors = SlowVectorStore { inner: vector_store(&HashEmbedder::new(DIM), &chunks).await, delay: Duration::from_secs(2) };
    let engine =
        EnsembleRetriever::new(MemoryChunkStore::from_chunks(chunks), vectors, HashEmbedder::new(DIM), RetrievalSettings::default())
            .unwrap();

    let started = Instant::now();
    let outcome =
        engine.search_within(Duration::from_millis(50), "remote work", SearchScope::Company("acme".into()), None, None).await;
    assert_eq!(outcome, FusionOutcome::Empty);
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
}

#[tokio::test]
async fn deadline_covers_bm25_index_build() {
    let chunks: Vec<Chunk> = (0..20_000)
        .map(|i| Chunk::new(format!("big:{i}"), "big", format!("section {i} covers travel expenses and per diem rules")).with_index(i))
        .collect();
    let vectors = vector_store(&HashEmbedder::new(DIM), &chunks).await;
    let engine =
        EnsembleRetriever::new(MemoryChunkStore::from_chunks(chunks), vectors, HashEmbedder::new(DIM), RetrievalSettings::default())
            .unwrap();

    let outcome =
        engine.search_within(Duration::from_millis(1), "travel expenses", SearchScope::Document("big".into()), None, None).await;
    assert_eq!(outcome, FusionOutcome::Empty);
}

#[tokio::test]
async fn deadline_leaves_fast_searches_alone() {
    let (engine, _) = retriever(TestEmbedder::up()).await;
    let outcome =
        engine.search_within(Duration::from_secs(10), "remote work", SearchScope::Company("acme".into()), None, None).await;
    assert!(matches!(outcome, FusionOutcome::Fused(ref r) if !r.is_empty()));
}

#[tokio::test]
async fn repeated_chunk_ids_fuse_once() {
    let mut chunks = corpus();
    chunks.push(chunks[1].clone());
    let vectors = vector_store(&HashEmbedder::new(DIM), &chunks).await;
    let engine =
        EnsembleRetriever::new(MemoryChunkStore::from_chunks(chunks), vectors, HashEmbedder::new(DIM), RetrievalSettings::default())
            .unwrap();

    let results = engine.document_ensemble_search("remote work approval", DocumentSearch::new("handbook")).await;
    let mut seen = ids(&results);
    assert_eq!(seen.iter().filter(|id| **id == "handbook:1").count(), 1);
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), results.len());
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let negative_k = RetrievalSettings { rrf_k: -1.0, ..RetrievalSettings::default() };
    let built = EnsembleRetriever::new(MemoryChunkStore::new(), MemoryVectorStore::new(), HashEmbedder::new(DIM), negative_k);
    assert!(matches!(built, Err(Error::InvalidConfig(_))));

    let zero_top_k = RetrievalSettings { document_top_k: 0, ..RetrievalSettings::default() };
    assert!(EnsembleRetriever::new(MemoryChunkStore::new(), MemoryVectorStore::new(), HashEmbedder::new(DIM), zero_top_k).is_err());
}
