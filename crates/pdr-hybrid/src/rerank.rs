use pdr_core::{Reranker, SearchResult};

/// Reorder fused results by cross-encoder score, recording it as
/// `rerank_score`. `score` keeps the fused value. On any reranker failure
/// the input comes back unchanged.
pub async fn rerank_results<R: Reranker>(reranker: &R, query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.len() < 2 { return results; }
    let documents: Vec<String> = results.iter().map(|r| r.content.clone()).collect();
    let scores = match reranker.rerank(query, &documents).await {
        Ok(scores) if scores.len() == results.len() => scores,
        Ok(scores) => {
            tracing::warn!(expected = results.len(), got = scores.len(), "reranker score count mismatch, keeping fused order");
            return results;
        }
        Err(err) => {
            tracing::warn!(error = %err, "rerank failed, keeping fused order");
            return results;
        }
    };
    let mut scored: Vec<(f32, SearchResult)> = scores
        .into_iter()
        .zip(results)
        .map(|(score, mut result)| {
            result.metadata.rerank_score = score.is_finite().then_some(score);
            (if score.is_finite() { score } else { f32::NEG_INFINITY }, result)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, r)| r).collect()
}
