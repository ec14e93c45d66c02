use pdr_core::Chunk;
use pdr_text::{rank_lexical, Bm25Index};

fn corpus() -> Vec<Chunk> {
    [
        "Quarterly revenue grew twelve percent on strong apparel sales.",
        "The board approved a new remote work policy for engineers.",
        "Revenue guidance for the next fiscal year remains unchanged.",
        "Engineers must complete security training before onboarding.",
        "Apparel margins fell while footwear revenue revenue revenue surged.",
    ]
    .iter()
    .enumerate()
    .map(|(i, t)| Chunk::new(format!("doc:{i}"), "doc", *t).with_index(i))
    .collect()
}

#[test]
fn ranks_matching_chunks_first() {
    let hits = rank_lexical(&corpus(), "revenue", 10).expect("search");
    let ords: Vec<usize> = hits.iter().map(|h| h.ord).collect();
    assert_eq!(ords.len(), 3);
    assert!(ords.contains(&0) && ords.contains(&2) && ords.contains(&4));
    // repeated term scores highest
    assert_eq!(ords[0], 4);
    for w in hits.windows(2) { assert!(w[0].score >= w[1].score); }
    for h in &hits { assert!(h.score.is_finite() && h.score > 0.0); }
}

#[test]
fn caps_at_k() {
    let hits = rank_lexical(&corpus(), "revenue engineers apparel", 2).expect("search");
    assert_eq!(hits.len(), 2);
}

#[test]
fn identical_inputs_give_identical_rankings() {
    let chunks = corpus();
    let a = Bm25Index::build(&chunks).unwrap().search("engineers revenue", 8).unwrap();
    let b = Bm25Index::build(&chunks).unwrap().search("engineers revenue", 8).unwrap();
    assert_eq!(a, b);
}

#[test]
fn idf_is_relative_to_the_chunk_set() {
    let chunks = corpus();
    // "policy" is rare in the full set; in a set of one chunk it is in every doc
    let full = rank_lexical(&chunks, "policy", 5).unwrap();
    let single = rank_lexical(&chunks[1..2], "policy", 5).unwrap();
    assert_eq!(full.len(), 1);
    assert_eq!(single.len(), 1);
    assert!(full[0].score > single[0].score);
}
