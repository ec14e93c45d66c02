//! Weighted reciprocal-rank fusion.
//!
//! `fused(c) = Σ_r w_r / (k + rank_r(c))` with 1-based ranks. A candidate
//! missing from a list gets nothing from that list. Ties keep first-seen
//! order across the lists as given.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_RRF_K: f32 = 60.0;

/// Per-ranker weights. Defaults to 0.4 lexical, 0.6 vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub lexical: f32,
    pub vector: f32,
}

impl Default for FusionWeights {
    fn default() -> Self { Self { lexical: 0.4, vector: 0.6 } }
}

impl FusionWeights {
    pub fn new(lexical: f32, vector: f32) -> Self { Self { lexical, vector } }

    /// Finite, non-negative, and not both zero.
    pub fn is_valid(&self) -> bool {
        let ok = |w: f32| w.is_finite() && w >= 0.0;
        ok(self.lexical) && ok(self.vector) && self.lexical + self.vector > 0.0
    }
}

impl From<[f32; 2]> for FusionWeights {
    fn from(w: [f32; 2]) -> Self { Self { lexical: w[0], vector: w[1] } }
}

/// One fused candidate. Ranks are 1-based positions in each input list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub ord: usize,
    pub score: f32,
    pub ranks: Vec<Option<usize>>,
}

/// Fuse ranked lists of candidate ids (`ord`s), each with its weight.
pub fn weighted_rrf(lists: &[(&[usize], f32)], k: f32) -> Vec<FusedCandidate> {
    let mut slot_of: HashMap<usize, usize> = HashMap::new();
    let mut fused: Vec<FusedCandidate> = Vec::new();
    for (list_idx, (list, weight)) in lists.iter().enumerate() {
        for (pos, &ord) in list.iter().enumerate() {
            let slot = *slot_of.entry(ord).or_insert_with(|| {
                fused.push(FusedCandidate { ord, score: 0.0, ranks: vec![None; lists.len()] });
                fused.len() - 1
            });
            let entry = &mut fused[slot];
            // first occurrence wins if a list repeats a candidate
            if entry.ranks[list_idx].is_none() {
                let rank = pos + 1;
                entry.ranks[list_idx] = Some(rank);
                entry.score += weight / (k + rank as f32);
            }
        }
    }
    // sort_by is stable: equal scores keep insertion order
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool { (a - b).abs() < 1e-6 }

    #[test]
    fn scores_follow_the_formula() {
        let lexical = [10, 20];
        let vector = [20, 30];
        let fused = weighted_rrf(&[(&lexical, 0.4), (&vector, 0.6)], 60.0);
        let by_ord = |o: usize| fused.iter().find(|c| c.ord == o).unwrap();

        assert!(approx(by_ord(10).score, 0.4 / 61.0));
        assert!(approx(by_ord(20).score, 0.4 / 62.0 + 0.6 / 61.0));
        assert!(approx(by_ord(30).score, 0.6 / 62.0));
        assert_eq!(by_ord(20).ranks, vec![Some(2), Some(1)]);
        assert_eq!(by_ord(30).ranks, vec![None, Some(2)]);
        assert_eq!(fused[0].ord, 20, "found by both rankers wins");
    }

    #[test]
    fn ties_keep_insertion_order() {
        // equal weights, mirrored ranks: 1 and 2 tie, lexical list seen first
        let fused = weighted_rrf(&[(&[1, 2], 0.5), (&[2, 1], 0.5)], 60.0);
        assert!(approx(fused[0].score, fused[1].score));
        assert_eq!(fused[0].ord, 1);
        assert_eq!(fused[1].ord, 2);
    }

    #[test]
    fn vector_weight_dominates_single_list_hits() {
        let fused = weighted_rrf(&[(&[1], 0.4), (&[2], 0.6)], 60.0);
        assert_eq!(fused.iter().map(|c| c.ord).collect::<Vec<_>>(), [2, 1]);
    }

    #[test]
    fn empty_lists_fuse_to_nothing() {
        assert!(weighted_rrf(&[(&[], 0.4), (&[], 0.6)], 60.0).is_empty());
    }

    #[test]
    fn weight_validation() {
        assert!(FusionWeights::default().is_valid());
        assert!(FusionWeights::new(0.0, 1.0).is_valid());
        assert!(!FusionWeights::new(0.0, 0.0).is_valid());
        assert!(!FusionWeights::new(-0.1, 1.0).is_valid());
        assert!(!FusionWeights::new(f32::NAN, 1.0).is_valid());
    }
}
