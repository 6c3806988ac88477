//! Deterministic top-K ranking of classifier scores.

use crate::error::RequestError;
use serde::Serialize;
use std::cmp::Ordering;

/// One entry of a ranked prediction list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RankedScore {
    /// Class index into the label list
    pub index: usize,
    /// Raw classifier score, passed through unmodified
    pub score: f32,
}

impl RankedScore {
    pub fn new(index: usize, score: f32) -> Self {
        Self { index, score }
    }
}

/// Select the `k` highest scores, best first.
///
/// Ties are broken by ascending class index so the result is reproducible
/// regardless of the selection algorithm. NaN scores rank after every number.
///
/// # Errors
///
/// Returns [`RequestError::TopKOutOfRange`] unless `1 <= k <= scores.len()`.
pub fn top_k(scores: &[f32], k: usize) -> Result<Vec<RankedScore>, RequestError> {
    let n = scores.len();

    if k == 0 || k > n {
        return Err(RequestError::TopKOutOfRange { k, n });
    }

    let mut ranked: Vec<RankedScore> = scores
        .iter()
        .enumerate()
        .map(|(index, &score)| RankedScore::new(index, score))
        .collect();

    if k < n {
        ranked.select_nth_unstable_by(k - 1, rank_order);
        ranked.truncate(k);
    }

    ranked.sort_unstable_by(rank_order);
    Ok(ranked)
}

/// Total order: higher score first, NaN last, then lower index first.
fn rank_order(a: &RankedScore, b: &RankedScore) -> Ordering {
    let by_score = match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    };

    by_score.then(a.index.cmp(&b.index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(ranked: &[RankedScore]) -> Vec<(usize, f32)> {
        ranked.iter().map(|r| (r.index, r.score)).collect()
    }

    #[test]
    fn breaks_ties_by_index() {
        let ranked = top_k(&[0.1, 0.9, 0.5, 0.9, 0.2], 3).unwrap();

        assert_eq!(pairs(&ranked), vec![(1, 0.9), (3, 0.9), (2, 0.5)]);
    }

    #[test]
    fn full_ranking_contains_every_index_once() {
        let scores = [0.3, 0.3, 0.1, 0.7, 0.3];
        let ranked = top_k(&scores, scores.len()).unwrap();

        assert_eq!(
            pairs(&ranked),
            vec![(3, 0.7), (0, 0.3), (1, 0.3), (4, 0.3), (2, 0.1)]
        );
    }

    #[test]
    fn tie_at_cutoff_keeps_lowest_index() {
        let ranked = top_k(&[0.5, 0.2, 0.5, 0.5], 2).unwrap();

        assert_eq!(pairs(&ranked), vec![(0, 0.5), (2, 0.5)]);
    }

    #[test]
    fn all_equal_scores_rank_by_index() {
        let scores = [0.25_f32; 8];

        for k in 1..=scores.len() {
            let ranked = top_k(&scores, k).unwrap();
            let indices: Vec<usize> = ranked.iter().map(|r| r.index).collect();
            assert_eq!(indices, (0..k).collect::<Vec<_>>());
        }
    }

    #[test]
    fn scores_are_not_renormalized() {
        let ranked = top_k(&[-3.5, 12.0, 0.0], 2).unwrap();

        assert_eq!(pairs(&ranked), vec![(1, 12.0), (2, 0.0)]);
    }

    #[test]
    fn nan_scores_rank_last() {
        let ranked = top_k(&[f32::NAN, 0.1, f32::NAN, 0.2], 4).unwrap();

        assert_eq!(ranked[0].index, 3);
        assert_eq!(ranked[1].index, 1);
        assert_eq!(ranked[2].index, 0);
        assert_eq!(ranked[3].index, 2);
        assert!(ranked[2].score.is_nan());
    }

    #[test]
    fn negative_zero_ties_with_zero() {
        let ranked = top_k(&[-0.0, 0.0], 2).unwrap();

        assert_eq!(ranked[0].index, 0);
        assert_eq!(ranked[1].index, 1);
    }

    #[test]
    fn rejects_k_above_label_count() {
        assert!(matches!(
            top_k(&[0.1, 0.2], 3),
            Err(RequestError::TopKOutOfRange { k: 3, n: 2 })
        ));
    }

    #[test]
    fn rejects_zero_k() {
        assert!(matches!(
            top_k(&[0.1, 0.2], 0),
            Err(RequestError::TopKOutOfRange { k: 0, n: 2 })
        ));
    }

    #[test]
    fn rejects_empty_scores() {
        assert!(top_k(&[], 1).is_err());
    }
}
