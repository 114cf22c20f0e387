//! Score normalization onto [0, 1].
//!
//! BM25-style ranks and cosine similarities live on unrelated scales, so each
//! path's scores are normalized over that path's own returned list before
//! fusion. A candidate a path did not return gets 0.0 for that path.
//!
//! | Method | Formula | Degenerate case |
//! |--------|---------|-----------------|
//! | `MinMax` | `(s - min) / (max - min)` | all equal → 0.5 |
//! | `ZScore` | `(clip((s - mean) / stddev, -3, 3) + 3) / 6` | stddev 0 → 0.5 |
//! | `ReciprocalRank` | `1 / (rank + k)`, rank 0-indexed | magnitude ignored |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use sift_core::defaults::RRF_K;
use sift_core::{RetrievalCandidate, ScoredResult};

/// Normalization applied independently to each retrieval path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    MinMax,
    ZScore,
    #[default]
    ReciprocalRank,
}

impl NormalizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMethod::MinMax => "min_max",
            NormalizationMethod::ZScore => "z_score",
            NormalizationMethod::ReciprocalRank => "reciprocal_rank",
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "min_max" | "minmax" => Ok(NormalizationMethod::MinMax),
            "z_score" | "zscore" => Ok(NormalizationMethod::ZScore),
            "reciprocal_rank" | "rrf" => Ok(NormalizationMethod::ReciprocalRank),
            other => Err(format!("unknown normalization method {other:?}")),
        }
    }
}

const NEUTRAL: f32 = 0.5;
const Z_CLIP: f64 = 3.0;

/// Normalize one path's scores. Output is index-aligned with the input.
///
/// Non-finite inputs are excluded from the statistics and map to 0.0.
pub fn normalize(scores: &[f32], method: NormalizationMethod) -> Vec<f32> {
    let finite: Vec<f64> = scores
        .iter()
        .filter(|s| s.is_finite())
        .map(|&s| s as f64)
        .collect();
    if finite.is_empty() {
        return vec![0.0; scores.len()];
    }

    match method {
        NormalizationMethod::MinMax => {
            let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            map_finite(scores, |s| {
                if range == 0.0 {
                    NEUTRAL
                } else {
                    ((s - min) / range) as f32
                }
            })
        }
        NormalizationMethod::ZScore => {
            let n = finite.len() as f64;
            let mean = finite.iter().sum::<f64>() / n;
            let variance = finite.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            let stddev = variance.sqrt();
            map_finite(scores, |s| {
                if stddev == 0.0 {
                    NEUTRAL
                } else {
                    let z = ((s - mean) / stddev).clamp(-Z_CLIP, Z_CLIP);
                    ((z + Z_CLIP) / (2.0 * Z_CLIP)) as f32
                }
            })
        }
        NormalizationMethod::ReciprocalRank => {
            // Stable sort: equal scores keep input order.
            let mut order: Vec<usize> = (0..scores.len())
                .filter(|&i| scores[i].is_finite())
                .collect();
            order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

            let mut out = vec![0.0; scores.len()];
            for (rank, idx) in order.into_iter().enumerate() {
                out[idx] = 1.0 / (rank as f32 + RRF_K);
            }
            out
        }
    }
}

fn map_finite(scores: &[f32], f: impl Fn(f64) -> f32) -> Vec<f32> {
    scores
        .iter()
        .map(|&s| {
            if s.is_finite() {
                f(s as f64).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Normalize both paths over a merged candidate list.
///
/// Each path is normalized over the candidates that carry a score for it; the
/// rest get 0.0 for that path. Hybrid scores are left at zero for fusion.
pub fn normalize_candidates(
    candidates: Vec<RetrievalCandidate>,
    method: NormalizationMethod,
) -> Vec<ScoredResult> {
    let bm25 = normalize_path(&candidates, method, |c| c.raw_bm25_score);
    let vector = normalize_path(&candidates, method, |c| c.raw_vector_score);

    candidates
        .into_iter()
        .zip(bm25.into_iter().zip(vector))
        .map(|(candidate, (nb, nv))| {
            trace!(chunk_id = %candidate.chunk_id, normalized_bm25 = nb, normalized_vector = nv, "Normalized");
            let mut result = ScoredResult::unscored(candidate);
            result.normalized_bm25 = nb;
            result.normalized_vector = nv;
            result
        })
        .collect()
}

fn normalize_path(
    candidates: &[RetrievalCandidate],
    method: NormalizationMethod,
    raw: impl Fn(&RetrievalCandidate) -> Option<f32>,
) -> Vec<f32> {
    let present: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| raw(c).filter(|s| s.is_finite()).map(|s| (i, s)))
        .collect();

    let scores: Vec<f32> = present.iter().map(|&(_, s)| s).collect();
    let normalized = normalize(&scores, method);

    let mut out = vec![0.0; candidates.len()];
    for ((idx, _), value) in present.into_iter().zip(normalized) {
        out[idx] = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_min_max() {
        let out = normalize(&[2.0, 4.0, 6.0], NormalizationMethod::MinMax);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_min_max_equal_scores() {
        let out = normalize(&[3.0, 3.0, 3.0], NormalizationMethod::MinMax);
        assert_eq!(out, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_min_max_single_score() {
        assert_eq!(normalize(&[0.42], NormalizationMethod::MinMax), vec![0.5]);
    }

    #[test]
    fn test_z_score() {
        // mean 2, population stddev sqrt(2/3)
        let out = normalize(&[1.0, 2.0, 3.0], NormalizationMethod::ZScore);
        let z = 1.0 / (2.0f64 / 3.0).sqrt();
        assert!(approx(out[0], ((3.0 - z) / 6.0) as f32));
        assert!(approx(out[1], 0.5));
        assert!(approx(out[2], ((3.0 + z) / 6.0) as f32));
    }

    #[test]
    fn test_z_score_clips_outliers() {
        let mut scores = vec![0.0; 99];
        scores.push(1000.0);
        let out = normalize(&scores, NormalizationMethod::ZScore);
        assert!(approx(out[99], 1.0));
        assert!(out.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_z_score_zero_stddev() {
        let out = normalize(&[7.0, 7.0], NormalizationMethod::ZScore);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_reciprocal_rank_ignores_magnitude() {
        let out = normalize(&[0.1, 100.0, 5.0], NormalizationMethod::ReciprocalRank);
        assert!(approx(out[1], 1.0 / 60.0));
        assert!(approx(out[2], 1.0 / 61.0));
        assert!(approx(out[0], 1.0 / 62.0));
    }

    #[test]
    fn test_reciprocal_rank_ties_keep_input_order() {
        let out = normalize(&[1.0, 1.0], NormalizationMethod::ReciprocalRank);
        assert!(approx(out[0], 1.0 / 60.0));
        assert!(approx(out[1], 1.0 / 61.0));
    }

    #[test]
    fn test_non_finite_scores_map_to_zero() {
        let out = normalize(&[f32::NAN, 1.0, 3.0], NormalizationMethod::MinMax);
        assert_eq!(out, vec![0.0, 0.0, 1.0]);

        let out = normalize(&[f32::INFINITY], NormalizationMethod::ReciprocalRank);
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(&[], NormalizationMethod::ZScore).is_empty());
    }

    #[test]
    fn test_normalize_candidates_absent_scores_are_zero() {
        let candidates = vec![
            RetrievalCandidate::new("a", "").with_bm25_score(10.0),
            RetrievalCandidate::new("b", "")
                .with_bm25_score(5.0)
                .with_vector_score(0.9),
            RetrievalCandidate::new("c", "").with_vector_score(0.3),
        ];
        let out = normalize_candidates(candidates, NormalizationMethod::MinMax);

        assert_eq!(out[0].normalized_bm25, 1.0);
        assert_eq!(out[0].normalized_vector, 0.0);
        assert_eq!(out[1].normalized_bm25, 0.0);
        assert_eq!(out[1].normalized_vector, 1.0);
        assert_eq!(out[2].normalized_bm25, 0.0);
        assert_eq!(out[2].normalized_vector, 0.0);
        assert!(out.iter().all(|r| r.hybrid_score == 0.0));
    }

    #[test]
    fn test_normalize_candidates_path_normalized_over_own_list() {
        // Only one candidate has a vector score: MinMax degenerates to 0.5 for it.
        let candidates = vec![
            RetrievalCandidate::new("a", "").with_bm25_score(1.0),
            RetrievalCandidate::new("b", "").with_bm25_score(2.0).with_vector_score(0.8),
        ];
        let out = normalize_candidates(candidates, NormalizationMethod::MinMax);
        assert_eq!(out[1].normalized_vector, 0.5);
        assert_eq!(out[0].normalized_vector, 0.0);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("minmax".parse(), Ok(NormalizationMethod::MinMax));
        assert_eq!("z-score".parse(), Ok(NormalizationMethod::ZScore));
        assert_eq!("RRF".parse(), Ok(NormalizationMethod::ReciprocalRank));
        assert!("softmax".parse::<NormalizationMethod>().is_err());
        assert_eq!(NormalizationMethod::default(), NormalizationMethod::ReciprocalRank);
    }
}
