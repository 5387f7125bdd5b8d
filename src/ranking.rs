//! Ranks candidates by their AHP-weighted score.

use serde::{Deserialize, Serialize};

use crate::ahp::CriterionWeights;
use crate::objective::{CandidateScoreMatrix, ScoreMatrixError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Row in the score matrix.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub score: f64,
    /// 1-based; equal scores keep input order.
    pub rank: usize,
}

/// Score every candidate with `weights` and sort best first.
pub fn rank_candidates(
    scores: &CandidateScoreMatrix,
    weights: &CriterionWeights,
    labels: Option<&[String]>,
) -> Result<Vec<RankedCandidate>, ScoreMatrixError> {
    let weighted = scores.weighted_scores(weights.as_slice())?;
    let mut order: Vec<usize> = (0..weighted.len()).collect();
    // Stable sort keeps input order on ties.
    order.sort_by(|&a, &b| weighted[b].total_cmp(&weighted[a]));

    Ok(order
        .into_iter()
        .enumerate()
        .map(|(pos, index)| RankedCandidate {
            index,
            label: labels.and_then(|l| l.get(index).cloned()),
            score: weighted[index],
            rank: pos + 1,
        })
        .collect())
}
