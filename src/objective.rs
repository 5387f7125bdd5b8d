//! Two-objective evaluation of comparison matrices against candidate scores.
//!
//! Objective vector: `(consistency_ratio, -best_candidate_score)`, both
//! minimized. Any matrix the AHP pass cannot evaluate maps to `(+inf, +inf)`,
//! which every valid individual dominates.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::ahp::{AhpEngine, AhpError, PairwiseMatrix};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreMatrixError {
    #[error("candidate score matrix must contain at least one candidate")]
    NoCandidates,
    #[error("candidate score matrix must contain at least one criterion")]
    NoCriteria,
    #[error("candidate {row} has {got} scores, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("score ({row}, {col}) must be finite and non-negative, got {value}")]
    InvalidScore { row: usize, col: usize, value: f64 },
    #[error("weight vector has {got} entries, expected {expected}")]
    WeightLengthMismatch { expected: usize, got: usize },
}

/// Candidates × criteria, non-negative. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct CandidateScoreMatrix {
    values: DMatrix<f64>,
}

impl CandidateScoreMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ScoreMatrixError> {
        let m = rows.len();
        if m == 0 {
            return Err(ScoreMatrixError::NoCandidates);
        }
        let n = rows[0].len();
        if n == 0 {
            return Err(ScoreMatrixError::NoCriteria);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(ScoreMatrixError::RaggedRow {
                    row,
                    expected: n,
                    got: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ScoreMatrixError::InvalidScore { row, col, value });
                }
            }
        }
        Ok(Self {
            values: DMatrix::from_fn(m, n, |i, j| rows[i][j]),
        })
    }

    pub fn candidates(&self) -> usize {
        self.values.nrows()
    }

    pub fn criteria(&self) -> usize {
        self.values.ncols()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect()
    }

    /// Row-wise dot product with `weights`.
    pub fn weighted_scores(&self, weights: &[f64]) -> Result<Vec<f64>, ScoreMatrixError> {
        if weights.len() != self.criteria() {
            return Err(ScoreMatrixError::WeightLengthMismatch {
                expected: self.criteria(),
                got: weights.len(),
            });
        }
        let w = DVector::from_column_slice(weights);
        Ok((&self.values * w).iter().copied().collect())
    }
}

impl TryFrom<Vec<Vec<f64>>> for CandidateScoreMatrix {
    type Error = ScoreMatrixError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<CandidateScoreMatrix> for Vec<Vec<f64>> {
    fn from(matrix: CandidateScoreMatrix) -> Self {
        matrix.to_rows()
    }
}

/// `(consistency_ratio, -best_candidate_score)`, both minimized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub consistency_ratio: f64,
    pub negated_best_score: f64,
}

impl ObjectiveVector {
    /// Sentinel for matrices that failed evaluation.
    pub const WORST: ObjectiveVector = ObjectiveVector {
        consistency_ratio: f64::INFINITY,
        negated_best_score: f64::INFINITY,
    };

    pub fn new(consistency_ratio: f64, negated_best_score: f64) -> Self {
        Self {
            consistency_ratio,
            negated_best_score,
        }
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.consistency_ratio, self.negated_best_score]
    }

    pub fn best_score(&self) -> f64 {
        -self.negated_best_score
    }

    pub fn is_finite(&self) -> bool {
        self.consistency_ratio.is_finite() && self.negated_best_score.is_finite()
    }

    /// Componentwise ≤ and strictly < in at least one objective.
    pub fn dominates(&self, other: &ObjectiveVector) -> bool {
        dominates(&self.as_array(), &other.as_array())
    }
}

/// Pareto dominance for minimized objectives.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut strictly_better = false;
    for (&av, &bv) in a.iter().zip(b) {
        if av > bv {
            return false;
        }
        if av < bv {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Scores comparison matrices against a fixed candidate-score matrix.
#[derive(Debug, Clone)]
pub struct ObjectiveEvaluator<'a> {
    engine: AhpEngine,
    scores: &'a CandidateScoreMatrix,
}

impl<'a> ObjectiveEvaluator<'a> {
    pub fn new(scores: &'a CandidateScoreMatrix) -> Self {
        Self::with_engine(AhpEngine::default(), scores)
    }

    pub fn with_engine(engine: AhpEngine, scores: &'a CandidateScoreMatrix) -> Self {
        Self { engine, scores }
    }

    pub fn scores(&self) -> &CandidateScoreMatrix {
        self.scores
    }

    /// Never fails: degenerate evaluations become [`ObjectiveVector::WORST`].
    pub fn evaluate(&self, matrix: &PairwiseMatrix) -> ObjectiveVector {
        match self.try_evaluate(matrix) {
            Ok(objectives) => objectives,
            Err(err) => {
                warn!(error = %err, "degenerate comparison matrix; assigning worst objectives");
                ObjectiveVector::WORST
            }
        }
    }

    fn try_evaluate(&self, matrix: &PairwiseMatrix) -> Result<ObjectiveVector, AhpError> {
        let (weights, report) = self.engine.run(matrix)?;
        let cr = report
            .consistency_ratio
            .value()
            .filter(|cr| cr.is_finite())
            .ok_or(AhpError::Degenerate)?;
        let best = self
            .scores
            .weighted_scores(weights.as_slice())
            .map_err(|_| AhpError::Degenerate)?
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return Err(AhpError::Degenerate);
        }
        Ok(ObjectiveVector::new(cr, -best))
    }
}

/// Convenience wrapper over [`ObjectiveEvaluator::evaluate`].
pub fn evaluate(matrix: &PairwiseMatrix, scores: &CandidateScoreMatrix) -> ObjectiveVector {
    ObjectiveEvaluator::new(scores).evaluate(matrix)
}
