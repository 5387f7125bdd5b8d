//! Analytic Hierarchy Process: criterion weights and consistency from a
//! pairwise comparison matrix.
//!
//! Weights come from the column-normalized row means of the matrix (the
//! classic approximation of the principal eigenvector). The same pass yields
//! an estimate of `lambda_max`, the consistency index and the consistency
//! ratio against Saaty's random-index table.
//!
//! Parameter tables are `const` data. [`AhpEngine`] carries the random-index
//! table it was built with, so callers that want a different table construct
//! their own engine instead of touching shared state.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Saaty's random consistency index, indexed by `n - 1`.
pub const RANDOM_INDEX: [f64; 10] = [0.0, 0.0, 0.58, 0.9, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49];

/// Full Saaty intensity scale: 1..=9 and their reciprocals.
pub const SAATY_SCALE: [f64; 17] = [
    1.0 / 9.0,
    1.0 / 8.0,
    1.0 / 7.0,
    1.0 / 6.0,
    1.0 / 5.0,
    1.0 / 4.0,
    1.0 / 3.0,
    1.0 / 2.0,
    1.0,
    2.0,
    3.0,
    4.0,
    5.0,
    6.0,
    7.0,
    8.0,
    9.0,
];

/// Odd intensities used when one criterion clearly outranks another.
pub const DOMINANT_INTENSITIES: [f64; 4] = [3.0, 5.0, 7.0, 9.0];

/// Extreme judgments used by strong mutation.
pub const STRONG_INTENSITIES: [f64; 4] = [1.0 / 9.0, 1.0 / 7.0, 7.0, 9.0];

/// Conventional acceptability bound for the consistency ratio.
pub const ACCEPTABLE_CONSISTENCY_RATIO: f64 = 0.1;

/// Accepts user matrices entered with three decimals (e.g. `0.333` for 1/3).
const RECIPROCAL_TOLERANCE: f64 = 1e-2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AhpError {
    #[error("comparison matrix must contain at least one criterion")]
    Empty,
    #[error("comparison matrix is not square: {rows} rows but row {row} has {cols} columns")]
    NotSquare { rows: usize, row: usize, cols: usize },
    #[error("entry ({row}, {col}) must be positive and finite, got {value}")]
    NonPositiveEntry { row: usize, col: usize, value: f64 },
    #[error("diagonal entry {index} must be 1, got {value}")]
    NonUnitDiagonal { index: usize, value: f64 },
    #[error("entries ({row}, {col}) = {value} and ({col}, {row}) = {mirror} are not reciprocal")]
    NotReciprocal {
        row: usize,
        col: usize,
        value: f64,
        mirror: f64,
    },
    #[error("evaluation produced non-finite or zero weights")]
    Degenerate,
}

impl AhpError {
    /// True for input-shape problems (rejected before any computation).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, AhpError::Degenerate)
    }
}

/// Square, positive, reciprocal comparison matrix (`M[j,i] = 1 / M[i,j]`).
///
/// Cloning is a deep copy; individuals in a search never share storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct PairwiseMatrix {
    values: DMatrix<f64>,
}

impl PairwiseMatrix {
    /// All criteria equally important.
    pub fn identity(order: usize) -> Self {
        Self {
            values: DMatrix::from_element(order, order, 1.0),
        }
    }

    /// Validate row-major input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, AhpError> {
        let n = rows.len();
        if n == 0 {
            return Err(AhpError::Empty);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(AhpError::NotSquare {
                    rows: n,
                    row,
                    cols: values.len(),
                });
            }
        }
        let values = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::from_matrix(values)
    }

    pub fn from_matrix(values: DMatrix<f64>) -> Result<Self, AhpError> {
        let n = values.nrows();
        if n == 0 {
            return Err(AhpError::Empty);
        }
        if values.ncols() != n {
            return Err(AhpError::NotSquare {
                rows: n,
                row: 0,
                cols: values.ncols(),
            });
        }
        for i in 0..n {
            for j in 0..n {
                let value = values[(i, j)];
                if !value.is_finite() || value <= 0.0 {
                    return Err(AhpError::NonPositiveEntry {
                        row: i,
                        col: j,
                        value,
                    });
                }
            }
        }
        for i in 0..n {
            let d = values[(i, i)];
            if (d - 1.0).abs() > RECIPROCAL_TOLERANCE {
                return Err(AhpError::NonUnitDiagonal { index: i, value: d });
            }
            for j in (i + 1)..n {
                let value = values[(i, j)];
                let mirror = values[(j, i)];
                if (value * mirror - 1.0).abs() > RECIPROCAL_TOLERANCE {
                    return Err(AhpError::NotReciprocal {
                        row: i,
                        col: j,
                        value,
                        mirror,
                    });
                }
            }
        }
        Ok(Self { values })
    }

    /// Perfectly consistent matrix `M[i,j] = w_i / w_j`.
    pub fn from_weights(weights: &[f64]) -> Result<Self, AhpError> {
        if weights.is_empty() {
            return Err(AhpError::Empty);
        }
        for (idx, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w <= 0.0 {
                return Err(AhpError::NonPositiveEntry {
                    row: idx,
                    col: idx,
                    value: w,
                });
            }
        }
        let n = weights.len();
        Ok(Self {
            values: DMatrix::from_fn(n, n, |i, j| {
                if i == j {
                    1.0
                } else {
                    weights[i] / weights[j]
                }
            }),
        })
    }

    /// Number of criteria.
    pub fn order(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.order())
            .map(|i| (0..self.order()).map(|j| self.values[(i, j)]).collect())
            .collect()
    }

    /// Set `(row, col)` and mirror the reciprocal into `(col, row)`.
    ///
    /// `value` must be positive; callers draw it from the Saaty scale.
    pub(crate) fn set_pair(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row != col && value > 0.0);
        self.values[(row, col)] = value;
        self.values[(col, row)] = 1.0 / value;
    }

    /// Exact reciprocity check within `tolerance` on `M[i,j] * M[j,i]`.
    pub fn is_reciprocal(&self, tolerance: f64) -> bool {
        let n = self.order();
        (0..n).all(|i| {
            (self.values[(i, i)] - 1.0).abs() <= tolerance
                && ((i + 1)..n)
                    .all(|j| (self.values[(i, j)] * self.values[(j, i)] - 1.0).abs() <= tolerance)
        })
    }
}

impl TryFrom<Vec<Vec<f64>>> for PairwiseMatrix {
    type Error = AhpError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<PairwiseMatrix> for Vec<Vec<f64>> {
    fn from(matrix: PairwiseMatrix) -> Self {
        matrix.to_rows()
    }
}

impl fmt::Display for PairwiseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.3}")).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

/// Normalized criterion weights; sums to 1 within floating tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionWeights(Vec<f64>);

impl CriterionWeights {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for CriterionWeights {
    fn from(weights: Vec<f64>) -> Self {
        Self(weights)
    }
}

/// Consistency ratio, or an explicit "unknown" outside the random-index table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyRatio {
    Value(f64),
    Unavailable,
}

impl ConsistencyRatio {
    pub fn value(self) -> Option<f64> {
        match self {
            ConsistencyRatio::Value(v) => Some(v),
            ConsistencyRatio::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub lambda_max: f64,
    /// `None` for a single criterion, where `(lambda_max - n) / (n - 1)` is undefined.
    pub consistency_index: Option<f64>,
    pub consistency_ratio: ConsistencyRatio,
}

impl ConsistencyReport {
    /// CR ≤ 0.1. An unavailable ratio is never acceptable.
    pub fn is_acceptable(&self) -> bool {
        self.consistency_ratio
            .value()
            .is_some_and(|cr| cr <= ACCEPTABLE_CONSISTENCY_RATIO)
    }
}

/// Weight and consistency evaluator bound to a random-index table.
#[derive(Debug, Clone, Copy)]
pub struct AhpEngine {
    random_index: &'static [f64],
}

impl Default for AhpEngine {
    fn default() -> Self {
        Self::new(&RANDOM_INDEX)
    }
}

impl AhpEngine {
    pub const fn new(random_index: &'static [f64]) -> Self {
        Self { random_index }
    }

    /// Largest criteria count with a tabulated random index.
    pub fn max_order(&self) -> usize {
        self.random_index.len()
    }

    pub fn run(
        &self,
        matrix: &PairwiseMatrix,
    ) -> Result<(CriterionWeights, ConsistencyReport), AhpError> {
        let m = matrix.as_matrix();
        let n = matrix.order();

        let col_sums: Vec<f64> = m.column_iter().map(|c| c.sum()).collect();
        if col_sums.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(AhpError::Degenerate);
        }

        let normalized = DMatrix::from_fn(n, n, |i, j| m[(i, j)] / col_sums[j]);
        let weights = DVector::from_iterator(n, normalized.row_iter().map(|r| r.mean()));
        if weights.iter().any(|w| !w.is_finite() || *w == 0.0) {
            return Err(AhpError::Degenerate);
        }

        let weighted_sum = (m * &weights).component_div(&weights);
        let lambda_max = weighted_sum.mean();
        if !lambda_max.is_finite() {
            return Err(AhpError::Degenerate);
        }

        let report = self.consistency(n, lambda_max);
        Ok((CriterionWeights(weights.iter().copied().collect()), report))
    }

    fn consistency(&self, n: usize, lambda_max: f64) -> ConsistencyReport {
        if n == 1 {
            return ConsistencyReport {
                lambda_max,
                consistency_index: None,
                consistency_ratio: ConsistencyRatio::Unavailable,
            };
        }
        let ci = (lambda_max - n as f64) / (n as f64 - 1.0);
        let consistency_ratio = match self.random_index.get(n - 1) {
            None => ConsistencyRatio::Unavailable,
            // Order-2 reciprocal matrices are consistent by construction.
            Some(&ri) if ri == 0.0 => ConsistencyRatio::Value(0.0),
            Some(&ri) => ConsistencyRatio::Value(ci / ri),
        };
        ConsistencyReport {
            lambda_max,
            consistency_index: Some(ci),
            consistency_ratio,
        }
    }
}

/// Run the default engine on `matrix`.
pub fn ahp_run(matrix: &PairwiseMatrix) -> Result<(CriterionWeights, ConsistencyReport), AhpError> {
    AhpEngine::default().run(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn consistent_three_by_three_matches_reference_weights() {
        let m = PairwiseMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![0.5, 1.0, 1.5],
            vec![0.333, 0.667, 1.0],
        ])
        .unwrap();
        let (w, report) = ahp_run(&m).unwrap();

        assert!(close(w.as_slice()[0], 0.545, 1e-3));
        assert!(close(w.as_slice()[1], 0.273, 1e-3));
        assert!(close(w.as_slice()[2], 0.182, 1e-3));
        assert!(close(report.consistency_ratio.value().unwrap(), 0.0, 1e-3));
        assert!(report.is_acceptable());
    }

    #[test]
    fn inconsistent_matrix_has_positive_ratio() {
        // a > b, b > c, but c > a.
        let m = PairwiseMatrix::from_rows(&[
            vec![1.0, 5.0, 1.0 / 5.0],
            vec![1.0 / 5.0, 1.0, 5.0],
            vec![5.0, 1.0 / 5.0, 1.0],
        ])
        .unwrap();
        let (w, report) = ahp_run(&m).unwrap();
        assert!(close(w.as_slice().iter().sum::<f64>(), 1.0, 1e-9));
        assert!(report.consistency_ratio.value().unwrap() > ACCEPTABLE_CONSISTENCY_RATIO);
        assert!(!report.is_acceptable());
    }

    #[test]
    fn single_criterion_has_unit_weight_and_no_index() {
        let (w, report) = ahp_run(&PairwiseMatrix::identity(1)).unwrap();
        assert_eq!(w.as_slice(), &[1.0]);
        assert_eq!(report.consistency_index, None);
        assert_eq!(report.consistency_ratio, ConsistencyRatio::Unavailable);
    }

    #[test]
    fn two_criteria_are_always_consistent() {
        let m = PairwiseMatrix::from_rows(&[vec![1.0, 7.0], vec![1.0 / 7.0, 1.0]]).unwrap();
        let (w, report) = ahp_run(&m).unwrap();
        assert!(close(w.as_slice()[0], 0.875, 1e-12));
        assert_eq!(report.consistency_ratio, ConsistencyRatio::Value(0.0));
    }

    #[test]
    fn ratio_is_unavailable_beyond_table() {
        let m = PairwiseMatrix::identity(11);
        let (w, report) = ahp_run(&m).unwrap();
        assert_eq!(w.len(), 11);
        assert!(report.consistency_index.is_some());
        assert_eq!(report.consistency_ratio, ConsistencyRatio::Unavailable);
        assert!(!report.is_acceptable());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(PairwiseMatrix::from_rows(&[]), Err(AhpError::Empty));
        assert!(matches!(
            PairwiseMatrix::from_rows(&[vec![1.0, 2.0], vec![0.5]]),
            Err(AhpError::NotSquare { row: 1, cols: 1, .. })
        ));
        assert!(matches!(
            PairwiseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]),
            Err(AhpError::NonPositiveEntry { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            PairwiseMatrix::from_rows(&[vec![2.0, 2.0], vec![0.5, 1.0]]),
            Err(AhpError::NonUnitDiagonal { index: 0, .. })
        ));
        assert!(matches!(
            PairwiseMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 1.0]]),
            Err(AhpError::NotReciprocal { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn serde_round_trips_through_rows() {
        let json = "[[1.0,3.0],[0.3333333333333333,1.0]]";
        let m: PairwiseMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(m.order(), 2);
        assert!(serde_json::from_str::<PairwiseMatrix>("[[1.0,3.0],[3.0,1.0]]").is_err());
    }
}
