//! Request/response layer over the engines: weights → ranking, matrix search,
//! candidate search and job-fit scoring.
//!
//! Every request and response is serde-friendly so the CLI can read and
//! write them as JSON files:
//! ```bash
//! ranker rank --input request.json --out ranking.json
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ahp::{ahp_run, AhpError, ConsistencyReport, CriterionWeights, PairwiseMatrix};
use crate::candidate_search::{
    optimize_candidates, CandidateSearchConfig, CandidateSearchError, CandidateSearchOutcome,
    CriteriaSpec,
};
use crate::job_fit::{
    criterion_scores, default_category_matrix, hierarchy_score, score_matrix,
    weighted_fit_score, CandidateForm, JobFitError, JobRequirements, CATEGORY_COUNT,
};
use crate::matrix_search::{optimize_matrix, MatrixSearchConfig, MatrixSearchOutcome, SearchError};
use crate::objective::{CandidateScoreMatrix, ObjectiveVector, ScoreMatrixError};
use crate::ranking::{rank_candidates, RankedCandidate};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("comparison matrix: {0}")]
    Ahp(#[from] AhpError),
    #[error("candidate scores: {0}")]
    Scores(#[from] ScoreMatrixError),
    #[error("matrix search: {0}")]
    MatrixSearch(#[from] SearchError),
    #[error("candidate search: {0}")]
    CandidateSearch(#[from] CandidateSearchError),
    #[error("job fit: {0}")]
    JobFit(#[from] JobFitError),
}

// =============================================================================
// AHP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AhpResponse {
    pub weights: CriterionWeights,
    pub consistency: ConsistencyReport,
    /// Consistency ratio known and at most 0.1.
    pub acceptable: bool,
}

pub fn run_ahp(matrix: &PairwiseMatrix) -> Result<AhpResponse, PipelineError> {
    let (weights, consistency) = ahp_run(matrix)?;
    Ok(AhpResponse {
        acceptable: consistency.is_acceptable(),
        weights,
        consistency,
    })
}

// =============================================================================
// Ranking
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntry {
    #[serde(default)]
    pub label: Option<String>,
    pub scores: Vec<f64>,
}

/// Candidates to rank, with either a fixed comparison matrix or a search
/// configuration used to find one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRequest {
    pub candidates: Vec<CandidateEntry>,
    #[serde(default)]
    pub comparison_matrix: Option<PairwiseMatrix>,
    #[serde(default)]
    pub search: Option<MatrixSearchConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResponse {
    pub comparison_matrix: PairwiseMatrix,
    pub weights: CriterionWeights,
    pub consistency: ConsistencyReport,
    pub acceptable: bool,
    pub ranking: Vec<RankedCandidate>,
    /// Present when the matrix came from a search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<ObjectiveVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_size: Option<usize>,
}

fn label_or_default(label: Option<&String>, index: usize) -> String {
    label
        .cloned()
        .unwrap_or_else(|| format!("candidate-{}", index + 1))
}

pub fn run_ranking(request: &RankingRequest) -> Result<RankingResponse, PipelineError> {
    let rows: Vec<Vec<f64>> = request.candidates.iter().map(|c| c.scores.clone()).collect();
    let scores = CandidateScoreMatrix::from_rows(&rows)?;

    let (matrix, objectives, archive_size) = match &request.comparison_matrix {
        Some(matrix) => (matrix.clone(), None, None),
        None => {
            let config = request.search.clone().unwrap_or_default();
            let outcome = optimize_matrix(&scores, &config)?;
            let archive_size = outcome.archive.len();
            let (matrix, objectives) = outcome.into_best();
            (matrix, Some(objectives), Some(archive_size))
        }
    };

    let (weights, consistency) = ahp_run(&matrix)?;
    let labels: Vec<String> = request
        .candidates
        .iter()
        .enumerate()
        .map(|(i, c)| label_or_default(c.label.as_ref(), i))
        .collect();
    let ranking = rank_candidates(&scores, &weights, Some(&labels))?;
    info!(
        candidates = ranking.len(),
        criteria = weights.len(),
        searched = objectives.is_some(),
        "ranked candidates"
    );

    Ok(RankingResponse {
        comparison_matrix: matrix,
        acceptable: consistency.is_acceptable(),
        weights,
        consistency,
        ranking,
        objectives,
        archive_size,
    })
}

// =============================================================================
// Searches
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSearchRequest {
    pub scores: CandidateScoreMatrix,
    #[serde(default)]
    pub config: MatrixSearchConfig,
}

pub fn run_matrix_search(request: &MatrixSearchRequest) -> Result<MatrixSearchOutcome, PipelineError> {
    Ok(optimize_matrix(&request.scores, &request.config)?)
}

/// Criterion box, weights, thresholds and penalties keyed by criterion name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSearchRequest {
    /// `[min, max]` per criterion.
    pub criteria_ranges: BTreeMap<String, (f64, f64)>,
    #[serde(default)]
    pub criteria_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub criteria_thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    pub criteria_penalties: BTreeMap<String, f64>,
    #[serde(default)]
    pub config: CandidateSearchConfig,
}

pub fn run_candidate_search(
    request: &CandidateSearchRequest,
) -> Result<CandidateSearchOutcome, PipelineError> {
    let spec = CriteriaSpec::from_maps(
        &request.criteria_ranges,
        &request.criteria_weights,
        &request.criteria_thresholds,
        &request.criteria_penalties,
    )?;
    Ok(optimize_candidates(&spec, &request.config)?)
}

// =============================================================================
// Job fit
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitRequest {
    pub job: JobRequirements,
    pub forms: Vec<CandidateForm>,
    /// 3x3 comparison of hard constraints, soft constraints and skills.
    #[serde(default)]
    pub comparison_matrix: Option<PairwiseMatrix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitCandidate {
    pub label: String,
    pub criterion_scores: [f64; CATEGORY_COUNT],
    pub hierarchy_score: f64,
    pub weighted_fit_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitResponse {
    pub weights: CriterionWeights,
    pub consistency: ConsistencyReport,
    pub candidates: Vec<JobFitCandidate>,
    /// Candidates ordered by hierarchy score.
    pub ranking: Vec<RankedCandidate>,
}

pub fn run_job_fit(request: &JobFitRequest) -> Result<JobFitResponse, PipelineError> {
    let matrix = request
        .comparison_matrix
        .clone()
        .unwrap_or_else(default_category_matrix);
    let (weights, consistency) = ahp_run(&matrix)?;
    let scores = score_matrix(&request.job, &request.forms)?;

    let labels: Vec<String> = request
        .forms
        .iter()
        .enumerate()
        .map(|(i, f)| label_or_default(f.label.as_ref(), i))
        .collect();

    let mut candidates = Vec::with_capacity(request.forms.len());
    for (form, label) in request.forms.iter().zip(&labels) {
        candidates.push(JobFitCandidate {
            label: label.clone(),
            criterion_scores: criterion_scores(&request.job, form),
            hierarchy_score: hierarchy_score(&request.job, form, &matrix)?,
            weighted_fit_score: weighted_fit_score(&request.job, &form.bio),
        });
    }
    let ranking = rank_candidates(&scores, &weights, Some(&labels))?;
    info!(candidates = candidates.len(), "scored job fit");

    Ok(JobFitResponse {
        weights,
        consistency,
        candidates,
        ranking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<CandidateEntry> {
        vec![
            CandidateEntry {
                label: Some("ana".into()),
                scores: vec![5.0, 6.0],
            },
            CandidateEntry {
                label: None,
                scores: vec![2.0, 3.0],
            },
        ]
    }

    #[test]
    fn ranking_with_fixed_matrix() {
        let request = RankingRequest {
            candidates: entries(),
            comparison_matrix: Some(PairwiseMatrix::from_weights(&[0.6, 0.4]).unwrap()),
            search: None,
        };
        let response = run_ranking(&request).unwrap();
        assert!(response.acceptable);
        assert!(response.objectives.is_none());
        assert_eq!(response.ranking[0].label.as_deref(), Some("ana"));
        assert_eq!(response.ranking[1].label.as_deref(), Some("candidate-2"));
        assert!((response.ranking[0].score - 5.4).abs() < 1e-9);
    }

    #[test]
    fn ranking_without_matrix_searches_for_one() {
        let request = RankingRequest {
            candidates: entries(),
            comparison_matrix: None,
            search: Some(MatrixSearchConfig {
                population_size: 12,
                generations: 5,
                archive_capacity: 6,
                ..MatrixSearchConfig::default()
            }),
        };
        let response = run_ranking(&request).unwrap();
        assert_eq!(response.weights.len(), 2);
        assert!(response.objectives.is_some());
        assert!(response.archive_size.is_some_and(|n| (1..=6).contains(&n)));
        assert_eq!(response.ranking[0].index, 0);
    }

    #[test]
    fn mismatched_matrix_is_reported() {
        let request = RankingRequest {
            candidates: entries(),
            comparison_matrix: Some(PairwiseMatrix::identity(3)),
            search: None,
        };
        assert!(matches!(
            run_ranking(&request),
            Err(PipelineError::Scores(ScoreMatrixError::WeightLengthMismatch { .. }))
        ));
    }

    #[test]
    fn candidate_request_parses_from_json() {
        let json = r#"{
            "criteria_ranges": {"experience": [0, 10], "technique": [0, 10]},
            "criteria_weights": {"experience": 0.6, "technique": 0.4},
            "criteria_thresholds": {"experience": 7},
            "config": {"population_size": 10, "rng_seed": 5}
        }"#;
        let request: CandidateSearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.config.generations, 7);
        let outcome = run_candidate_search(&request).unwrap();
        assert_eq!(outcome.best.chromosome.len(), 2);
        assert!(!outcome.history.is_empty());
    }
}
