#![forbid(unsafe_code)]

//! # criteria-ranker
//!
//! Multi-criteria candidate ranking built on the Analytic Hierarchy Process.
//!
//! A pairwise comparison matrix over the criteria yields normalized weights
//! and a consistency ratio; the weights rank candidates by their weighted
//! score. When no trustworthy matrix is available, an NSGA-II search looks
//! for matrices that are both consistent and favourable to the best
//! candidate, and a penalty-based genetic search explores ideal candidate
//! profiles in criterion space.

pub mod ahp;
pub mod candidate_search;
pub mod job_fit;
pub mod matrix_search;
pub mod objective;
pub mod pareto;
pub mod pipeline;
pub mod ranking;

pub use ahp::{
    ahp_run, AhpEngine, AhpError, ConsistencyRatio, ConsistencyReport, CriterionWeights,
    PairwiseMatrix,
};
pub use candidate_search::{
    optimize_candidates, CandidateProfile, CandidateSearchConfig, CandidateSearchError,
    CandidateSearchOutcome, CriteriaSpec, StopReason,
};
pub use matrix_search::{optimize_matrix, MatrixSearchConfig, MatrixSearchOutcome, SearchError};
pub use objective::{evaluate, CandidateScoreMatrix, ObjectiveVector, ScoreMatrixError};
pub use pipeline::PipelineError;
pub use ranking::{rank_candidates, RankedCandidate};
