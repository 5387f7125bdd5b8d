//! Text-match scoring of candidate forms against job requirements.
//!
//! Produces per-candidate category scores (hard constraints, soft
//! constraints, skills) that feed the AHP ranking, plus two scalar fit
//! scores. Matching is a case-insensitive substring test.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ahp::{AhpEngine, AhpError, PairwiseMatrix};
use crate::objective::{CandidateScoreMatrix, ScoreMatrixError};

/// Number of scoring categories: hard constraints, soft constraints, skills.
pub const CATEGORY_COUNT: usize = 3;

const SOFT_MATCH: f64 = 0.8;
const SOFT_MISS: f64 = 0.2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobFitError {
    #[error("category comparison matrix must be {CATEGORY_COUNT}x{CATEGORY_COUNT}, got order {got}")]
    CategoryCount { got: usize },
    #[error(transparent)]
    Ahp(#[from] AhpError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Hard,
    Soft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequirements {
    pub constraints: Vec<Constraint>,
    pub skills: Vec<SkillRequirement>,
}

impl JobRequirements {
    fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.kind == kind)
    }
}

/// Free-text answers a candidate submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateForm {
    pub label: Option<String>,
    pub experience: String,
    pub communication_skills: String,
    pub skills: String,
    pub bio: String,
}

fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Fraction of `needles` found in `haystack`, or `empty` when there are none.
fn match_ratio<'n>(needles: impl Iterator<Item = &'n str>, haystack: &str, empty: f64) -> f64 {
    let (found, total) = needles.fold((0usize, 0usize), |(found, total), n| {
        (found + usize::from(mentions(haystack, n)), total + 1)
    });
    if total == 0 {
        empty
    } else {
        found as f64 / total as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `[hard, soft, skills]` match ratios in `[0, 1]`.
///
/// No hard or soft constraints means full credit for that category; no skills
/// means zero.
pub fn criterion_scores(job: &JobRequirements, form: &CandidateForm) -> [f64; CATEGORY_COUNT] {
    let hard = match_ratio(
        job.constraints_of(ConstraintKind::Hard)
            .map(|c| c.description.as_str()),
        &form.experience,
        1.0,
    );
    let soft = match_ratio(
        job.constraints_of(ConstraintKind::Soft)
            .map(|c| c.description.as_str()),
        &form.communication_skills,
        1.0,
    );
    let skills = match_ratio(
        job.skills.iter().map(|s| s.name.as_str()),
        &form.skills,
        0.0,
    );
    [hard, soft, skills]
}

/// Hard constraints weigh least; soft constraints and skills tie.
pub fn default_category_matrix() -> PairwiseMatrix {
    let mut matrix = PairwiseMatrix::identity(CATEGORY_COUNT);
    matrix.set_pair(0, 1, 1.0 / 2.0);
    matrix.set_pair(0, 2, 1.0 / 3.0);
    matrix
}

/// AHP-weighted category score on a 0-100 scale, 2 decimals.
pub fn hierarchy_score(
    job: &JobRequirements,
    form: &CandidateForm,
    matrix: &PairwiseMatrix,
) -> Result<f64, JobFitError> {
    if matrix.order() != CATEGORY_COUNT {
        return Err(JobFitError::CategoryCount {
            got: matrix.order(),
        });
    }
    let (weights, _) = AhpEngine::default().run(matrix)?;
    let scores = criterion_scores(job, form);
    let total: f64 = weights
        .as_slice()
        .iter()
        .zip(scores)
        .map(|(w, s)| w * s)
        .sum();
    Ok(round2(total * 100.0))
}

/// Weight-averaged match of every constraint and skill against `bio`, on a
/// 0-100 scale. Zero total weight scores 0.
pub fn weighted_fit_score(job: &JobRequirements, bio: &str) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for c in &job.constraints {
        let hit = mentions(bio, &c.description);
        let value = match (c.kind, hit) {
            (ConstraintKind::Hard, true) => 1.0,
            (ConstraintKind::Hard, false) => 0.0,
            (ConstraintKind::Soft, true) => SOFT_MATCH,
            (ConstraintKind::Soft, false) => SOFT_MISS,
        };
        total += value * c.weight;
        weight_sum += c.weight;
    }
    for s in &job.skills {
        if mentions(bio, &s.name) {
            total += s.weight;
        }
        weight_sum += s.weight;
    }
    if weight_sum == 0.0 {
        return 0.0;
    }
    round2(total / weight_sum * 100.0)
}

/// One row of category scores per form.
pub fn score_matrix(
    job: &JobRequirements,
    forms: &[CandidateForm],
) -> Result<CandidateScoreMatrix, ScoreMatrixError> {
    let rows: Vec<Vec<f64>> = forms
        .iter()
        .map(|f| criterion_scores(job, f).to_vec())
        .collect();
    CandidateScoreMatrix::from_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobRequirements {
        JobRequirements {
            constraints: vec![
                Constraint {
                    kind: ConstraintKind::Hard,
                    description: "5 years".into(),
                    weight: 3.0,
                },
                Constraint {
                    kind: ConstraintKind::Hard,
                    description: "Master".into(),
                    weight: 1.0,
                },
                Constraint {
                    kind: ConstraintKind::Soft,
                    description: "teamwork".into(),
                    weight: 1.0,
                },
            ],
            skills: vec![
                SkillRequirement {
                    name: "Rust".into(),
                    weight: 2.0,
                },
                SkillRequirement {
                    name: "SQL".into(),
                    weight: 1.0,
                },
            ],
        }
    }

    fn form() -> CandidateForm {
        CandidateForm {
            label: Some("camille".into()),
            experience: "5 YEARS building APIs".into(),
            communication_skills: "Teamwork and mentoring".into(),
            skills: "rust, go".into(),
            bio: "Backend engineer, 5 years of Rust, loves teamwork".into(),
        }
    }

    #[test]
    fn category_ratios_are_case_insensitive() {
        assert_eq!(criterion_scores(&job(), &form()), [0.5, 1.0, 0.5]);
    }

    #[test]
    fn empty_categories_use_their_defaults() {
        let scores = criterion_scores(&JobRequirements::default(), &form());
        assert_eq!(scores, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn hierarchy_score_weights_categories() {
        let matrix = default_category_matrix();
        let (w, _) = AhpEngine::default().run(&matrix).unwrap();
        let expected = round2((w.as_slice()[0] * 0.5 + w.as_slice()[1] + w.as_slice()[2] * 0.5) * 100.0);
        let got = hierarchy_score(&job(), &form(), &matrix).unwrap();
        assert_eq!(got, expected);
        assert!(got > 0.0 && got <= 100.0);

        let err = hierarchy_score(&job(), &form(), &PairwiseMatrix::identity(2)).unwrap_err();
        assert_eq!(err, JobFitError::CategoryCount { got: 2 });
    }

    #[test]
    fn weighted_fit_averages_by_weight() {
        // Hard: 3*1 + 1*0, soft: 1*0.8, skills: 2*1 + 1*0 over weight 8.
        assert_eq!(weighted_fit_score(&job(), &form().bio), 72.5);
        assert_eq!(weighted_fit_score(&JobRequirements::default(), "anything"), 0.0);
    }

    #[test]
    fn score_matrix_has_one_row_per_form() {
        let m = score_matrix(&job(), &[form(), CandidateForm::default()]).unwrap();
        assert_eq!((m.candidates(), m.criteria()), (2, CATEGORY_COUNT));
        assert_eq!(m.to_rows()[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(score_matrix(&job(), &[]), Err(ScoreMatrixError::NoCandidates));
    }
}
