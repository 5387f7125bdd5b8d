//! NSGA-II search over reciprocal comparison matrices.
//!
//! Each individual is a [`PairwiseMatrix`] scored by [`ObjectiveEvaluator`]
//! as `(consistency_ratio, -best_candidate_score)`. The loop:
//! - seeds the population from random criterion hierarchies, so the first
//!   generation is already close to consistent
//! - breeds offspring from random parent pairs with reciprocal-pair uniform
//!   crossover and Saaty-scale mutation
//! - keeps the best `population_size` of parents ∪ offspring by front rank and
//!   crowding distance
//! - maintains a bounded archive of the best fronts seen so far and
//!   periodically re-injects archive members into the population
//! - returns the archive member with the best weighted compromise score
//!
//! Individuals are owned values; crossover and mutation always work on a
//! fresh clone, so archive members are never modified through a child.

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ahp::{
    AhpEngine, CriterionWeights, PairwiseMatrix, DOMINANT_INTENSITIES, SAATY_SCALE,
    STRONG_INTENSITIES,
};
use crate::objective::{CandidateScoreMatrix, ObjectiveEvaluator, ObjectiveVector};
use crate::pareto::{compromise_index, non_dominated_sort, truncate_by_fronts, CompromiseWeights};

/// Configuration for [`MatrixSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSearchConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation budget; the only termination condition.
    pub generations: usize,
    /// Per-cell probability of mutating an upper-triangular judgment.
    pub mutation_rate: f64,
    /// Upper bound on archived solutions.
    pub archive_capacity: usize,
    /// Chance that a mutation draws an extreme judgment (1/9, 1/7, 7, 9)
    /// instead of any value on the Saaty scale.
    pub strong_mutation_prob: f64,
    /// Re-inject archive members every this many generations (0 disables).
    pub diversity_period: usize,
    /// Share of the population replaced on re-injection. Any positive share
    /// replaces at least one individual; 0 disables injection.
    pub diversity_fraction: f64,
    /// Weights of the final compromise pick.
    pub compromise: CompromiseWeights,
    pub rng_seed: u64,
}

impl Default for MatrixSearchConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            archive_capacity: 30,
            strong_mutation_prob: 0.5,
            diversity_period: 20,
            diversity_fraction: 0.1,
            compromise: CompromiseWeights::default(),
            rng_seed: 1337,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("population_size must be at least 1")]
    EmptyPopulation,
    #[error("archive_capacity must be at least 1")]
    ZeroArchiveCapacity,
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("compromise weights must be finite and non-negative")]
    InvalidCompromiseWeights,
    #[error("matrix search needs between 2 and {max} criteria, got {got}")]
    UnsupportedCriteriaCount { got: usize, max: usize },
}

impl MatrixSearchConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.population_size == 0 {
            return Err(SearchError::EmptyPopulation);
        }
        if self.archive_capacity == 0 {
            return Err(SearchError::ZeroArchiveCapacity);
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("strong_mutation_prob", self.strong_mutation_prob),
            ("diversity_fraction", self.diversity_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::InvalidProbability { name, value });
            }
        }
        let CompromiseWeights { consistency, score } = self.compromise;
        if !(consistency.is_finite() && score.is_finite() && consistency >= 0.0 && score >= 0.0) {
            return Err(SearchError::InvalidCompromiseWeights);
        }
        Ok(())
    }
}

/// A comparison matrix together with its objective vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub matrix: PairwiseMatrix,
    pub objectives: ObjectiveVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSearchOutcome {
    pub best_matrix: PairwiseMatrix,
    pub objectives: ObjectiveVector,
    /// AHP weights of `best_matrix`; absent only when every individual was degenerate.
    pub weights: Option<CriterionWeights>,
    pub archive: Vec<Solution>,
    pub generations_run: usize,
}

impl MatrixSearchOutcome {
    pub fn into_best(self) -> (PairwiseMatrix, ObjectiveVector) {
        (self.best_matrix, self.objectives)
    }
}

/// Matrix built from a random strict ordering of the criteria.
///
/// For each pair the higher-ranked criterion gets an intensity from
/// {3, 5, 7, 9} and the other its reciprocal.
pub fn random_hierarchy_matrix<R: Rng + ?Sized>(order: usize, rng: &mut R) -> PairwiseMatrix {
    let mut hierarchy: Vec<usize> = (0..order).collect();
    hierarchy.shuffle(rng);
    let mut position = vec![0; order];
    for (pos, &criterion) in hierarchy.iter().enumerate() {
        position[criterion] = pos;
    }

    let mut matrix = PairwiseMatrix::identity(order);
    for i in 0..order {
        for j in (i + 1)..order {
            let intensity = DOMINANT_INTENSITIES[rng.gen_range(0..DOMINANT_INTENSITIES.len())];
            let value = if position[i] < position[j] {
                intensity
            } else {
                1.0 / intensity
            };
            matrix.set_pair(i, j, value);
        }
    }
    matrix
}

/// Uniform crossover over reciprocal pairs.
///
/// Each upper-triangular judgment is inherited from one parent and its
/// reciprocal travels with it, so the child is reciprocal on return.
pub(crate) fn crossover<R: Rng + ?Sized>(
    first: &PairwiseMatrix,
    second: &PairwiseMatrix,
    rng: &mut R,
) -> PairwiseMatrix {
    debug_assert_eq!(first.order(), second.order());
    let mut child = first.clone();
    let n = child.order();
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.gen_bool(0.5) {
                child.set_pair(i, j, second.get(i, j));
            }
        }
    }
    child
}

/// Perturb each upper-triangular judgment with probability `rate` and mirror
/// the reciprocal into the lower triangle.
///
/// `rate` and `strong_prob` must lie in `[0, 1]`; [`MatrixSearchConfig::validate`]
/// guarantees this for the search loop.
pub(crate) fn mutate<R: Rng + ?Sized>(
    matrix: &mut PairwiseMatrix,
    rate: f64,
    strong_prob: f64,
    rng: &mut R,
) {
    let n = matrix.order();
    for i in 0..n {
        for j in (i + 1)..n {
            if !rng.gen_bool(rate) {
                continue;
            }
            let value = if rng.gen_bool(strong_prob) {
                STRONG_INTENSITIES[rng.gen_range(0..STRONG_INTENSITIES.len())]
            } else {
                SAATY_SCALE[rng.gen_range(0..SAATY_SCALE.len())]
            };
            matrix.set_pair(i, j, value);
        }
    }
}

fn take_indices<T>(items: Vec<T>, indices: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    indices.iter().filter_map(|&i| slots[i].take()).collect()
}

fn merge_unique(mut base: Vec<Solution>, extra: &[Solution]) -> Vec<Solution> {
    for candidate in extra {
        if !base.iter().any(|s| s.matrix == candidate.matrix) {
            base.push(candidate.clone());
        }
    }
    base
}

fn objectives_of(solutions: &[Solution]) -> Vec<ObjectiveVector> {
    solutions.iter().map(|s| s.objectives).collect()
}

/// NSGA-II driver bound to one candidate-score matrix.
pub struct MatrixSearch<'a> {
    config: MatrixSearchConfig,
    evaluator: ObjectiveEvaluator<'a>,
    order: usize,
    rng: StdRng,
}

impl<'a> MatrixSearch<'a> {
    pub fn new(
        scores: &'a CandidateScoreMatrix,
        config: MatrixSearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let engine = AhpEngine::default();
        let order = scores.criteria();
        if order < 2 || order > engine.max_order() {
            return Err(SearchError::UnsupportedCriteriaCount {
                got: order,
                max: engine.max_order(),
            });
        }
        let rng = StdRng::seed_from_u64(config.rng_seed);
        Ok(Self {
            config,
            evaluator: ObjectiveEvaluator::with_engine(engine, scores),
            order,
            rng,
        })
    }

    fn solution(&self, matrix: PairwiseMatrix) -> Solution {
        let objectives = self.evaluator.evaluate(&matrix);
        Solution { matrix, objectives }
    }

    fn initial_population(&mut self) -> Vec<Solution> {
        (0..self.config.population_size)
            .map(|_| {
                let matrix = random_hierarchy_matrix(self.order, &mut self.rng);
                self.solution(matrix)
            })
            .collect()
    }

    fn offspring(&mut self, population: &[Solution]) -> Vec<Solution> {
        let n = population.len();
        (0..self.config.population_size)
            .map(|_| {
                let a = self.rng.gen_range(0..n);
                let mut b = self.rng.gen_range(0..n);
                while n > 1 && b == a {
                    b = self.rng.gen_range(0..n);
                }
                let mut child =
                    crossover(&population[a].matrix, &population[b].matrix, &mut self.rng);
                mutate(
                    &mut child,
                    self.config.mutation_rate,
                    self.config.strong_mutation_prob,
                    &mut self.rng,
                );
                self.solution(child)
            })
            .collect()
    }

    fn update_archive(&self, archive: Vec<Solution>, population: &[Solution]) -> Vec<Solution> {
        let merged = merge_unique(archive, population);
        let keep = truncate_by_fronts(&objectives_of(&merged), self.config.archive_capacity);
        take_indices(merged, &keep)
    }

    fn injects_at(&self, generation: usize) -> bool {
        self.config.diversity_period > 0 && generation % self.config.diversity_period == 0
    }

    /// `max(1, round(fraction · population))`, capped by both sizes.
    fn injection_count(&self, population: usize, archive: usize) -> usize {
        if self.config.diversity_fraction <= 0.0 {
            return 0;
        }
        let wanted = (population as f64 * self.config.diversity_fraction).round() as usize;
        wanted.max(1).min(archive).min(population)
    }

    /// Replace the tail of the (survival-ordered) population with archive samples.
    fn inject_from_archive(&mut self, population: &mut [Solution], archive: &[Solution]) {
        let count = self.injection_count(population.len(), archive.len());
        if count == 0 {
            return;
        }
        let picks = index::sample(&mut self.rng, archive.len(), count);
        let start = population.len() - count;
        for (slot, pick) in population[start..].iter_mut().zip(picks.iter()) {
            *slot = archive[pick].clone();
        }
        debug!(count, "re-injected archive members into population");
    }

    pub fn run(mut self) -> MatrixSearchOutcome {
        let pop_size = self.config.population_size;
        let mut population = self.initial_population();
        let mut archive = self.update_archive(Vec::new(), &population);

        for generation in 1..=self.config.generations {
            let children = self.offspring(&population);
            let mut combined = population;
            combined.extend(children);

            let keep = truncate_by_fronts(&objectives_of(&combined), pop_size);
            population = take_indices(combined, &keep);
            archive = self.update_archive(archive, &population);

            if self.injects_at(generation) {
                self.inject_from_archive(&mut population, &archive);
            }

            let best_cr = archive
                .iter()
                .map(|s| s.objectives.consistency_ratio)
                .fold(f64::INFINITY, f64::min);
            let best_score = archive
                .iter()
                .map(|s| s.objectives.best_score())
                .fold(f64::NEG_INFINITY, f64::max);
            debug!(
                generation,
                front0 = non_dominated_sort(&objectives_of(&population))
                    .first()
                    .map_or(0, Vec::len),
                archive = archive.len(),
                best_cr,
                best_score,
                "matrix search generation"
            );
        }

        let candidates = merge_unique(archive.clone(), &population);
        let pick = compromise_index(&objectives_of(&candidates), self.config.compromise)
            .unwrap_or_default();
        let best = candidates[pick].clone();
        let weights = AhpEngine::default()
            .run(&best.matrix)
            .ok()
            .map(|(w, _)| w);

        info!(
            generations = self.config.generations,
            archive = archive.len(),
            consistency_ratio = best.objectives.consistency_ratio,
            best_score = best.objectives.best_score(),
            "matrix search finished"
        );

        MatrixSearchOutcome {
            best_matrix: best.matrix,
            objectives: best.objectives,
            weights,
            archive,
            generations_run: self.config.generations,
        }
    }
}

/// Search comparison matrices for `candidate_scores` and return the
/// compromise solution with the final archive.
pub fn optimize_matrix(
    candidate_scores: &CandidateScoreMatrix,
    config: &MatrixSearchConfig,
) -> Result<MatrixSearchOutcome, SearchError> {
    Ok(MatrixSearch::new(candidate_scores, config.clone())?.run())
}
