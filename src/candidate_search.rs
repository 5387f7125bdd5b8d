//! Penalty-based genetic search in criterion space.
//!
//! Individuals are candidate profiles: one value per criterion inside that
//! criterion's `[min, max]` box. Fitness is the weighted criterion sum minus
//! threshold penalties:
//!
//! `fitness = Σ score_i · weight_i − Σ coef_i · (threshold_i − score_i)`
//!
//! where the penalty term only applies when `score_i < threshold_i`.
//!
//! Criteria are kept in name order, which also fixes the structural
//! crossover split.

use std::collections::BTreeMap;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use thiserror::Error;
use tracing::{debug, info};

/// Penalty coefficient for a thresholded criterion with no explicit coefficient.
const DEFAULT_PENALTY: f64 = 1.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandidateSearchError {
    #[error("population_size must be at least 1")]
    EmptyPopulation,
    #[error("criterion {criterion} has invalid range [{min}, {max}]")]
    InvalidRange { criterion: String, min: f64, max: f64 },
    #[error("{field} references unknown criterion {criterion}")]
    UnknownCriterion {
        criterion: String,
        field: &'static str,
    },
    #[error("{field} for criterion {criterion} must be finite, got {value}")]
    NonFiniteCoefficient {
        criterion: String,
        field: &'static str,
        value: f64,
    },
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// One criterion of the search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub weight: f64,
    pub threshold: Option<f64>,
    pub penalty: f64,
}

/// Ordered criteria with their weights, thresholds and penalties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaSpec {
    criteria: Vec<CriterionSpec>,
}

fn check_known(
    ranges: &BTreeMap<String, (f64, f64)>,
    values: &BTreeMap<String, f64>,
    field: &'static str,
) -> Result<(), CandidateSearchError> {
    for (criterion, &value) in values {
        if !ranges.contains_key(criterion) {
            return Err(CandidateSearchError::UnknownCriterion {
                criterion: criterion.clone(),
                field,
            });
        }
        if !value.is_finite() {
            return Err(CandidateSearchError::NonFiniteCoefficient {
                criterion: criterion.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}

impl CriteriaSpec {
    /// Build from the four per-criterion mappings.
    ///
    /// Criteria are ordered by name, and that order also positions the
    /// fixed crossover segment.
    ///
    /// Criteria missing from `weights` weigh 0. Criteria missing from
    /// `thresholds` are never penalized. A threshold without a coefficient
    /// uses a coefficient of 1.
    pub fn from_maps(
        ranges: &BTreeMap<String, (f64, f64)>,
        weights: &BTreeMap<String, f64>,
        thresholds: &BTreeMap<String, f64>,
        penalties: &BTreeMap<String, f64>,
    ) -> Result<Self, CandidateSearchError> {
        check_known(ranges, weights, "criteria_weights")?;
        check_known(ranges, thresholds, "criteria_thresholds")?;
        check_known(ranges, penalties, "criteria_penalties")?;

        let mut criteria = Vec::with_capacity(ranges.len());
        for (name, &(min, max)) in ranges {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(CandidateSearchError::InvalidRange {
                    criterion: name.clone(),
                    min,
                    max,
                });
            }
            criteria.push(CriterionSpec {
                name: name.clone(),
                min,
                max,
                weight: weights.get(name).copied().unwrap_or(0.0),
                threshold: thresholds.get(name).copied(),
                penalty: penalties.get(name).copied().unwrap_or(DEFAULT_PENALTY),
            });
        }
        Ok(Self { criteria })
    }

    pub fn criteria(&self) -> &[CriterionSpec] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Weighted score minus threshold shortfall penalties. Zero for an empty
    /// criteria set.
    pub fn fitness(&self, profile: &CandidateProfile) -> f64 {
        let mut score = 0.0;
        let mut penalty = 0.0;
        for c in &self.criteria {
            let Some(&value) = profile.chromosome.get(&c.name) else {
                continue;
            };
            score += value * c.weight;
            if let Some(threshold) = c.threshold {
                if value < threshold {
                    penalty += c.penalty * (threshold - value);
                }
            }
        }
        score - penalty
    }

    /// Euclidean distance over the declared criteria.
    pub fn distance(&self, a: &CandidateProfile, b: &CandidateProfile) -> f64 {
        self.criteria
            .iter()
            .map(|c| {
                let d = a.gene(&c.name) - b.gene(&c.name);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Half-open index range inherited from the second parent.
    fn middle_segment(&self) -> (usize, usize) {
        let n = self.criteria.len();
        (n.div_ceil(4), (3 * n).div_ceil(4))
    }
}

/// A point in criterion space and the generation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub chromosome: BTreeMap<String, f64>,
    pub generation: usize,
}

impl CandidateProfile {
    pub fn gene(&self, criterion: &str) -> f64 {
        self.chromosome.get(criterion).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateSearchConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Initial pool size as a multiple of `population_size`.
    pub pool_factor: f64,
    /// Competitors per tournament; `None` uses 20% of the population (at least 1).
    pub tournament_size: Option<usize>,
    pub crossover_prob: f64,
    /// Per-gene mutation probability.
    pub mutation_prob: f64,
    /// Standard deviation of the Gaussian mutation noise.
    pub mutation_sigma: f64,
    pub elitism_count: usize,
    /// Minimum Euclidean distance between greedily seeded individuals.
    pub min_distance: f64,
    /// Relative gain the best fitness must exceed to reset stagnation.
    pub improvement_threshold: f64,
    /// Consecutive non-improving generations before stopping.
    pub stagnation_limit: usize,
    pub rng_seed: u64,
}

impl Default for CandidateSearchConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 7,
            pool_factor: 0.5,
            tournament_size: None,
            crossover_prob: 0.8,
            mutation_prob: 0.2,
            mutation_sigma: 0.1,
            elitism_count: 2,
            min_distance: 2.0,
            improvement_threshold: 0.1,
            stagnation_limit: 2,
            rng_seed: 1337,
        }
    }
}

impl CandidateSearchConfig {
    pub fn validate(&self) -> Result<(), CandidateSearchError> {
        if self.population_size == 0 {
            return Err(CandidateSearchError::EmptyPopulation);
        }
        for (name, value) in [
            ("crossover_prob", self.crossover_prob),
            ("mutation_prob", self.mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CandidateSearchError::InvalidProbability { name, value });
            }
        }
        let non_negative = [
            ("pool_factor", self.pool_factor),
            ("min_distance", self.min_distance),
            ("improvement_threshold", self.improvement_threshold),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CandidateSearchError::InvalidParameter { name, value });
            }
        }
        if !(self.mutation_sigma.is_finite() && self.mutation_sigma > 0.0) {
            return Err(CandidateSearchError::InvalidParameter {
                name: "mutation_sigma",
                value: self.mutation_sigma,
            });
        }
        if self.tournament_size == Some(0) {
            return Err(CandidateSearchError::InvalidParameter {
                name: "tournament_size",
                value: 0.0,
            });
        }
        if self.stagnation_limit == 0 {
            return Err(CandidateSearchError::InvalidParameter {
                name: "stagnation_limit",
                value: 0.0,
            });
        }
        Ok(())
    }

    fn effective_tournament_size(&self) -> usize {
        self.tournament_size
            .unwrap_or_else(|| (self.population_size as f64 * 0.2) as usize)
            .max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Stagnation,
    GenerationBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSearchOutcome {
    pub best: CandidateProfile,
    pub fitness: f64,
    pub history: Vec<GenerationStats>,
    pub stop_reason: StopReason,
}

type Evaluated = (CandidateProfile, f64);

/// Generational GA with elitism and stagnation-based early stop.
pub struct CandidateSearch<'a> {
    spec: &'a CriteriaSpec,
    config: CandidateSearchConfig,
    noise: Normal,
    rng: StdRng,
}

impl<'a> CandidateSearch<'a> {
    pub fn new(
        spec: &'a CriteriaSpec,
        config: CandidateSearchConfig,
    ) -> Result<Self, CandidateSearchError> {
        config.validate()?;
        let noise = Normal::new(0.0, config.mutation_sigma).map_err(|_| {
            CandidateSearchError::InvalidParameter {
                name: "mutation_sigma",
                value: config.mutation_sigma,
            }
        })?;
        let rng = StdRng::seed_from_u64(config.rng_seed);
        Ok(Self {
            spec,
            config,
            noise,
            rng,
        })
    }

    fn random_profile(&mut self, generation: usize) -> CandidateProfile {
        let spec = self.spec;
        let chromosome = spec
            .criteria()
            .iter()
            .map(|c| (c.name.clone(), self.rng.gen_range(c.min..=c.max)))
            .collect();
        CandidateProfile {
            chromosome,
            generation,
        }
    }

    fn evaluate(&self, population: Vec<CandidateProfile>) -> Vec<Evaluated> {
        let mut evaluated: Vec<Evaluated> = population
            .into_iter()
            .map(|p| {
                let f = self.spec.fitness(&p);
                (p, f)
            })
            .collect();
        evaluated.sort_by(|a, b| b.1.total_cmp(&a.1));
        evaluated
    }

    /// Greedy diversity-constrained seeding from an oversampled pool.
    fn initial_population(&mut self) -> Vec<CandidateProfile> {
        let size = self.config.population_size;
        let pool_size = (self.config.pool_factor * size as f64) as usize;
        let pool: Vec<CandidateProfile> = (0..pool_size).map(|_| self.random_profile(0)).collect();
        let ranked = self.evaluate(pool);

        let mut taken = vec![false; ranked.len()];
        let mut selected: Vec<CandidateProfile> = Vec::with_capacity(size);
        for (idx, (candidate, _)) in ranked.iter().enumerate() {
            if selected.len() >= size {
                break;
            }
            let diverse = selected
                .iter()
                .all(|s| self.spec.distance(candidate, s) >= self.config.min_distance);
            if diverse {
                selected.push(candidate.clone());
                taken[idx] = true;
            }
        }

        for (idx, (candidate, _)) in ranked.iter().enumerate() {
            if selected.len() >= size {
                break;
            }
            if !taken[idx] {
                selected.push(candidate.clone());
            }
        }

        if selected.len() < size {
            debug!(
                pool = ranked.len(),
                missing = size - selected.len(),
                "initial pool smaller than population; filling with fresh random profiles"
            );
            while selected.len() < size {
                let fresh = self.random_profile(0);
                selected.push(fresh);
            }
        }
        selected
    }

    fn tournament<'e>(&mut self, evaluated: &'e [Evaluated]) -> &'e CandidateProfile {
        let k = self
            .config
            .effective_tournament_size()
            .min(evaluated.len());
        let winner = index::sample(&mut self.rng, evaluated.len(), k)
            .into_iter()
            .max_by(|&a, &b| evaluated[a].1.total_cmp(&evaluated[b].1))
            .unwrap_or(0);
        &evaluated[winner].0
    }

    /// Middle segment from `second`, the rest from `first`.
    pub fn crossover(&self, first: &CandidateProfile, second: &CandidateProfile) -> CandidateProfile {
        let (start, end) = self.spec.middle_segment();
        let chromosome = self
            .spec
            .criteria()
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let parent = if (start..end).contains(&idx) {
                    second
                } else {
                    first
                };
                (c.name.clone(), parent.gene(&c.name))
            })
            .collect();
        CandidateProfile {
            chromosome,
            generation: first.generation.max(second.generation) + 1,
        }
    }

    /// Gaussian noise per gene with probability `mutation_prob`, clamped to range.
    fn mutate(&mut self, profile: &mut CandidateProfile) {
        let spec = self.spec;
        for c in spec.criteria() {
            if !self.rng.gen_bool(self.config.mutation_prob) {
                continue;
            }
            if let Some(value) = profile.chromosome.get_mut(&c.name) {
                let perturbed = *value + self.noise.sample(&mut self.rng);
                *value = perturbed.clamp(c.min, c.max);
            }
        }
    }

    fn improves(&self, current: f64, previous: f64) -> bool {
        if previous == f64::NEG_INFINITY {
            return current > previous;
        }
        current > previous + self.config.improvement_threshold * previous.abs()
    }

    pub fn run(mut self) -> CandidateSearchOutcome {
        let size = self.config.population_size;
        let mut population = self.initial_population();
        let mut best: Option<Evaluated> = None;
        // Fitness the next generation must beat by the improvement margin.
        let mut baseline = f64::NEG_INFINITY;
        let mut stagnation = 0;
        let mut history = Vec::new();
        let mut stop_reason = StopReason::GenerationBudget;

        for generation in 0..self.config.generations {
            let evaluated = self.evaluate(population);
            let top = evaluated[0].1;
            let mean = evaluated.iter().map(|(_, f)| f).sum::<f64>() / evaluated.len() as f64;
            history.push(GenerationStats {
                generation,
                best_fitness: top,
                mean_fitness: mean,
            });
            debug!(generation, best = top, mean, "candidate search generation");

            if best.as_ref().map_or(true, |(_, f)| top > *f) {
                best = Some(evaluated[0].clone());
            }
            if self.improves(top, baseline) {
                baseline = top;
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            if stagnation >= self.config.stagnation_limit {
                info!(generation, best = top, baseline, "stopping early: stagnation");
                stop_reason = StopReason::Stagnation;
                population = evaluated.into_iter().map(|(p, _)| p).collect();
                break;
            }

            let elites = self.config.elitism_count.min(evaluated.len());
            let mut next: Vec<CandidateProfile> =
                evaluated[..elites].iter().map(|(p, _)| p.clone()).collect();
            while next.len() < size {
                let first = self.tournament(&evaluated).clone();
                let second = self.tournament(&evaluated);
                let mut child = if self.rng.gen_bool(self.config.crossover_prob) {
                    self.crossover(&first, second)
                } else {
                    CandidateProfile {
                        chromosome: first.chromosome.clone(),
                        generation: generation + 1,
                    }
                };
                self.mutate(&mut child);
                next.push(child);
            }
            population = next;
        }

        let (best, fitness) = match best {
            Some(found) => found,
            // No generation ran: report the best seeded profile.
            None => self
                .evaluate(population)
                .into_iter()
                .next()
                .unwrap_or_else(|| (self.random_profile(0), f64::NEG_INFINITY)),
        };
        info!(fitness, generations = history.len(), ?stop_reason, "candidate search finished");

        CandidateSearchOutcome {
            best,
            fitness,
            history,
            stop_reason,
        }
    }
}

/// Evolve candidate profiles toward the best penalized fitness.
pub fn optimize_candidates(
    spec: &CriteriaSpec,
    config: &CandidateSearchConfig,
) -> Result<CandidateSearchOutcome, CandidateSearchError> {
    Ok(CandidateSearch::new(spec, config.clone())?.run())
}
