//! Pareto machinery shared by the matrix search: fast non-dominated sorting,
//! crowding distance, front-first truncation and the compromise pick.
//!
//! Everything here works on indices into a slice of [`ObjectiveVector`]s so
//! the caller keeps ownership of the individuals.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::objective::ObjectiveVector;

/// Fast non-dominated sort (Deb et al., 2002).
///
/// Every index appears in exactly one front; `fronts[0]` holds the
/// individuals nothing dominates.
pub fn non_dominated_sort(objectives: &[ObjectiveVector]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if objectives[i].dominates(&objectives[j]) {
                dominated[i].push(j);
                domination_count[j] += 1;
            } else if objectives[j].dominates(&objectives[i]) {
                dominated[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance for one front, aligned with `front`.
///
/// Per-objective extremes get `+inf`. An objective with zero (or
/// non-finite) range adds nothing to interior members.
pub fn crowding_distance(front: &[usize], objectives: &[ObjectiveVector]) -> Vec<f64> {
    let n = front.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }
    let mut distance = vec![0.0; n];
    for obj in 0..2 {
        let value = |pos: usize| objectives[front[pos]].as_array()[obj];
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;

        let range = value(order[n - 1]) - value(order[0]);
        if !(range.is_finite() && range > 0.0) {
            continue;
        }
        for k in 1..(n - 1) {
            let gap = value(order[k + 1]) - value(order[k - 1]);
            if gap.is_finite() {
                distance[order[k]] += gap / range;
            }
        }
    }
    distance
}

/// Front rank and crowding distance per individual.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontAssignment {
    pub rank: Vec<usize>,
    pub crowding: Vec<f64>,
    pub fronts: Vec<Vec<usize>>,
}

pub fn assign_fronts(objectives: &[ObjectiveVector]) -> FrontAssignment {
    let fronts = non_dominated_sort(objectives);
    let mut rank = vec![0; objectives.len()];
    let mut crowding = vec![0.0; objectives.len()];
    for (r, front) in fronts.iter().enumerate() {
        let distances = crowding_distance(front, objectives);
        for (&idx, d) in front.iter().zip(distances) {
            rank[idx] = r;
            crowding[idx] = d;
        }
    }
    FrontAssignment {
        rank,
        crowding,
        fronts,
    }
}

/// All indices ordered by `(rank ascending, crowding descending)`.
pub fn survival_order(objectives: &[ObjectiveVector]) -> Vec<usize> {
    let assignment = assign_fronts(objectives);
    let mut order: Vec<usize> = (0..objectives.len()).collect();
    order.sort_by(|&a, &b| {
        assignment.rank[a]
            .cmp(&assignment.rank[b])
            .then_with(|| assignment.crowding[b].total_cmp(&assignment.crowding[a]))
    });
    order
}

/// Keep at most `capacity` indices: whole fronts first, then the boundary
/// front trimmed by descending crowding distance.
pub fn truncate_by_fronts(objectives: &[ObjectiveVector], capacity: usize) -> Vec<usize> {
    let mut order = survival_order(objectives);
    order.truncate(capacity);
    order
}

/// Weights of the final compromise score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompromiseWeights {
    pub consistency: f64,
    pub score: f64,
}

impl Default for CompromiseWeights {
    fn default() -> Self {
        Self {
            consistency: 0.6,
            score: 0.4,
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn normalize(value: f64, (lo, hi): (f64, f64)) -> f64 {
    let range = hi - lo;
    if range > 0.0 {
        (value - lo) / range
    } else {
        0.0
    }
}

/// Index maximizing `w_cr·(1 − norm_cr) + w_score·(1 − norm_obj2)` over the
/// finite individuals. Falls back to the first individual when none is finite.
pub fn compromise_index(objectives: &[ObjectiveVector], weights: CompromiseWeights) -> Option<usize> {
    if objectives.is_empty() {
        return None;
    }
    let finite: Vec<usize> = (0..objectives.len())
        .filter(|&i| objectives[i].is_finite())
        .collect();
    if finite.is_empty() {
        return Some(0);
    }

    let cr_bounds = min_max(finite.iter().map(|&i| objectives[i].consistency_ratio));
    let score_bounds = min_max(finite.iter().map(|&i| objectives[i].negated_best_score));

    let composite = |i: usize| {
        let o = &objectives[i];
        weights.consistency * (1.0 - normalize(o.consistency_ratio, cr_bounds))
            + weights.score * (1.0 - normalize(o.negated_best_score, score_bounds))
    };

    finite
        .iter()
        .copied()
        .max_by(|&a, &b| {
            composite(a)
                .partial_cmp(&composite(b))
                .unwrap_or(Ordering::Equal)
                // Prefer the earlier index on ties.
                .then_with(|| b.cmp(&a))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ov(cr: f64, neg: f64) -> ObjectiveVector {
        ObjectiveVector::new(cr, neg)
    }

    #[test]
    fn sort_covers_every_index_once() {
        let objs = vec![
            ov(1.0, 5.0),
            ov(5.0, 1.0),
            ov(3.0, 3.0),
            ov(4.0, 4.0),
            ObjectiveVector::WORST,
            ov(6.0, 6.0),
        ];
        let fronts = non_dominated_sort(&objs);
        let mut seen: Vec<usize> = fronts.iter().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);

        let mut f0 = fronts[0].clone();
        f0.sort();
        assert_eq!(f0, vec![0, 1, 2]);
        assert_eq!(fronts[1], vec![3]);
        assert_eq!(fronts.last().unwrap(), &vec![4]);
    }

    #[test]
    fn crowding_marks_extremes_infinite() {
        let objs = vec![ov(1.0, 5.0), ov(2.0, 4.0), ov(3.0, 2.0), ov(5.0, 1.0)];
        let front = vec![0, 1, 2, 3];
        let d = crowding_distance(&front, &objs);
        assert!(d[0].is_infinite());
        assert!(d[3].is_infinite());
        assert!(d[1].is_finite() && d[1] > 0.0);
        assert!(d[2].is_finite() && d[2] > 0.0);

        assert!(crowding_distance(&[0, 1], &objs).iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn crowding_tolerates_flat_objective() {
        let objs = vec![ov(0.0, 1.0), ov(0.0, 2.0), ov(0.0, 3.0)];
        let d = crowding_distance(&[0, 1, 2], &objs);
        // Only the second objective contributes to the middle member.
        assert!((d[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn truncation_keeps_whole_fronts_then_most_crowded() {
        let objs = vec![
            ov(0.0, 10.0),
            ov(10.0, 0.0),
            ov(1.0, 9.0),
            ov(5.0, 5.0),
            ov(9.0, 1.0),
            ov(20.0, 20.0),
        ];
        let kept = truncate_by_fronts(&objs, 4);
        assert_eq!(kept.len(), 4);
        assert!(kept.contains(&0) && kept.contains(&1));
        assert!(!kept.contains(&5));
        // Middle point has the largest interior crowding distance.
        assert!(kept.contains(&3));
    }

    #[test]
    fn compromise_prefers_consistency() {
        let objs = vec![ov(0.0, -4.0), ov(0.2, -5.0), ObjectiveVector::WORST];
        assert_eq!(compromise_index(&objs, CompromiseWeights::default()), Some(0));
        assert_eq!(
            compromise_index(&[ObjectiveVector::WORST], CompromiseWeights::default()),
            Some(0)
        );
        assert_eq!(compromise_index(&[], CompromiseWeights::default()), None);
    }
}
