use criteria_ranker::ahp::ahp_run;
use criteria_ranker::matrix_search::{optimize_matrix, MatrixSearchConfig, SearchError};
use criteria_ranker::objective::{evaluate, CandidateScoreMatrix};
use criteria_ranker::pareto::non_dominated_sort;

fn scores() -> CandidateScoreMatrix {
    CandidateScoreMatrix::from_rows(&[
        vec![8.0, 3.0, 6.0],
        vec![4.0, 9.0, 5.0],
        vec![6.0, 6.0, 6.0],
        vec![2.0, 4.0, 9.0],
        vec![7.0, 5.0, 3.0],
    ])
    .unwrap()
}

fn small_config(seed: u64) -> MatrixSearchConfig {
    MatrixSearchConfig {
        population_size: 24,
        generations: 30,
        archive_capacity: 10,
        diversity_period: 10,
        rng_seed: seed,
        ..MatrixSearchConfig::default()
    }
}

#[test]
fn archive_is_bounded_and_led_by_a_pareto_front() {
    let outcome = optimize_matrix(&scores(), &small_config(3)).unwrap();
    assert!(!outcome.archive.is_empty());
    assert!(outcome.archive.len() <= 10);
    assert_eq!(outcome.generations_run, 30);

    let objectives: Vec<_> = outcome.archive.iter().map(|s| s.objectives).collect();
    let fronts = non_dominated_sort(&objectives);
    let first = &fronts[0];
    for &i in first {
        for &j in first {
            assert!(!objectives[i].dominates(&objectives[j]));
        }
    }

    for solution in &outcome.archive {
        assert!(solution.matrix.is_reciprocal(1e-9));
        assert_eq!(evaluate(&solution.matrix, &scores()), solution.objectives);
    }
}

#[test]
fn recommended_matrix_is_usable_for_ranking() {
    let outcome = optimize_matrix(&scores(), &small_config(11)).unwrap();
    assert!(outcome.objectives.is_finite());

    let (weights, report) = ahp_run(&outcome.best_matrix).unwrap();
    assert_eq!(Some(&weights), outcome.weights.as_ref());
    let cr = report.consistency_ratio.value().unwrap();
    assert!((cr - outcome.objectives.consistency_ratio).abs() < 1e-12);

    let best = scores()
        .weighted_scores(weights.as_slice())
        .unwrap()
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    assert!((best - outcome.objectives.best_score()).abs() < 1e-9);
}

#[test]
fn same_seed_same_outcome() {
    let a = optimize_matrix(&scores(), &small_config(99)).unwrap();
    let b = optimize_matrix(&scores(), &small_config(99)).unwrap();
    assert_eq!(a.best_matrix, b.best_matrix);
    assert_eq!(a.archive, b.archive);
}

#[test]
fn misconfigured_search_is_rejected() {
    let one = CandidateScoreMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
    let err = optimize_matrix(&one, &MatrixSearchConfig::default()).unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedCriteriaCount { got: 1, .. }));

    let config = MatrixSearchConfig {
        archive_capacity: 0,
        ..MatrixSearchConfig::default()
    };
    assert_eq!(
        optimize_matrix(&scores(), &config).unwrap_err(),
        SearchError::ZeroArchiveCapacity
    );
}
