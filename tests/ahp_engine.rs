use criteria_ranker::ahp::{
    ahp_run, AhpEngine, AhpError, ConsistencyRatio, PairwiseMatrix, RANDOM_INDEX,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn weights_sum_to_one_and_follow_dominance() {
    let matrix = PairwiseMatrix::from_rows(&[
        vec![1.0, 3.0, 5.0, 7.0],
        vec![1.0 / 3.0, 1.0, 3.0, 5.0],
        vec![1.0 / 5.0, 1.0 / 3.0, 1.0, 3.0],
        vec![1.0 / 7.0, 1.0 / 5.0, 1.0 / 3.0, 1.0],
    ])
    .unwrap();
    let (weights, report) = ahp_run(&matrix).unwrap();
    let w = weights.as_slice();

    assert!(approx_eq(w.iter().sum::<f64>(), 1.0, 1e-9));
    assert!(w.windows(2).all(|pair| pair[0] > pair[1]));
    assert!(report.lambda_max >= 4.0 - 1e-9);
    let cr = report.consistency_ratio.value().unwrap();
    assert!(cr > 0.0 && cr < 0.1, "cr = {cr}");
    assert!(report.is_acceptable());
}

#[test]
fn consistent_matrix_from_weights_recovers_them() {
    let target = [0.5, 0.3, 0.15, 0.05];
    let matrix = PairwiseMatrix::from_weights(&target).unwrap();
    let (weights, report) = ahp_run(&matrix).unwrap();
    for (got, want) in weights.as_slice().iter().zip(target) {
        assert!(approx_eq(*got, want, 1e-9));
    }
    assert!(approx_eq(report.lambda_max, 4.0, 1e-9));
    assert!(report.consistency_ratio.value().unwrap().abs() < 1e-9);
}

#[test]
fn ratio_is_unavailable_past_the_random_index_table() {
    let n = RANDOM_INDEX.len() + 1;
    let (weights, report) = AhpEngine::default().run(&PairwiseMatrix::identity(n)).unwrap();
    assert_eq!(weights.len(), n);
    assert_eq!(report.consistency_ratio, ConsistencyRatio::Unavailable);
    assert!(!report.is_acceptable());
}

#[test]
fn malformed_matrices_are_rejected() {
    let not_reciprocal = PairwiseMatrix::from_rows(&[vec![1.0, 3.0], vec![3.0, 1.0]]);
    assert!(matches!(not_reciprocal, Err(AhpError::NotReciprocal { .. })));

    let bad_diagonal = PairwiseMatrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 1.0]]);
    assert!(matches!(bad_diagonal, Err(AhpError::NonUnitDiagonal { .. })));

    let err = PairwiseMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap_err();
    assert!(err.is_malformed());
}

#[test]
fn matrix_json_is_a_list_of_rows() {
    let matrix: PairwiseMatrix =
        serde_json::from_str("[[1, 2, 4], [0.5, 1, 2], [0.25, 0.5, 1]]").unwrap();
    assert_eq!(matrix.order(), 3);
    let (_, report) = ahp_run(&matrix).unwrap();
    assert!(report.consistency_ratio.value().unwrap().abs() < 1e-9);

    let bad: Result<PairwiseMatrix, _> = serde_json::from_str("[[1, -2], [-0.5, 1]]");
    assert!(bad.is_err());
}
