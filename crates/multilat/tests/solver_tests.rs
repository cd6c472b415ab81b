use std::collections::HashMap;

use multilat::coordinator::NodeRecord;
use multilat::solver::{MultilatSolver, MIN_MEASUREMENTS};
use multilat_core::{MultilatError, Point3};

// =============================================================================
// HELPERS
// =============================================================================

fn sensor_set(positions: &[[f64; 3]]) -> HashMap<i32, NodeRecord> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let id = i as i32 + 1;
            (
                id,
                NodeRecord::new(id, p.into(), format!("tcp://127.0.0.1:25{id:03}")),
            )
        })
        .collect()
}

fn exact_distances(nodes: &HashMap<i32, NodeRecord>, truth: Point3) -> HashMap<i32, f64> {
    nodes
        .iter()
        .map(|(&id, record)| (id, record.position.distance_to(&truth)))
        .collect()
}

fn tetrahedron() -> HashMap<i32, NodeRecord> {
    sensor_set(&[
        [0.0, 0.0, 0.0],
        [10.0, 0.0, 0.0],
        [0.0, 10.0, 0.0],
        [0.0, 0.0, 10.0],
    ])
}

// =============================================================================
// RECOVERY
// =============================================================================

#[test]
fn noiseless_inputs_recover_the_exact_position() {
    let nodes = tetrahedron();
    let truth = Point3::new(3.0, 4.0, 5.0);

    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&nodes);

    let estimate = solver
        .estimate_position(&exact_distances(&nodes, truth))
        .unwrap();
    assert!(
        estimate.distance_to(&truth) < 1e-3,
        "estimate {estimate:?} too far from {truth:?}"
    );
}

#[test]
fn repeated_solves_are_bit_stable_within_epsilon() {
    let nodes = tetrahedron();
    let truth = Point3::new(-2.0, 7.0, 1.5);
    let distances = exact_distances(&nodes, truth);

    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&nodes);

    let mut estimates = Vec::new();
    for _ in 0..5 {
        estimates.push(solver.estimate_position(&distances).unwrap());
    }

    for window in estimates.windows(2) {
        assert!(window[0].distance_to(&window[1]) < 1e-9);
    }
}

#[test]
fn cold_and_warm_starts_agree() {
    let nodes = tetrahedron();
    let truth = Point3::new(3.0, 4.0, 5.0);
    let distances = exact_distances(&nodes, truth);

    let mut cold = MultilatSolver::new();
    cold.set_sensor_positions(&nodes);
    let cold_estimate = cold.estimate_position(&distances).unwrap();

    let mut warm = MultilatSolver::with_initial_guess(Point3::new(2.9, 4.1, 4.95));
    warm.set_sensor_positions(&nodes);
    let warm_estimate = warm.estimate_position(&distances).unwrap();

    assert!(cold_estimate.distance_to(&warm_estimate) < 1e-6);
}

// =============================================================================
// BOUNDARIES
// =============================================================================

#[test]
fn exactly_three_sensors_still_solve() {
    let nodes = sensor_set(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 10.0, 0.0]]);
    let truth = Point3::new(3.0, 4.0, 5.0);

    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&nodes);

    let estimate = solver
        .estimate_position(&exact_distances(&nodes, truth))
        .unwrap();
    assert!(estimate.distance_to(&truth) < 1e-3);
}

#[test]
fn two_sensors_are_insufficient() {
    let nodes = sensor_set(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);

    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&nodes);

    let result = solver.estimate_position(&exact_distances(&nodes, Point3::new(1.0, 1.0, 1.0)));
    assert!(matches!(
        result,
        Err(MultilatError::InsufficientMeasurements {
            have: 2,
            need: MIN_MEASUREMENTS,
        })
    ));
}

#[test]
fn empty_distance_map_is_insufficient() {
    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&tetrahedron());

    let result = solver.estimate_position(&HashMap::new());
    assert!(matches!(
        result,
        Err(MultilatError::InsufficientMeasurements { have: 0, .. })
    ));
}

#[test]
fn partial_round_uses_only_the_intersection() {
    let nodes = tetrahedron();
    let truth = Point3::new(3.0, 4.0, 5.0);

    let mut solver = MultilatSolver::new();
    solver.set_sensor_positions(&nodes);

    // Node 4 missed the round; an unknown node 42 snuck a value in.
    let mut distances = exact_distances(&nodes, truth);
    distances.remove(&4);
    distances.insert(42, 1.0);

    let estimate = solver.estimate_position(&distances).unwrap();
    assert!(estimate.distance_to(&truth) < 1e-2);
}
