//! Non-linear least-squares multilateration.
//!
//! Estimates the target position `p` minimizing
//! `Σᵢ (‖p − sᵢ‖ − dᵢ)²` over the sensors that reported a distance,
//! via Levenberg-Marquardt on the 3x3 normal equations
//! `(JᵀJ + λ diag(JᵀJ)) δ = −Jᵀr`.

use std::collections::HashMap;

use nalgebra::{Matrix3, Vector3};

use multilat_core::{MultilatError, Point3, Result};

use crate::coordinator::NodeRecord;

/// Fewest (position, distance) pairs that make the 3-unknown problem
/// solvable.
pub const MIN_MEASUREMENTS: usize = 3;

const MAX_ITERATIONS: usize = 100;
const STEP_TOLERANCE: f64 = 1e-9;
const GRADIENT_TOLERANCE: f64 = 1e-9;
const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e12;
/// Per-measurement squared residual above which a converged point is
/// retried from a nudged start.
const RESTART_COST: f64 = 1e-6;

pub struct MultilatSolver {
    sensor_positions: HashMap<i32, Point3>,
    /// Warm start: the previous estimate seeds the next solve.
    initial_guess: Point3,
}

impl MultilatSolver {
    pub fn new() -> Self {
        Self {
            sensor_positions: HashMap::new(),
            initial_guess: Point3::ORIGIN,
        }
    }

    pub fn with_initial_guess(initial_guess: Point3) -> Self {
        Self {
            sensor_positions: HashMap::new(),
            initial_guess,
        }
    }

    /// Snapshots the registry. Called once, during activation.
    pub fn set_sensor_positions(&mut self, nodes: &HashMap<i32, NodeRecord>) {
        self.sensor_positions = nodes
            .iter()
            .map(|(&id, record)| (id, record.position))
            .collect();
    }

    /// Solves for the target position from this round's distances.
    /// Only the intersection of known sensors and reported distances
    /// contributes; fewer than [`MIN_MEASUREMENTS`] usable pairs is an
    /// error, as is a solve that exhausts its iteration budget.
    pub fn estimate_position(&mut self, distances: &HashMap<i32, f64>) -> Result<Point3> {
        let pairs: Vec<(Vector3<f64>, f64)> = distances
            .iter()
            .filter_map(|(id, &distance)| {
                let position = self.sensor_positions.get(id)?;
                Some((Vector3::new(position.x, position.y, position.z), distance))
            })
            .collect();

        if pairs.len() < MIN_MEASUREMENTS {
            return Err(MultilatError::InsufficientMeasurements {
                have: pairs.len(),
                need: MIN_MEASUREMENTS,
            });
        }

        let start = Vector3::new(
            self.initial_guess.x,
            self.initial_guess.y,
            self.initial_guess.z,
        );

        let first = levenberg_marquardt(start, &pairs);

        // A stationary point with a large residual is typically the
        // in-plane trap of a coplanar sensor set: the gradient normal
        // to the sensor plane vanishes for any in-plane iterate.
        // Restart once from an off-plane nudge and keep the lower cost.
        let best = match first {
            Some((p, cost)) if cost <= RESTART_COST * pairs.len() as f64 => Some((p, cost)),
            _ => {
                let nudged = first.map(|(p, _)| p).unwrap_or(start) + Vector3::repeat(1.0);
                let second = levenberg_marquardt(nudged, &pairs);
                match (first, second) {
                    (Some(a), Some(b)) => Some(if b.1 < a.1 { b } else { a }),
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                }
            }
        };

        let Some((p, _)) = best else {
            return Err(MultilatError::SolverDivergence);
        };

        let estimate = Point3::new(p.x, p.y, p.z);
        self.initial_guess = estimate;
        Ok(estimate)
    }
}

impl Default for MultilatSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// One Levenberg-Marquardt descent from `start`. Returns the iterate
/// and its cost on convergence, `None` when the iteration budget or
/// the damping ceiling is exhausted first.
fn levenberg_marquardt(
    start: Vector3<f64>,
    pairs: &[(Vector3<f64>, f64)],
) -> Option<(Vector3<f64>, f64)> {
    let mut p = start;
    let mut lambda = INITIAL_DAMPING;
    let mut cost = residual_cost(&p, pairs);

    for _ in 0..MAX_ITERATIONS {
        let (jtj, jtr) = normal_equations(&p, pairs);

        if jtr.norm() < GRADIENT_TOLERANCE {
            return Some((p, cost));
        }

        let mut damped = jtj;
        for i in 0..3 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(f64::EPSILON);
        }

        let step = match damped.lu().solve(&(-jtr)) {
            Some(step) => step,
            None => {
                lambda *= 10.0;
                if lambda > MAX_DAMPING {
                    return None;
                }
                continue;
            }
        };

        let candidate = p + step;
        let candidate_cost = residual_cost(&candidate, pairs);

        if candidate_cost < cost {
            p = candidate;
            cost = candidate_cost;
            lambda = (lambda * 0.1).max(1e-12);

            if step.norm() < STEP_TOLERANCE {
                return Some((p, cost));
            }
        } else {
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                return None;
            }
        }
    }

    None
}

fn residual_cost(p: &Vector3<f64>, pairs: &[(Vector3<f64>, f64)]) -> f64 {
    pairs
        .iter()
        .map(|(sensor, distance)| {
            let r = (p - sensor).norm() - distance;
            r * r
        })
        .sum()
}

/// Builds `JᵀJ` and `Jᵀr` for the residuals `rᵢ = ‖p − sᵢ‖ − dᵢ` with
/// Jacobian rows `(p − sᵢ)ᵀ / ‖p − sᵢ‖`. A sensor coincident with the
/// current iterate contributes a zero row instead of a division by
/// zero.
fn normal_equations(
    p: &Vector3<f64>,
    pairs: &[(Vector3<f64>, f64)],
) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();

    for (sensor, distance) in pairs {
        let diff = p - sensor;
        let range = diff.norm();
        if range < 1e-12 {
            continue;
        }

        let jacobian_row = diff / range;
        let residual = range - distance;

        jtj += jacobian_row * jacobian_row.transpose();
        jtr += jacobian_row * residual;
    }

    (jtj, jtr)
}
