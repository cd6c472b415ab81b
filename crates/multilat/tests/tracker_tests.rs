use multilat::config::TrackerConfig;
use multilat::tracker::KalmanTracker;
use multilat_core::Point3;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

// =============================================================================
// HELPERS
// =============================================================================

const DT: f64 = 0.2;
const MEASUREMENT_SIGMA: f64 = 0.3;

fn tracker_config() -> TrackerConfig {
    TrackerConfig {
        noise_ax: 0.5,
        noise_ay: 0.5,
        noise_az: 0.5,
        measurement_noise: MEASUREMENT_SIGMA * MEASUREMENT_SIGMA,
    }
}

fn truth_at(step: usize, velocity: Point3) -> Point3 {
    let t = step as f64 * DT;
    Point3::new(velocity.x * t, velocity.y * t, velocity.z * t)
}

// =============================================================================
// INITIALIZATION
// =============================================================================

#[test]
fn first_measurement_seeds_the_state() {
    let mut filter = KalmanTracker::new(&tracker_config());
    assert!(!filter.is_initialized());

    let prediction = filter.process_measurement(Point3::new(2.0, -1.0, 4.0), 0.0);

    assert!(filter.is_initialized());
    assert_eq!(prediction, Point3::new(2.0, -1.0, 4.0));
    assert_eq!(filter.velocity(), Point3::ORIGIN);
}

// =============================================================================
// SMOOTHING
// =============================================================================

#[test]
fn smoothing_beats_raw_measurements_on_a_linear_track() {
    // Ten noisy estimates of a constant-velocity target; at step 10 the
    // filtered position must be closer to ground truth than the raw
    // measurement, averaged over 100 seeds.
    let velocity = Point3::new(1.0, 0.5, -0.25);
    let noise = Normal::new(0.0, MEASUREMENT_SIGMA).unwrap();

    let mut total_filtered_error = 0.0;
    let mut total_raw_error = 0.0;

    for seed in 0..100u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut filter = KalmanTracker::new(&tracker_config());

        let mut last_truth = Point3::ORIGIN;
        let mut last_measurement = Point3::ORIGIN;
        let mut last_prediction = Point3::ORIGIN;

        for step in 0..10 {
            let truth = truth_at(step, velocity);
            let measurement = Point3::new(
                truth.x + noise.sample(&mut rng),
                truth.y + noise.sample(&mut rng),
                truth.z + noise.sample(&mut rng),
            );

            last_truth = truth;
            last_measurement = measurement;
            last_prediction = filter.process_measurement(measurement, DT);
        }

        total_filtered_error += last_prediction.distance_to(&last_truth);
        total_raw_error += last_measurement.distance_to(&last_truth);
    }

    let filtered = total_filtered_error / 100.0;
    let raw = total_raw_error / 100.0;
    assert!(
        filtered < raw,
        "filtered error {filtered:.4} should beat raw error {raw:.4}"
    );
}

#[test]
fn velocity_converges_on_a_linear_track() {
    let velocity = Point3::new(1.0, 0.5, -0.25);
    let mut filter = KalmanTracker::new(&tracker_config());

    for step in 0..60 {
        filter.process_measurement(truth_at(step, velocity), DT);
    }

    assert!(filter.velocity().distance_to(&velocity) < 0.05);
}

#[test]
fn late_rounds_widen_the_prediction_interval() {
    let mut filter = KalmanTracker::new(&tracker_config());
    filter.process_measurement(Point3::ORIGIN, 0.0);
    filter.process_measurement(Point3::new(1.0, 0.0, 0.0), DT);

    // One skipped tick: the next measurement just carries a larger dt.
    let prediction = filter.process_measurement(Point3::new(3.0, 0.0, 0.0), 3.0 * DT);
    assert!(prediction.x > 1.0 && prediction.x < 3.5);
}
