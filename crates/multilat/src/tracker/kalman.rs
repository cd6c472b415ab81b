//! Linear Kalman filter over the state `[x, y, z, vx, vy, vz]` with a
//! 3D position measurement and a discrete white-noise acceleration
//! process model.

use nalgebra::{SMatrix, SVector};

use multilat_core::Point3;

use crate::config::TrackerConfig;

type State = SVector<f64, 6>;
type StateCov = SMatrix<f64, 6, 6>;
type Measurement = SVector<f64, 3>;
type MeasurementCov = SMatrix<f64, 3, 3>;
type Observation = SMatrix<f64, 3, 6>;

const INITIAL_VELOCITY_VAR: f64 = 1000.0;

pub struct KalmanTracker {
    x: State,
    p: StateCov,
    h: Observation,
    r: MeasurementCov,
    noise_ax: f64,
    noise_ay: f64,
    noise_az: f64,
    initialized: bool,
}

impl KalmanTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        let mut h = Observation::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        h[(2, 2)] = 1.0;

        let r = MeasurementCov::identity() * config.measurement_noise;

        let mut p = StateCov::identity();
        for i in 3..6 {
            p[(i, i)] = INITIAL_VELOCITY_VAR;
        }

        Self {
            x: State::zeros(),
            p,
            h,
            r,
            noise_ax: config.noise_ax,
            noise_ay: config.noise_ay,
            noise_az: config.noise_az,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn position(&self) -> Point3 {
        Point3::new(self.x[0], self.x[1], self.x[2])
    }

    pub fn velocity(&self) -> Point3 {
        Point3::new(self.x[3], self.x[4], self.x[5])
    }

    /// Folds one measurement in. The first measurement initializes the
    /// state at zero velocity; later ones predict over `dt` seconds and
    /// then update. Returns the filtered position.
    pub fn process_measurement(&mut self, measurement: Point3, dt: f64) -> Point3 {
        if !self.initialized {
            self.x = State::from_column_slice(&[
                measurement.x,
                measurement.y,
                measurement.z,
                0.0,
                0.0,
                0.0,
            ]);
            self.initialized = true;
            return self.position();
        }

        self.predict(dt);
        self.update(Measurement::new(measurement.x, measurement.y, measurement.z));
        self.position()
    }

    fn predict(&mut self, dt: f64) {
        let mut f = StateCov::identity();
        f[(0, 3)] = dt;
        f[(1, 4)] = dt;
        f[(2, 5)] = dt;

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut q = StateCov::zeros();
        for (axis, noise) in [self.noise_ax, self.noise_ay, self.noise_az]
            .into_iter()
            .enumerate()
        {
            q[(axis, axis)] = dt4 / 4.0 * noise;
            q[(axis, axis + 3)] = dt3 / 2.0 * noise;
            q[(axis + 3, axis)] = dt3 / 2.0 * noise;
            q[(axis + 3, axis + 3)] = dt2 * noise;
        }

        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + q;
    }

    fn update(&mut self, z: Measurement) {
        let innovation = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;

        let Some(s_inv) = s.try_inverse() else {
            tracing::warn!("singular innovation covariance, measurement skipped");
            return;
        };

        let gain = self.p * self.h.transpose() * s_inv;
        self.x += gain * innovation;
        self.p = (StateCov::identity() - gain * self.h) * self.p;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> KalmanTracker {
        KalmanTracker::new(&TrackerConfig::default())
    }

    #[test]
    fn test_first_measurement_initializes() {
        let mut filter = tracker();
        assert!(!filter.is_initialized());

        let out = filter.process_measurement(Point3::new(1.0, 2.0, 3.0), 0.0);
        assert!(filter.is_initialized());
        assert_eq!(out, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(filter.velocity(), Point3::ORIGIN);
    }

    #[test]
    fn test_tracks_stationary_target() {
        let mut filter = tracker();
        let truth = Point3::new(5.0, -2.0, 8.0);

        for _ in 0..20 {
            filter.process_measurement(truth, 0.1);
        }

        assert!(filter.position().distance_to(&truth) < 1e-6);
        assert!(filter.velocity().distance_to(&Point3::ORIGIN) < 1e-3);
    }

    #[test]
    fn test_learns_constant_velocity() {
        let mut filter = tracker();
        let velocity = Point3::new(1.0, 0.5, -0.25);
        let dt = 0.1;

        for step in 0..50 {
            let t = step as f64 * dt;
            let truth = Point3::new(velocity.x * t, velocity.y * t, velocity.z * t);
            filter.process_measurement(truth, dt);
        }

        assert!(filter.velocity().distance_to(&velocity) < 0.05);
    }

    #[test]
    fn test_larger_dt_is_accepted() {
        let mut filter = tracker();
        filter.process_measurement(Point3::new(0.0, 0.0, 0.0), 0.0);
        // A late RPC round simply widens the prediction interval.
        let out = filter.process_measurement(Point3::new(2.0, 0.0, 0.0), 2.5);
        assert!(out.x > 0.0 && out.x <= 2.0 + 1e-9);
    }
}
