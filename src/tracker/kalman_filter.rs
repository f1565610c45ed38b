//! Constant-velocity Kalman filter for bounding box tracking.
//!
//! The 8-dimensional state space `(x, y, a, h, vx, vy, va, vh)` holds the
//! box center, aspect ratio, height and their velocities. The observation
//! model is the first four components.

use nalgebra::{Cholesky, SMatrix, SVector};

pub type StateMean = SVector<f64, 8>;
pub type StateCovariance = SMatrix<f64, 8, 8>;
pub type Measurement = SVector<f64, 4>;
pub type MeasurementCovariance = SMatrix<f64, 4, 4>;

/// 0.95 quantile of the chi-square distribution for 1..=9 degrees of freedom.
///
/// Use `chi2inv95(4)` as a gate on [`KalmanFilter::gating_distance`] when
/// the full `(x, y, a, h)` measurement is compared.
pub const fn chi2inv95(n_dof: usize) -> f64 {
    match n_dof {
        1 => 3.8415,
        2 => 5.9915,
        3 => 7.8147,
        4 => 9.4877,
        5 => 11.070,
        6 => 12.592,
        7 => 14.067,
        8 => 15.507,
        9 => 16.919,
        _ => panic!("chi2inv95: degrees of freedom out of range"),
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: StateCovariance,
    update_mat: SMatrix<f64, 4, 8>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::with_weights(1.0 / 20.0, 1.0 / 160.0)
    }

    /// Build a filter whose noise terms scale with the box height by the
    /// given position and velocity weights.
    pub fn with_weights(std_weight_position: f64, std_weight_velocity: f64) -> Self {
        let ndim = 4;
        let mut motion_mat = StateCovariance::identity();
        for i in 0..ndim {
            motion_mat[(i, ndim + i)] = 1.0;
        }

        let mut update_mat = SMatrix::<f64, 4, 8>::zeros();
        for i in 0..ndim {
            update_mat[(i, i)] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position,
            std_weight_velocity,
        }
    }

    /// Create a track state from an unassociated measurement, with zero
    /// velocity.
    pub fn initiate(&self, measurement: &Measurement) -> (StateMean, StateCovariance) {
        let mut mean = StateMean::zeros();
        mean.fixed_rows_mut::<4>(0).copy_from(measurement);

        let h = measurement[3];
        let std = StateMean::from([
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ]);

        (mean, StateCovariance::from_diagonal(&std.component_mul(&std)))
    }

    pub fn predict(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
    ) -> (StateMean, StateCovariance) {
        let h = mean[3];
        let std = StateMean::from([
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ]);
        let motion_cov = StateCovariance::from_diagonal(&std.component_mul(&std));

        let new_mean = self.motion_mat * mean;
        let new_covariance = self.motion_mat * covariance * self.motion_mat.transpose() + motion_cov;

        (new_mean, new_covariance)
    }

    /// Project the state distribution into measurement space.
    pub fn project(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
    ) -> (Measurement, MeasurementCovariance) {
        let h = mean[3];
        let std = Measurement::from([
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ]);
        let innovation_cov = MeasurementCovariance::from_diagonal(&std.component_mul(&std));

        let mean_proj = self.update_mat * mean;
        let covariance_proj =
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Kalman correction step.
    ///
    /// # Panics
    /// If the projected covariance is not positive definite. That only
    /// happens when the state was corrupted upstream.
    pub fn update(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
        measurement: &Measurement,
    ) -> (StateMean, StateCovariance) {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let chol = Cholesky::new(projected_cov)
            .expect("innovation covariance is not positive definite");

        // S * K^T = (P * H^T)^T
        let pht = covariance * self.update_mat.transpose();
        let kalman_gain = chol.solve(&pht.transpose()).transpose();

        let innovation = measurement - projected_mean;

        let new_mean = mean + kalman_gain * innovation;
        let new_covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();

        (new_mean, new_covariance)
    }

    /// Squared Mahalanobis distance between the projected state and each
    /// measurement.
    ///
    /// # Panics
    /// If the projected covariance is not positive definite.
    pub fn gating_distance(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
        measurements: &[Measurement],
    ) -> Vec<f64> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let chol = Cholesky::new(projected_cov)
            .expect("innovation covariance is not positive definite");
        let l = chol.l();

        measurements
            .iter()
            .map(|z| {
                let d = z - projected_mean;
                l.solve_lower_triangular(&d)
                    .expect("cholesky factor is singular")
                    .norm_squared()
            })
            .collect()
    }
}
