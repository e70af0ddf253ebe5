use nalgebra as na;

use crate::observation::{self, Sample};

const PROCESS_NOISE: f32 = 1e-4;
const MEASUREMENT_NOISE: f32 = 1e-1;
const INITIAL_ERROR: f32 = 0.1;

/// Linear Kalman filter over a 2D point.
///
/// State is {x, y, vx, vy} when the acceleration factor is negative, or
/// {x, y, vx, vy, ax, ay} otherwise. Only (x, y) is measured.
#[derive(Debug, Clone)]
pub struct PointFilter {
    state: na::DVector<f32>,
    transition: na::DMatrix<f32>,
    measurement: na::DMatrix<f32>,
    process_noise: na::DMatrix<f32>,
    measurement_noise: na::DMatrix<f32>,
    error_cov: na::DMatrix<f32>,
}

impl PointFilter {
    /// Creates a filter at rest at (x, y). `dt` scales the velocity term of
    /// the transition model; a non-negative `dv` switches to the 6-state
    /// constant-acceleration model with `dv` scaling the acceleration terms.
    pub fn new(x: f32, y: f32, dt: f32, dv: f32) -> Self {
        let n = if dv < 0.0 { 4 } else { 6 };

        let mut state = na::DVector::zeros(n);
        state[0] = x;
        state[1] = y;

        let mut measurement = na::DMatrix::zeros(2, n);
        measurement[(0, 0)] = 1.0;
        measurement[(1, 1)] = 1.0;

        Self {
            state,
            transition: transition_matrix(n, dt, dv),
            measurement,
            process_noise: na::DMatrix::identity(n, n) * PROCESS_NOISE,
            measurement_noise: na::DMatrix::identity(2, 2) * MEASUREMENT_NOISE,
            error_cov: na::DMatrix::identity(n, n) * INITIAL_ERROR,
        }
    }

    /// Rebuilds the transition matrix, keeping state and covariances.
    pub fn set_transition(&mut self, dt: f32, dv: f32) {
        self.transition = transition_matrix(self.state.len(), dt, dv);
    }

    /// Advances the state one transition step and returns the predicted
    /// position. The posterior is overwritten with the prediction, so
    /// consecutive prediction-only steps keep extrapolating.
    pub fn predict(&mut self) -> [f32; 2] {
        self.state = &self.transition * &self.state;
        self.error_cov = &self.transition * &self.error_cov * self.transition.transpose()
            + &self.process_noise;

        [self.state[0], self.state[1]]
    }

    /// Applies a measurement update, then force-sets the posterior position
    /// to the raw measurement. The overwrite keeps the output glued to the
    /// observation while velocity (and acceleration) still come from the
    /// Kalman gain.
    pub fn correct(&mut self, x: f32, y: f32) -> [f32; 2] {
        let h = &self.measurement;
        let innovation_cov = h * &self.error_cov * h.transpose() + &self.measurement_noise;
        let s_inv = innovation_cov
            .try_inverse()
            .expect("innovation covariance is singular");

        let gain = &self.error_cov * h.transpose() * s_inv;
        let innovation = na::DVector::from_column_slice(&[x, y]) - h * &self.state;

        self.state += &gain * innovation;
        let n = self.state.len();
        self.error_cov = (na::DMatrix::identity(n, n) - gain * h) * &self.error_cov;

        self.state[0] = x;
        self.state[1] = y;

        [x, y]
    }

    /// Current posterior position.
    #[inline]
    pub fn position(&self) -> [f32; 2] {
        [self.state[0], self.state[1]]
    }

    /// Current posterior velocity.
    #[inline]
    pub fn velocity(&self) -> [f32; 2] {
        [self.state[2], self.state[3]]
    }

    /// One predict-or-correct cycle driven by a possibly missing observation.
    ///
    /// A missing observation (both coordinates negative) below the retirement
    /// threshold yields the predicted position and bumps the counter; a
    /// present one corrects the filter and resets the counter. Once the
    /// counter has reached `max_missing`, a missing observation is passed
    /// back unchanged — the negative coordinates signal the caller that this
    /// entity is due for retirement. A half-negative pair is malformed input
    /// and is treated as fully missing.
    pub fn update_step(&mut self, x: f32, y: f32, missing: &mut u32, max_missing: u32) -> [f32; 2] {
        let predicted = self.predict();

        match observation::classify(x, y) {
            Sample::Present => {
                self.correct(x, y);
                *missing = 0;
                [x, y]
            }
            kind => {
                if kind == Sample::Malformed {
                    log::warn!("malformed observation ({}, {}), treating as missing", x, y);
                }

                if *missing < max_missing {
                    *missing += 1;
                    predicted
                } else {
                    [x, y]
                }
            }
        }
    }
}

fn transition_matrix(n: usize, dt: f32, dv: f32) -> na::DMatrix<f32> {
    let mut m = na::DMatrix::identity(n, n);
    m[(0, 2)] = dt;
    m[(1, 3)] = dt;

    if n == 6 {
        m[(0, 4)] = 0.5 * dv;
        m[(1, 5)] = 0.5 * dv;
        m[(2, 4)] = dv;
        m[(3, 5)] = dv;
    }

    m
}
