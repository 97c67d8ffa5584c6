//! Speed and acceleration estimation
//!
//! The raw wheel speed is quantized and noisy. The estimator smooths it and
//! derives an acceleration the controller can use.

/// Re-seed when the measurement jumps further than this from the estimate (m/s)
const RESEED_THRESHOLD: f64 = 2.0;

/// Turns raw speed samples into (speed, acceleration)
pub trait SpeedEstimator {
    /// Feed one raw sample (m/s), get back filtered speed and acceleration
    fn update(&mut self, v_raw: f64) -> (f64, f64);

    /// Forget all history
    fn reset(&mut self);
}

/// Constant-velocity Kalman filter with a precomputed steady-state gain.
///
/// State is `[v, a]`, `A = [[1, dt], [0, 1]]`, `C = [1, 0]`. With a fixed gain
/// `K` the update collapses to `x = (A - K·C)·x + K·z`.
#[derive(Debug, Clone)]
pub struct KalmanSpeedEstimator {
    dt: f64,
    gain: [f64; 2],
    x: [f64; 2],
}

impl KalmanSpeedEstimator {
    pub fn new(dt: f64, gain: [f64; 2]) -> Self {
        Self {
            dt,
            gain,
            x: [0.0, 0.0],
        }
    }

    /// Overwrite the state estimate
    pub fn set_state(&mut self, speed: f64, accel: f64) {
        self.x = [speed, accel];
    }

    pub fn state(&self) -> (f64, f64) {
        (self.x[0], self.x[1])
    }
}

impl Default for KalmanSpeedEstimator {
    fn default() -> Self {
        Self::new(0.01, [0.12287673, 0.29666309])
    }
}

impl SpeedEstimator for KalmanSpeedEstimator {
    fn update(&mut self, v_raw: f64) -> (f64, f64) {
        // Avoid a huge acceleration spike when first seeing a moving car
        if (v_raw - self.x[0]).abs() > RESEED_THRESHOLD {
            log::debug!("Re-seeding speed estimate: {:.2} -> {:.2}", self.x[0], v_raw);
            self.set_state(v_raw, 0.0);
        }

        let [k0, k1] = self.gain;
        let [v, a] = self.x;

        let v_next = (1.0 - k0) * v + self.dt * a + k0 * v_raw;
        let a_next = -k1 * v + a + k1 * v_raw;
        self.x = [v_next, a_next];

        (v_next, a_next)
    }

    fn reset(&mut self) {
        self.x = [0.0, 0.0];
    }
}
