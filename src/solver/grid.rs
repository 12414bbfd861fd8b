use crate::error::EmissionError;

/// Added to the step count when computing the solver step, so accumulated
/// rounding cannot push the last output time past the end of the span.
pub const FLOATING_POINT_ZERO: f64 = 1e-12;

/// Uniform output grid shared by the analytic and the numeric side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    t0: f64,
    tf: f64,
    steps: usize,
}

impl TimeGrid {
    pub fn new(t0: f64, tf: f64, steps: usize) -> Result<Self, EmissionError> {
        if steps == 0 {
            return Err(EmissionError::InvalidGrid(
                "the number of time steps must be at least one".to_string(),
            ));
        }
        if !t0.is_finite() || !tf.is_finite() || tf <= t0 {
            return Err(EmissionError::InvalidGrid(format!(
                "the time span [{}, {}] must be finite and increasing",
                t0, tf
            )));
        }
        Ok(Self { t0, tf, steps })
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn tf(&self) -> f64 {
        self.tf
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of grid points, `steps + 1`.
    pub fn len(&self) -> usize {
        self.steps + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `t_i = t0 + (tf - t0) * i / steps`.
    #[inline(always)]
    pub fn time(&self, i: usize) -> f64 {
        self.t0 + (self.tf - self.t0) * i as f64 / self.steps as f64
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=self.steps).map(move |i| self.time(i))
    }

    /// Output spacing handed to the integrator.
    pub fn solver_step(&self) -> f64 {
        (self.tf - self.t0) / (self.steps as f64 + FLOATING_POINT_ZERO)
    }

    /// Output times as the integrator produces them, `t0 + i * solver_step()`.
    pub fn solver_times(&self) -> Vec<f64> {
        let dx = self.solver_step();
        (0..=self.steps).map(|i| self.t0 + i as f64 * dx).collect()
    }

    /// Largest distance tolerated between a grid time and the matching
    /// integrator output time.
    pub fn matching_tolerance(&self) -> f64 {
        1e-9 * (1.0 + self.tf.abs().max(self.t0.abs()))
    }
}
