//! Contract between the comparison driver and the numeric integrator.
//!
//! An [OdeIntegrator] takes an [OdeSystem] (right-hand side plus exact
//! Jacobian), an initial state and a [TimeGrid], and returns a [TimeSeries]
//! with one row per grid point. The default integrator is [BdfIntegrator],
//! built on `diffsol`.

mod bdf;
pub mod grid;

pub use bdf::BdfIntegrator;
pub use grid::TimeGrid;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::EmissionError;

type T = f64;
type V = nalgebra::DVector<T>;
type M = nalgebra::DMatrix<T>;

const ATOL: f64 = 1e-10;
const H0: f64 = 1e-6;

/// A first order ODE system `dy/dt = f(t, y)` with an analytic Jacobian.
pub trait OdeSystem {
    fn nstates(&self) -> usize;

    /// Writes `f(t, y)` into `dydt`.
    fn rhs(&self, t: T, y: &[T], dydt: &mut [T]);

    /// Writes `∂f/∂y` at `(t, y)` into `jac` (`nstates × nstates`).
    fn jacobian(&self, t: T, y: &[T], jac: &mut M);

    /// Times at which `f` is discontinuous. The integrator restarts at each of them.
    fn breakpoints(&self) -> Vec<T> {
        Vec::new()
    }
}

/// Integrates an [OdeSystem] over a [TimeGrid].
pub trait OdeIntegrator {
    /// Returns a `(steps + 1) × (1 + nstates)` series: column 0 holds time,
    /// the first row holds `y0`.
    ///
    /// `rel_tol` is a target for the integrator, it is never relaxed: a
    /// failure to meet it is an [EmissionError::NonConvergence].
    fn solve(
        &self,
        system: &dyn OdeSystem,
        y0: &[T],
        grid: &TimeGrid,
        rel_tol: T,
    ) -> Result<TimeSeries, EmissionError>;
}

/// Integrator settings not covered by the solver contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SolverSettings {
    /// Absolute tolerance, applied to every state.
    pub atol: f64,
    /// Initial step size.
    pub h0: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self { atol: ATOL, h0: H0 }
    }
}

/// States sampled on a time grid, one row per time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    data: Array2<T>,
}

impl TimeSeries {
    /// Wraps an array whose column 0 holds the time.
    pub fn new(data: Array2<T>) -> Self {
        Self { data }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn nstates(&self) -> usize {
        self.data.ncols().saturating_sub(1)
    }

    pub fn time(&self, row: usize) -> T {
        self.data[[row, 0]]
    }

    /// Value of state `index` at `row`.
    pub fn state(&self, row: usize, index: usize) -> T {
        self.data[[row, index + 1]]
    }

    pub fn times(&self) -> ArrayView1<'_, T> {
        self.data.column(0)
    }

    pub fn as_array(&self) -> &Array2<T> {
        &self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }
}
