//! Scenario configuration, in code or from JSON.
//!
//! ```json
//! {
//!   "scenarios": [
//!     { "c0": 1.0, "t_end": 20.0, "tf": 60.0, "k02": 0.005, "k12": 0.1,
//!       "steps": 100, "rel_tol": 0.01 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EmissionError;
use crate::model::EmissionParams;
use crate::solver::{SolverSettings, TimeGrid};

/// Number of output steps used by the reference scenarios.
pub const NUMBER_OF_TIME_STEPS: usize = 100;

/// One validation run: model parameters, simulated span and solver tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Concentration in the product at `t = 0`.
    pub c0: f64,
    /// End of the emission period.
    pub t_end: f64,
    /// End of the simulation.
    pub tf: f64,
    /// Ventilation rate of the air.
    pub k02: f64,
    /// Transfer rate between product and air.
    pub k12: f64,
    pub steps: usize,
    pub rel_tol: f64,
    #[serde(default)]
    pub solver: SolverSettings,
}

impl Scenario {
    /// The reference case: `C0 = 1, T = 20, tf = 60, k02 = 0.005, k12 = 0.1`, 100 steps.
    pub fn reference(rel_tol: f64) -> Self {
        Self {
            c0: 1.0,
            t_end: 20.0,
            tf: 60.0,
            k02: 0.005,
            k12: 0.1,
            steps: NUMBER_OF_TIME_STEPS,
            rel_tol,
            solver: SolverSettings::default(),
        }
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn params(&self) -> Result<EmissionParams, EmissionError> {
        EmissionParams::new(self.c0, self.t_end, self.k02, self.k12)
    }

    /// The grid `t_i = tf * i / steps` both sides of a comparison use.
    pub fn grid(&self) -> Result<TimeGrid, EmissionError> {
        TimeGrid::new(0.0, self.tf, self.steps)
    }
}

/// A list of scenarios, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    /// The reference scenario at relTol 0.01 and at 0.001.
    pub fn reference() -> Self {
        Self {
            scenarios: vec![Scenario::reference(0.01), Scenario::reference(0.001)],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, EmissionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EmissionError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
