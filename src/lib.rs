//! Validation of a stiff ODE integrator against the closed-form solution of a
//! two-compartment emission model.
//!
//! A product (compartment 1) emits into the air (compartment 2) until `T`,
//! the air is ventilated throughout. [AnalyticModel] gives the exact
//! concentrations, [EmissionModel] gives the right-hand side and Jacobian of the
//! same system to a numeric integrator, and [compare] runs both over one time
//! grid.
//!
//! ```ignore
//! use emission_check::*;
//!
//! let comparison = compare(&Scenario::reference(0.01))?;
//! println!("{:?}", comparison.max_relative_error());
//! ```

pub mod comparison;
pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod solver;

pub use crate::comparison::report::{report_to_string, write_report, write_trace};
pub use crate::comparison::{
    compare, compare_many, compare_with, relative_error, Comparison, ComparisonPoint,
    ErrorSummary,
};
pub use crate::config::{Scenario, ScenarioFile, NUMBER_OF_TIME_STEPS};
pub use crate::model::analytic::AnalyticModel;
pub use crate::model::emission::EmissionModel;
pub use crate::model::EmissionParams;
pub use crate::observer::{
    Evaluation, EvaluationKind, EvaluationObserver, NoopObserver, RecordingObserver,
    TracingObserver,
};
pub use crate::solver::{BdfIntegrator, OdeIntegrator, OdeSystem, SolverSettings, TimeGrid, TimeSeries};
pub use error::EmissionError;
