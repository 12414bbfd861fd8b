//! Numeric versus analytic comparison runs.
//!
//! [compare] integrates the emission model with the default BDF integrator and
//! pairs every output row with the closed-form solution at the same grid
//! time. The result is data only: deciding whether the agreement is good
//! enough is left to the caller (see [Comparison::within]).

pub mod report;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Scenario;
use crate::error::EmissionError;
use crate::model::{analytic::AnalyticModel, emission::EmissionModel, AIR, PRODUCT};
use crate::observer::{EvaluationObserver, NoopObserver};
use crate::solver::{BdfIntegrator, OdeIntegrator};

/// Denominator floor for relative errors, so points where the analytic value
/// is zero (the air at `t = 0`) do not divide by zero.
pub const RELATIVE_ERROR_FLOOR: f64 = 1e-12;

/// Analytic and numeric concentrations at one grid time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub t: f64,
    pub air_analytic: f64,
    pub air_numeric: f64,
    pub product_analytic: f64,
    pub product_numeric: f64,
}

impl ComparisonPoint {
    pub fn air_relative_error(&self) -> f64 {
        relative_error(self.air_analytic, self.air_numeric)
    }

    pub fn product_relative_error(&self) -> f64 {
        relative_error(self.product_analytic, self.product_numeric)
    }

    pub fn air_absolute_error(&self) -> f64 {
        (self.air_numeric - self.air_analytic).abs()
    }

    pub fn product_absolute_error(&self) -> f64 {
        (self.product_numeric - self.product_analytic).abs()
    }
}

/// `|numeric - analytic| / max(|analytic|, RELATIVE_ERROR_FLOOR)`
///
/// Where the analytic value is below the solver's absolute tolerance, the
/// numeric value is solver noise and this ratio can be far above one.
pub fn relative_error(analytic: f64, numeric: f64) -> f64 {
    (numeric - analytic).abs() / analytic.abs().max(RELATIVE_ERROR_FLOOR)
}

/// Largest relative error of each compartment over a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub air: f64,
    pub product: f64,
}

impl ErrorSummary {
    pub fn max(&self) -> f64 {
        self.air.max(self.product)
    }
}

/// Paired series of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    scenario: Scenario,
    points: Vec<ComparisonPoint>,
}

impl Comparison {
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn points(&self) -> &[ComparisonPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_relative_error(&self) -> ErrorSummary {
        self.points.iter().fold(
            ErrorSummary {
                air: 0.0,
                product: 0.0,
            },
            |acc, p| ErrorSummary {
                air: acc.air.max(p.air_relative_error()),
                product: acc.product.max(p.product_relative_error()),
            },
        )
    }

    /// Largest absolute error of each compartment over a comparison.
    pub fn max_absolute_error(&self) -> ErrorSummary {
        self.points.iter().fold(
            ErrorSummary {
                air: 0.0,
                product: 0.0,
            },
            |acc, p| ErrorSummary {
                air: acc.air.max(p.air_absolute_error()),
                product: acc.product.max(p.product_absolute_error()),
            },
        )
    }

    /// True if every point of both compartments is within `tolerance` relative error.
    ///
    /// Concentrations that stay near zero, such as the air when `T = 0` or
    /// with a very fast ventilation, are dominated by absolute solver error;
    /// check [Comparison::max_absolute_error] against `atol` for those.
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_relative_error().max() <= tolerance
    }

    pub fn to_json(&self) -> Result<String, EmissionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs `scenario` with the default BDF integrator and no diagnostics.
pub fn compare(scenario: &Scenario) -> Result<Comparison, EmissionError> {
    compare_with(
        scenario,
        &BdfIntegrator::new(scenario.solver),
        &NoopObserver,
    )
}

/// Runs `scenario` with `integrator`, reporting every callback evaluation to `observer`.
pub fn compare_with(
    scenario: &Scenario,
    integrator: &dyn OdeIntegrator,
    observer: &dyn EvaluationObserver,
) -> Result<Comparison, EmissionError> {
    info!(
        c0 = scenario.c0,
        t_end = scenario.t_end,
        tf = scenario.tf,
        k02 = scenario.k02,
        k12 = scenario.k12,
        steps = scenario.steps,
        rel_tol = scenario.rel_tol,
        "Comparing numeric and analytic solutions"
    );

    let params = scenario.params()?;
    let grid = scenario.grid()?;
    let analytic = AnalyticModel::new(params)?;
    let emission = EmissionModel::with_observer(params, observer);

    let numeric = integrator.solve(&emission, &params.initial_state(), &grid, scenario.rel_tol)?;

    if numeric.nrows() != grid.len() {
        return Err(EmissionError::InvalidGrid(format!(
            "the integrator returned {} rows for a grid of {} points",
            numeric.nrows(),
            grid.len()
        )));
    }

    let points = grid
        .times()
        .enumerate()
        .map(|(row, t)| {
            if (numeric.time(row) - t).abs() > grid.matching_tolerance() {
                return Err(EmissionError::InvalidGrid(format!(
                    "row {} is at t = {} but the grid expects t = {}",
                    row,
                    numeric.time(row),
                    t
                )));
            }
            Ok(ComparisonPoint {
                t,
                air_analytic: analytic.air_concentration(t),
                air_numeric: numeric.state(row, AIR),
                product_analytic: analytic.product_concentration(t),
                product_numeric: numeric.state(row, PRODUCT),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let comparison = Comparison {
        scenario: *scenario,
        points,
    };
    let errors = comparison.max_relative_error();
    debug!(
        air = errors.air,
        product = errors.product,
        "Maximum relative error"
    );
    Ok(comparison)
}

/// Runs independent scenarios in parallel. Each run builds its own models.
pub fn compare_many(scenarios: &[Scenario]) -> Vec<Result<Comparison, EmissionError>> {
    scenarios.par_iter().map(compare).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{EvaluationKind, RecordingObserver};
    use crate::solver::{OdeSystem, TimeGrid, TimeSeries};
    use ndarray::Array2;

    #[test]
    fn relative_error_uses_floor() {
        assert_eq!(relative_error(0.0, 0.0), 0.0);
        assert!((relative_error(2.0, 2.2) - 0.1).abs() < 1e-12);
        assert!((relative_error(-2.0, -1.0) - 0.5).abs() < 1e-12);
        assert_eq!(relative_error(0.0, 1e-12), 1.0);
    }

    #[test]
    fn absolute_error_covers_vanishing_air() {
        let mut scenario = Scenario::reference(0.01);
        scenario.t_end = 0.0;
        let comparison = compare(&scenario).unwrap();

        assert!(comparison.points().iter().all(|p| p.air_analytic == 0.0));
        let errors = comparison.max_absolute_error();
        assert!(errors.air < 1e-6, "{:?}", errors);
        assert!(errors.product < 1e-2, "{:?}", errors);
    }

    #[test]
    fn pairs_every_grid_point() {
        let comparison = compare(&Scenario::reference(0.01)).unwrap();
        assert_eq!(comparison.len(), 101);
        let first = comparison.points()[0];
        assert_eq!(first.t, 0.0);
        assert_eq!(first.air_numeric, 0.0);
        assert_eq!(first.product_numeric, 1.0);
        assert_eq!(comparison.points()[100].t, 60.0);
    }

    #[test]
    fn recording_does_not_change_results() {
        let scenario = Scenario::reference(0.01);
        let recorder = RecordingObserver::new();
        let observed = compare_with(&scenario, &BdfIntegrator::default(), &recorder).unwrap();
        let plain = compare(&scenario).unwrap();

        assert_eq!(observed, plain);
        assert!(recorder.count(EvaluationKind::Model) > 0);
        assert!(recorder.count(EvaluationKind::Jacobian) > 0);
    }

    #[test]
    fn invalid_parameters_fail_before_solving() {
        let mut scenario = Scenario::reference(0.01);
        scenario.k02 = 0.0;
        scenario.k12 = 0.0;
        assert!(matches!(
            compare(&scenario),
            Err(EmissionError::InvalidParameter { .. })
        ));
    }

    /// Returns one row too few.
    struct ShortIntegrator;

    impl OdeIntegrator for ShortIntegrator {
        fn solve(
            &self,
            _system: &dyn OdeSystem,
            _y0: &[f64],
            grid: &TimeGrid,
            _rel_tol: f64,
        ) -> Result<TimeSeries, EmissionError> {
            Ok(TimeSeries::new(Array2::zeros((grid.len() - 1, 3))))
        }
    }

    #[test]
    fn rejects_mismatched_series() {
        let result = compare_with(
            &Scenario::reference(0.01),
            &ShortIntegrator,
            &NoopObserver,
        );
        assert!(matches!(result, Err(EmissionError::InvalidGrid(_))));
    }
}
