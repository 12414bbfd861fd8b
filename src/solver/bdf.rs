use diffsol::{
    error::{DiffsolError, OdeSolverError},
    NalgebraLU, OdeBuilder, OdeSolverMethod, OdeSolverStopReason,
};
use ndarray::Array2;
use tracing::debug;

use super::{OdeIntegrator, OdeSystem, SolverSettings, TimeGrid, TimeSeries, M, T, V};
use crate::error::EmissionError;

type LS = NalgebraLU<T>;

/// Variable order BDF integrator from `diffsol`, driven with the exact Jacobian.
///
/// The span is split at the breakpoints of the system and a fresh solver is
/// started on every piece, so no step ever straddles a discontinuity of the
/// right-hand side. Within a piece the solver stops exactly on each output time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BdfIntegrator {
    settings: SolverSettings,
}

impl BdfIntegrator {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn integrate_segment(
        &self,
        system: &dyn OdeSystem,
        y_start: &V,
        t_start: T,
        targets: &[(T, Option<usize>)],
        rel_tol: T,
        series: &mut Array2<T>,
    ) -> Result<V, EmissionError> {
        let nstates = system.nstates();
        let problem = OdeBuilder::<M>::new()
            .t0(t_start)
            .h0(self.settings.h0)
            .rtol(rel_tol)
            .atol(vec![self.settings.atol; nstates])
            .rhs_implicit(
                |x: &V, _p: &V, t: T, y: &mut V| system.rhs(t, x.as_slice(), y.as_mut_slice()),
                |x: &V, _p: &V, t: T, v: &V, y: &mut V| {
                    let mut jac = M::zeros(nstates, nstates);
                    system.jacobian(t, x.as_slice(), &mut jac);
                    jac.mul_to(v, y);
                },
            )
            .init(|_p: &V, _t: T| y_start.clone())
            .build()?;

        let mut solver = problem.bdf::<LS>()?;

        let mut reached = t_start;
        for &(t_stop, row) in targets {
            match solver.set_stop_time(t_stop) {
                Ok(_) => loop {
                    match solver.step() {
                        Ok(OdeSolverStopReason::InternalTimestep) => continue,
                        Ok(OdeSolverStopReason::TstopReached) => break,
                        Ok(OdeSolverStopReason::RootFound(_)) => {
                            return Err(EmissionError::UnexpectedStop { t: reached });
                        }
                        Err(DiffsolError::OdeSolverError(err)) => {
                            return Err(EmissionError::NonConvergence {
                                t: reached,
                                rel_tol,
                                message: err.to_string(),
                            });
                        }
                        Err(err) => return Err(err.into()),
                    }
                },
                Err(DiffsolError::OdeSolverError(OdeSolverError::StopTimeAtCurrentTime)) => {}
                Err(err) => return Err(err.into()),
            }
            reached = t_stop;

            if let Some(row) = row {
                series[[row, 0]] = t_stop;
                for (i, value) in solver.state().y.iter().enumerate() {
                    series[[row, i + 1]] = *value;
                }
            }
        }
        Ok(solver.state().y.clone())
    }
}

impl OdeIntegrator for BdfIntegrator {
    fn solve(
        &self,
        system: &dyn OdeSystem,
        y0: &[T],
        grid: &TimeGrid,
        rel_tol: T,
    ) -> Result<TimeSeries, EmissionError> {
        let nstates = system.nstates();
        if y0.len() != nstates {
            return Err(EmissionError::InvalidParameter {
                name: "y0",
                value: y0.len() as f64,
                reason: "initial state length must match the number of equations",
            });
        }
        positive("relTol", rel_tol)?;
        positive("atol", self.settings.atol)?;
        positive("h0", self.settings.h0)?;

        let times = grid.solver_times();
        let last = times[times.len() - 1];
        let mut series = Array2::zeros((times.len(), nstates + 1));
        series[[0, 0]] = times[0];
        for (i, value) in y0.iter().enumerate() {
            series[[0, i + 1]] = *value;
        }

        let segment_ends = segment_ends(system.breakpoints(), &times, grid);

        let mut state = V::from_column_slice(y0);
        let mut start = times[0];
        let mut next_row = 1;
        for &end in &segment_ends {
            let mut targets = Vec::new();
            while next_row < times.len() && times[next_row] <= end {
                targets.push((times[next_row], Some(next_row)));
                next_row += 1;
            }
            if targets.last().map_or(true, |(t, _)| *t < end) {
                targets.push((end, None));
            }
            state = self.integrate_segment(system, &state, start, &targets, rel_tol, &mut series)?;
            start = end;
        }

        debug!(
            rows = series.nrows(),
            segments = segment_ends.len(),
            t_end = last,
            rel_tol,
            "BDF integration finished"
        );
        Ok(TimeSeries::new(series))
    }
}

fn positive(name: &'static str, value: T) -> Result<(), EmissionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EmissionError::InvalidParameter {
            name,
            value,
            reason: "must be finite and positive",
        });
    }
    Ok(())
}

/// Sorted ends of the integration pieces: the breakpoints strictly inside the
/// span followed by the last output time. A breakpoint that falls on an output
/// time (up to rounding) is moved onto it.
fn segment_ends(breakpoints: Vec<T>, times: &[T], grid: &TimeGrid) -> Vec<T> {
    let first = times[0];
    let last = times[times.len() - 1];
    let dx = grid.solver_step();

    let mut ends: Vec<T> = breakpoints
        .into_iter()
        .filter(|b| b.is_finite())
        .map(|b| {
            let nearest = ((b - first) / dx).round();
            if nearest >= 0.0 && (nearest as usize) < times.len() {
                let t = times[nearest as usize];
                if (t - b).abs() <= grid.matching_tolerance() {
                    return t;
                }
            }
            b
        })
        .filter(|b| *b > first && *b < last)
        .collect();
    ends.sort_by(|a, b| a.total_cmp(b));
    ends.dedup();
    ends.push(last);
    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// dy/dt = -k y
    struct Decay {
        k: f64,
    }

    impl OdeSystem for Decay {
        fn nstates(&self) -> usize {
            1
        }

        fn rhs(&self, _t: T, y: &[T], dydt: &mut [T]) {
            dydt[0] = -self.k * y[0];
        }

        fn jacobian(&self, _t: T, _y: &[T], jac: &mut M) {
            jac[(0, 0)] = -self.k;
        }
    }

    /// dy/dt = 1 until t = 1, then 0.
    struct Ramp;

    impl OdeSystem for Ramp {
        fn nstates(&self) -> usize {
            1
        }

        fn rhs(&self, t: T, _y: &[T], dydt: &mut [T]) {
            dydt[0] = if t <= 1.0 { 1.0 } else { 0.0 };
        }

        fn jacobian(&self, _t: T, _y: &[T], jac: &mut M) {
            jac[(0, 0)] = 0.0;
        }

        fn breakpoints(&self) -> Vec<T> {
            vec![1.0]
        }
    }

    /// Finite at `t = 0` and NaN everywhere after it, so no step can succeed.
    struct Poisoned;

    impl OdeSystem for Poisoned {
        fn nstates(&self) -> usize {
            1
        }

        fn rhs(&self, t: T, _y: &[T], dydt: &mut [T]) {
            dydt[0] = if t > 0.0 { f64::NAN } else { -1.0 };
        }

        fn jacobian(&self, _t: T, _y: &[T], jac: &mut M) {
            jac[(0, 0)] = 0.0;
        }
    }

    #[test]
    fn exponential_decay() {
        let grid = TimeGrid::new(0.0, 5.0, 10).unwrap();
        let series = BdfIntegrator::default()
            .solve(&Decay { k: 0.5 }, &[2.0], &grid, 1e-6)
            .unwrap();

        assert_eq!(series.nrows(), 11);
        assert_eq!(series.nstates(), 1);
        assert_eq!(series.state(0, 0), 2.0);
        for row in 0..series.nrows() {
            let t = series.time(row);
            assert_relative_eq!(series.state(row, 0), 2.0 * (-0.5 * t).exp(), max_relative = 1e-4);
        }
    }

    #[test]
    fn restarts_at_breakpoint() {
        let grid = TimeGrid::new(0.0, 3.0, 7).unwrap();
        let series = BdfIntegrator::default()
            .solve(&Ramp, &[0.0], &grid, 1e-6)
            .unwrap();

        for row in 0..series.nrows() {
            let t = series.time(row);
            assert_relative_eq!(series.state(row, 0), t.min(1.0), epsilon = 1e-6);
        }
    }

    #[test]
    fn breakpoint_on_grid_is_snapped() {
        let grid = TimeGrid::new(0.0, 2.0, 4).unwrap();
        let times = grid.solver_times();
        let ends = segment_ends(vec![1.0, -1.0, 5.0], &times, &grid);
        assert_eq!(ends, vec![times[2], times[4]]);
    }

    #[test]
    fn rejects_wrong_initial_state() {
        let grid = TimeGrid::new(0.0, 1.0, 2).unwrap();
        let result = BdfIntegrator::default().solve(&Decay { k: 1.0 }, &[1.0, 2.0], &grid, 1e-3);
        assert!(matches!(result, Err(EmissionError::InvalidParameter { .. })));
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let grid = TimeGrid::new(0.0, 1.0, 2).unwrap();
        let result = BdfIntegrator::default().solve(&Decay { k: 1.0 }, &[1.0], &grid, 0.0);
        assert!(matches!(result, Err(EmissionError::InvalidParameter { .. })));
    }

    #[test]
    fn rejects_invalid_settings() {
        let grid = TimeGrid::new(0.0, 1.0, 2).unwrap();
        let atol = |atol| SolverSettings {
            atol,
            ..SolverSettings::default()
        };
        let h0 = |h0| SolverSettings {
            h0,
            ..SolverSettings::default()
        };
        let cases = [
            ("atol", atol(0.0)),
            ("atol", atol(f64::NAN)),
            ("atol", atol(-1.0)),
            ("h0", h0(-1.0)),
            ("h0", h0(0.0)),
            ("h0", h0(f64::INFINITY)),
        ];
        for (expected, settings) in cases {
            let result = BdfIntegrator::new(settings).solve(&Decay { k: 1.0 }, &[1.0], &grid, 1e-3);
            match result {
                Err(EmissionError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("{:?} gave {:?}", settings, other),
            }
        }
    }

    #[test]
    fn step_size_collapse_is_non_convergence() {
        let grid = TimeGrid::new(0.0, 1.0, 4).unwrap();
        let result = BdfIntegrator::default().solve(&Poisoned, &[1.0], &grid, 1e-3);
        match result {
            Err(EmissionError::NonConvergence { t, rel_tol, .. }) => {
                assert_eq!(t, 0.0);
                assert_eq!(rel_tol, 1e-3);
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
    }
}
