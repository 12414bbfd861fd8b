use nalgebra::{DMatrix, Matrix2};

use super::{EmissionParams, AIR, NUMBER_OF_COMPARTMENTS, PRODUCT};
use crate::observer::{Evaluation, EvaluationKind, EvaluationObserver, NoopObserver};
use crate::solver::OdeSystem;

/// Right-hand side and exact Jacobian of the emission model, for the numeric solver.
///
/// Both callbacks are evaluated at the time and state handed in by the caller,
/// so they can be used at the intermediate stages of an implicit method.
#[derive(Clone, Copy)]
pub struct EmissionModel<'a> {
    params: EmissionParams,
    observer: &'a dyn EvaluationObserver,
}

impl EmissionModel<'static> {
    pub fn new(params: EmissionParams) -> Self {
        Self {
            params,
            observer: &NoopObserver,
        }
    }
}

impl<'a> EmissionModel<'a> {
    /// Same model, reporting every evaluation to `observer`.
    pub fn with_observer(params: EmissionParams, observer: &'a dyn EvaluationObserver) -> Self {
        Self { params, observer }
    }

    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    /// `dy/dt` at `(t, y)` with `y = [air, product]`.
    pub fn right_hand_side(&self, t: f64, y: &[f64]) -> [f64; NUMBER_OF_COMPARTMENTS] {
        let k02 = self.params.k02();
        let k12 = self.params.k12();
        let air = y[AIR];
        let product = y[PRODUCT];

        let dydt = if self.params.is_emitting(t) {
            [k12 * (product - air) - k02 * air, -k12 * (product - air)]
        } else {
            [-k02 * air, 0.0]
        };

        if self.observer.enabled() {
            self.observer.record(Evaluation {
                kind: EvaluationKind::Model,
                t,
                y: y.to_vec(),
                values: dydt.to_vec(),
            });
        }
        dydt
    }

    /// `∂(dy/dt)/∂y` at `(t, y)`. The model is linear, so only `t` matters.
    pub fn jacobian(&self, t: f64, y: &[f64]) -> Matrix2<f64> {
        let k02 = self.params.k02();
        let k12 = self.params.k12();

        let jacobian = if self.params.is_emitting(t) {
            Matrix2::new(-k12 - k02, k12, k12, -k12)
        } else {
            Matrix2::new(-k02, 0.0, 0.0, 0.0)
        };

        if self.observer.enabled() {
            self.observer.record(Evaluation {
                kind: EvaluationKind::Jacobian,
                t,
                y: y.to_vec(),
                values: vec![
                    jacobian[(0, 0)],
                    jacobian[(0, 1)],
                    jacobian[(1, 0)],
                    jacobian[(1, 1)],
                ],
            });
        }
        jacobian
    }
}

impl OdeSystem for EmissionModel<'_> {
    fn nstates(&self) -> usize {
        NUMBER_OF_COMPARTMENTS
    }

    #[inline(always)]
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        dydt.copy_from_slice(&self.right_hand_side(t, y));
    }

    #[inline(always)]
    fn jacobian(&self, t: f64, y: &[f64], jac: &mut DMatrix<f64>) {
        jac.copy_from(&EmissionModel::jacobian(self, t, y));
    }

    // The source term switches off at T.
    fn breakpoints(&self) -> Vec<f64> {
        vec![self.params.t_end()]
    }
}
