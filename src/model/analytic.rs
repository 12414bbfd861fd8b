use super::{EmissionParams, NUMBER_OF_COMPARTMENTS};
use crate::error::EmissionError;

/// Closed-form solution of the two-compartment emission model.
///
/// During emission the rate matrix `[[-k12-k02, k12], [k12, -k12]]` has the
/// eigenvalues `lp` and `lm`, both real and non-positive. After `T` the
/// product concentration is frozen and the air decays exponentially from its
/// value at `T`.
#[derive(Debug, Clone)]
pub struct AnalyticModel {
    params: EmissionParams,
    sqd: f64,
    lp: f64,
    lm: f64,
    air_at_t_end: f64,
    product_at_t_end: f64,
}

impl AnalyticModel {
    pub fn new(params: EmissionParams) -> Result<Self, EmissionError> {
        let k02 = params.k02();
        let k12 = params.k12();

        let sqd = (4.0 * k12 * k12 + k02 * k02).sqrt();
        if sqd <= 0.0 || !sqd.is_finite() {
            return Err(EmissionError::InvalidParameter {
                name: "k12",
                value: k12,
                reason: "the rate matrix discriminant must be positive and finite",
            });
        }
        let l = -k12 - k02 / 2.0;

        let mut model = Self {
            params,
            sqd,
            lp: l + sqd / 2.0,
            lm: l - sqd / 2.0,
            air_at_t_end: 0.0,
            product_at_t_end: 0.0,
        };
        model.air_at_t_end = model.emitting_air(params.t_end());
        model.product_at_t_end = model.emitting_product(params.t_end());
        Ok(model)
    }

    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    /// Eigenvalues `(lp, lm)` of the rate matrix during emission.
    pub fn eigenvalues(&self) -> (f64, f64) {
        (self.lp, self.lm)
    }

    /// Concentration in the air compartment at time `t`.
    pub fn air_concentration(&self, t: f64) -> f64 {
        if self.params.is_emitting(t) {
            self.emitting_air(t)
        } else {
            self.air_at_t_end * (-self.params.k02() * (t - self.params.t_end())).exp()
        }
    }

    /// Concentration in the product compartment at time `t`.
    pub fn product_concentration(&self, t: f64) -> f64 {
        if self.params.is_emitting(t) {
            self.emitting_product(t)
        } else {
            self.product_at_t_end
        }
    }

    /// Both concentrations, in state order `[air, product]`.
    pub fn concentrations(&self, t: f64) -> [f64; NUMBER_OF_COMPARTMENTS] {
        [self.air_concentration(t), self.product_concentration(t)]
    }

    /// Time derivative of the closed form, in state order.
    pub fn derivative(&self, t: f64) -> [f64; NUMBER_OF_COMPARTMENTS] {
        let k02 = self.params.k02();
        if !self.params.is_emitting(t) {
            return [-k02 * self.air_concentration(t), 0.0];
        }
        let c0 = self.params.c0();
        let k12 = self.params.k12();
        let exp_lp_t = (self.lp * t).exp();
        let exp_lm_t = (self.lm * t).exp();

        let dair = (c0 / self.sqd) * k12 * (self.lp * exp_lp_t - self.lm * exp_lm_t);
        let dproduct = c0
            * ((self.sqd + k02) * self.lp * exp_lp_t + (self.sqd - k02) * self.lm * exp_lm_t)
            / (2.0 * self.sqd);
        [dair, dproduct]
    }

    fn emitting_air(&self, t: f64) -> f64 {
        (self.params.c0() / self.sqd)
            * self.params.k12()
            * ((self.lp * t).exp() - (self.lm * t).exp())
    }

    // C0·exp(lm·t)·(k02·(exp(sqD·t) - 1) + (exp(sqD·t) + 1)·sqD) / (2·sqD), with
    // exp(lm·t)·exp(sqD·t) folded into exp(lp·t) so large t cannot overflow.
    fn emitting_product(&self, t: f64) -> f64 {
        let k02 = self.params.k02();
        self.params.c0()
            * ((self.sqd + k02) * (self.lp * t).exp() + (self.sqd - k02) * (self.lm * t).exp())
            / (2.0 * self.sqd)
    }
}
