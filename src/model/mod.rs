//! The two-compartment emission model.
//!
//! Compartment 1 is the product that emits, compartment 2 is the ventilated
//! air around it. During the emission period `[0, T]` mass moves between the
//! two compartments with rate `k12` and leaves the air with rate `k02`. After
//! `T` the product is removed and the air only ventilates.
//!
//! The state vector is always ordered `[air, product]`.

pub mod analytic;
pub mod emission;

use crate::error::EmissionError;

/// Index of the air concentration in the state vector.
pub const AIR: usize = 0;
/// Index of the product concentration in the state vector.
pub const PRODUCT: usize = 1;
/// Number of compartments, and therefore of equations.
pub const NUMBER_OF_COMPARTMENTS: usize = 2;

/// Physical parameters shared by the analytic and the numeric model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionParams {
    c0: f64,
    t_end: f64,
    k02: f64,
    k12: f64,
}

impl EmissionParams {
    /// Validates and creates a parameter set.
    ///
    /// - `c0`: concentration in the product at `t = 0`
    /// - `t_end`: time at which the emission stops (`T`)
    /// - `k02`: ventilation rate of the air compartment
    /// - `k12`: transfer rate between product and air
    pub fn new(c0: f64, t_end: f64, k02: f64, k12: f64) -> Result<Self, EmissionError> {
        non_negative("C0", c0)?;
        non_negative("T", t_end)?;
        non_negative("k02", k02)?;
        non_negative("k12", k12)?;
        if k02 == 0.0 && k12 == 0.0 {
            return Err(EmissionError::InvalidParameter {
                name: "k12",
                value: k12,
                reason: "k02 and k12 cannot both be zero",
            });
        }
        Ok(Self {
            c0,
            t_end,
            k02,
            k12,
        })
    }

    pub fn c0(&self) -> f64 {
        self.c0
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    pub fn k02(&self) -> f64 {
        self.k02
    }

    pub fn k12(&self) -> f64 {
        self.k12
    }

    /// True while the product is still emitting.
    #[inline(always)]
    pub fn is_emitting(&self, t: f64) -> bool {
        t <= self.t_end
    }

    /// Initial state `[air, product] = [0, C0]`.
    pub fn initial_state(&self) -> [f64; NUMBER_OF_COMPARTMENTS] {
        [0.0, self.c0]
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), EmissionError> {
    if !value.is_finite() {
        return Err(EmissionError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(EmissionError::InvalidParameter {
            name,
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reference_parameters() {
        let params = EmissionParams::new(1.0, 20.0, 0.005, 0.1).unwrap();
        assert_eq!(params.initial_state(), [0.0, 1.0]);
        assert!(params.is_emitting(20.0));
        assert!(!params.is_emitting(20.0 + 1e-9));
    }

    #[test]
    fn rejects_zero_rates() {
        let err = EmissionParams::new(1.0, 20.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, EmissionError::InvalidParameter { .. }));
    }

    #[test]
    fn rejects_non_finite_and_negative_values() {
        assert!(EmissionParams::new(f64::NAN, 20.0, 0.005, 0.1).is_err());
        assert!(EmissionParams::new(1.0, f64::INFINITY, 0.005, 0.1).is_err());
        assert!(EmissionParams::new(1.0, 20.0, -0.005, 0.1).is_err());
        assert!(EmissionParams::new(-1.0, 20.0, 0.005, 0.1).is_err());
    }

    #[test]
    fn single_rate_is_enough() {
        assert!(EmissionParams::new(1.0, 20.0, 0.0, 0.1).is_ok());
        assert!(EmissionParams::new(1.0, 20.0, 0.005, 0.0).is_ok());
    }
}
