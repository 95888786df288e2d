//! Steady-state solutions to the optical Bloch equations.
//!
//! Two systems are handled: a single driven two-level transition, solved in
//! closed form ([`two_level`]), and a three-level double-lambda system with two
//! ground states `|1>`, `|2>` and one excited state `|3>`, solved by a damped
//! Newton iteration ([`three_level`], [`newton`]). Every three-level solution
//! is passed through the projector in [`physical`] before it is returned.
//!
//! Density matrices for the three-level system are ordered `[ground1, ground2,
//! excited]`.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ EitError, EitResult };

pub mod two_level;
pub mod newton;
pub mod three_level;
pub mod physical;

pub use two_level::two_level_steady_state;
pub use three_level::{ solve_steady_state, SteadyState, Convergence };
pub use physical::{ make_physical, validate, Validity, DEFAULT_TOL };

/// Square complex density matrix.
pub type DensityMatrix = nd::Array2<C64>;

/// Decomposition of the total decay rate of the excited state into branches
/// ending on each ground state, in units of angular frequency.
///
/// `gamma_to_ground1 + gamma_to_ground2` may be less than `gamma_total` when
/// the excited state also decays outside the double-lambda manifold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayRates {
    pub gamma_total: f64,
    pub gamma_to_ground1: f64,
    pub gamma_to_ground2: f64,
}

impl DecayRates {
    /// Total decay rate `gamma` split evenly between the two ground states.
    pub fn symmetric(gamma: f64) -> Self {
        Self {
            gamma_total: gamma,
            gamma_to_ground1: gamma / 2.0,
            gamma_to_ground2: gamma / 2.0,
        }
    }

    pub fn validate(&self) -> EitResult<()> {
        let rates = [
            ("gamma_total", self.gamma_total),
            ("gamma_to_ground1", self.gamma_to_ground1),
            ("gamma_to_ground2", self.gamma_to_ground2),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(EitError::InvalidParameter(
                    format!("{name} must be finite and non-negative, got {rate}")
                ));
            }
        }
        let branches = self.gamma_to_ground1 + self.gamma_to_ground2;
        if branches > self.gamma_total * (1.0 + 1e-12) {
            return Err(EitError::InvalidParameter(format!(
                "decay branches sum to {branches}, exceeding the total rate {}",
                self.gamma_total,
            )));
        }
        Ok(())
    }
}

/// Drive and relaxation parameters for a single double-lambda solve.
///
/// The pump couples `|1> <-> |3>` and the probe couples `|2> <-> |3>`. All
/// quantities are in units of angular frequency. Values of this type are
/// constructed fresh for every solve and never mutated by the solvers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SystemParameters {
    pub pump_rabi: f64,
    pub probe_rabi: f64,
    pub pump_detuning: f64,
    pub probe_detuning: f64,
    pub decay: DecayRates,
    pub ground_dephasing: f64,
}

impl SystemParameters {
    /// Create a new set of parameters whose excited-state decay is split
    /// evenly between the two ground states.
    pub fn new(
        pump_rabi: f64,
        probe_rabi: f64,
        pump_detuning: f64,
        probe_detuning: f64,
        excited_decay_rate: f64,
        ground_dephasing: f64,
    ) -> Self
    {
        Self {
            pump_rabi,
            probe_rabi,
            pump_detuning,
            probe_detuning,
            decay: DecayRates::symmetric(excited_decay_rate),
            ground_dephasing,
        }
    }

    /// Set explicit decay branches, keeping the total rate.
    pub fn with_branching(mut self, gamma_to_ground1: f64, gamma_to_ground2: f64)
        -> Self
    {
        self.decay.gamma_to_ground1 = gamma_to_ground1;
        self.decay.gamma_to_ground2 = gamma_to_ground2;
        self
    }

    pub fn with_decay(mut self, decay: DecayRates) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_pump_rabi(mut self, pump_rabi: f64) -> Self {
        self.pump_rabi = pump_rabi;
        self
    }

    pub fn with_probe_rabi(mut self, probe_rabi: f64) -> Self {
        self.probe_rabi = probe_rabi;
        self
    }

    pub fn with_pump_detuning(mut self, pump_detuning: f64) -> Self {
        self.pump_detuning = pump_detuning;
        self
    }

    pub fn with_probe_detuning(mut self, probe_detuning: f64) -> Self {
        self.probe_detuning = probe_detuning;
        self
    }

    pub fn with_ground_dephasing(mut self, ground_dephasing: f64) -> Self {
        self.ground_dephasing = ground_dephasing;
        self
    }

    /// Total decay rate of the excited state.
    pub fn excited_decay_rate(&self) -> f64 { self.decay.gamma_total }

    /// Pump detuning minus probe detuning.
    pub fn two_photon_detuning(&self) -> f64 {
        self.pump_detuning - self.probe_detuning
    }

    /// Check that all rates are non-negative and all values finite.
    pub fn validate(&self) -> EitResult<()> {
        let non_negative = [
            ("pump_rabi", self.pump_rabi),
            ("probe_rabi", self.probe_rabi),
            ("ground_dephasing", self.ground_dephasing),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EitError::InvalidParameter(
                    format!("{name} must be finite and non-negative, got {value}")
                ));
            }
        }
        let detunings = [
            ("pump_detuning", self.pump_detuning),
            ("probe_detuning", self.probe_detuning),
        ];
        for (name, value) in detunings {
            if !value.is_finite() {
                return Err(EitError::InvalidParameter(
                    format!("{name} must be finite, got {value}")
                ));
            }
        }
        self.decay.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_branching() {
        let params = SystemParameters::new(1.0, 2.0, 0.0, 0.0, 6.0, 0.0);
        assert_eq!(params.decay.gamma_to_ground1, 3.0);
        assert_eq!(params.decay.gamma_to_ground2, 3.0);
        assert!(params.validate().is_ok());
        let params = params.with_branching(4.0, 2.0);
        assert_eq!(params.decay.gamma_total, 6.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_bad_rates() {
        let params = SystemParameters::new(-1.0, 2.0, 0.0, 0.0, 6.0, 0.0);
        assert!(matches!(params.validate(), Err(EitError::InvalidParameter(_))));
        let params = SystemParameters::new(1.0, 2.0, f64::NAN, 0.0, 6.0, 0.0);
        assert!(params.validate().is_err());
        let params
            = SystemParameters::new(1.0, 2.0, 0.0, 0.0, 6.0, 0.0)
            .with_branching(5.0, 5.0);
        assert!(params.validate().is_err());
        let params
            = SystemParameters::new(1.0, 2.0, 0.0, 0.0, 6.0, 0.0)
            .with_ground_dephasing(-1.0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn two_photon_detuning() {
        let params = SystemParameters::new(1.0, 1.0, 3.0, 1.0, 6.0, 0.0);
        assert_eq!(params.two_photon_detuning(), 2.0);
    }
}
