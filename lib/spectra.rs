//! Four-wave-mixing spectra of a double-lambda medium.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use serde::{ Deserialize, Serialize };
use crate::{
    bloch::{ self, SystemParameters },
    double_lambda::DoubleLambda,
    error::{ EitError, EitResult },
    susceptibility::{ compute_chi3, compute_fwm_intensity },
};

/// Intensities [W / m^2] of the pump and probe beams entering the FWM signal.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Beams {
    pub pump_intensity: f64,
    pub probe_intensity: f64,
}

impl Default for Beams {
    fn default() -> Self { Self { pump_intensity: 1e3, probe_intensity: 1e2 } }
}

impl Beams {
    pub fn validate(&self) -> EitResult<()> {
        for (name, value) in [
            ("pump_intensity", self.pump_intensity),
            ("probe_intensity", self.probe_intensity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EitError::InvalidParameter(
                    format!("{name} must be finite and non-negative, got {value}")
                ));
            }
        }
        Ok(())
    }
}

/// Output of a single solve -> χ3 -> intensity evaluation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FwmPoint {
    pub chi3: C64,
    pub intensity: f64,
    /// `false` if the steady-state solve fell back to its initial guess.
    pub converged: bool,
}

/// χ3 and FWM intensity along a one-dimensional scan.
#[derive(Clone, Debug, PartialEq)]
pub struct FwmSeries {
    pub chi3: nd::Array1<C64>,
    pub intensity: nd::Array1<f64>,
    /// Number of points whose steady-state solve did not converge.
    pub fallbacks: usize,
}

impl FromIterator<FwmPoint> for FwmSeries {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = FwmPoint>
    {
        let mut chi3: Vec<C64> = Vec::new();
        let mut intensity: Vec<f64> = Vec::new();
        let mut fallbacks: usize = 0;
        for point in iter {
            chi3.push(point.chi3);
            intensity.push(point.intensity);
            fallbacks += usize::from(!point.converged);
        }
        Self { chi3: chi3.into(), intensity: intensity.into(), fallbacks }
    }
}

/// Computes χ3 and FWM signal intensity for a double-lambda medium of given
/// density and length.
#[derive(Clone, Debug)]
pub struct FwmSpectra {
    pub system: DoubleLambda,
    /// Atomic number density [m^-3].
    pub number_density: f64,
    /// Length of the interaction region [m].
    pub interaction_length: f64,
    /// Ground-state dephasing rate, in units of angular frequency.
    pub ground_dephasing: f64,
}

impl FwmSpectra {
    /// Create a new calculator with `N = 1e17 m^-3`, `L = 1 cm`, and no ground
    /// dephasing.
    pub fn new(system: DoubleLambda) -> Self {
        Self {
            system,
            number_density: 1e17,
            interaction_length: 0.01,
            ground_dephasing: 0.0,
        }
    }

    pub fn with_number_density(mut self, number_density: f64) -> Self {
        self.number_density = number_density;
        self
    }

    pub fn with_interaction_length(mut self, interaction_length: f64) -> Self {
        self.interaction_length = interaction_length;
        self
    }

    pub fn with_ground_dephasing(mut self, ground_dephasing: f64) -> Self {
        self.ground_dephasing = ground_dephasing;
        self
    }

    pub fn validate(&self) -> EitResult<()> {
        for (name, value) in [
            ("number_density", self.number_density),
            ("interaction_length", self.interaction_length),
            ("ground_dephasing", self.ground_dephasing),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EitError::InvalidParameter(
                    format!("{name} must be finite and non-negative, got {value}")
                ));
            }
        }
        self.base_parameters().validate()
    }

    /// Solver parameters at the system's current field settings.
    pub fn base_parameters(&self) -> SystemParameters {
        self.system.parameters(self.ground_dephasing)
    }

    /// Dipole moment of the probe transition [C m].
    pub fn probe_dipole(&self) -> f64 {
        self.system.probe_transition().dipole_moment
    }

    /// Solve the steady state for `params` and derive χ3 and the FWM
    /// intensity from it.
    pub fn evaluate(&self, params: &SystemParameters, beams: &Beams) -> FwmPoint {
        let ss = bloch::solve_steady_state(params);
        let chi3 = compute_chi3(
            &ss.rho,
            params.probe_rabi,
            params.probe_detuning,
            params.decay.gamma_total,
            self.probe_dipole(),
            self.number_density,
        );
        let intensity = compute_fwm_intensity(
            chi3,
            beams.pump_intensity,
            beams.probe_intensity,
            self.interaction_length,
        );
        FwmPoint { chi3, intensity, converged: ss.convergence.is_converged() }
    }

    /// [`Self::evaluate`] over many independent parameter sets in parallel.
    ///
    /// Output order matches input order.
    pub fn evaluate_all(&self, params: &[SystemParameters], beams: &Beams)
        -> Vec<FwmPoint>
    {
        params.par_iter()
            .map(|p| self.evaluate(p, beams))
            .collect()
    }

    fn scan<F>(&self, values: &nd::Array1<f64>, beams: &Beams, apply: F)
        -> FwmSeries
    where F: Fn(SystemParameters, f64) -> SystemParameters
    {
        let base = self.base_parameters();
        let params: Vec<SystemParameters>
            = values.iter().map(|v| apply(base, *v)).collect();
        self.evaluate_all(&params, beams).into_iter().collect()
    }

    /// χ3 as a function of probe detuning.
    pub fn chi3_spectrum(&self, probe_detunings: &nd::Array1<f64>)
        -> nd::Array1<C64>
    {
        self.scan(
            probe_detunings,
            &Beams::default(),
            SystemParameters::with_probe_detuning,
        )
        .chi3
    }

    /// FWM intensity as a function of probe detuning.
    pub fn intensity_spectrum(
        &self,
        probe_detunings: &nd::Array1<f64>,
        beams: &Beams,
    ) -> nd::Array1<f64>
    {
        self.scan(probe_detunings, beams, SystemParameters::with_probe_detuning)
            .intensity
    }

    /// χ3 and FWM intensity as functions of pump Rabi frequency at fixed probe
    /// detuning.
    pub fn pump_power_sweep(
        &self,
        pump_rabis: &nd::Array1<f64>,
        probe_detuning: f64,
        beams: &Beams,
    ) -> FwmSeries
    {
        self.scan(
            pump_rabis,
            beams,
            |p, v| p.with_probe_detuning(probe_detuning).with_pump_rabi(v),
        )
    }

    /// χ3 and FWM intensity as functions of pump detuning at fixed probe
    /// detuning.
    pub fn coupling_detuning_sweep(
        &self,
        pump_detunings: &nd::Array1<f64>,
        probe_detuning: f64,
        beams: &Beams,
    ) -> FwmSeries
    {
        self.scan(
            pump_detunings,
            beams,
            |p, v| p.with_probe_detuning(probe_detuning).with_pump_detuning(v),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use approx::assert_relative_eq;
    use crate::atoms::Isotope;

    fn spectra() -> FwmSpectra {
        FwmSpectra::new(DoubleLambda::new(Isotope::Rb87).unwrap())
            .with_ground_dephasing(TAU * 0.1e6)
    }

    #[test]
    fn defaults() {
        let s = spectra();
        assert_eq!(s.number_density, 1e17);
        assert_eq!(s.interaction_length, 0.01);
        assert!(s.validate().is_ok());
        assert!(s.clone().with_number_density(-1.0).validate().is_err());
        assert_eq!(Beams::default().pump_intensity, 1e3);
        assert_eq!(Beams::default().probe_intensity, 1e2);
    }

    #[test]
    fn chi3_linear_in_density() {
        let s = spectra();
        let p = s.base_parameters().with_probe_detuning(TAU * 2e6);
        let a = s.evaluate(&p, &Beams::default());
        let b = s.clone().with_number_density(1e18).evaluate(&p, &Beams::default());
        assert!(a.chi3.norm() > 0.0);
        assert_relative_eq!(b.chi3.norm() / a.chi3.norm(), 10.0, max_relative = 1e-2);
    }

    #[test]
    fn intensity_scaling() {
        let s = spectra();
        let p = s.base_parameters().with_probe_detuning(TAU * 2e6);
        let beams = Beams::default();
        let base = s.evaluate(&p, &beams).intensity;
        let long = s.clone().with_interaction_length(0.02).evaluate(&p, &beams).intensity;
        let bright = s.evaluate(
            &p,
            &Beams { pump_intensity: 2.0 * beams.pump_intensity, ..beams },
        )
        .intensity;
        assert!(base > 0.0);
        assert_relative_eq!(long / base, 4.0, max_relative = 1e-2);
        assert_relative_eq!(bright / base, 4.0, max_relative = 1e-2);
    }

    #[test]
    fn series_lengths() {
        let s = spectra();
        let scan = nd::Array1::linspace(-TAU * 10e6, TAU * 10e6, 9);
        assert_eq!(s.chi3_spectrum(&scan).len(), 9);
        assert_eq!(s.intensity_spectrum(&scan, &Beams::default()).len(), 9);
        let rabis = nd::Array1::linspace(TAU * 1e6, TAU * 20e6, 5);
        let series = s.pump_power_sweep(&rabis, 0.0, &Beams::default());
        assert_eq!(series.chi3.len(), 5);
        assert_eq!(series.fallbacks, 0);
        let series = s.coupling_detuning_sweep(&scan, TAU * 1e6, &Beams::default());
        assert_eq!(series.intensity.len(), 9);
        assert!(series.intensity.iter().all(|i| *i >= 0.0));
    }

    #[test]
    fn parallel_matches_serial() {
        let s = spectra();
        let scan = nd::Array1::linspace(-TAU * 5e6, TAU * 5e6, 7);
        let par = s.chi3_spectrum(&scan);
        for (dc, chi3) in scan.iter().zip(par.iter()) {
            let p = s.base_parameters().with_probe_detuning(*dc);
            assert_eq!(s.evaluate(&p, &Beams::default()).chi3, *chi3);
        }
    }
}
