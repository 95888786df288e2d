//! Driving fields.

use std::{ f64::consts::TAU, fmt, str::FromStr };
use serde::{ Deserialize, Serialize };
use crate::{
    constants::{ C, EPSILON_0, HBAR },
    error::{ EitError, EitResult },
};

/// Polarization of a driving field.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    #[default]
    Linear,
    SigmaPlus,
    SigmaMinus,
    Circular,
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::SigmaPlus => write!(f, "sigma_plus"),
            Self::SigmaMinus => write!(f, "sigma_minus"),
            Self::Circular => write!(f, "circular"),
        }
    }
}

impl FromStr for Polarization {
    type Err = EitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "sigma_plus" => Ok(Self::SigmaPlus),
            "sigma_minus" => Ok(Self::SigmaMinus),
            "circular" => Ok(Self::Circular),
            _ => Err(EitError::InvalidParameter(
                format!("unknown polarization '{s}'")
            )),
        }
    }
}

/// A monochromatic field driving one transition.
///
/// Rabi frequency and detuning are in units of angular frequency; the phase is
/// kept in `[0, 2π)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaserField {
    rabi_frequency: f64,
    pub detuning: f64,
    phase: f64,
    pub polarization: Polarization,
    /// Carrier angular frequency, if known.
    pub frequency: Option<f64>,
    /// Intensity [W / m^2], if set through [`Self::set_intensity`].
    intensity: Option<f64>,
}

impl LaserField {
    /// Create a new linearly polarized field with zero phase.
    ///
    /// Fails if `rabi_frequency` is negative or not finite.
    pub fn new(rabi_frequency: f64, detuning: f64) -> EitResult<Self> {
        check_rabi(rabi_frequency)?;
        Ok(Self {
            rabi_frequency,
            detuning,
            phase: 0.0,
            polarization: Polarization::Linear,
            frequency: None,
            intensity: None,
        })
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(TAU);
        self
    }

    pub fn with_polarization(mut self, polarization: Polarization) -> Self {
        self.polarization = polarization;
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn rabi_frequency(&self) -> f64 { self.rabi_frequency }

    pub fn phase(&self) -> f64 { self.phase }

    pub fn set_rabi_frequency(&mut self, rabi_frequency: f64) -> EitResult<()> {
        check_rabi(rabi_frequency)?;
        self.rabi_frequency = rabi_frequency;
        self.intensity = None;
        Ok(())
    }

    pub fn set_phase(&mut self, phase: f64) { self.phase = phase.rem_euclid(TAU); }

    /// Electric field amplitude `Ω ħ / d` [V / m] for a transition with dipole
    /// moment `d`.
    pub fn electric_field_amplitude(&self, d: f64) -> f64 {
        self.rabi_frequency * HBAR / d
    }

    /// Generalized Rabi frequency `sqrt(Ω^2 + Δ^2)`.
    pub fn effective_rabi_frequency(&self) -> f64 {
        self.rabi_frequency.hypot(self.detuning)
    }

    /// Set the Rabi frequency from an intensity [W / m^2] driving a transition
    /// with dipole moment `d`.
    pub fn set_intensity(&mut self, intensity: f64, d: f64) -> EitResult<()> {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(EitError::InvalidParameter(
                format!("intensity must be finite and non-negative, got {intensity}")
            ));
        }
        let E = (2.0 * intensity / (EPSILON_0 * C)).sqrt();
        self.rabi_frequency = d * E / HBAR;
        self.intensity = Some(intensity);
        Ok(())
    }

    /// Intensity [W / m^2] corresponding to the current Rabi frequency for a
    /// transition with dipole moment `d`.
    pub fn intensity(&self, d: f64) -> f64 {
        let E = self.electric_field_amplitude(d);
        0.5 * EPSILON_0 * C * E.powi(2)
    }

    /// Intensity last passed to [`Self::set_intensity`], if the Rabi
    /// frequency has not been changed since.
    pub fn set_point_intensity(&self) -> Option<f64> { self.intensity }
}

fn check_rabi(rabi_frequency: f64) -> EitResult<()> {
    if rabi_frequency.is_finite() && rabi_frequency >= 0.0 {
        Ok(())
    } else {
        Err(EitError::InvalidParameter(format!(
            "Rabi frequency must be finite and non-negative, got {rabi_frequency}"
        )))
    }
}

impl fmt::Display for LaserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ω = 2π × {:.3} MHz, Δ = 2π × {:.3} MHz",
            self.rabi_frequency / TAU / 1e6,
            self.detuning / TAU / 1e6,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::constants::RB_D2_REDUCED_DIPOLE;

    #[test]
    fn rejects_negative_rabi() {
        assert!(LaserField::new(-1.0, 0.0).is_err());
        let mut field = LaserField::new(1.0, 0.0).unwrap();
        assert!(field.set_rabi_frequency(f64::INFINITY).is_err());
        assert_eq!(field.rabi_frequency(), 1.0);
    }

    #[test]
    fn phase_is_wrapped() {
        let field = LaserField::new(1.0, 0.0).unwrap().with_phase(-0.5);
        assert_relative_eq!(field.phase(), TAU - 0.5, max_relative = 1e-15);
        let field = field.with_phase(3.0 * TAU + 1.0);
        assert_relative_eq!(field.phase(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn effective_rabi() {
        let field = LaserField::new(3.0, 4.0).unwrap();
        assert_relative_eq!(field.effective_rabi_frequency(), 5.0);
    }

    #[test]
    fn intensity_round_trip() {
        let d = RB_D2_REDUCED_DIPOLE;
        let mut field = LaserField::new(0.0, 0.0).unwrap();
        field.set_intensity(1e3, d).unwrap();
        assert!(field.rabi_frequency() > 0.0);
        assert_relative_eq!(field.intensity(d), 1e3, max_relative = 1e-12);
        assert_eq!(field.set_point_intensity(), Some(1e3));
        field.set_rabi_frequency(1.0).unwrap();
        assert_eq!(field.set_point_intensity(), None);
    }

    #[test]
    fn polarization_names() {
        for pol in [
            Polarization::Linear,
            Polarization::SigmaPlus,
            Polarization::SigmaMinus,
            Polarization::Circular,
        ] {
            assert_eq!(pol.to_string().parse::<Polarization>().unwrap(), pol);
        }
        assert!("elliptical".parse::<Polarization>().is_err());
    }
}
