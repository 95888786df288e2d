//! Optical response derived from steady-state coherences.
//!
//! Linear EIT susceptibility uses the closed-form weak-probe expression.
//! Third-order susceptibility and four-wave-mixing intensity are built from
//! the ground-state coherence of a three-level solve. None of these functions
//! clamp non-finite values.

use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::{
    bloch::DensityMatrix,
    constants::{ C, EPSILON_0, HBAR },
};

/// Regularizer added to the two-photon detuning in [`eit_susceptibility`], in
/// units of angular frequency.
pub const TWO_PHOTON_EPS: f64 = 1e-6;

/// Denominator magnitude below which [`compute_chi3`] returns zero.
pub const CHI3_DENOM_EPS: f64 = 1e-30;

/// Linear susceptibility at a single probe detuning:
/// ```text
/// χ = Ωprobe^2 / [ (Δprobe + i Γ/2) + Ωpump^2 / (4 (Δ2 + i ε)) ]
/// ```
/// where `Δ2 = Δpump - Δprobe`. Absorption is `Im χ` and dispersion is `Re χ`.
pub fn eit_susceptibility(
    probe_detuning: f64,
    pump_rabi: f64,
    pump_detuning: f64,
    probe_rabi: f64,
    gamma: f64,
) -> C64
{
    let two_photon = pump_detuning - probe_detuning;
    let denom
        = C64::new(probe_detuning, gamma / 2.0)
        + pump_rabi.powi(2) / (4.0 * C64::new(two_photon, TWO_PHOTON_EPS));
    probe_rabi.powi(2) / denom
}

/// [`eit_susceptibility`] over a scan of probe detunings.
pub fn eit_spectrum(
    probe_detunings: &nd::Array1<f64>,
    pump_rabi: f64,
    pump_detuning: f64,
    probe_rabi: f64,
    gamma: f64,
) -> nd::Array1<C64>
{
    probe_detunings.mapv(|dc| {
        eit_susceptibility(dc, pump_rabi, pump_detuning, probe_rabi, gamma)
    })
}

/// Absorption (`Im χ`) of a linear susceptibility spectrum.
pub fn absorption(chi: &nd::Array1<C64>) -> nd::Array1<f64> { chi.mapv(|x| x.im) }

/// Dispersion (`Re χ`) of a linear susceptibility spectrum.
pub fn dispersion(chi: &nd::Array1<C64>) -> nd::Array1<f64> { chi.mapv(|x| x.re) }

/// Third-order susceptibility from the ground-state coherence `rho[[0, 1]]`:
/// ```text
/// χ3 = N d^2 / (ε0 ħ) ρ12 / [ (Δc + i Γ/2) Ωc/2 ]
/// ```
/// Returns exactly zero when the denominator magnitude is below `1e-30`.
pub fn compute_chi3(
    rho: &DensityMatrix,
    probe_rabi: f64,
    probe_detuning: f64,
    gamma: f64,
    dipole_moment: f64,
    number_density: f64,
) -> C64
{
    let denom = C64::new(probe_detuning, gamma / 2.0) * (probe_rabi / 2.0);
    if denom.norm() < CHI3_DENOM_EPS { return C64::zero(); }
    let prefactor = number_density * dipole_moment.powi(2) / (EPSILON_0 * HBAR);
    prefactor * rho[[0, 1]] / denom
}

/// Four-wave-mixing signal intensity [W / m^2]:
/// `I = ε0 c |χ3|^2 Ipump^2 Iprobe L^2`.
pub fn compute_fwm_intensity(
    chi3: C64,
    pump_intensity: f64,
    probe_intensity: f64,
    interaction_length: f64,
) -> f64
{
    EPSILON_0 * C * chi3.norm_sqr()
        * pump_intensity.powi(2) * probe_intensity
        * interaction_length.powi(2)
}

/// Probe absorption and dispersion computed from steady-state probe
/// coherences `ρ23`.
///
/// With `χ = N d^2 / (2 ε0 ħ) ρ23 / Ωprobe`, returns `(-2 Im χ, 2 Re χ)`.
pub fn bloch_susceptibility(
    coherences: &nd::Array1<C64>,
    dipole_moment: f64,
    number_density: f64,
    probe_rabi: f64,
) -> (nd::Array1<f64>, nd::Array1<f64>)
{
    let prefactor
        = number_density * dipole_moment.powi(2) / (2.0 * EPSILON_0 * HBAR);
    let chi: nd::Array1<C64> = coherences.mapv(|r| prefactor * r / probe_rabi);
    (chi.mapv(|x| -2.0 * x.im), chi.mapv(|x| 2.0 * x.re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use approx::assert_relative_eq;
    use crate::constants::RB_D2_REDUCED_DIPOLE;

    fn rho_with_coherence(r12: C64) -> DensityMatrix {
        let mut rho: DensityMatrix = nd::Array2::zeros((3, 3));
        rho[[0, 0]] = C64::from(0.5);
        rho[[1, 1]] = C64::from(0.5);
        rho[[0, 1]] = r12;
        rho[[1, 0]] = r12.conj();
        rho
    }

    #[test]
    fn chi3_scales_with_density() {
        let rho = rho_with_coherence(C64::new(-0.1, 0.02));
        let args = (TAU * 1e6, TAU * 2e6, TAU * 6e6, RB_D2_REDUCED_DIPOLE);
        let chi_a = compute_chi3(&rho, args.0, args.1, args.2, args.3, 1e17);
        let chi_b = compute_chi3(&rho, args.0, args.1, args.2, args.3, 1e18);
        assert_relative_eq!(chi_b.norm() / chi_a.norm(), 10.0, max_relative = 1e-12);
    }

    #[test]
    fn chi3_zero_denominator() {
        let rho: DensityMatrix = nd::Array2::zeros((3, 3));
        let chi3 = compute_chi3(&rho, 0.0, 0.0, TAU * 6e6, RB_D2_REDUCED_DIPOLE, 1e17);
        assert_eq!(chi3, C64::new(0.0, 0.0));
    }

    #[test]
    fn fwm_scaling_laws() {
        let chi3 = C64::new(1e-3, -2e-3);
        let base = compute_fwm_intensity(chi3, 1e3, 1e2, 0.01);
        assert!(base > 0.0);
        let longer = compute_fwm_intensity(chi3, 1e3, 1e2, 0.02);
        let brighter = compute_fwm_intensity(chi3, 2e3, 1e2, 0.01);
        assert_relative_eq!(longer / base, 4.0, max_relative = 1e-12);
        assert_relative_eq!(brighter / base, 4.0, max_relative = 1e-12);
    }

    #[test]
    fn eit_far_detuned_limit() {
        // far from two-photon resonance the pump term is negligible
        let gamma = TAU * 6e6;
        let dc = TAU * 1e12;
        let chi = eit_susceptibility(dc, TAU * 1e6, 0.0, TAU * 1e6, gamma);
        let bare = (TAU * 1e6).powi(2) / C64::new(dc, gamma / 2.0);
        assert_relative_eq!(chi.re, bare.re, max_relative = 1e-6);
    }

    #[test]
    fn eit_window_at_two_photon_resonance() {
        let gamma = TAU * 6.0666e6;
        let scan: nd::Array1<f64> = nd::Array1::linspace(-TAU * 20e6, TAU * 20e6, 201);
        let chi = eit_spectrum(&scan, TAU * 10e6, 0.0, TAU * 1e6, gamma);
        let abs = absorption(&chi).mapv(f64::abs);
        let edge: f64
            = abs.iter().take(10).chain(abs.iter().rev().take(10)).sum::<f64>()
            / 20.0;
        assert!(abs[100] < edge);
        assert_eq!(dispersion(&chi).len(), 201);
    }

    #[test]
    fn bloch_susceptibility_signs() {
        let coherences = nd::array![C64::new(0.0, 0.1), C64::new(0.1, 0.0)];
        let (abs, disp) = bloch_susceptibility(&coherences, 1.0, 1.0, 1.0);
        let prefactor = 1.0 / (2.0 * EPSILON_0 * HBAR);
        assert_relative_eq!(abs[0], -0.2 * prefactor, max_relative = 1e-12);
        assert_relative_eq!(disp[1], 0.2 * prefactor, max_relative = 1e-12);
        assert_eq!(disp[0], 0.0);
    }
}
