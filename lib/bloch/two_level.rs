//! Closed-form steady state of a single driven transition.

use ndarray as nd;
use num_complex::Complex64 as C64;
use super::DensityMatrix;

/// Steady-state density matrix `[[rho_gg, rho_ge], [rho_eg, rho_ee]]` of a
/// two-level atom with Rabi frequency `rabi`, detuning `detuning`, excited
/// decay rate `decay`, and coherence dephasing rate `dephasing`.
///
/// The result is Hermitian with unit trace by construction. When all four
/// inputs vanish the solution is undefined and the entries are NaN.
pub fn two_level_steady_state(
    rabi: f64,
    detuning: f64,
    decay: f64,
    dephasing: f64,
) -> DensityMatrix
{
    let g = decay / 2.0 + dephasing;
    let denom = detuning.powi(2) + g.powi(2) + rabi.powi(2) / 2.0;
    let rho_ee = (rabi.powi(2) / 2.0) / denom;
    let rho_gg = 1.0 - rho_ee;
    let rho_ge
        = C64::new(0.0, -rabi / 2.0) * C64::new(detuning, -g) / denom;
    nd::array![
        [C64::from(rho_gg), rho_ge             ],
        [rho_ge.conj(),     C64::from(rho_ee)  ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use approx::assert_relative_eq;
    use crate::bloch::validate;

    #[test]
    fn resonant_saturation() {
        let rabi = TAU * 10e6;
        let gamma = TAU * 6e6;
        let rho = two_level_steady_state(rabi, 0.0, gamma, 0.0);
        let expected
            = (rabi.powi(2) / 2.0) / (gamma.powi(2) / 4.0 + rabi.powi(2) / 2.0);
        assert_relative_eq!(rho[[1, 1]].re, expected, max_relative = 1e-6);
        assert!(validate(&rho, 1e-6).valid);
    }

    #[test]
    fn weak_field_stays_in_ground() {
        let rho = two_level_steady_state(TAU * 0.1e6, 0.0, TAU * 6e6, 0.0);
        assert!(rho[[0, 0]].re > 0.99);
    }

    #[test]
    fn detuned_coherence_is_conjugate_symmetric() {
        let rho = two_level_steady_state(TAU * 3e6, TAU * 5e6, TAU * 6e6, TAU * 0.5e6);
        assert_eq!(rho[[1, 0]], rho[[0, 1]].conj());
        assert_relative_eq!((rho[[0, 0]] + rho[[1, 1]]).re, 1.0, epsilon = 1e-15);
        assert!(rho[[0, 1]].norm() > 0.0);
    }
}
