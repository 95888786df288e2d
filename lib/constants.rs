//! Physical constants and rubidium spectroscopic data.
//!
//! Hyperfine constants and line data are from D. A. Steck, *Rubidium 87 D Line
//! Data* and *Rubidium 85 D Line Data*. Hyperfine `A` and `B` coefficients and
//! natural linewidths are given in units of angular frequency.

use std::f64::consts::TAU;

// reduced Planck constant [J s]
pub const HBAR: f64 = 1.054571817e-34;

// Planck constant [J s]
pub const H: f64 = 6.62607015e-34;

// vacuum permittivity [F / m]
pub const EPSILON_0: f64 = 8.8541878128e-12;

// speed of light [m / s]
pub const C: f64 = 299792458.0;

// Bohr radius [m]
pub const A0: f64 = 5.29177210903e-11;

// elementary charge [C]
pub const E0: f64 = 1.602176634e-19;

/// Convert a frequency in MHz to angular frequency.
pub fn mhz(f: f64) -> f64 { TAU * f * 1e6 }

/* 87Rb ***********************************************************************/

pub const RB87_NUCLEAR_SPIN_HALVES: u32 = 3;
pub const RB87_D1_WAVELENGTH: f64 = 794.978851156e-9; // m
pub const RB87_D2_WAVELENGTH: f64 = 780.241209686e-9; // m
pub const RB87_GROUND_HFS_A: f64 = TAU * 3.417341305452145e9;
pub const RB87_5P12_HFS_A: f64 = TAU * 408.328e6;
pub const RB87_5P32_HFS_A: f64 = TAU * 84.7185e6;
pub const RB87_5P32_HFS_B: f64 = TAU * 12.4965e6;

/* 85Rb ***********************************************************************/

pub const RB85_NUCLEAR_SPIN_HALVES: u32 = 5;
pub const RB85_D1_WAVELENGTH: f64 = 794.979014933e-9; // m
pub const RB85_D2_WAVELENGTH: f64 = 780.241368271e-9; // m
pub const RB85_GROUND_HFS_A: f64 = TAU * 1.0119108130e9;
pub const RB85_5P12_HFS_A: f64 = TAU * 120.527e6;
pub const RB85_5P32_HFS_A: f64 = TAU * 25.0020e6;
pub const RB85_5P32_HFS_B: f64 = TAU * -25.790e6;

/* shared D-line data *********************************************************/

// natural linewidths
pub const RB_D1_DECAY_RATE: f64 = TAU * 5.7500e6;
pub const RB_D2_DECAY_RATE: f64 = TAU * 6.0666e6;

// reduced dipole matrix elements <J||er||J'> [C m]
pub const RB_D1_REDUCED_DIPOLE: f64 = 2.9931 * E0 * A0;
pub const RB_D2_REDUCED_DIPOLE: f64 = 4.2275 * E0 * A0;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reduced_dipoles() {
        assert_relative_eq!(RB_D1_REDUCED_DIPOLE, 2.537e-29, max_relative = 1e-3);
        assert_relative_eq!(RB_D2_REDUCED_DIPOLE, 3.584e-29, max_relative = 1e-3);
    }

    #[test]
    fn mhz_conversion() {
        assert_relative_eq!(mhz(1.0), TAU * 1e6, max_relative = 1e-15);
    }
}
