//! Steady state of the three-level double-lambda optical Bloch equations.
//!
//! In the rotating frame, with pump `(Op, Dp)` on `|1> <-> |3>`, probe `(Oc,
//! Dc)` on `|2> <-> |3>`, excited decay `G` split into branches `G1`, `G2`,
//! and ground dephasing `g`:
//! ```text
//! d rho11 / dt = G1 rho33 + i Op/2 (rho13 - rho13*)
//! d rho22 / dt = G2 rho33 + i Oc/2 (rho23 - rho23*)
//! d rho12 / dt = (i (Dp - Dc) - g) rho12 + i Op/2 rho23* - i Oc/2 rho13
//! d rho13 / dt = (i Dp - G/2 - g) rho13 + i Op/2 (rho33 - rho11) - i Oc/2 rho12
//! d rho23 / dt = (i Dc - G/2 - g) rho23 + i Oc/2 (rho33 - rho22) - i Op/2 rho12
//! ```
//! with `rho33 = 1 - rho11 - rho22`. The `rho33` equation is implied by the
//! trace constraint and dropped, leaving eight real equations in eight real
//! unknowns.

use ndarray as nd;
use num_complex::Complex64 as C64;
use super::{
    DensityMatrix,
    SystemParameters,
    newton::{ self, NewtonConfig, NewtonError },
    physical::make_physical,
};

/// Root-finder starting point and fallback result: `rho11 = rho22 = 0.45`,
/// `rho33 = 0.1`, no coherences.
pub const INITIAL_GUESS: [f64; 8] = [0.45, 0.45, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// How a steady state was obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum Convergence {
    /// The root finder converged.
    Converged { iterations: usize, residual: f64 },
    /// The root finder failed and the result was built from
    /// [`INITIAL_GUESS`].
    Fallback { reason: NewtonError },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Solution of [`solve_steady_state`].
#[derive(Clone, Debug, PartialEq)]
pub struct SteadyState {
    /// Physical density matrix ordered `[ground1, ground2, excited]`.
    pub rho: DensityMatrix,
    pub convergence: Convergence,
}

impl SteadyState {
    pub fn ground_coherence(&self) -> C64 { self.rho[[0, 1]] }

    pub fn probe_coherence(&self) -> C64 { self.rho[[1, 2]] }

    pub fn excited_population(&self) -> f64 { self.rho[[2, 2]].re }
}

// parameters in units of a common rate
#[derive(Copy, Clone, Debug)]
struct Scaled {
    Op: f64,
    Oc: f64,
    Dp: f64,
    Dc: f64,
    G: f64,
    G1: f64,
    G2: f64,
    g: f64,
}

impl Scaled {
    fn new(params: &SystemParameters) -> Result<Self, NewtonError> {
        let raw = [
            params.pump_rabi,
            params.probe_rabi,
            params.pump_detuning,
            params.probe_detuning,
            params.decay.gamma_total,
            params.decay.gamma_to_ground1,
            params.decay.gamma_to_ground2,
            params.ground_dephasing,
        ];
        if raw.iter().any(|r| !r.is_finite()) {
            return Err(NewtonError::NonFinite);
        }
        let s = raw.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
        if s <= 0.0 { return Err(NewtonError::Singular); }
        Ok(Self {
            Op: raw[0] / s,
            Oc: raw[1] / s,
            Dp: raw[2] / s,
            Dc: raw[3] / s,
            G: raw[4] / s,
            G1: raw[5] / s,
            G2: raw[6] / s,
            g: raw[7] / s,
        })
    }
}

fn unpack(x: &nd::Array1<f64>) -> [C64; 6] {
    let rho11 = C64::from(x[0]);
    let rho22 = C64::from(x[1]);
    let rho33 = C64::from(1.0 - x[0] - x[1]);
    let rho12 = C64::new(x[2], x[3]);
    let rho13 = C64::new(x[4], x[5]);
    let rho23 = C64::new(x[6], x[7]);
    [rho11, rho22, rho33, rho12, rho13, rho23]
}

fn residuals(x: &nd::Array1<f64>, p: &Scaled) -> nd::Array1<f64> {
    let i = C64::i();
    let [rho11, rho22, rho33, rho12, rho13, rho23] = unpack(x);

    let d11
        = p.G1 * rho33 + i * (p.Op / 2.0) * (rho13 - rho13.conj());
    let d22
        = p.G2 * rho33 + i * (p.Oc / 2.0) * (rho23 - rho23.conj());
    let d12
        = (i * (p.Dp - p.Dc) - p.g) * rho12
        + i * (p.Op / 2.0) * rho23.conj()
        - i * (p.Oc / 2.0) * rho13;
    let d13
        = (i * p.Dp - p.G / 2.0 - p.g) * rho13
        + i * (p.Op / 2.0) * (rho33 - rho11)
        - i * (p.Oc / 2.0) * rho12;
    let d23
        = (i * p.Dc - p.G / 2.0 - p.g) * rho23
        + i * (p.Oc / 2.0) * (rho33 - rho22)
        - i * (p.Op / 2.0) * rho12;

    nd::array![
        d11.re, d22.re,
        d12.re, d12.im,
        d13.re, d13.im,
        d23.re, d23.im,
    ]
}

fn assemble(x: &nd::Array1<f64>) -> DensityMatrix {
    let [rho11, rho22, rho33, rho12, rho13, rho23] = unpack(x);
    nd::array![
        [rho11,        rho12,        rho13],
        [rho12.conj(), rho22,        rho23],
        [rho13.conj(), rho23.conj(), rho33],
    ]
}

/// Density matrix corresponding to [`INITIAL_GUESS`].
pub fn fallback_state() -> DensityMatrix {
    assemble(&nd::Array1::from(INITIAL_GUESS.to_vec()))
}

/// Solve for the steady state of the double-lambda system described by
/// `params`.
///
/// Rates are rescaled by their largest magnitude before root finding. If the
/// iteration does not converge, the returned matrix is built from
/// [`INITIAL_GUESS`] and the failure is recorded in
/// [`SteadyState::convergence`]. In both cases the matrix is passed through
/// [`make_physical`].
pub fn solve_steady_state(params: &SystemParameters) -> SteadyState {
    let x0 = nd::Array1::from(INITIAL_GUESS.to_vec());
    let result
        = Scaled::new(params)
        .and_then(|p| {
            newton::solve(|x| residuals(x, &p), &x0, &NewtonConfig::default())
        });
    match result {
        Ok(sol) => {
            tracing::debug!(
                iterations = sol.iterations,
                residual = sol.residual,
                "steady state converged"
            );
            SteadyState {
                rho: make_physical(&assemble(&sol.x)),
                convergence: Convergence::Converged {
                    iterations: sol.iterations,
                    residual: sol.residual,
                },
            }
        },
        Err(reason) => {
            tracing::warn!(
                %reason,
                pump_rabi = params.pump_rabi,
                probe_rabi = params.probe_rabi,
                pump_detuning = params.pump_detuning,
                probe_detuning = params.probe_detuning,
                "steady state did not converge; using initial guess"
            );
            SteadyState {
                rho: make_physical(&fallback_state()),
                convergence: Convergence::Fallback { reason },
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use approx::assert_abs_diff_eq;
    use crate::bloch::{ validate, DecayRates };

    fn params(dp: f64, dc: f64) -> SystemParameters {
        SystemParameters::new(TAU * 10e6, TAU * 1e6, dp, dc, TAU * 6.0666e6, 0.0)
    }

    #[test]
    fn residuals_vanish_at_solution() {
        let p = params(0.0, TAU * 3e6);
        let scaled = Scaled::new(&p).unwrap();
        let sol = newton::solve(
            |x| residuals(x, &scaled),
            &nd::Array1::from(INITIAL_GUESS.to_vec()),
            &NewtonConfig::default(),
        )
        .unwrap();
        let r = residuals(&sol.x, &scaled);
        assert!(r.iter().all(|rk| rk.abs() < 1e-9));
    }

    #[test]
    fn resonant_dark_state() {
        let ss = solve_steady_state(&params(0.0, 0.0));
        assert!(ss.convergence.is_converged());
        assert!(validate(&ss.rho, 1e-6).valid);
        assert!(ss.excited_population() < 0.5);
        assert_abs_diff_eq!(ss.excited_population(), 0.0, epsilon = 1e-6);
        // population is pumped into the ground state weakly coupled to |3>
        assert!(ss.rho[[1, 1]].re > ss.rho[[0, 0]].re);
    }

    #[test]
    fn balanced_drive_dark_state() {
        // equal Rabi frequencies on two-photon resonance: the Jacobian is
        // singular along the dark-state family
        for rabi in [TAU * 5e6, TAU * 10e6] {
            let p = SystemParameters::new(rabi, rabi, 0.0, 0.0, TAU * 6.0666e6, 0.0);
            let ss = solve_steady_state(&p);
            assert!(ss.convergence.is_converged(), "{:?}", ss.convergence);
            assert!(validate(&ss.rho, 1e-6).valid);
            assert_abs_diff_eq!(ss.excited_population(), 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(ss.rho[[0, 0]].re, 0.5, epsilon = 1e-6);
            assert_abs_diff_eq!(ss.ground_coherence().norm(), 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn off_resonant_results_are_physical() {
        for (dp, dc) in [(0.0, TAU * 5e6), (TAU * 2e6, -TAU * 7e6), (TAU * 20e6, 0.0)] {
            let p = params(dp, dc).with_ground_dephasing(TAU * 0.1e6);
            let ss = solve_steady_state(&p);
            let v = validate(&ss.rho, 1e-6);
            assert!(v.valid, "{v:?} at ({dp}, {dc})");
            for ((i, j), r) in ss.rho.indexed_iter() {
                assert_abs_diff_eq!(r.re, ss.rho[[j, i]].re, epsilon = 1e-8);
                assert_abs_diff_eq!(r.im, -ss.rho[[j, i]].im, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn asymmetric_branching() {
        let p = params(0.0, TAU * 1e6)
            .with_decay(DecayRates {
                gamma_total: TAU * 6e6,
                gamma_to_ground1: TAU * 4e6,
                gamma_to_ground2: TAU * 2e6,
            });
        let ss = solve_steady_state(&p);
        assert!(validate(&ss.rho, 1e-6).valid);
    }

    #[test]
    fn degenerate_parameters_fall_back() {
        let p = SystemParameters::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let ss = solve_steady_state(&p);
        assert!(!ss.convergence.is_converged());
        assert_abs_diff_eq!(ss.rho[[0, 0]].re, 0.45, epsilon = 1e-12);
        assert!(validate(&ss.rho, 1e-6).valid);

        let p = params(f64::NAN, 0.0);
        let ss = solve_steady_state(&p);
        assert_eq!(
            ss.convergence,
            Convergence::Fallback { reason: NewtonError::NonFinite },
        );
    }

    #[test]
    fn fallback_state_has_unit_trace() {
        let rho = fallback_state();
        assert_abs_diff_eq!(rho.diag().sum().re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(rho[[2, 2]].re, 0.1, epsilon = 1e-15);
    }
}
