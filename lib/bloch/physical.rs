//! Projection of numerically computed matrices onto the set of valid density
//! matrices, and the corresponding validity check.

use ndarray as nd;
use ndarray_linalg::{ Eigh, EigValsh, UPLO };
use num_complex::Complex64 as C64;
use num_traits::Zero;
use serde::{ Deserialize, Serialize };
use super::DensityMatrix;

/// Default absolute tolerance for [`validate`].
pub const DEFAULT_TOL: f64 = 1e-6;

const TRACE_EPS: f64 = 1e-10;

/// The maximally mixed state `I / n`.
pub fn maximally_mixed(n: usize) -> DensityMatrix {
    nd::Array2::from_diag_elem(n, C64::from(1.0 / n as f64))
}

/// `(M + M^dagger) / 2`.
pub fn hermitian_part(M: &nd::Array2<C64>) -> nd::Array2<C64> {
    let Mdag = M.t().mapv(|m| m.conj());
    (M + &Mdag) / C64::from(2.0)
}

/// Repair a square complex matrix into a density matrix.
///
/// The input is first symmetrized to its Hermitian part and divided by its
/// trace; a trace smaller than `1e-10` in magnitude (or a non-finite one)
/// yields the maximally mixed state instead. Negative eigenvalues are then
/// clipped to zero, the spectrum is renormalized to unit sum, and the matrix
/// is rebuilt from its eigenvectors.
///
/// The output is Hermitian with unit trace and non-negative eigenvalues up to
/// floating-point error.
pub fn make_physical(M: &nd::Array2<C64>) -> DensityMatrix {
    let n = M.nrows();
    let mut rho = hermitian_part(M);

    let trace = rho.diag().sum();
    if trace.norm() > TRACE_EPS && trace.is_finite() && rho.iter().all(|r| r.is_finite()) {
        rho /= trace;
    } else {
        tracing::warn!(
            trace = trace.norm(),
            "degenerate trace; substituting the maximally mixed state"
        );
        return maximally_mixed(n);
    }

    let (evals, V) = match rho.eigh(UPLO::Lower) {
        Ok(ev) => ev,
        Err(err) => {
            tracing::warn!(
                %err,
                "eigendecomposition failed; substituting the maximally mixed state"
            );
            return maximally_mixed(n);
        },
    };
    let mut lambda: nd::Array1<f64> = evals.mapv(|l| l.max(0.0));
    let total = lambda.sum();
    if total <= 0.0 || !total.is_finite() {
        return maximally_mixed(n);
    }
    lambda /= total;

    // V diag(lambda) V^dagger
    let Vl: nd::Array2<C64>
        = &V * &lambda.mapv(C64::from).insert_axis(nd::Axis(0));
    let Vdag: nd::Array2<C64> = V.t().mapv(|v| v.conj());
    Vl.dot(&Vdag)
}

/// Result of [`validate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub hermitian: bool,
    pub trace_one: bool,
    pub positive_semidefinite: bool,
    pub valid: bool,
}

/// Check that a matrix is a valid density matrix to within an absolute
/// tolerance `tol`: Hermitian elementwise, real part of the trace within `tol`
/// of 1, and all eigenvalues of the Hermitian part at least `-tol`.
pub fn validate(M: &nd::Array2<C64>, tol: f64) -> Validity {
    let square = M.is_square();
    let hermitian
        = square
        && M.indexed_iter()
            .all(|((i, j), m)| (*m - M[[j, i]].conj()).norm() <= tol);

    let trace = if square { M.diag().sum() } else { C64::zero() };
    let trace_one = square && (trace.re - 1.0).abs() <= tol;

    let positive_semidefinite
        = square
        && hermitian_part(M).eigvalsh(UPLO::Lower)
            .map(|evals| evals.iter().all(|l| *l >= -tol))
            .unwrap_or(false);

    Validity {
        hermitian,
        trace_one,
        positive_semidefinite,
        valid: hermitian && trace_one && positive_semidefinite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn eigenvalues(rho: &DensityMatrix) -> nd::Array1<f64> {
        rho.eigvalsh(UPLO::Lower).unwrap()
    }

    #[test]
    fn repairs_negative_populations() {
        let M = nd::array![
            [C64::new(1.2, 0.0), C64::new(0.3, 0.1), C64::new(0.0, 0.2)],
            [C64::new(0.3, -0.3), C64::new(-0.1, 0.0), C64::zero()],
            [C64::new(0.1, 0.0), C64::zero(), C64::new(-0.05, 0.0)],
        ];
        let rho = make_physical(&M);
        let v = validate(&rho, 1e-8);
        assert!(v.valid, "{v:?}");
        assert!(eigenvalues(&rho).iter().all(|l| *l >= -1e-12));
        assert_abs_diff_eq!(rho.diag().sum().re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn valid_input_is_unchanged() {
        let rho0 = nd::array![
            [C64::new(0.6, 0.0), C64::new(0.1, 0.2)],
            [C64::new(0.1, -0.2), C64::new(0.4, 0.0)],
        ];
        let rho = make_physical(&rho0);
        for (a, b) in rho.iter().zip(rho0.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_trace_gives_maximally_mixed() {
        let M = nd::array![
            [C64::new(1.0, 0.0), C64::zero()],
            [C64::zero(), C64::new(-1.0, 0.0)],
        ];
        assert_eq!(make_physical(&M), maximally_mixed(2));
        let M: nd::Array2<C64> = nd::Array2::from_elem((3, 3), C64::new(f64::NAN, 0.0));
        assert_eq!(make_physical(&M), maximally_mixed(3));
    }

    #[test]
    fn validation_flags() {
        let not_hermitian = nd::array![
            [C64::new(0.5, 0.0), C64::new(0.1, 0.0)],
            [C64::new(0.3, 0.0), C64::new(0.5, 0.0)],
        ];
        let v = validate(&not_hermitian, DEFAULT_TOL);
        assert!(!v.hermitian && v.trace_one && !v.valid);

        let bad_trace = nd::Array2::from_diag_elem(2, C64::from(0.6));
        let v = validate(&bad_trace, DEFAULT_TOL);
        assert!(v.hermitian && !v.trace_one && v.positive_semidefinite);

        let negative = nd::array![
            [C64::new(1.5, 0.0), C64::zero()],
            [C64::zero(), C64::new(-0.5, 0.0)],
        ];
        let v = validate(&negative, DEFAULT_TOL);
        assert!(v.hermitian && v.trace_one && !v.positive_semidefinite);

        let v = validate(&maximally_mixed(3), DEFAULT_TOL);
        assert!(v.valid);
    }
}
