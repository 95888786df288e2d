//! Damped Newton iteration for small, dense systems of real nonlinear
//! equations.
//!
//! The Jacobian is approximated by forward differences and each step is
//! solved with LAPACK through [`ndarray_linalg`]. Steps are shortened by
//! backtracking until the residual norm decreases. When the Newton step is
//! unusable (singular or ill-conditioned Jacobian) a Levenberg-Marquardt step
//! `(JᵀJ + μI) dx = -JᵀF` is taken instead. All scratch arrays are owned by a
//! single call, so concurrent solves share nothing.

use ndarray as nd;
use ndarray_linalg::Solve;
use thiserror::Error;

/// Reasons a Newton iteration can fail.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NewtonError {
    #[error("residual function returned a non-finite value")]
    NonFinite,

    #[error("Jacobian is singular")]
    Singular,

    #[error("line search failed to reduce the residual (|F| = {0:.3e})")]
    LineSearch(f64),

    #[error("no convergence after {iterations} iterations (|F| = {residual:.3e})")]
    MaxIterations { iterations: usize, residual: f64 },
}

/// Iteration controls.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Convergence threshold on the max-norm of the residual.
    pub tol: f64,
    pub max_iter: usize,
    /// Relative forward-difference step for the Jacobian.
    pub fd_step: f64,
    /// Smallest step fraction tried by the line search.
    pub min_alpha: f64,
    /// Levenberg-Marquardt damping relative to the largest diagonal element
    /// of `JᵀJ`.
    pub damping: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_iter: 100,
            fd_step: 1e-7,
            min_alpha: 1e-8,
            damping: 1e-10,
        }
    }
}

/// A converged root.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonSolution {
    pub x: nd::Array1<f64>,
    pub iterations: usize,
    pub residual: f64,
}

fn max_norm(v: &nd::Array1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, vk| acc.max(vk.abs()))
}

fn all_finite(v: &nd::Array1<f64>) -> bool { v.iter().all(|vk| vk.is_finite()) }

/// Forward-difference Jacobian `J[[i, k]] = dF_i / dx_k` at `x`, given
/// `fx = F(x)`.
pub fn jacobian<F>(f: &F, x: &nd::Array1<f64>, fx: &nd::Array1<f64>, rel_step: f64)
    -> nd::Array2<f64>
where F: Fn(&nd::Array1<f64>) -> nd::Array1<f64>
{
    let n = x.len();
    let m = fx.len();
    let mut J: nd::Array2<f64> = nd::Array2::zeros((m, n));
    let mut xh: nd::Array1<f64> = x.clone();
    for k in 0..n {
        let h = rel_step * x[k].abs().max(1.0);
        xh[k] = x[k] + h;
        let fh = f(&xh);
        J.column_mut(k).assign(&((&fh - fx) / h));
        xh[k] = x[k];
    }
    J
}

fn newton_step(J: &nd::Array2<f64>, fx: &nd::Array1<f64>)
    -> Option<nd::Array1<f64>>
{
    let rhs: nd::Array1<f64> = fx.mapv(|fk| -fk);
    J.solve_into(rhs).ok().filter(all_finite)
}

/// Levenberg-Marquardt step, well defined for rank-deficient `J`.
fn damped_step(J: &nd::Array2<f64>, fx: &nd::Array1<f64>, damping: f64)
    -> Option<nd::Array1<f64>>
{
    let mut JtJ: nd::Array2<f64> = J.t().dot(J);
    let scale = JtJ.diag().fold(0.0_f64, |acc, a| acc.max(*a));
    if !(scale > 0.0 && scale.is_finite()) { return None; }
    let mu = damping * scale;
    JtJ.diag_mut().mapv_inplace(|a| a + mu);
    let rhs: nd::Array1<f64> = -J.t().dot(fx);
    JtJ.solve_into(rhs).ok().filter(all_finite)
}

/// Backtrack along `dx` until the residual norm drops sufficiently.
fn line_search<F>(
    f: &F,
    x: &nd::Array1<f64>,
    dx: &nd::Array1<f64>,
    norm: f64,
    min_alpha: f64,
) -> Option<(nd::Array1<f64>, nd::Array1<f64>, f64)>
where F: Fn(&nd::Array1<f64>) -> nd::Array1<f64>
{
    let mut alpha = 1.0;
    while alpha >= min_alpha {
        let x_new: nd::Array1<f64> = x + &(alpha * dx);
        let f_new = f(&x_new);
        let norm_new = max_norm(&f_new);
        if all_finite(&f_new) && norm_new < (1.0 - 1e-4 * alpha) * norm {
            return Some((x_new, f_new, norm_new));
        }
        alpha *= 0.5;
    }
    None
}

/// Find a root of `f` starting from `x0`.
pub fn solve<F>(f: F, x0: &nd::Array1<f64>, config: &NewtonConfig)
    -> Result<NewtonSolution, NewtonError>
where F: Fn(&nd::Array1<f64>) -> nd::Array1<f64>
{
    let mut x: nd::Array1<f64> = x0.clone();
    let mut fx: nd::Array1<f64> = f(&x);
    if !all_finite(&fx) { return Err(NewtonError::NonFinite); }
    let mut norm = max_norm(&fx);

    for iter in 0..config.max_iter {
        if norm <= config.tol {
            return Ok(NewtonSolution { x, iterations: iter, residual: norm });
        }
        let J = jacobian(&f, &x, &fx, config.fd_step);
        let accepted
            = newton_step(&J, &fx)
            .and_then(|dx| line_search(&f, &x, &dx, norm, config.min_alpha));
        let (x_new, f_new, norm_new) = match accepted {
            Some(step) => step,
            None => {
                let dx = damped_step(&J, &fx, config.damping)
                    .ok_or(NewtonError::Singular)?;
                line_search(&f, &x, &dx, norm, config.min_alpha)
                    .ok_or(NewtonError::LineSearch(norm))?
            },
        };
        x = x_new;
        fx = f_new;
        norm = norm_new;
    }
    if norm <= config.tol {
        Ok(NewtonSolution { x, iterations: config.max_iter, residual: norm })
    } else {
        Err(NewtonError::MaxIterations {
            iterations: config.max_iter,
            residual: norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_system() {
        let f = |x: &nd::Array1<f64>| {
            nd::array![2.0 * x[0] + x[1] - 3.0, x[0] - x[1]]
        };
        let sol = solve(f, &nd::array![0.0, 0.0], &NewtonConfig::default())
            .unwrap();
        assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(sol.x[1], 1.0, epsilon = 1e-8);
        assert!(sol.iterations <= 3);
    }

    #[test]
    fn nonlinear_system() {
        // circle of radius 2 intersected with y = x
        let f = |x: &nd::Array1<f64>| {
            nd::array![x[0].powi(2) + x[1].powi(2) - 4.0, x[0] - x[1]]
        };
        let sol = solve(f, &nd::array![1.0, 0.5], &NewtonConfig::default())
            .unwrap();
        assert_abs_diff_eq!(sol.x[0], 2.0_f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(sol.x[1], 2.0_f64.sqrt(), epsilon = 1e-8);
    }

    #[test]
    fn already_converged() {
        let f = |x: &nd::Array1<f64>| x.clone();
        let sol = solve(f, &nd::array![0.0], &NewtonConfig::default()).unwrap();
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn singular_jacobian() {
        // inconsistent: no root exists
        let f = |x: &nd::Array1<f64>| nd::array![x[0] + x[1] - 1.0, 2.0 * x[0] + 2.0 * x[1] - 3.0];
        let res = solve(f, &nd::array![0.0, 0.0], &NewtonConfig::default());
        assert!(res.is_err());
    }

    #[test]
    fn rank_deficient_system() {
        // a line of roots; J is singular everywhere
        let f = |x: &nd::Array1<f64>| nd::array![x[0] + x[1] - 1.0, 2.0 * x[0] + 2.0 * x[1] - 2.0];
        let sol = solve(f, &nd::array![0.0, 0.0], &NewtonConfig::default())
            .unwrap();
        assert_abs_diff_eq!(sol.x[0] + sol.x[1], 1.0, epsilon = 1e-8);
        assert!(sol.residual <= 1e-10);
    }

    #[test]
    fn zero_jacobian() {
        let f = |_: &nd::Array1<f64>| nd::array![1.0];
        let res = solve(f, &nd::array![0.0], &NewtonConfig::default());
        assert_eq!(res, Err(NewtonError::Singular));
    }

    #[test]
    fn non_finite_residual() {
        let f = |x: &nd::Array1<f64>| x.mapv(|xk| 1.0 / xk);
        let res = solve(f, &nd::array![0.0], &NewtonConfig::default());
        assert_eq!(res, Err(NewtonError::NonFinite));
    }
}
