//! Angular momentum quantum numbers and recoupling coefficients for hyperfine
//! manifolds.

use std::hash::Hash;
use thiserror::Error;
use wigner_symbols::Wigner6j;

/// A single total angular momentum quantum number.
///
/// This type is backed by a single `u32` representing the number of halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinTotal(u32);

impl SpinTotal {
    /// Create a new total spin from a number of halves.
    pub const fn new(j: u32) -> Self { Self(j) }

    /// Create a new integer total spin.
    pub const fn integer(j: u32) -> Self { Self(2 * j) }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> u32 { self.0 }

    /// Return `self` as an `f64`.
    ///
    /// This reflects the "true" numerical value of the quantum number; i.e.
    /// there is a relative factor of 2 between this and [`Self::halves`].
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }

    /// Create a new total-spin quantum number from a `f64` value, rounding
    /// to the nearest half-integer.
    ///
    /// Negative inputs are passed through [`f64::abs`] before rounding.
    pub fn from_f64(f: f64) -> Self { Self((2.0 * f.abs()).round() as u32) }

    /// Return `true` if `self` is an integer.
    pub fn is_integer(self) -> bool { self.0 % 2 == 0 }

    /// Return the multiplicity `2j + 1`.
    pub fn multiplicity(self) -> f64 { f64::from(self.0) + 1.0 }

    /// Return `j (j + 1)`.
    pub fn casimir(self) -> f64 {
        let j = self.f();
        j * (j + 1.0)
    }

    /// Iterate over all totals reachable by coupling `self` with `other`, in
    /// ascending order.
    pub fn coupled_with(self, other: Self) -> impl Iterator<Item = Self> {
        let lo = self.0.abs_diff(other.0);
        let hi = self.0 + other.0;
        (lo..=hi).step_by(2).map(Self)
    }
}

impl std::fmt::Display for SpinTotal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}/2", self.0)
        }
    }
}

/// Returned when a string is not a valid integer or half-integer spin.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid spin quantum number '{0}'")]
pub struct ParseSpinError(pub String);

impl std::str::FromStr for SpinTotal {
    type Err = ParseSpinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSpinError(s.to_string());
        match s.trim().split_once('/') {
            Some((num, den)) if den.trim() == "2" => {
                num.trim().parse::<u32>().map(Self).map_err(|_| err())
            },
            Some(_) => Err(err()),
            None => {
                s.trim().parse::<u32>().map(Self::integer).map_err(|_| err())
            },
        }
    }
}

impl From<SpinTotal> for f64 {
    fn from(j: SpinTotal) -> Self { j.f() }
}

/// Calculate the appropriate Wigner 6j symbol for total spins (by row)
/// `j00..j12`.
pub fn w6j<J00, J01, J02, J10, J11, J12>(
    j00: J00,
    j01: J01,
    j02: J02,
    j10: J10,
    j11: J11,
    j12: J12,
) -> f64
where
    J00: Into<SpinTotal>,
    J01: Into<SpinTotal>,
    J02: Into<SpinTotal>,
    J10: Into<SpinTotal>,
    J11: Into<SpinTotal>,
    J12: Into<SpinTotal>,
{
    Wigner6j {
        tj1: j00.into().halves() as i32,
        tj2: j01.into().halves() as i32,
        tj3: j02.into().halves() as i32,
        tj4: j10.into().halves() as i32,
        tj5: j11.into().halves() as i32,
        tj6: j12.into().halves() as i32,
    }
    .value()
    .into()
}

/// Relative strength of the hyperfine component `F -> F'` of the fine
/// structure line `J -> J'` for nuclear spin `I`.
///
/// Normalized so that the strengths summed over all `F'` for a fixed lower `F`
/// equal 1.
pub fn hyperfine_strength(
    j_lo: SpinTotal,
    f_lo: SpinTotal,
    j_up: SpinTotal,
    f_up: SpinTotal,
    i: SpinTotal,
) -> f64
{
    let sixj = w6j(j_lo, j_up, SpinTotal::integer(1), f_up, f_lo, i);
    f_up.multiplicity() * j_lo.multiplicity() * sixj.powi(2)
}

/// Branching ratio for spontaneous decay of the hyperfine level `F'` of the
/// manifold `J'` to the lower level `F` of the manifold `J`.
///
/// Normalized so that the ratios summed over all `F` for a fixed upper `F'`
/// equal 1.
pub fn hyperfine_branching(
    j_up: SpinTotal,
    f_up: SpinTotal,
    j_lo: SpinTotal,
    f_lo: SpinTotal,
    i: SpinTotal,
) -> f64
{
    let sixj = w6j(j_lo, j_up, SpinTotal::integer(1), f_up, f_lo, i);
    f_lo.multiplicity() * j_up.multiplicity() * sixj.powi(2)
}
