//! Definitions to describe atomic states and bases of them.

use std::{ hash::Hash, ops::{ Deref, DerefMut } };
use ndarray as nd;
use indexmap::IndexMap;
use itertools::Itertools;

/* States *********************************************************************/

/// A single basis state.
pub trait BasisState: Clone + PartialEq + Eq + Hash + std::fmt::Debug {
    /// Return `true` if two states can be coupled by an electric dipole
    /// transition.
    ///
    /// This method should be reflexive in its inputs.
    fn couples_to(&self, other: &Self) -> bool;
}

/// Extends [`BasisState`] to include spontaneous decay properties.
pub trait SpontaneousDecay: BasisState {
    /// Get the rate of spontaneous decay to another state in units of angular
    /// frequency.
    fn decay_rate(&self, other: &Self) -> Option<f64>;
}

/* Bases **********************************************************************/

/// A collection of unique [`BasisState`]s with associated energies in units of
/// angular frequency.
///
/// This collection is backed by a single [`IndexMap`], which can be accessed
/// via [`AsRef`], [`Deref`] and [`DerefMut`]. Iteration order is the order
/// in which states were inserted and fixes the matrix index of each state.
#[derive(Clone, Debug)]
pub struct Basis<S>
where S: BasisState
{
    energies: IndexMap<S, f64>,
}

impl<S> AsRef<IndexMap<S, f64>> for Basis<S>
where S: BasisState
{
    fn as_ref(&self) -> &IndexMap<S, f64> { &self.energies }
}

impl<S> Deref for Basis<S>
where S: BasisState
{
    type Target = IndexMap<S, f64>;

    fn deref(&self) -> &Self::Target { &self.energies }
}

impl<S> DerefMut for Basis<S>
where S: BasisState
{
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.energies }
}

impl<S> Default for Basis<S>
where S: BasisState
{
    fn default() -> Self { Self { energies: IndexMap::default() } }
}

impl<S> FromIterator<(S, f64)> for Basis<S>
where S: BasisState
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self { energies: iter.into_iter().collect() }
    }
}

impl<S> Basis<S>
where S: BasisState
{
    /// Create a new, empty basis.
    pub fn new() -> Self { Self::default() }

    /// Get the energy in units of angular frequency of a particular basis
    /// state.
    pub fn get_energy(&self, state: &S) -> Option<f64> {
        self.energies.get(state).copied()
    }

    /// Get the energy in units of angular frequency of a particular basis state
    /// by index.
    pub fn get_energy_index(&self, index: usize) -> Option<f64> {
        self.energies.get_index(index).map(|(_, e)| e).copied()
    }

    /// Return all pairs of states coupled by an electric dipole transition,
    /// lower-energy state first.
    pub fn couplings(&self) -> Vec<(&S, &S)> {
        self.energies.iter()
            .tuple_combinations()
            .filter(|((s1, _), (s2, _))| s1.couples_to(s2))
            .map(|((s1, e1), (s2, e2))| if e1 <= e2 { (s1, s2) } else { (s2, s1) })
            .collect()
    }
}

/* Decay **********************************************************************/

/// Builds the decay rate coupling matrix for a basis of
/// [`SpontaneousDecay`] states.
///
/// `Y[[i, j]]` is the rate at which state `j` decays to state `i`.
#[derive(Clone, Debug)]
pub struct YBuilder<S>
where S: SpontaneousDecay
{
    basis: Basis<S>,
}

impl<S> YBuilder<S>
where S: SpontaneousDecay
{
    /// Create a new `YBuilder`.
    pub fn new(basis: Basis<S>) -> Self { Self { basis } }

    /// Get a reference to the basis.
    pub fn basis(&self) -> &Basis<S> { &self.basis }

    /// Compute the decay rate coupling matrix.
    pub fn gen(&self) -> nd::Array2<f64> {
        let n = self.basis.len();
        let keys: Vec<&S> = self.basis.keys().collect();
        nd::Array2::from_shape_fn(
            (n, n),
            |(i, j)| keys[j].decay_rate(keys[i]).unwrap_or(0.0),
        )
    }

    /// Total decay rate out of each state, i.e. the column sums of
    /// [`Self::gen`].
    pub fn totals(&self) -> nd::Array1<f64> {
        self.gen().sum_axis(nd::Axis(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum Lambda { G0, G1, E }

    impl BasisState for Lambda {
        fn couples_to(&self, other: &Self) -> bool {
            matches!(
                (self, other),
                (Self::G0, Self::E) | (Self::E, Self::G0)
                | (Self::G1, Self::E) | (Self::E, Self::G1)
            )
        }
    }

    impl SpontaneousDecay for Lambda {
        fn decay_rate(&self, other: &Self) -> Option<f64> {
            match (self, other) {
                (Self::E, Self::G0) => Some(2.0),
                (Self::E, Self::G1) => Some(1.0),
                _ => None,
            }
        }
    }

    fn basis() -> Basis<Lambda> {
        [(Lambda::G0, 0.0), (Lambda::G1, 1.0), (Lambda::E, 10.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn couplings_are_ordered_by_energy() {
        let basis = basis();
        let pairs = basis.couplings();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(_, up)| **up == Lambda::E));
    }

    #[test]
    fn decay_matrix() {
        let builder = YBuilder::new(basis());
        let Y = builder.gen();
        assert_eq!(Y[[0, 2]], 2.0);
        assert_eq!(Y[[1, 2]], 1.0);
        assert_eq!(Y[[2, 0]], 0.0);
        assert_eq!(builder.totals()[2], 3.0);
    }
}
