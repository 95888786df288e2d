#![allow(non_snake_case)]

//! Steady-state optical response of double-lambda EIT systems in rubidium.
//!
//! The core of the crate is the optical Bloch equation steady-state solver
//! ([`bloch`]), which feeds the susceptibility and four-wave-mixing quantities
//! in [`susceptibility`] and the parameter sweeps in [`sweep`]. Atomic level
//! data for <sup>87</sup>Rb and <sup>85</sup>Rb live in [`atoms`].
//!
//! All rates, detunings, and Rabi frequencies are in units of angular
//! frequency.

pub mod constants;
pub mod error;
pub mod utils;
pub mod spin;
pub mod hilbert;
pub mod atoms;
pub mod laser;
pub mod double_lambda;
pub mod bloch;
pub mod susceptibility;
pub mod spectra;
pub mod sweep;
pub mod export;
pub mod config;

pub use error::{ EitError, EitResult };
pub use bloch::{ DensityMatrix, DecayRates, SystemParameters };
