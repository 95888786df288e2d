//! Hyperfine level structure, D-line transitions, and spontaneous decay
//! channels of <sup>87</sup>Rb and <sup>85</sup>Rb.
//!
//! Level data are computed once per isotope on first use and shared
//! immutably afterward; see [`Isotope::data`].

use std::{ f64::consts::TAU, fmt, str::FromStr, sync::OnceLock };
use ndarray as nd;
use crate::{
    bloch::DecayRates,
    constants::*,
    error::{ EitError, EitResult },
    hilbert::{ Basis, BasisState, SpontaneousDecay, YBuilder },
    spin::{ SpinTotal, hyperfine_branching, hyperfine_strength },
};

/* Isotopes *******************************************************************/

/// Rubidium isotope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Isotope {
    Rb87,
    Rb85,
}

impl Isotope {
    /// Nuclear spin `I`.
    pub fn nuclear_spin(self) -> SpinTotal {
        match self {
            Self::Rb87 => SpinTotal::new(RB87_NUCLEAR_SPIN_HALVES),
            Self::Rb85 => SpinTotal::new(RB85_NUCLEAR_SPIN_HALVES),
        }
    }

    /// Hyperfine values of `F` available in a manifold.
    pub fn f_values(self, manifold: Manifold) -> impl Iterator<Item = SpinTotal> {
        self.nuclear_spin().coupled_with(manifold.j())
    }

    /// Labels of the default double-lambda levels: two ground hyperfine
    /// levels and one level of the `5P_3/2` manifold.
    pub fn default_double_lambda(self) -> [&'static str; 3] {
        match self {
            Self::Rb87 => ["5S_1/2, F=1", "5S_1/2, F=2", "5P_3/2, F=2"],
            Self::Rb85 => ["5S_1/2, F=2", "5S_1/2, F=3", "5P_3/2, F=3"],
        }
    }

    /// Get the level data table for this isotope, computing it on first
    /// access.
    pub fn data(self) -> &'static AtomData {
        static RB87: OnceLock<AtomData> = OnceLock::new();
        static RB85: OnceLock<AtomData> = OnceLock::new();
        match self {
            Self::Rb87 => RB87.get_or_init(|| AtomData::build(self)),
            Self::Rb85 => RB85.get_or_init(|| AtomData::build(self)),
        }
    }

    fn hfs_coefficients(self, manifold: Manifold) -> (f64, f64) {
        match (self, manifold) {
            (Self::Rb87, Manifold::S12) => (RB87_GROUND_HFS_A, 0.0),
            (Self::Rb87, Manifold::P12) => (RB87_5P12_HFS_A, 0.0),
            (Self::Rb87, Manifold::P32) => (RB87_5P32_HFS_A, RB87_5P32_HFS_B),
            (Self::Rb85, Manifold::S12) => (RB85_GROUND_HFS_A, 0.0),
            (Self::Rb85, Manifold::P12) => (RB85_5P12_HFS_A, 0.0),
            (Self::Rb85, Manifold::P32) => (RB85_5P32_HFS_A, RB85_5P32_HFS_B),
        }
    }

    fn line_wavelength(self, manifold: Manifold) -> Option<f64> {
        match (self, manifold) {
            (_, Manifold::S12) => None,
            (Self::Rb87, Manifold::P12) => Some(RB87_D1_WAVELENGTH),
            (Self::Rb87, Manifold::P32) => Some(RB87_D2_WAVELENGTH),
            (Self::Rb85, Manifold::P12) => Some(RB85_D1_WAVELENGTH),
            (Self::Rb85, Manifold::P32) => Some(RB85_D2_WAVELENGTH),
        }
    }
}

impl fmt::Display for Isotope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rb87 => write!(f, "Rb87"),
            Self::Rb85 => write!(f, "Rb85"),
        }
    }
}

impl FromStr for Isotope {
    type Err = EitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rb87" | "87rb" => Ok(Self::Rb87),
            "rb85" | "85rb" => Ok(Self::Rb85),
            _ => Err(EitError::UnknownIsotope(s.to_string())),
        }
    }
}

/* Levels *********************************************************************/

/// Fine-structure manifold of the `n = 5` shell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Manifold {
    /// 5S<sub>1/2</sub>
    S12,
    /// 5P<sub>1/2</sub>
    P12,
    /// 5P<sub>3/2</sub>
    P32,
}

impl Manifold {
    /// Principal quantum number.
    pub fn n(self) -> u32 { 5 }

    /// Orbital angular momentum.
    pub fn l(self) -> u32 {
        match self {
            Self::S12 => 0,
            Self::P12 | Self::P32 => 1,
        }
    }

    /// Fine-structure total angular momentum.
    pub fn j(self) -> SpinTotal {
        match self {
            Self::S12 | Self::P12 => SpinTotal::new(1),
            Self::P32 => SpinTotal::new(3),
        }
    }

    /// Natural linewidth of the D line ending on this manifold, if excited.
    pub fn line_decay_rate(self) -> Option<f64> {
        match self {
            Self::S12 => None,
            Self::P12 => Some(RB_D1_DECAY_RATE),
            Self::P32 => Some(RB_D2_DECAY_RATE),
        }
    }

    /// Reduced dipole matrix element `<J||er||J'>` of the D line ending on
    /// this manifold, if excited.
    pub fn line_reduced_dipole(self) -> Option<f64> {
        match self {
            Self::S12 => None,
            Self::P12 => Some(RB_D1_REDUCED_DIPOLE),
            Self::P32 => Some(RB_D2_REDUCED_DIPOLE),
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::S12 => "5S_1/2",
            Self::P12 => "5P_1/2",
            Self::P32 => "5P_3/2",
        }
    }
}

/// A single hyperfine level `|n L_J, F>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RbLevel {
    pub isotope: Isotope,
    pub manifold: Manifold,
    pub f: SpinTotal,
}

impl RbLevel {
    pub fn new(isotope: Isotope, manifold: Manifold, f: SpinTotal) -> Self {
        Self { isotope, manifold, f }
    }

    /// Parse a label of the form `"5P_3/2, F=2"` for a given isotope.
    ///
    /// The level must exist in the isotope's hyperfine structure.
    pub fn parse(isotope: Isotope, label: &str) -> EitResult<Self> {
        let not_found = || EitError::LevelNotFound(label.to_string());
        let (prefix, f) = label.split_once(',').ok_or_else(not_found)?;
        let manifold
            = [Manifold::S12, Manifold::P12, Manifold::P32].into_iter()
            .find(|m| m.prefix() == prefix.trim())
            .ok_or_else(not_found)?;
        let f: SpinTotal
            = f.trim()
            .strip_prefix("F=")
            .and_then(|f| f.parse().ok())
            .ok_or_else(not_found)?;
        isotope.f_values(manifold)
            .any(|allowed| allowed == f)
            .then_some(Self { isotope, manifold, f })
            .ok_or_else(not_found)
    }

    /// Spectroscopic label, e.g. `"5S_1/2, F=1"`.
    pub fn label(&self) -> String { self.to_string() }

    /// Return `true` if the level belongs to the ground manifold.
    pub fn is_ground(&self) -> bool { self.manifold == Manifold::S12 }

    /// Energy in units of angular frequency, relative to the 5S<sub>1/2</sub>
    /// center of gravity.
    pub fn energy(&self) -> f64 {
        let (a, b) = self.isotope.hfs_coefficients(self.manifold);
        let line
            = self.isotope.line_wavelength(self.manifold)
            .map(|lambda| TAU * C / lambda)
            .unwrap_or(0.0);
        line + hyperfine_shift(
            a, b, self.isotope.nuclear_spin(), self.manifold.j(), self.f)
    }
}

impl fmt::Display for RbLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, F={}", self.manifold.prefix(), self.f)
    }
}

impl BasisState for RbLevel {
    fn couples_to(&self, other: &Self) -> bool {
        self.isotope == other.isotope
            && self.manifold.l().abs_diff(other.manifold.l()) == 1
            && self.f.halves().abs_diff(other.f.halves()) <= 2
            && !(self.f.halves() == 0 && other.f.halves() == 0)
    }
}

impl SpontaneousDecay for RbLevel {
    fn decay_rate(&self, other: &Self) -> Option<f64> {
        if !other.is_ground() || !self.couples_to(other) { return None; }
        let gamma = self.manifold.line_decay_rate()?;
        let branching = hyperfine_branching(
            self.manifold.j(),
            self.f,
            other.manifold.j(),
            other.f,
            self.isotope.nuclear_spin(),
        );
        Some(gamma * branching)
    }
}

/// Hyperfine shift `A K / 2 + B [3/2 K (K + 1) - 2 I (I + 1) J (J + 1)]
/// / [2 I (2 I - 1) 2 J (2 J - 1)]`, with `K = F (F + 1) - I (I + 1) - J (J +
/// 1)`.
///
/// The quadrupole term is only included for `J > 1/2`.
pub fn hyperfine_shift(a: f64, b: f64, i: SpinTotal, j: SpinTotal, f: SpinTotal)
    -> f64
{
    let K = f.casimir() - i.casimir() - j.casimir();
    let dipole = 0.5 * a * K;
    if j.halves() <= 1 || i.halves() <= 1 {
        dipole
    } else {
        let (I, J) = (i.f(), j.f());
        let quad
            = b * (1.5 * K * (K + 1.0) - 2.0 * i.casimir() * j.casimir())
            / (2.0 * I * (2.0 * I - 1.0) * 2.0 * J * (2.0 * J - 1.0));
        dipole + quad
    }
}

/* Transitions and decay ******************************************************/

/// An electric dipole transition between a ground and an excited hyperfine
/// level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transition {
    pub lower: RbLevel,
    pub upper: RbLevel,
    /// Effective dipole moment `d_red * sqrt(S)` [C m].
    pub dipole_moment: f64,
    /// Relative hyperfine line strength `S(F -> F')`.
    pub strength: f64,
    /// Transition angular frequency.
    pub frequency: f64,
}

impl Transition {
    /// Rabi frequency produced by a field of amplitude `E` [V / m].
    pub fn rabi_frequency(&self, E: f64) -> f64 {
        self.dipole_moment * E / HBAR
    }

    /// Vacuum wavelength [m].
    pub fn wavelength(&self) -> f64 { TAU * C / self.frequency }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lower, self.upper)
    }
}

/// A spontaneous decay channel from an excited to a ground hyperfine level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayChannel {
    pub upper: RbLevel,
    pub lower: RbLevel,
    pub decay_rate: f64,
    pub branching_ratio: f64,
}

/* Data tables ****************************************************************/

/// Immutable level, transition, and decay-channel data for one isotope.
#[derive(Clone, Debug)]
pub struct AtomData {
    isotope: Isotope,
    basis: Basis<RbLevel>,
    transitions: Vec<Transition>,
    channels: Vec<DecayChannel>,
}

impl AtomData {
    fn build(isotope: Isotope) -> Self {
        let basis: Basis<RbLevel>
            = [Manifold::S12, Manifold::P12, Manifold::P32].into_iter()
            .flat_map(|m| {
                isotope.f_values(m).map(move |f| RbLevel::new(isotope, m, f))
            })
            .map(|level| (level, level.energy()))
            .collect();

        let mut transitions: Vec<Transition> = Vec::new();
        let mut channels: Vec<DecayChannel> = Vec::new();
        for (lower, upper) in basis.couplings() {
            let Some(d_red) = upper.manifold.line_reduced_dipole()
                else { continue };
            let strength = hyperfine_strength(
                lower.manifold.j(),
                lower.f,
                upper.manifold.j(),
                upper.f,
                isotope.nuclear_spin(),
            );
            let frequency
                = basis.get_energy(upper).unwrap_or(0.0)
                - basis.get_energy(lower).unwrap_or(0.0);
            transitions.push(Transition {
                lower: *lower,
                upper: *upper,
                dipole_moment: d_red * strength.sqrt(),
                strength,
                frequency,
            });
            if let (Some(rate), Some(gamma))
                = (upper.decay_rate(lower), upper.manifold.line_decay_rate())
            {
                channels.push(DecayChannel {
                    upper: *upper,
                    lower: *lower,
                    decay_rate: rate,
                    branching_ratio: rate / gamma,
                });
            }
        }
        tracing::debug!(
            %isotope,
            levels = basis.len(),
            transitions = transitions.len(),
            channels = channels.len(),
            "built level data"
        );
        Self { isotope, basis, transitions, channels }
    }

    pub fn isotope(&self) -> Isotope { self.isotope }

    /// All hyperfine levels with their energies, ground levels first.
    pub fn basis(&self) -> &Basis<RbLevel> { &self.basis }

    pub fn transitions(&self) -> &[Transition] { &self.transitions }

    pub fn decay_channels(&self) -> &[DecayChannel] { &self.channels }

    pub fn ground_states(&self) -> impl Iterator<Item = &RbLevel> + '_ {
        self.basis.keys().filter(|l| l.is_ground())
    }

    pub fn excited_states(&self) -> impl Iterator<Item = &RbLevel> + '_ {
        self.basis.keys().filter(|l| !l.is_ground())
    }

    /// Look up a level by label.
    pub fn level(&self, label: &str) -> EitResult<RbLevel> {
        RbLevel::parse(self.isotope, label)
    }

    /// Look up the dipole transition between two levels.
    pub fn transition(&self, lower: &RbLevel, upper: &RbLevel)
        -> EitResult<&Transition>
    {
        self.transitions.iter()
            .find(|t| t.lower == *lower && t.upper == *upper)
            .ok_or_else(|| EitError::TransitionNotFound {
                lower: lower.label(),
                upper: upper.label(),
            })
    }

    /// Sum of all decay-channel rates out of a level.
    pub fn total_decay_rate(&self, level: &RbLevel) -> f64 {
        self.channels.iter()
            .filter(|ch| ch.upper == *level)
            .map(|ch| ch.decay_rate)
            .sum()
    }

    /// Decay rate from `upper` to `lower`, or zero if no channel connects
    /// them.
    pub fn decay_rate(&self, upper: &RbLevel, lower: &RbLevel) -> f64 {
        self.channels.iter()
            .find(|ch| ch.upper == *upper && ch.lower == *lower)
            .map(|ch| ch.decay_rate)
            .unwrap_or(0.0)
    }

    /// Decompose the decay of `excited` into branches to `ground1` and
    /// `ground2`.
    ///
    /// `gamma_total` includes decay to levels outside the pair.
    pub fn decay_rates(
        &self,
        ground1: &RbLevel,
        ground2: &RbLevel,
        excited: &RbLevel,
    ) -> DecayRates
    {
        DecayRates {
            gamma_total: self.total_decay_rate(excited),
            gamma_to_ground1: self.decay_rate(excited, ground1),
            gamma_to_ground2: self.decay_rate(excited, ground2),
        }
    }

    /// Decay rate coupling matrix over all levels, indexed in the order of
    /// [`Self::basis`].
    pub fn decay_matrix(&self) -> nd::Array2<f64> {
        YBuilder::new(self.basis.clone()).gen()
    }
}
