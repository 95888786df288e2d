//! Double-lambda configurations built from rubidium level data.

use std::{ f64::consts::TAU, fmt };
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use crate::{
    atoms::{ AtomData, Isotope, RbLevel, Transition },
    bloch::{ self, DecayRates, DensityMatrix, SteadyState, SystemParameters },
    error::{ EitError, EitResult },
    hilbert::Basis,
    laser::LaserField,
    susceptibility,
};

/// Default pump Rabi frequency, 2π × 10 MHz.
pub const DEFAULT_PUMP_RABI: f64 = TAU * 10e6;

/// Default probe Rabi frequency, 2π × 1 MHz.
pub const DEFAULT_PROBE_RABI: f64 = TAU * 1e6;

/// Two ground hyperfine levels `|1>`, `|2>` sharing one excited level `|3>`,
/// with a pump on `|1> <-> |3>` and a probe on `|2> <-> |3>`.
#[derive(Clone, Debug)]
pub struct DoubleLambda {
    isotope: Isotope,
    ground1: RbLevel,
    ground2: RbLevel,
    excited: RbLevel,
    pump_transition: Transition,
    probe_transition: Transition,
    pub pump: LaserField,
    pub probe: LaserField,
}

impl DoubleLambda {
    /// Create a new system from the isotope's default levels with the default
    /// fields.
    pub fn new(isotope: Isotope) -> EitResult<Self> {
        let [g1, g2, e] = isotope.default_double_lambda();
        Self::with_levels(isotope, g1, g2, e)
    }

    /// Create a new system from explicit level labels, e.g. `"5S_1/2, F=1"`.
    ///
    /// Fails if a level or either transition does not exist, if the ground
    /// levels coincide or lie above the excited level, or if they belong to
    /// different fine-structure manifolds.
    pub fn with_levels(
        isotope: Isotope,
        ground1: &str,
        ground2: &str,
        excited: &str,
    ) -> EitResult<Self>
    {
        let data = isotope.data();
        let ground1 = data.level(ground1)?;
        let ground2 = data.level(ground2)?;
        let excited = data.level(excited)?;
        validate_levels(&ground1, &ground2, &excited)?;
        let pump_transition = *data.transition(&ground1, &excited)?;
        let probe_transition = *data.transition(&ground2, &excited)?;
        let pump
            = LaserField::new(DEFAULT_PUMP_RABI, 0.0)?
            .with_frequency(pump_transition.frequency);
        let probe
            = LaserField::new(DEFAULT_PROBE_RABI, 0.0)?
            .with_frequency(probe_transition.frequency);
        Ok(Self {
            isotope,
            ground1,
            ground2,
            excited,
            pump_transition,
            probe_transition,
            pump,
            probe,
        })
    }

    /// Set pump Rabi frequency and detuning.
    pub fn with_pump(mut self, rabi: f64, detuning: f64) -> EitResult<Self> {
        self.pump.set_rabi_frequency(rabi)?;
        self.pump.detuning = detuning;
        Ok(self)
    }

    /// Set probe Rabi frequency and detuning.
    pub fn with_probe(mut self, rabi: f64, detuning: f64) -> EitResult<Self> {
        self.probe.set_rabi_frequency(rabi)?;
        self.probe.detuning = detuning;
        Ok(self)
    }

    pub fn isotope(&self) -> Isotope { self.isotope }

    pub fn atom_data(&self) -> &'static AtomData { self.isotope.data() }

    /// Levels in matrix order `[ground1, ground2, excited]`.
    pub fn levels(&self) -> [RbLevel; 3] { [self.ground1, self.ground2, self.excited] }

    pub fn pump_transition(&self) -> &Transition { &self.pump_transition }

    pub fn probe_transition(&self) -> &Transition { &self.probe_transition }

    /// The three levels with their energies, in matrix order.
    pub fn basis(&self) -> Basis<RbLevel> {
        self.levels().into_iter()
            .map(|level| (level, level.energy()))
            .collect()
    }

    /// Pump detuning minus probe detuning.
    pub fn two_photon_detuning(&self) -> f64 {
        self.pump.detuning - self.probe.detuning
    }

    /// Total decay rate of the excited level.
    pub fn excited_decay_rate(&self) -> f64 {
        self.atom_data().total_decay_rate(&self.excited)
    }

    /// Decay of the excited level into each ground level.
    pub fn decay_rates(&self) -> DecayRates {
        self.atom_data().decay_rates(&self.ground1, &self.ground2, &self.excited)
    }

    /// Snapshot of the current fields and decay rates for a solver call.
    pub fn parameters(&self, ground_dephasing: f64) -> SystemParameters {
        SystemParameters {
            pump_rabi: self.pump.rabi_frequency(),
            probe_rabi: self.probe.rabi_frequency(),
            pump_detuning: self.pump.detuning,
            probe_detuning: self.probe.detuning,
            decay: self.decay_rates(),
            ground_dephasing,
        }
    }

    /// Linear EIT susceptibility over a scan of probe detunings, using the
    /// current pump settings.
    pub fn eit_susceptibility(&self, probe_detunings: &nd::Array1<f64>)
        -> nd::Array1<C64>
    {
        susceptibility::eit_spectrum(
            probe_detunings,
            self.pump.rabi_frequency(),
            self.pump.detuning,
            self.probe.rabi_frequency(),
            self.excited_decay_rate(),
        )
    }

    /// Steady state at the current field settings.
    pub fn steady_state(&self, ground_dephasing: f64) -> SteadyState {
        bloch::solve_steady_state(&self.parameters(ground_dephasing))
    }

    /// Steady states over a scan of probe detunings, along with the probe
    /// coherences `rho[[1, 2]]`.
    ///
    /// Points are solved in parallel; output order matches `probe_detunings`.
    pub fn sweep_probe_detuning(
        &self,
        probe_detunings: &nd::Array1<f64>,
        ground_dephasing: f64,
    ) -> (Vec<DensityMatrix>, nd::Array1<C64>)
    {
        let base = self.parameters(ground_dephasing);
        let cells: Vec<SystemParameters>
            = probe_detunings.iter()
            .map(|dc| base.with_probe_detuning(*dc))
            .collect();
        let states: Vec<DensityMatrix>
            = cells.par_iter()
            .map(|p| bloch::solve_steady_state(p).rho)
            .collect();
        let coherences: nd::Array1<C64>
            = states.iter().map(|rho| rho[[1, 2]]).collect();
        (states, coherences)
    }

    /// Probe absorption and dispersion over a scan of probe detunings from
    /// full steady-state solutions; see
    /// [`susceptibility::bloch_susceptibility`].
    pub fn bloch_susceptibility(
        &self,
        probe_detunings: &nd::Array1<f64>,
        number_density: f64,
        ground_dephasing: f64,
    ) -> (nd::Array1<f64>, nd::Array1<f64>)
    {
        let (_, coherences)
            = self.sweep_probe_detuning(probe_detunings, ground_dephasing);
        susceptibility::bloch_susceptibility(
            &coherences,
            self.probe_transition.dipole_moment,
            number_density,
            self.probe.rabi_frequency(),
        )
    }
}

fn validate_levels(g1: &RbLevel, g2: &RbLevel, e: &RbLevel) -> EitResult<()> {
    if g1 == g2 {
        return Err(EitError::InvalidSystem(
            "ground states must be distinct".to_string()));
    }
    if g1.energy() >= e.energy() || g2.energy() >= e.energy() {
        return Err(EitError::InvalidSystem(
            "ground states must lie below the excited state".to_string()));
    }
    if g1.manifold != g2.manifold {
        return Err(EitError::InvalidSystem(
            "ground states must share L and J".to_string()));
    }
    Ok(())
}

impl fmt::Display for DoubleLambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "double-lambda system ({})", self.isotope)?;
        writeln!(f, "  |1> = {}", self.ground1)?;
        writeln!(f, "  |2> = {}", self.ground2)?;
        writeln!(f, "  |3> = {}", self.excited)?;
        writeln!(f, "  pump:  {}", self.pump)?;
        write!(f, "  probe: {}", self.probe)
    }
}
