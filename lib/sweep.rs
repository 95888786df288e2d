//! One- and two-dimensional parameter sweeps of FWM spectra.
//!
//! Every grid cell builds its own [`SystemParameters`] from a fixed base and
//! runs the full solve -> χ3 -> intensity pipeline independently. Cells are
//! evaluated in parallel with `rayon` and collected in row-major order (first
//! axis outer).

use std::{ fmt, str::FromStr };
use indexmap::IndexMap;
use itertools::Itertools;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    bloch::SystemParameters,
    error::{ EitError, EitResult },
    spectra::{ Beams, FwmSeries, FwmSpectra },
};

/// Quantities that can be swept.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SweepParameter {
    ProbeDetuning,
    PumpRabi,
    PumpDetuning,
}

impl SweepParameter {
    pub const ALL: [Self; 3] = [Self::ProbeDetuning, Self::PumpRabi, Self::PumpDetuning];

    /// Canonical name used in results and exported files.
    pub fn name(self) -> &'static str {
        match self {
            Self::ProbeDetuning => "probe_detuning",
            Self::PumpRabi => "pump_rabi_frequency",
            Self::PumpDetuning => "pump_detuning",
        }
    }

    /// Return `params` with this quantity set to `value`.
    pub fn apply(self, params: SystemParameters, value: f64) -> SystemParameters {
        match self {
            Self::ProbeDetuning => params.with_probe_detuning(value),
            Self::PumpRabi => params.with_pump_rabi(value),
            Self::PumpDetuning => params.with_pump_detuning(value),
        }
    }

    /// Current value of this quantity in `params`.
    pub fn get(self, params: &SystemParameters) -> f64 {
        match self {
            Self::ProbeDetuning => params.probe_detuning,
            Self::PumpRabi => params.pump_rabi,
            Self::PumpDetuning => params.pump_detuning,
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SweepParameter {
    type Err = EitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "probe_detuning" => Ok(Self::ProbeDetuning),
            "pump_rabi" | "pump_rabi_frequency" => Ok(Self::PumpRabi),
            "pump_detuning" | "coupling_detuning" => Ok(Self::PumpDetuning),
            _ => Err(EitError::UnknownParameter(s.to_string())),
        }
    }
}

/// A named, ordered sequence of parameter values.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepAxis {
    pub name: String,
    pub values: nd::Array1<f64>,
}

impl SweepAxis {
    pub fn new<S>(name: S, values: nd::Array1<f64>) -> Self
    where S: Into<String>
    {
        Self { name: name.into(), values }
    }

    /// `num` evenly spaced values of `param` from `min` to `max` inclusive.
    pub fn linspace(param: SweepParameter, min: f64, max: f64, num: usize)
        -> Self
    {
        Self::new(param.name(), nd::Array1::linspace(min, max, num))
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

/// Results of a one- or two-dimensional sweep.
///
/// The χ3 and intensity arrays always have shape `[n1]` for a 1D sweep and
/// `[n1, n2]` for a 2D sweep; [`Self::new`] rejects anything else.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSweepResult {
    primary: SweepAxis,
    secondary: Option<SweepAxis>,
    chi3: nd::ArrayD<C64>,
    intensity: nd::ArrayD<f64>,
    fixed_parameters: IndexMap<String, f64>,
    metadata: IndexMap<String, String>,
}

impl ParameterSweepResult {
    pub fn new(
        primary: SweepAxis,
        secondary: Option<SweepAxis>,
        chi3: nd::ArrayD<C64>,
        intensity: nd::ArrayD<f64>,
        fixed_parameters: IndexMap<String, f64>,
        metadata: IndexMap<String, String>,
    ) -> EitResult<Self>
    {
        let expected: Vec<usize>
            = std::iter::once(primary.len())
            .chain(secondary.as_ref().map(|ax| ax.len()))
            .collect();
        if chi3.shape() != expected.as_slice() {
            return Err(EitError::ShapeMismatch {
                field: "chi3",
                expected,
                got: chi3.shape().to_vec(),
            });
        }
        if intensity.shape() != expected.as_slice() {
            return Err(EitError::ShapeMismatch {
                field: "intensity",
                expected,
                got: intensity.shape().to_vec(),
            });
        }
        Ok(Self { primary, secondary, chi3, intensity, fixed_parameters, metadata })
    }

    pub fn parameter_name(&self) -> &str { &self.primary.name }

    pub fn parameter_values(&self) -> &nd::Array1<f64> { &self.primary.values }

    pub fn secondary_parameter_name(&self) -> Option<&str> {
        self.secondary.as_ref().map(|ax| ax.name.as_str())
    }

    pub fn secondary_parameter_values(&self) -> Option<&nd::Array1<f64>> {
        self.secondary.as_ref().map(|ax| &ax.values)
    }

    pub fn primary(&self) -> &SweepAxis { &self.primary }

    pub fn secondary(&self) -> Option<&SweepAxis> { self.secondary.as_ref() }

    pub fn chi3(&self) -> &nd::ArrayD<C64> { &self.chi3 }

    pub fn intensity(&self) -> &nd::ArrayD<f64> { &self.intensity }

    pub fn fixed_parameters(&self) -> &IndexMap<String, f64> { &self.fixed_parameters }

    pub fn metadata(&self) -> &IndexMap<String, String> { &self.metadata }

    pub fn shape(&self) -> &[usize] { self.chi3.shape() }

    pub fn is_2d(&self) -> bool { self.secondary.is_some() }

    /// Iterate over grid cells in row-major order as `(param, param2, chi3,
    /// intensity)`; `param2` is `None` for 1D sweeps.
    pub fn rows(&self) -> impl Iterator<Item = (f64, Option<f64>, C64, f64)> + '_ {
        let n2 = self.secondary.as_ref().map(|ax| ax.len()).unwrap_or(1);
        self.chi3.iter().zip(self.intensity.iter())
            .enumerate()
            .map(move |(k, (chi3, intensity))| {
                let p1 = self.primary.values[k / n2];
                let p2 = self.secondary.as_ref().map(|ax| ax.values[k % n2]);
                (p1, p2, *chi3, *intensity)
            })
    }
}

/// Runs sweeps of an [`FwmSpectra`] calculator with fixed beam intensities.
#[derive(Clone, Debug)]
pub struct ParameterSweep {
    pub spectra: FwmSpectra,
    pub beams: Beams,
}

impl ParameterSweep {
    pub fn new(spectra: FwmSpectra, beams: Beams) -> Self {
        Self { spectra, beams }
    }

    fn fixed_parameters(
        &self,
        base: &SystemParameters,
        swept: &[SweepParameter],
    ) -> IndexMap<String, f64>
    {
        let mut fixed: IndexMap<String, f64> = IndexMap::new();
        for param in SweepParameter::ALL {
            if !swept.contains(&param) {
                fixed.insert(param.name().to_string(), param.get(base));
            }
        }
        fixed.insert("probe_rabi_frequency".to_string(), base.probe_rabi);
        fixed.insert("gamma_total".to_string(), base.decay.gamma_total);
        fixed.insert("ground_dephasing".to_string(), base.ground_dephasing);
        fixed.insert("pump_intensity".to_string(), self.beams.pump_intensity);
        fixed.insert("probe_intensity".to_string(), self.beams.probe_intensity);
        fixed.insert("number_density".to_string(), self.spectra.number_density);
        fixed.insert(
            "interaction_length".to_string(), self.spectra.interaction_length);
        fixed
    }

    fn metadata(&self, sweep_type: &str, fallbacks: usize)
        -> IndexMap<String, String>
    {
        let mut metadata: IndexMap<String, String> = IndexMap::new();
        metadata.insert("units".to_string(), "rad/s".to_string());
        metadata.insert("sweep_type".to_string(), sweep_type.to_string());
        metadata.insert(
            "isotope".to_string(), self.spectra.system.isotope().to_string());
        metadata.insert("fallbacks".to_string(), fallbacks.to_string());
        metadata
    }

    // reject bad configuration before any solve
    fn check(&self, cells: &[SystemParameters]) -> EitResult<()> {
        self.spectra.validate()?;
        self.beams.validate()?;
        if cells.is_empty() {
            return Err(EitError::InvalidSweep("sweep grid is empty".to_string()));
        }
        cells.iter().try_for_each(|p| p.validate())
    }

    /// Sweep a single parameter over `values`, starting from `base`.
    pub fn sweep_1d_from(
        &self,
        base: SystemParameters,
        param: SweepParameter,
        values: nd::Array1<f64>,
    ) -> EitResult<ParameterSweepResult>
    {
        let cells: Vec<SystemParameters>
            = values.iter().map(|v| param.apply(base, *v)).collect();
        self.check(&cells)?;
        tracing::info!(parameter = %param, points = cells.len(), "starting 1D sweep");
        let series: FwmSeries
            = self.spectra.evaluate_all(&cells, &self.beams).into_iter().collect();
        tracing::info!(fallbacks = series.fallbacks, "finished 1D sweep");
        ParameterSweepResult::new(
            SweepAxis::new(param.name(), values),
            None,
            series.chi3.into_dyn(),
            series.intensity.into_dyn(),
            self.fixed_parameters(&base, &[param]),
            self.metadata("1D", series.fallbacks),
        )
    }

    /// Sweep a single parameter over `values` at the calculator's current
    /// settings.
    pub fn sweep_1d(&self, param: SweepParameter, values: nd::Array1<f64>)
        -> EitResult<ParameterSweepResult>
    {
        self.sweep_1d_from(self.spectra.base_parameters(), param, values)
    }

    /// Sweep probe detuning over `num_points` evenly spaced values.
    pub fn sweep_probe_detuning(&self, min: f64, max: f64, num_points: usize)
        -> EitResult<ParameterSweepResult>
    {
        self.sweep_1d(
            SweepParameter::ProbeDetuning,
            nd::Array1::linspace(min, max, num_points),
        )
    }

    /// Sweep pump Rabi frequency over `num_points` evenly spaced values at
    /// fixed probe detuning.
    pub fn sweep_pump_rabi_frequency(
        &self,
        min: f64,
        max: f64,
        num_points: usize,
        probe_detuning: f64,
    ) -> EitResult<ParameterSweepResult>
    {
        self.sweep_1d_from(
            self.spectra.base_parameters().with_probe_detuning(probe_detuning),
            SweepParameter::PumpRabi,
            nd::Array1::linspace(min, max, num_points),
        )
    }

    /// Sweep pump detuning over `num_points` evenly spaced values at fixed
    /// probe detuning.
    pub fn sweep_pump_detuning(
        &self,
        min: f64,
        max: f64,
        num_points: usize,
        probe_detuning: f64,
    ) -> EitResult<ParameterSweepResult>
    {
        self.sweep_1d_from(
            self.spectra.base_parameters().with_probe_detuning(probe_detuning),
            SweepParameter::PumpDetuning,
            nd::Array1::linspace(min, max, num_points),
        )
    }

    /// Sweep two distinct parameters over the Cartesian product of their
    /// values. Results have shape `[values1.len(), values2.len()]`.
    pub fn sweep_2d(
        &self,
        param1: SweepParameter,
        values1: nd::Array1<f64>,
        param2: SweepParameter,
        values2: nd::Array1<f64>,
    ) -> EitResult<ParameterSweepResult>
    {
        if param1 == param2 {
            return Err(EitError::InvalidSweep(
                format!("cannot sweep {param1} against itself")
            ));
        }
        let base = self.spectra.base_parameters();
        let (n1, n2) = (values1.len(), values2.len());
        let cells: Vec<SystemParameters>
            = values1.iter().cartesian_product(values2.iter())
            .map(|(v1, v2)| param2.apply(param1.apply(base, *v1), *v2))
            .collect();
        self.check(&cells)?;
        tracing::info!(
            parameter1 = %param1,
            parameter2 = %param2,
            points = cells.len(),
            "starting 2D sweep"
        );
        let series: FwmSeries
            = self.spectra.evaluate_all(&cells, &self.beams).into_iter().collect();
        tracing::info!(fallbacks = series.fallbacks, "finished 2D sweep");
        let chi3: nd::Array2<C64>
            = series.chi3.into_shape((n1, n2))?;
        let intensity: nd::Array2<f64>
            = series.intensity.into_shape((n1, n2))?;
        ParameterSweepResult::new(
            SweepAxis::new(param1.name(), values1),
            Some(SweepAxis::new(param2.name(), values2)),
            chi3.into_dyn(),
            intensity.into_dyn(),
            self.fixed_parameters(&base, &[param1, param2]),
            self.metadata("2D", series.fallbacks),
        )
    }

    /// [`Self::sweep_2d`] with parameters given by name.
    pub fn sweep_2d_named(
        &self,
        name1: &str,
        values1: nd::Array1<f64>,
        name2: &str,
        values2: nd::Array1<f64>,
    ) -> EitResult<ParameterSweepResult>
    {
        self.sweep_2d(name1.parse()?, values1, name2.parse()?, values2)
    }
}
