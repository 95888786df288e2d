//! TOML run configuration.
//!
//! Frequencies in the file (Rabi frequencies, detunings, dephasing rate) are
//! given in MHz and converted to angular frequency on use. Every field has a
//! default, so an empty file describes a valid run: a 101-point probe
//! detuning sweep over ±20 MHz of the default <sup>87</sup>Rb system.

use std::path::{ Path, PathBuf };
use indexmap::IndexMap;
use ndarray as nd;
use serde::Deserialize;
use crate::{
    atoms::Isotope,
    constants::mhz,
    double_lambda::{ DoubleLambda, DEFAULT_PROBE_RABI, DEFAULT_PUMP_RABI },
    error::EitResult,
    export::{ export_formats, ExportFormat },
    spectra::{ Beams, FwmSpectra },
    sweep::{ ParameterSweep, ParameterSweepResult, SweepParameter },
};

/// Top-level run configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub system: SystemConfig,
    pub medium: MediumConfig,
    pub beams: Beams,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
}

/// Atomic levels and field settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// "Rb87" or "Rb85".
    pub isotope: String,
    /// Level labels, e.g. "5S_1/2, F=1"; isotope defaults when absent.
    pub ground1: Option<String>,
    pub ground2: Option<String>,
    pub excited: Option<String>,
    pub pump_rabi_mhz: f64,
    pub probe_rabi_mhz: f64,
    pub pump_detuning_mhz: f64,
    pub probe_detuning_mhz: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            isotope: "Rb87".into(),
            ground1: None,
            ground2: None,
            excited: None,
            pump_rabi_mhz: DEFAULT_PUMP_RABI / mhz(1.0),
            probe_rabi_mhz: DEFAULT_PROBE_RABI / mhz(1.0),
            pump_detuning_mhz: 0.0,
            probe_detuning_mhz: 0.0,
        }
    }
}

/// Properties of the atomic medium.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediumConfig {
    /// Atomic number density [m^-3].
    pub number_density: f64,
    /// Interaction length [m].
    pub interaction_length: f64,
    pub ground_dephasing_mhz: f64,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            number_density: 1e17,
            interaction_length: 0.01,
            ground_dephasing_mhz: 0.0,
        }
    }
}

/// A single sweep axis.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    pub parameter: String,
    pub min_mhz: f64,
    pub max_mhz: f64,
    #[serde(default = "default_points")]
    pub points: usize,
}

fn default_points() -> usize { 101 }

impl AxisConfig {
    /// Parse the parameter name and generate the axis values in angular
    /// frequency.
    pub fn resolve(&self) -> EitResult<(SweepParameter, nd::Array1<f64>)> {
        let param: SweepParameter = self.parameter.parse()?;
        let values
            = nd::Array1::linspace(mhz(self.min_mhz), mhz(self.max_mhz), self.points);
        Ok((param, values))
    }
}

/// Primary sweep axis, with an optional secondary axis as a subtable.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub parameter: String,
    pub min_mhz: f64,
    pub max_mhz: f64,
    pub points: usize,
    pub secondary: Option<AxisConfig>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parameter: "probe_detuning".into(),
            min_mhz: -20.0,
            max_mhz: 20.0,
            points: default_points(),
            secondary: None,
        }
    }
}

impl SweepConfig {
    pub fn primary(&self) -> AxisConfig {
        AxisConfig {
            parameter: self.parameter.clone(),
            min_mhz: self.min_mhz,
            max_mhz: self.max_mhz,
            points: self.points,
        }
    }
}

/// Where and how to write results.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// File name without extension.
    pub basename: String,
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            basename: "sweep".into(),
            formats: vec![ExportFormat::Csv, ExportFormat::Json],
        }
    }
}

impl std::str::FromStr for RunConfig {
    type Err = crate::error::EitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(toml::from_str(s)?) }
}

impl RunConfig {
    /// Load and parse a TOML configuration file.
    pub fn from_file<P>(path: P) -> EitResult<Self>
    where P: AsRef<Path>
    {
        std::fs::read_to_string(path)?.parse()
    }

    /// Build the double-lambda system described by `[system]`.
    pub fn build_system(&self) -> EitResult<DoubleLambda> {
        let sys = &self.system;
        let isotope: Isotope = sys.isotope.parse()?;
        let [g1, g2, e] = isotope.default_double_lambda();
        DoubleLambda::with_levels(
            isotope,
            sys.ground1.as_deref().unwrap_or(g1),
            sys.ground2.as_deref().unwrap_or(g2),
            sys.excited.as_deref().unwrap_or(e),
        )?
        .with_pump(mhz(sys.pump_rabi_mhz), mhz(sys.pump_detuning_mhz))?
        .with_probe(mhz(sys.probe_rabi_mhz), mhz(sys.probe_detuning_mhz))
    }

    /// Build the FWM calculator described by `[system]` and `[medium]`.
    pub fn build_spectra(&self) -> EitResult<FwmSpectra> {
        let spectra
            = FwmSpectra::new(self.build_system()?)
            .with_number_density(self.medium.number_density)
            .with_interaction_length(self.medium.interaction_length)
            .with_ground_dephasing(mhz(self.medium.ground_dephasing_mhz));
        spectra.validate()?;
        Ok(spectra)
    }

    pub fn build_sweep(&self) -> EitResult<ParameterSweep> {
        self.beams.validate()?;
        Ok(ParameterSweep::new(self.build_spectra()?, self.beams))
    }

    /// Run the sweep described by `[sweep]`.
    pub fn run(&self) -> EitResult<ParameterSweepResult> {
        let sweeper = self.build_sweep()?;
        let (param1, values1) = self.sweep.primary().resolve()?;
        match &self.sweep.secondary {
            Some(axis) => {
                let (param2, values2) = axis.resolve()?;
                sweeper.sweep_2d(param1, values1, param2, values2)
            },
            None => sweeper.sweep_1d(param1, values1),
        }
    }

    /// Write a result in every format listed under `[output]`.
    pub fn export(&self, result: &ParameterSweepResult)
        -> EitResult<IndexMap<ExportFormat, PathBuf>>
    {
        let base = self.output.directory.join(&self.output.basename);
        export_formats(result, base, &self.output.formats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::error::EitError;

    #[test]
    fn empty_file_uses_defaults() {
        let config: RunConfig = "".parse().unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.system.isotope, "Rb87");
        assert_relative_eq!(config.system.pump_rabi_mhz, 10.0, max_relative = 1e-12);
        assert_eq!(config.medium.number_density, 1e17);
        assert_eq!(config.beams.pump_intensity, 1e3);
        assert_eq!(config.output.formats, vec![ExportFormat::Csv, ExportFormat::Json]);
        let system = config.build_system().unwrap();
        assert_eq!(system.levels()[0].label(), "5S_1/2, F=1");
    }

    #[test]
    fn parses_full_file() {
        let text = r#"
            [system]
            isotope = "Rb85"
            pump_rabi_mhz = 8.0
            probe_detuning_mhz = 1.5

            [medium]
            number_density = 5e16
            ground_dephasing_mhz = 0.1

            [beams]
            pump_intensity = 2e3

            [sweep]
            parameter = "coupling_detuning"
            min_mhz = -5.0
            max_mhz = 5.0
            points = 11

            [sweep.secondary]
            parameter = "pump_rabi"
            min_mhz = 1.0
            max_mhz = 10.0
            points = 4

            [output]
            directory = "results"
            formats = ["npz"]
        "#;
        let config: RunConfig = text.parse().unwrap();
        assert_eq!(config.beams.probe_intensity, 1e2);
        assert_eq!(config.beams.pump_intensity, 2e3);
        let (param, values) = config.sweep.primary().resolve().unwrap();
        assert_eq!(param, SweepParameter::PumpDetuning);
        assert_eq!(values.len(), 11);
        assert_relative_eq!(values[10], mhz(5.0));
        let (param2, _) = config.sweep.secondary.as_ref().unwrap().resolve().unwrap();
        assert_eq!(param2, SweepParameter::PumpRabi);

        let spectra = config.build_spectra().unwrap();
        assert_eq!(spectra.number_density, 5e16);
        assert_relative_eq!(spectra.ground_dephasing, mhz(0.1));
        assert_relative_eq!(spectra.system.pump.rabi_frequency(), mhz(8.0));
        assert_relative_eq!(spectra.system.probe.detuning, mhz(1.5));
    }

    #[test]
    fn configuration_errors() {
        let config: RunConfig = "[system]\nisotope = \"K39\"".parse().unwrap();
        assert!(matches!(config.build_system(), Err(EitError::UnknownIsotope(_))));

        let config: RunConfig
            = "[sweep]\nparameter = \"laser_phase\"\nmin_mhz = 0.0\nmax_mhz = 1.0"
            .parse().unwrap();
        assert!(matches!(config.run(), Err(EitError::UnknownParameter(_))));

        let bad: Result<RunConfig, _> = "[system]\npump_power = 1.0".parse();
        assert!(matches!(bad, Err(EitError::Toml(_))));
    }
}
