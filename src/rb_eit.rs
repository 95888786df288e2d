//! Command-line driver for double-lambda EIT calculations.
//!
//! ```bash
//! # steady state at the default field settings
//! rb-eit steady-state --isotope Rb87
//!
//! # probe-detuning spectrum written to an .npz archive
//! rb-eit spectrum --min -20 --max 20 --points 401
//!
//! # FWM sweeps
//! rb-eit sweep pump_rabi --min 1 --max 20 --points 50 --formats csv,npz
//! rb-eit sweep2d probe_detuning -20 20 101 pump_detuning -5 5 21
//!
//! # everything from a TOML file
//! rb-eit run config.toml
//! ```
//!
//! All frequencies on the command line are in MHz.

use std::path::PathBuf;
use anyhow::Context;
use clap::{ Args, Parser, Subcommand };
use ndarray as nd;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use rb_eit::{
    bloch::{ self, Convergence, DEFAULT_TOL },
    config::{ AxisConfig, MediumConfig, OutputConfig, RunConfig, SweepConfig, SystemConfig },
    constants::mhz,
    export::ExportFormat,
    spectra::Beams,
    susceptibility::{ absorption, dispersion },
    write_npz,
};

#[derive(Parser)]
#[command(name = "rb-eit")]
#[command(version)]
#[command(about = "Steady-state EIT and four-wave mixing in rubidium double-lambda systems")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve for the steady-state density matrix
    SteadyState {
        #[command(flatten)]
        system: SystemArgs,
    },

    /// Scan probe detuning and write EIT and FWM spectra to an .npz archive
    Spectrum {
        #[command(flatten)]
        system: SystemArgs,

        #[arg(long, default_value_t = -20.0, allow_hyphen_values = true)]
        min: f64,

        #[arg(long, default_value_t = 20.0, allow_hyphen_values = true)]
        max: f64,

        #[arg(long, default_value_t = 401)]
        points: usize,

        /// Output file
        #[arg(short, long, default_value = "output/spectrum.npz")]
        output: PathBuf,
    },

    /// Sweep one parameter
    Sweep {
        /// probe_detuning, pump_rabi_frequency, or pump_detuning
        parameter: String,

        #[arg(long, allow_hyphen_values = true)]
        min: f64,

        #[arg(long, allow_hyphen_values = true)]
        max: f64,

        #[arg(long, default_value_t = 101)]
        points: usize,

        #[command(flatten)]
        system: SystemArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Sweep two parameters over a grid
    Sweep2d {
        parameter1: String,
        #[arg(allow_hyphen_values = true)]
        min1: f64,
        #[arg(allow_hyphen_values = true)]
        max1: f64,
        points1: usize,

        parameter2: String,
        #[arg(allow_hyphen_values = true)]
        min2: f64,
        #[arg(allow_hyphen_values = true)]
        max2: f64,
        points2: usize,

        #[command(flatten)]
        system: SystemArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the sweep described by a TOML configuration file
    Run {
        config: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SystemArgs {
    /// Rb87 or Rb85
    #[arg(long, default_value = "Rb87")]
    isotope: String,

    #[arg(long, default_value_t = 10.0)]
    pump_rabi: f64,

    #[arg(long, default_value_t = 1.0)]
    probe_rabi: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pump_detuning: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    probe_detuning: f64,

    /// Ground-state dephasing rate
    #[arg(long, default_value_t = 0.0)]
    dephasing: f64,

    /// Atomic number density [m^-3]
    #[arg(long, default_value_t = 1e17)]
    density: f64,

    /// Interaction length [m]
    #[arg(long, default_value_t = 0.01)]
    length: f64,

    /// Pump intensity [W/m^2]
    #[arg(long, default_value_t = 1e3)]
    pump_intensity: f64,

    /// Probe intensity [W/m^2]
    #[arg(long, default_value_t = 1e2)]
    probe_intensity: f64,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    #[arg(long, default_value = "sweep")]
    basename: String,

    /// Comma-separated list of csv, json, npz
    #[arg(long, value_delimiter = ',', default_value = "csv,json")]
    formats: Vec<String>,
}

impl SystemArgs {
    fn to_config(&self) -> RunConfig {
        RunConfig {
            system: SystemConfig {
                isotope: self.isotope.clone(),
                pump_rabi_mhz: self.pump_rabi,
                probe_rabi_mhz: self.probe_rabi,
                pump_detuning_mhz: self.pump_detuning,
                probe_detuning_mhz: self.probe_detuning,
                ..SystemConfig::default()
            },
            medium: MediumConfig {
                number_density: self.density,
                interaction_length: self.length,
                ground_dephasing_mhz: self.dephasing,
            },
            beams: Beams {
                pump_intensity: self.pump_intensity,
                probe_intensity: self.probe_intensity,
            },
            ..RunConfig::default()
        }
    }
}

impl OutputArgs {
    fn to_config(&self) -> anyhow::Result<OutputConfig> {
        let formats: Vec<ExportFormat>
            = self.formats.iter()
            .map(|f| f.parse())
            .collect::<Result<_, _>>()?;
        Ok(OutputConfig {
            directory: self.output_dir.clone(),
            basename: self.basename.clone(),
            formats,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::SteadyState { system } => {
            steady_state(&system.to_config())?;
        },
        Commands::Spectrum { system, min, max, points, output } => {
            spectrum(&system.to_config(), min, max, points, output)?;
        },
        Commands::Sweep { parameter, min, max, points, system, output } => {
            let config = RunConfig {
                sweep: SweepConfig {
                    parameter,
                    min_mhz: min,
                    max_mhz: max,
                    points,
                    secondary: None,
                },
                output: output.to_config()?,
                ..system.to_config()
            };
            run(&config)?;
        },
        Commands::Sweep2d {
            parameter1, min1, max1, points1,
            parameter2, min2, max2, points2,
            system,
            output,
        } => {
            let config = RunConfig {
                sweep: SweepConfig {
                    parameter: parameter1,
                    min_mhz: min1,
                    max_mhz: max1,
                    points: points1,
                    secondary: Some(AxisConfig {
                        parameter: parameter2,
                        min_mhz: min2,
                        max_mhz: max2,
                        points: points2,
                    }),
                },
                output: output.to_config()?,
                ..system.to_config()
            };
            run(&config)?;
        },
        Commands::Run { config, output_dir } => {
            let mut run_config = RunConfig::from_file(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            if let Some(dir) = output_dir {
                run_config.output.directory = dir;
            }
            run(&run_config)?;
        },
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter
        = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn steady_state(config: &RunConfig) -> anyhow::Result<()> {
    let spectra = config.build_spectra()?;
    let ss = spectra.system.steady_state(spectra.ground_dephasing);
    println!("{}", spectra.system);
    match &ss.convergence {
        Convergence::Converged { iterations, residual } => {
            println!("converged in {iterations} iterations (residual {residual:.3e})");
        },
        Convergence::Fallback { reason } => {
            println!("solver did not converge ({reason}); using fallback state");
        },
    }
    println!("rho =");
    for row in ss.rho.rows() {
        let entries: Vec<String>
            = row.iter().map(|z| format!("{:+.6e}{:+.6e}i", z.re, z.im)).collect();
        println!("  [ {} ]", entries.join("  "));
    }
    let validity = bloch::validate(&ss.rho, DEFAULT_TOL);
    println!(
        "hermitian: {}, trace one: {}, positive semidefinite: {}",
        validity.hermitian,
        validity.trace_one,
        validity.positive_semidefinite,
    );
    println!("excited population: {:.6e}", ss.excited_population());
    let rho12 = ss.ground_coherence();
    println!("ground coherence:   {:+.6e}{:+.6e}i", rho12.re, rho12.im);
    Ok(())
}

fn spectrum(
    config: &RunConfig,
    min: f64,
    max: f64,
    points: usize,
    output: PathBuf,
) -> anyhow::Result<()>
{
    let spectra = config.build_spectra()?;
    let det: nd::Array1<f64> = nd::Array1::linspace(mhz(min), mhz(max), points);
    info!(points, "computing probe spectrum");

    let chi_eit = spectra.system.eit_susceptibility(&det);
    let (bloch_abs, bloch_disp)
        = spectra.system.bloch_susceptibility(
            &det, spectra.number_density, spectra.ground_dephasing);
    let chi3 = spectra.chi3_spectrum(&det);
    let intensity = spectra.intensity_spectrum(&det, &config.beams);

    write_npz!(
        output,
        arrays: {
            "det" => &det,
            "eit_absorption" => &absorption(&chi_eit),
            "eit_dispersion" => &dispersion(&chi_eit),
            "bloch_absorption" => &bloch_abs,
            "bloch_dispersion" => &bloch_disp,
            "chi3_real" => &chi3.mapv(|z| z.re),
            "chi3_imag" => &chi3.mapv(|z| z.im),
            "fwm_intensity" => &intensity,
        }
    )?;
    info!(path = %output.display(), "wrote spectrum");
    Ok(())
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    let result = config.run()?;
    let fallbacks = result.metadata().get("fallbacks").cloned().unwrap_or_default();
    info!(shape = ?result.shape(), fallbacks = %fallbacks, "sweep complete");
    for (format, path) in config.export(&result)? {
        println!("{format}: {}", path.display());
    }
    Ok(())
}
