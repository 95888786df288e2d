#![allow(non_snake_case)]

use std::path::PathBuf;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rb_eit::{
    mkdir,
    write_npz,
    atoms::Isotope,
    constants::mhz,
    double_lambda::DoubleLambda,
    spectra::{ Beams, FwmSpectra },
};

const PROBE_RABI: f64 = 1.0; // MHz
const DEPHASING: f64 = 0.1; // MHz
const DENSITY: f64 = 1e17; // m^-3
const LENGTH: f64 = 0.01; // m

fn main() -> rb_eit::EitResult<()> {
    let outdir = PathBuf::from("output");
    mkdir!(outdir)?;

    let beams = Beams::default();
    let pump_rabi: nd::Array1<f64>
        = nd::Array1::linspace(mhz(0.5), mhz(30.0), 120);
    let det: nd::Array1<f64>
        = nd::Array1::linspace(mhz(-10.0), mhz(10.0), 201);

    for isotope in [Isotope::Rb87, Isotope::Rb85] {
        let system
            = DoubleLambda::new(isotope)?
            .with_probe(mhz(PROBE_RABI), 0.0)?;
        let spectra
            = FwmSpectra::new(system)
            .with_number_density(DENSITY)
            .with_interaction_length(LENGTH)
            .with_ground_dephasing(mhz(DEPHASING));

        // pump power at two-photon resonance
        let series = spectra.pump_power_sweep(&pump_rabi, 0.0, &beams);
        println!("{isotope}: {} pump points, {} fallbacks", pump_rabi.len(), series.fallbacks);

        // pump-detuning scan for a slightly detuned probe
        let coupling = spectra.coupling_detuning_sweep(&det, mhz(1.0), &beams);

        let chi3: nd::Array1<C64> = spectra.chi3_spectrum(&det);
        let I: nd::Array1<f64> = spectra.intensity_spectrum(&det, &beams);

        write_npz!(
            outdir.join(format!("fwm_pump_scan_{isotope}.npz")),
            arrays: {
                "pump_rabi" => &pump_rabi,
                "pump_chi3_re" => &series.chi3.mapv(|z| z.re),
                "pump_chi3_im" => &series.chi3.mapv(|z| z.im),
                "pump_I" => &series.intensity,
                "det" => &det,
                "coupling_I" => &coupling.intensity,
                "probe_chi3_re" => &chi3.mapv(|z| z.re),
                "probe_chi3_im" => &chi3.mapv(|z| z.im),
                "probe_I" => &I,
            }
        )?;
    }

    println!("done");
    Ok(())
}
