//! Writing sweep results to CSV, JSON, and `.npz` files.
//!
//! CSV files carry an optional `#`-commented header followed by one row per
//! grid cell (row-major for 2D sweeps). JSON files keep 2D grids as nested
//! arrays and can be read back with [`from_json`]; non-finite values are
//! stored as strings (see [`Cell`]).

use std::{
    fmt,
    fs,
    io::{ BufWriter, Write },
    path::{ Path, PathBuf },
    str::FromStr,
};
use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ de, Deserialize, Serialize };
use crate::{
    error::{ EitError, EitResult },
    sweep::{ ParameterSweepResult, SweepAxis },
    utils::create_parent,
    write_npz,
};

/// Supported output formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Npz,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Npz => "npz",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = EitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "npz" => Ok(Self::Npz),
            _ => Err(EitError::InvalidParameter(
                format!("unknown export format '{s}'")
            )),
        }
    }
}

/// Current local time in ISO 8601 format.
pub fn timestamp() -> String { chrono::Local::now().to_rfc3339() }

fn export_metadata(result: &ParameterSweepResult) -> IndexMap<String, serde_json::Value> {
    use serde_json::Value;
    let mut metadata: IndexMap<String, Value> = IndexMap::new();
    metadata.insert("timestamp".into(), timestamp().into());
    metadata.insert("parameter_name".into(), result.parameter_name().into());
    metadata.insert("num_points".into(), result.parameter_values().len().into());
    match result.secondary() {
        Some(ax) => {
            metadata.insert("secondary_parameter_name".into(), ax.name.as_str().into());
            metadata.insert("num_secondary_points".into(), ax.len().into());
            metadata.insert("sweep_type".into(), "2D".into());
        },
        None => {
            metadata.insert("sweep_type".into(), "1D".into());
        },
    }
    for (key, value) in result.metadata() {
        metadata.insert(key.clone(), value.as_str().into());
    }
    metadata
}

/* CSV ************************************************************************/

/// Write a sweep result as CSV, optionally preceded by a commented metadata
/// header.
pub fn to_csv<P>(result: &ParameterSweepResult, path: P, include_metadata: bool)
    -> EitResult<()>
where P: AsRef<Path>
{
    let path = path.as_ref();
    create_parent(path)?;
    let mut out = BufWriter::new(fs::File::create(path)?);

    if include_metadata {
        writeln!(out, "# Export Timestamp: {}", timestamp())?;
        writeln!(out, "# Parameter: {}", result.parameter_name())?;
        if let Some(name) = result.secondary_parameter_name() {
            writeln!(out, "# Secondary Parameter: {}", name)?;
        }
        writeln!(out, "# Fixed Parameters:")?;
        for (key, value) in result.fixed_parameters() {
            writeln!(out, "#   {}: {}", key, value)?;
        }
        writeln!(out, "# Metadata:")?;
        for (key, value) in result.metadata() {
            writeln!(out, "#   {}: {}", key, value)?;
        }
        writeln!(out, "#")?;
    }

    match result.secondary_parameter_name() {
        Some(name2) => writeln!(
            out,
            "{},{},chi3_real,chi3_imag,chi3_magnitude,chi3_phase,fwm_intensity",
            result.parameter_name(),
            name2,
        )?,
        None => writeln!(
            out,
            "{},chi3_real,chi3_imag,chi3_magnitude,chi3_phase,fwm_intensity",
            result.parameter_name(),
        )?,
    }
    for (p1, p2, chi3, intensity) in result.rows() {
        match p2 {
            Some(p2) => write!(out, "{},{},", p1, p2)?,
            None => write!(out, "{},", p1)?,
        }
        writeln!(
            out,
            "{:.12e},{:.12e},{:.12e},{:.12e},{:.12e}",
            chi3.re, chi3.im, chi3.norm(), chi3.arg(), intensity,
        )?;
    }
    out.flush()?;
    Ok(())
}

/* JSON ***********************************************************************/

/// A single grid value.
///
/// JSON numbers cannot hold NaN or infinities, so those are written as the
/// strings `"NaN"`, `"inf"`, and `"-inf"`. `null` reads back as NaN.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cell(pub f64);

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: serde::Serializer
    {
        let x = self.0;
        if x.is_finite() {
            serializer.serialize_f64(x)
        } else if x.is_nan() {
            serializer.serialize_str("NaN")
        } else if x > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

struct CellVisitor;

impl<'de> de::Visitor<'de> for CellVisitor {
    type Value = Cell;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a number, null, or one of \"NaN\", \"inf\", \"-inf\"")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Cell, E>
    where E: de::Error
    {
        Ok(Cell(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Cell, E>
    where E: de::Error
    {
        Ok(Cell(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Cell, E>
    where E: de::Error
    {
        Ok(Cell(v as f64))
    }

    fn visit_unit<E>(self) -> Result<Cell, E>
    where E: de::Error
    {
        Ok(Cell(f64::NAN))
    }

    fn visit_none<E>(self) -> Result<Cell, E>
    where E: de::Error
    {
        Ok(Cell(f64::NAN))
    }

    fn visit_str<E>(self, v: &str) -> Result<Cell, E>
    where E: de::Error
    {
        match v {
            "NaN" | "nan" => Ok(Cell(f64::NAN)),
            "inf" | "Infinity" => Ok(Cell(f64::INFINITY)),
            "-inf" | "-Infinity" => Ok(Cell(f64::NEG_INFINITY)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de>
    {
        deserializer.deserialize_any(CellVisitor)
    }
}

/// Real-valued data over a sweep grid: flat for 1D sweeps, nested row-major
/// for 2D sweeps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Grid {
    Flat(Vec<Cell>),
    Nested(Vec<Vec<Cell>>),
}

impl Grid {
    fn from_array(arr: &nd::ArrayD<f64>) -> Self {
        match arr.ndim() {
            1 => Self::Flat(arr.iter().copied().map(Cell).collect()),
            _ => Self::Nested(
                arr.outer_iter()
                    .map(|row| row.iter().copied().map(Cell).collect())
                    .collect()
            ),
        }
    }

    fn into_array(self) -> EitResult<nd::ArrayD<f64>> {
        match self {
            Self::Flat(v) => {
                let flat: Vec<f64> = v.into_iter().map(|c| c.0).collect();
                Ok(nd::Array1::from(flat).into_dyn())
            },
            Self::Nested(rows) => {
                let n1 = rows.len();
                let n2 = rows.first().map(|r| r.len()).unwrap_or(0);
                let flat: Vec<f64>
                    = rows.into_iter().flatten().map(|c| c.0).collect();
                Ok(nd::Array2::from_shape_vec((n1, n2), flat)?.into_dyn())
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chi3Doc {
    pub real: Grid,
    pub imag: Grid,
    pub magnitude: Grid,
    pub phase: Grid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultsDoc {
    pub chi3: Chi3Doc,
    pub fwm_intensity: Grid,
}

/// On-disk JSON layout of a [`ParameterSweepResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepDocument {
    pub metadata: IndexMap<String, serde_json::Value>,
    pub parameter: ParameterDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_parameter: Option<ParameterDoc>,
    #[serde(default)]
    pub fixed_parameters: IndexMap<String, f64>,
    pub results: ResultsDoc,
}

// keys added at export time rather than carried by the result
const GENERATED_KEYS: [&str; 5] = [
    "timestamp",
    "parameter_name",
    "num_points",
    "secondary_parameter_name",
    "num_secondary_points",
];

impl SweepDocument {
    pub fn from_result(result: &ParameterSweepResult) -> Self {
        let chi3 = result.chi3();
        Self {
            metadata: export_metadata(result),
            parameter: ParameterDoc {
                name: result.parameter_name().to_string(),
                values: result.parameter_values().to_vec(),
                units: Some(
                    result.metadata().get("units")
                        .cloned()
                        .unwrap_or_else(|| "N/A".to_string())
                ),
            },
            secondary_parameter: result.secondary().map(|ax| ParameterDoc {
                name: ax.name.clone(),
                values: ax.values.to_vec(),
                units: None,
            }),
            fixed_parameters: result.fixed_parameters().clone(),
            results: ResultsDoc {
                chi3: Chi3Doc {
                    real: Grid::from_array(&chi3.mapv(|x| x.re)),
                    imag: Grid::from_array(&chi3.mapv(|x| x.im)),
                    magnitude: Grid::from_array(&chi3.mapv(|x| x.norm())),
                    phase: Grid::from_array(&chi3.mapv(|x| x.arg())),
                },
                fwm_intensity: Grid::from_array(result.intensity()),
            },
        }
    }

    /// Rebuild a [`ParameterSweepResult`], re-validating array shapes.
    pub fn into_result(self) -> EitResult<ParameterSweepResult> {
        let re = self.results.chi3.real.into_array()?;
        let im = self.results.chi3.imag.into_array()?;
        if re.shape() != im.shape() {
            return Err(EitError::ShapeMismatch {
                field: "chi3.imag",
                expected: re.shape().to_vec(),
                got: im.shape().to_vec(),
            });
        }
        let chi3: nd::ArrayD<C64>
            = nd::Zip::from(&re).and(&im).map_collect(|r, i| C64::new(*r, *i));
        let intensity = self.results.fwm_intensity.into_array()?;
        let metadata: IndexMap<String, String>
            = self.metadata.into_iter()
            .filter(|(key, _)| !GENERATED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        ParameterSweepResult::new(
            SweepAxis::new(self.parameter.name, self.parameter.values.into()),
            self.secondary_parameter
                .map(|ax| SweepAxis::new(ax.name, ax.values.into())),
            chi3,
            intensity,
            self.fixed_parameters,
            metadata,
        )
    }
}

/// Write a sweep result as pretty-printed JSON.
pub fn to_json<P>(result: &ParameterSweepResult, path: P) -> EitResult<()>
where P: AsRef<Path>
{
    let path = path.as_ref();
    create_parent(path)?;
    let out = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(out, &SweepDocument::from_result(result))?;
    Ok(())
}

/// Read a sweep result written by [`to_json`].
pub fn from_json<P>(path: P) -> EitResult<ParameterSweepResult>
where P: AsRef<Path>
{
    let file = fs::File::open(path)?;
    let doc: SweepDocument = serde_json::from_reader(std::io::BufReader::new(file))?;
    doc.into_result()
}

/* NPZ ************************************************************************/

/// Write a sweep result as an `.npz` archive with arrays `param`, `param2`
/// (2D sweeps only), `chi3_real`, `chi3_imag`, and `fwm_intensity`.
pub fn to_npz<P>(result: &ParameterSweepResult, path: P) -> EitResult<()>
where P: AsRef<Path>
{
    let path = path.as_ref();
    let chi3_real = result.chi3().mapv(|x| x.re);
    let chi3_imag = result.chi3().mapv(|x| x.im);
    match result.secondary_parameter_values() {
        Some(param2) => write_npz!(
            path,
            arrays: {
                "param" => result.parameter_values(),
                "param2" => param2,
                "chi3_real" => &chi3_real,
                "chi3_imag" => &chi3_imag,
                "fwm_intensity" => result.intensity(),
            }
        ),
        None => write_npz!(
            path,
            arrays: {
                "param" => result.parameter_values(),
                "chi3_real" => &chi3_real,
                "chi3_imag" => &chi3_imag,
                "fwm_intensity" => result.intensity(),
            }
        ),
    }
}

/// Write a result in several formats to `base_path` with the appropriate
/// extensions, returning the written paths.
pub fn export_formats<P>(
    result: &ParameterSweepResult,
    base_path: P,
    formats: &[ExportFormat],
) -> EitResult<IndexMap<ExportFormat, PathBuf>>
where P: AsRef<Path>
{
    let base = base_path.as_ref();
    let mut written: IndexMap<ExportFormat, PathBuf> = IndexMap::new();
    for format in formats {
        let path = base.with_extension(format.extension());
        match format {
            ExportFormat::Csv => to_csv(result, &path, true)?,
            ExportFormat::Json => to_json(result, &path)?,
            ExportFormat::Npz => to_npz(result, &path)?,
        }
        tracing::info!(path = %path.display(), "wrote {format}");
        written.insert(*format, path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_2d() -> ParameterSweepResult {
        let chi3 = nd::Array2::from_shape_fn((2, 3), |(i, j)| {
            C64::new(i as f64 + 0.5, -(j as f64))
        });
        let intensity = nd::Array2::from_shape_fn((2, 3), |(i, j)| (i * 3 + j) as f64);
        let mut fixed = IndexMap::new();
        fixed.insert("pump_intensity".to_string(), 1e3);
        let mut metadata = IndexMap::new();
        metadata.insert("units".to_string(), "rad/s".to_string());
        ParameterSweepResult::new(
            SweepAxis::new("probe_detuning", nd::array![-1.0, 1.0]),
            Some(SweepAxis::new("pump_detuning", nd::array![0.0, 0.5, 1.0])),
            chi3.into_dyn(),
            intensity.into_dyn(),
            fixed,
            metadata,
        )
        .unwrap()
    }

    #[test]
    fn csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scan.csv");
        to_csv(&result_2d(), &path, true).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines().filter(|l| !l.starts_with('#'));
        assert_eq!(
            lines.next().unwrap(),
            "probe_detuning,pump_detuning,chi3_real,chi3_imag,chi3_magnitude,chi3_phase,fwm_intensity",
        );
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 6);
        assert!(rows[4].starts_with("1,0.5,"));
        assert!(text.contains("#   pump_intensity: 1000"));
        assert!(text.contains("# Export Timestamp: "));
    }

    #[test]
    fn csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        to_csv(&result_2d(), &path, false).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("probe_detuning,"));
    }

    #[test]
    fn json_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let result = result_2d();
        to_json(&result, &path).unwrap();
        let raw: serde_json::Value
            = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["metadata"]["sweep_type"], "2D");
        assert_eq!(raw["metadata"]["num_secondary_points"], 3);
        assert_eq!(raw["parameter"]["units"], "rad/s");
        assert_eq!(raw["results"]["fwm_intensity"][1][2], 5.0);

        let loaded = from_json(&path).unwrap();
        assert_eq!(loaded.shape(), &[2, 3]);
        assert_eq!(loaded.chi3(), result.chi3());
        assert_eq!(loaded.intensity(), result.intensity());
        assert_eq!(loaded.fixed_parameters(), result.fixed_parameters());
        assert_eq!(loaded.metadata()["units"], "rad/s");
        assert!(!loaded.metadata().contains_key("timestamp"));
    }

    #[test]
    fn json_non_finite_cells() {
        let result = ParameterSweepResult::new(
            SweepAxis::new("pump_rabi_frequency", nd::array![0.0, 1.0, 2.0]),
            None,
            nd::array![
                C64::new(f64::NAN, 0.0),
                C64::new(1.0, f64::NEG_INFINITY),
                C64::new(2.0, -0.5),
            ]
            .into_dyn(),
            nd::array![f64::NAN, f64::INFINITY, 4.0].into_dyn(),
            IndexMap::new(),
            IndexMap::new(),
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        to_json(&result, &path).unwrap();
        let raw: serde_json::Value
            = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["results"]["fwm_intensity"][0], "NaN");
        assert_eq!(raw["results"]["fwm_intensity"][1], "inf");
        assert_eq!(raw["results"]["chi3"]["imag"][1], "-inf");

        let loaded = from_json(&path).unwrap();
        let intensity = loaded.intensity();
        assert!(intensity[[0]].is_nan());
        assert_eq!(intensity[[1]], f64::INFINITY);
        assert_eq!(intensity[[2]], 4.0);
        assert!(loaded.chi3()[[0]].re.is_nan());
        assert_eq!(loaded.chi3()[[1]].im, f64::NEG_INFINITY);
        assert_eq!(loaded.chi3()[[2]], C64::new(2.0, -0.5));
    }

    #[test]
    fn json_null_reads_as_nan() {
        let grid: Grid = serde_json::from_str("[[1.0, null], [3, \"-inf\"]]").unwrap();
        let arr = grid.into_array().unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        assert!(arr[[0, 1]].is_nan());
        assert_eq!(arr[[1, 0]], 3.0);
        assert_eq!(arr[[1, 1]], f64::NEG_INFINITY);
        assert!(serde_json::from_str::<Grid>("[\"many\"]").is_err());
    }

    #[test]
    fn several_formats() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("out").join("scan");
        let formats = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Npz];
        let written = export_formats(&result_2d(), &base, &formats).unwrap();
        assert_eq!(written.len(), 3);
        for (format, path) in written.iter() {
            assert!(path.is_file());
            assert_eq!(path.extension().unwrap(), format.extension());
        }
    }

    #[test]
    fn format_names() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
