//! Loading and validation of the preprocessed cadastral CSV.
//!
//! The dataset directory holds one or more exports named
//! `dataset-malha-fundiaria-idace_preprocessado-<suffix>.csv`; the suffix
//! embeds a sortable date, so the lexically greatest filename is the most
//! recent export. Missing files and missing required columns are fatal;
//! everything at row level is coerced or counted, never fatal.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::classify::{classify, Category};
use crate::normalize::normalize_municipio;
use crate::{Error, Result};

pub const DATA_PREFIX: &str = "dataset-malha-fundiaria-idace_preprocessado-";
pub const DATA_SUFFIX: &str = ".csv";

/// Columns the pipeline cannot work without.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "modulo_fiscal",
    "area",
    "geom",
    "nome_municipio",
    "regiao_administrativa",
];

/// One source row, with the derived fields filled in.
///
/// `geometry` stays `None` until [`crate::geometry::prepare_geometries`]
/// has parsed and reprojected the WKT.
#[derive(Debug, Clone)]
pub struct ParcelRecord {
    /// Fiscal module of the municipality, hectares. NaN when the source
    /// cell was empty or unparseable.
    pub modulo_fiscal: f64,
    /// Parcel area, hectares. NaN on coercion failure, as above.
    pub area: f64,
    /// Raw WKT, EPSG:31984. Rows without geometry text never make it into
    /// the dataset.
    pub geom_wkt: String,
    pub nome_municipio: String,
    pub regiao_administrativa: String,
    /// Diacritic-stripped lowercase municipality name, the join key.
    pub municipio_norm: String,
    pub categoria: Category,
    /// Parsed geometry in EPSG:4326.
    pub geometry: Option<geo::Geometry<f64>>,
    /// Non-required columns as read, in source order.
    pub extras: Vec<(String, String)>,
}

impl ParcelRecord {
    /// Both numeric fields present, so the category is meaningful.
    pub fn classifiable(&self) -> bool {
        !self.modulo_fiscal.is_nan() && !self.area.is_nan()
    }
}

/// The loaded dataset. Built once per session and immutable afterwards;
/// filtering and feature building never touch it.
#[derive(Debug)]
pub struct Dataset {
    /// Source header, in file order. The interchange builder walks this to
    /// keep property order stable.
    pub columns: Vec<String>,
    pub records: Vec<ParcelRecord>,
}

/// Data-quality counters over a loaded dataset.
///
/// `total_loaded == valid_for_classification + discarded` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationCounts {
    pub total_loaded: usize,
    /// Rows with both `modulo_fiscal` and `area` present.
    pub valid_for_classification: usize,
    /// Classifiable rows that also carry a parseable geometry.
    pub valid_for_interactive: usize,
    /// Classifiable rows with a usable municipality key.
    pub valid_for_contextual: usize,
    pub discarded: usize,
}

/// Picks the most recent dataset export in `dir`.
pub fn latest_dataset(dir: &Path) -> Result<PathBuf> {
    let mut latest: Option<String> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(DATA_PREFIX) && name.ends_with(DATA_SUFFIX) {
            if latest.as_deref().map_or(true, |best| name > best) {
                latest = Some(name.to_string());
            }
        }
    }
    latest
        .map(|name| dir.join(name))
        .ok_or_else(|| Error::DatasetNotFound(dir.to_path_buf()))
}

/// Loads the most recent export from `dir` and derives the per-row fields.
///
/// Fails fast on a missing file or a missing required column. Rows with an
/// empty `geom` cell are dropped before anything else, so the validation
/// counters never see them; rows with unparseable numerics come back with
/// NaN so validation can count them.
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let path = latest_dataset(dir)?;
    info!("loading dataset {}", path.display());

    let file = File::open(&path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::MissingColumn(required.to_string()));
        }
    }

    let index_of = |name: &str| columns.iter().position(|c| c == name).unwrap();
    let idx_mf = index_of("modulo_fiscal");
    let idx_area = index_of("area");
    let idx_geom = index_of("geom");
    let idx_muni = index_of("nome_municipio");
    let idx_regiao = index_of("regiao_administrativa");

    let mut records = Vec::new();
    let mut no_geometry_text = 0usize;
    for row in reader.records() {
        let row = row?;
        let Some(geom_wkt) = row
            .get(idx_geom)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
        else {
            no_geometry_text += 1;
            continue;
        };
        let modulo_fiscal = parse_numeric(row.get(idx_mf));
        let area = parse_numeric(row.get(idx_area));
        let nome_municipio = row.get(idx_muni).unwrap_or_default().trim().to_string();
        let regiao_administrativa = row.get(idx_regiao).unwrap_or_default().trim().to_string();

        let extras = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                *i != idx_mf && *i != idx_area && *i != idx_geom && *i != idx_muni && *i != idx_regiao
            })
            .map(|(i, name)| (name.clone(), row.get(i).unwrap_or_default().to_string()))
            .collect();

        records.push(ParcelRecord {
            modulo_fiscal,
            area,
            geom_wkt,
            municipio_norm: normalize_municipio(&nome_municipio),
            categoria: classify(area, modulo_fiscal),
            nome_municipio,
            regiao_administrativa,
            geometry: None,
            extras,
        });
    }

    debug!(
        "loaded {} rows from {} ({} dropped for missing geometry text)",
        records.len(),
        path.display(),
        no_geometry_text
    );
    Ok(Dataset { columns, records })
}

fn parse_numeric(cell: Option<&str>) -> f64 {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Computes the data-quality counters for a dataset. Run this after
/// geometry preparation so `valid_for_interactive` sees the parse results.
pub fn validate(dataset: &Dataset) -> ValidationCounts {
    let total_loaded = dataset.records.len();
    let mut valid_for_classification = 0;
    let mut valid_for_interactive = 0;
    let mut valid_for_contextual = 0;

    for record in &dataset.records {
        if !record.classifiable() {
            continue;
        }
        valid_for_classification += 1;
        if record.geometry.is_some() {
            valid_for_interactive += 1;
        }
        if !record.municipio_norm.is_empty() {
            valid_for_contextual += 1;
        }
    }

    ValidationCounts {
        total_loaded,
        valid_for_classification,
        valid_for_interactive,
        valid_for_contextual,
        discarded: total_loaded - valid_for_classification,
    }
}
