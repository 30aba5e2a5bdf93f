//! Municipality boundary loading.
//!
//! The boundaries ship as a normalized GeoJSON file next to the dataset.
//! Sources disagree on the name of the municipality-name property (IBGE
//! exports use `NM_MUN`, older files use variants), so detection follows an
//! explicit ordered rule instead of a fuzzy scan: an exact case-insensitive
//! `nm_mun` wins, otherwise the first property containing both `nm` and
//! `mun`. No match is a fatal error that lists what was there.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geojson::GeoJson;
use log::info;

use crate::geometry::geometry_from_geojson;
use crate::normalize::normalize_municipio;
use crate::{Error, Result};

pub const MUNI_GEOJSON: &str = "geojson-municipios_ceara-normalizado.geojson";

/// A named municipality boundary, geographic coordinates.
#[derive(Debug, Clone)]
pub struct Municipio {
    pub nome_municipio: String,
    /// Same join key as the parcel records.
    pub municipio_norm: String,
    pub geometry: geo::Geometry<f64>,
}

/// Loads the municipality boundaries from `dir`.
pub fn load_municipios(dir: &Path) -> Result<Vec<Municipio>> {
    let path = dir.join(MUNI_GEOJSON);
    let file = File::open(&path)?;
    let geojson = GeoJson::from_reader(BufReader::new(file))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(Error::MunicipioColumnNotFound(vec![]));
    };

    let name_key = detect_name_key(
        collection
            .features
            .iter()
            .filter_map(|f| f.properties.as_ref()),
    )?;

    let mut municipios = Vec::new();
    for feature in &collection.features {
        let Some(name) = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(&name_key))
            .and_then(|value| value.as_str())
        else {
            continue;
        };
        let Some(geometry) = feature
            .geometry
            .as_ref()
            .and_then(|g| geometry_from_geojson(&g.value))
        else {
            continue;
        };
        municipios.push(Municipio {
            nome_municipio: name.to_string(),
            municipio_norm: normalize_municipio(name),
            geometry,
        });
    }
    info!("loaded {} municipality boundaries from {}", municipios.len(), path.display());
    Ok(municipios)
}

/// First-match detection over an ordered list of accepted patterns.
fn detect_name_key<'a, I>(property_sets: I) -> Result<String>
where
    I: IntoIterator<Item = &'a geojson::JsonObject>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut substring_match: Option<String> = None;
    for properties in property_sets {
        for key in properties.keys() {
            if key.eq_ignore_ascii_case("nm_mun") {
                return Ok(key.clone());
            }
            let lower = key.to_lowercase();
            if substring_match.is_none() && lower.contains("nm") && lower.contains("mun") {
                substring_match = Some(key.clone());
            }
            if !seen.contains(key) {
                seen.push(key.clone());
            }
        }
    }
    substring_match.ok_or(Error::MunicipioColumnNotFound(seen))
}
