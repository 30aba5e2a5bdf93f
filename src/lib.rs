//! Classification and map-data preparation for the Ceará cadastral survey
//! (malha fundiária).
//!
//! Two data paths produce the same artifact, a GeoJSON `FeatureCollection`
//! ready for a browser map overlay:
//!
//! - the local pipeline ([`pipeline`]) reads the preprocessed IDACE CSV,
//!   classifies each parcel by fiscal-module bands, reprojects the WKT
//!   geometries from EPSG:31984 to EPSG:4326 and builds the features;
//! - the remote pipeline ([`remote`]) fetches region lists, municipality
//!   lists and pre-built GeoJSON from the companion microservice, with a
//!   short-lived cache in front of every call.

use std::path::PathBuf;

pub mod cache;
pub mod classify;
pub mod geometry;
pub mod interchange;
pub mod loader;
pub mod municipios;
pub mod normalize;
pub mod pipeline;
pub mod remote;

/// Everything that can go wrong outside of row-level data quality.
///
/// Row-level issues (unparseable WKT, missing numerics) never surface here;
/// they are counted by [`loader::ValidationCounts`] and the rows excluded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no dataset found in {0}")]
    DatasetNotFound(PathBuf),

    #[error("required column '{0}' not found")]
    MissingColumn(String),

    #[error("no municipality name property found, properties were: {0:?}")]
    MunicipioColumnNotFound(Vec<String>),

    #[error("no geometries to compute a map center from")]
    EmptyGeometrySet,

    #[error("could not set up projection {from} -> {to}: {source}")]
    ProjSetup {
        from: &'static str,
        to: &'static str,
        source: proj::ProjCreateError,
    },

    #[error("reprojection failed: {0}")]
    Reproject(#[from] proj::ProjError),

    #[error("request to {url} failed: {source}")]
    Remote {
        url: String,
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    RemoteStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("could not read municipality GeoJSON: {0}")]
    MunicipioGeojson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
