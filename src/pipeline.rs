//! The local pipeline: CSV in, classified GeoJSON out.
//!
//! The dataset is loaded and prepared once, then treated as immutable;
//! every user-facing operation only filters it and rebuilds the derived
//! output. An empty result after filtering is the no-data signal
//! (`None`), distinct from any error.

use std::path::Path;

use geo::Point;
use geojson::FeatureCollection;
use log::info;

use crate::geometry::{self, PrepStats, Reprojector};
use crate::loader::{self, Dataset, ValidationCounts};
use crate::normalize::normalize_municipio;
use crate::Result;

pub struct LocalPipeline {
    dataset: Dataset,
    reprojector: Reprojector,
    counts: ValidationCounts,
    prep: PrepStats,
}

impl LocalPipeline {
    /// Loads the most recent export from `dir`, classifies and prepares
    /// every row. This is the only expensive step; hosts should run it
    /// once per session and keep the pipeline around.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut dataset = loader::load_dataset(dir)?;
        let reprojector = Reprojector::new()?;
        let prep = geometry::prepare_geometries(&mut dataset, &reprojector);
        let counts = loader::validate(&dataset);
        info!(
            "pipeline ready: {} rows, {} classifiable, {} mappable, {} discarded",
            counts.total_loaded,
            counts.valid_for_classification,
            counts.valid_for_interactive,
            counts.discarded
        );
        Ok(LocalPipeline {
            dataset,
            reprojector,
            counts,
            prep,
        })
    }

    pub fn counts(&self) -> ValidationCounts {
        self.counts
    }

    pub fn prep_stats(&self) -> PrepStats {
        self.prep
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Distinct administrative regions present in the data, sorted.
    pub fn regioes(&self) -> Vec<String> {
        let mut regioes: Vec<String> = self
            .dataset
            .records
            .iter()
            .map(|r| r.regiao_administrativa.clone())
            .filter(|r| !r.is_empty())
            .collect();
        regioes.sort();
        regioes.dedup();
        regioes
    }

    /// Distinct municipality names within a region, sorted.
    pub fn municipios(&self, regiao: &str) -> Vec<String> {
        let mut municipios: Vec<String> = self
            .dataset
            .records
            .iter()
            .filter(|r| r.regiao_administrativa == regiao)
            .map(|r| r.nome_municipio.clone())
            .filter(|m| !m.is_empty())
            .collect();
        municipios.sort();
        municipios.dedup();
        municipios
    }

    /// Features for one administrative region, or `None` when nothing
    /// matched.
    pub fn geojson_por_regiao(&self, regiao: &str) -> Option<FeatureCollection> {
        let collection = crate::interchange::feature_collection(&self.dataset, |record| {
            record.regiao_administrativa == regiao
        });
        (!collection.features.is_empty()).then_some(collection)
    }

    /// Features for one municipality, matched through the normalized key,
    /// or `None` when nothing matched.
    pub fn geojson_por_municipio(&self, municipio: &str) -> Option<FeatureCollection> {
        let key = normalize_municipio(municipio);
        let collection = crate::interchange::feature_collection(&self.dataset, |record| {
            record.municipio_norm == key
        });
        (!collection.features.is_empty()).then_some(collection)
    }

    /// Initial map framing point for a region's geometries.
    pub fn map_center_por_regiao(&self, regiao: &str) -> Result<Point<f64>> {
        let geometries = self
            .dataset
            .records
            .iter()
            .filter(|record| record.regiao_administrativa == regiao)
            .filter_map(|record| record.geometry.as_ref());
        geometry::map_center(geometries, &self.reprojector)
    }
}
