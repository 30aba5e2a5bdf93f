//! GeoJSON feature building, the hand-off format for the map overlay.
//!
//! One feature per record that carries a prepared geometry. Coordinates are
//! longitude-then-latitude; the browser overlay is the one that flips them
//! into its lat/lng display convention.

use geo::{Geometry, LineString, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry as GeoJsonGeometry, JsonObject, JsonValue};

use crate::loader::{Dataset, ParcelRecord};

/// Column names that must never leak into feature properties. The parsed
/// geometry is already the feature's geometry; embedding the raw WKT (or a
/// second geometry under any spelling) would double the payload.
const GEOMETRY_COLUMNS: [&str; 2] = ["geom", "geometry"];

/// Builds a `FeatureCollection` from the records selected by `filter`.
pub fn feature_collection<'a, F>(dataset: &'a Dataset, filter: F) -> FeatureCollection
where
    F: Fn(&ParcelRecord) -> bool,
{
    let features = dataset
        .records
        .iter()
        .filter(|record| filter(record))
        .filter_map(|record| feature_for(dataset, record))
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature_for(dataset: &Dataset, record: &ParcelRecord) -> Option<Feature> {
    let geometry = record.geometry.as_ref()?;
    Some(Feature {
        bbox: None,
        geometry: Some(geometry_to_geojson(geometry)),
        id: None,
        properties: Some(properties_for(dataset, record)),
        foreign_members: None,
    })
}

/// Copies every source column except the geometry ones, then the derived
/// fields. Key order in the emitted JSON is not part of the contract.
fn properties_for(dataset: &Dataset, record: &ParcelRecord) -> JsonObject {
    let mut properties = JsonObject::new();
    for column in &dataset.columns {
        if is_geometry_column(column) {
            continue;
        }
        let value = match column.as_str() {
            "modulo_fiscal" => number_or_null(record.modulo_fiscal),
            "area" => number_or_null(record.area),
            "nome_municipio" => JsonValue::String(record.nome_municipio.clone()),
            "regiao_administrativa" => JsonValue::String(record.regiao_administrativa.clone()),
            other => record
                .extras
                .iter()
                .find(|(name, _)| name == other)
                .map(|(_, v)| JsonValue::String(v.clone()))
                .unwrap_or(JsonValue::Null),
        };
        properties.insert(column.clone(), value);
    }
    properties.insert(
        "municipio_norm".to_string(),
        JsonValue::String(record.municipio_norm.clone()),
    );
    properties.insert(
        "categoria".to_string(),
        JsonValue::String(record.categoria.label().to_string()),
    );
    properties
}

fn is_geometry_column(name: &str) -> bool {
    GEOMETRY_COLUMNS.iter().any(|g| name.eq_ignore_ascii_case(g))
}

fn number_or_null(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Nested-ring encoding of an areal geometry. Anything non-areal never
/// reaches this point; the loader only keeps polygons and multi-polygons.
fn geometry_to_geojson(geometry: &Geometry<f64>) -> GeoJsonGeometry {
    match geometry {
        Geometry::Polygon(polygon) => {
            GeoJsonGeometry::new(geojson::Value::Polygon(polygon_rings(polygon)))
        }
        Geometry::MultiPolygon(multi) => GeoJsonGeometry::new(geojson::Value::MultiPolygon(
            multi.0.iter().map(polygon_rings).collect(),
        )),
        other => {
            // The loader guarantees areal input; represent anything else as
            // an empty polygon rather than panicking mid-render.
            log::warn!("non-areal geometry reached the interchange builder: {other:?}");
            GeoJsonGeometry::new(geojson::Value::Polygon(vec![]))
        }
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    let ring_positions = |ring: &LineString<f64>| {
        ring.points()
            .map(|point: Point<f64>| vec![point.x(), point.y()])
            .collect::<Vec<_>>()
    };
    let mut rings = vec![ring_positions(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_positions));
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Category};
    use geo::polygon;

    fn record(area: f64, modulo_fiscal: f64, regiao: &str, with_geometry: bool) -> ParcelRecord {
        let geometry = with_geometry.then(|| {
            Geometry::Polygon(polygon![
                (x: -38.5, y: -3.7),
                (x: -38.4, y: -3.7),
                (x: -38.4, y: -3.6),
                (x: -38.5, y: -3.7),
            ])
        });
        ParcelRecord {
            modulo_fiscal,
            area,
            geom_wkt: "POLYGON ((-38.5 -3.7, -38.4 -3.7, -38.4 -3.6, -38.5 -3.7))".to_string(),
            nome_municipio: "Fortaleza".to_string(),
            regiao_administrativa: regiao.to_string(),
            municipio_norm: "fortaleza".to_string(),
            categoria: classify(area, modulo_fiscal),
            geometry,
            extras: vec![("imovel".to_string(), "Sítio Alegre".to_string())],
        }
    }

    fn dataset(records: Vec<ParcelRecord>) -> Dataset {
        Dataset {
            columns: [
                "imovel",
                "modulo_fiscal",
                "area",
                "geom",
                "nome_municipio",
                "regiao_administrativa",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            records,
        }
    }

    #[test]
    fn properties_never_contain_geometry_keys() {
        let ds = dataset(vec![record(5.0, 10.0, "Cariri", true)]);
        let fc = feature_collection(&ds, |_| true);
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert!(!props.contains_key("geom"));
        assert!(!props.contains_key("geometry"));
        assert_eq!(props["imovel"], "Sítio Alegre");
        assert_eq!(props["categoria"], Category::SmallBelowOneModule.label());
        assert_eq!(props["municipio_norm"], "fortaleza");
    }

    #[test]
    fn nan_numerics_become_null() {
        let ds = dataset(vec![record(f64::NAN, 10.0, "Cariri", true)]);
        let fc = feature_collection(&ds, |_| true);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["area"], JsonValue::Null);
        assert_eq!(props["modulo_fiscal"], 10.0);
        assert_eq!(props["categoria"], Category::Unclassified.label());
    }

    #[test]
    fn records_without_geometry_are_skipped() {
        let ds = dataset(vec![
            record(5.0, 10.0, "Cariri", true),
            record(5.0, 10.0, "Cariri", false),
        ]);
        let fc = feature_collection(&ds, |_| true);
        assert_eq!(fc.features.len(), 1);
    }

    #[test]
    fn filter_selects_by_region() {
        let ds = dataset(vec![
            record(5.0, 10.0, "Cariri", true),
            record(120.0, 10.0, "Grande Fortaleza", true),
        ]);
        let fc = feature_collection(&ds, |r| r.regiao_administrativa == "Cariri");
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["regiao_administrativa"], "Cariri");
    }

    #[test]
    fn coordinates_are_lon_lat_rings() {
        let ds = dataset(vec![record(5.0, 10.0, "Cariri", true)]);
        let fc = feature_collection(&ds, |_| true);
        let geometry = fc.features[0].geometry.as_ref().unwrap();
        let geojson::Value::Polygon(rings) = &geometry.value else {
            panic!("expected polygon");
        };
        // Longitude first: Ceará longitudes are ~ -38, latitudes ~ -3.
        assert!(rings[0][0][0] < -30.0);
        assert!(rings[0][0][1] > -10.0);
    }
}
