//! Geometry parsing, reprojection and map centering.
//!
//! Parcel geometries arrive as WKT in EPSG:31984 (SIRGAS 2000 / UTM 24S)
//! and are transformed once into EPSG:4326; nothing downstream ever sees
//! the projected form. Map centering runs in EPSG:31983 so the centroid is
//! computed in a distance-preserving system, then comes back geographic.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::centroid::Centroid;
use geo::algorithm::map_coords::MapCoords;
use geo::{Coord, Geometry, MultiPolygon, Point, Polygon};
use log::{debug, info};
use proj::Proj;
use wkt::TryFromWkt;

use crate::loader::Dataset;
use crate::{Error, Result};

/// Projected CRS of the source WKT.
pub const SOURCE_CRS: &str = "EPSG:31984";
/// Geographic CRS every consumer sees.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";
/// Projected CRS used transiently for centroid/bounds computation.
pub const CENTERING_CRS: &str = "EPSG:31983";

/// Holds the fixed coordinate transformations used by the pipeline.
pub struct Reprojector {
    source_to_wgs84: Proj,
    wgs84_to_source: Proj,
    wgs84_to_centering: Proj,
    centering_to_wgs84: Proj,
}

impl Reprojector {
    pub fn new() -> Result<Self> {
        Ok(Reprojector {
            source_to_wgs84: make_proj(SOURCE_CRS, GEOGRAPHIC_CRS)?,
            wgs84_to_source: make_proj(GEOGRAPHIC_CRS, SOURCE_CRS)?,
            wgs84_to_centering: make_proj(GEOGRAPHIC_CRS, CENTERING_CRS)?,
            centering_to_wgs84: make_proj(CENTERING_CRS, GEOGRAPHIC_CRS)?,
        })
    }

    /// Source projected coordinates to geographic.
    pub fn to_geographic(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        transform(geometry, &self.source_to_wgs84)
    }

    /// Geographic back to the source projection. Exists for round-trip
    /// verification, not for the pipeline itself.
    pub fn to_source(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        transform(geometry, &self.wgs84_to_source)
    }

    fn to_centering(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        transform(geometry, &self.wgs84_to_centering)
    }

    fn centering_point_to_geographic(&self, point: Point<f64>) -> Result<Point<f64>> {
        let (x, y) = self.centering_to_wgs84.convert((point.x(), point.y()))?;
        Ok(Point::new(x, y))
    }
}

fn make_proj(from: &'static str, to: &'static str) -> Result<Proj> {
    Proj::new_known_crs(from, to, None).map_err(|source| Error::ProjSetup { from, to, source })
}

fn transform(geometry: &Geometry<f64>, proj: &Proj) -> Result<Geometry<f64>> {
    let transformed = geometry.try_map_coords(|Coord { x, y }| {
        let (x, y) = proj.convert((x, y))?;
        Ok::<_, proj::ProjError>(Coord { x, y })
    })?;
    Ok(transformed)
}

/// Parses a WKT string into an areal geometry. Anything that is not a
/// polygon or multi-polygon counts as unparseable.
pub fn parse_wkt(wkt_text: &str) -> Option<Geometry<f64>> {
    match Geometry::try_from_wkt_str(wkt_text) {
        Ok(geometry @ (Geometry::Polygon(_) | Geometry::MultiPolygon(_))) => Some(geometry),
        _ => None,
    }
}

/// Outcome of the geometry-preparation pass, for audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepStats {
    pub parsed: usize,
    /// Rows whose WKT failed to parse or reproject. Excluded, never fatal.
    pub dropped: usize,
}

/// Parses and reprojects every row that carries WKT, in place.
///
/// Rows that fail stay without a geometry and are counted in the returned
/// stats; the validation counters pick them up as not-interactive.
pub fn prepare_geometries(dataset: &mut Dataset, reprojector: &Reprojector) -> PrepStats {
    let mut stats = PrepStats::default();
    for record in &mut dataset.records {
        let prepared = parse_wkt(&record.geom_wkt)
            .and_then(|geometry| reprojector.to_geographic(&geometry).ok());
        match prepared {
            Some(geometry) => {
                record.geometry = Some(geometry);
                stats.parsed += 1;
            }
            None => {
                stats.dropped += 1;
                debug!(
                    "dropping unparseable geometry for municipality '{}'",
                    record.nome_municipio
                );
            }
        }
    }
    info!(
        "geometry preparation: {} parsed, {} dropped",
        stats.parsed, stats.dropped
    );
    stats
}

/// Computes a representative center for a set of geographic geometries,
/// for initial map framing.
///
/// Two enumerable steps, no generic error interception: the primary path
/// takes the area-weighted centroid of the collection in [`CENTERING_CRS`];
/// when that is undefined (a collection with no coordinates at all has no
/// centroid) the fallback is the midpoint of the collection's bounding box
/// in the same system. Only an entirely empty input errors.
pub fn map_center<'a, I>(geometries: I, reprojector: &Reprojector) -> Result<Point<f64>>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for geometry in geometries {
        match reprojector.to_centering(geometry)? {
            Geometry::Polygon(p) => polygons.push(p),
            Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
            _ => {}
        }
    }
    if polygons.is_empty() {
        return Err(Error::EmptyGeometrySet);
    }

    let collection = MultiPolygon::new(polygons);
    let center = match collection.centroid() {
        Some(centroid) => centroid,
        None => bounding_box_midpoint(&collection).ok_or(Error::EmptyGeometrySet)?,
    };
    reprojector.centering_point_to_geographic(center)
}

fn bounding_box_midpoint(collection: &MultiPolygon<f64>) -> Option<Point<f64>> {
    let rect = collection.bounding_rect()?;
    Some(Point::new(
        (rect.min().x + rect.max().x) / 2.0,
        (rect.min().y + rect.max().y) / 2.0,
    ))
}

/// Converts a GeoJSON polygonal value into a `geo` geometry. Non-areal
/// values come back as `None`.
pub fn geometry_from_geojson(value: &geojson::Value) -> Option<Geometry<f64>> {
    match value {
        geojson::Value::Polygon(rings) => Some(Geometry::Polygon(polygon_from_rings(rings))),
        geojson::Value::MultiPolygon(polygons) => Some(Geometry::MultiPolygon(MultiPolygon::new(
            polygons.iter().map(|rings| polygon_from_rings(rings)).collect(),
        ))),
        _ => None,
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    // Positions arrive as unchecked arrays; anything shorter than an x/y
    // pair is row-level bad data and gets skipped, never a panic.
    let ring_to_linestring = |ring: &Vec<Vec<f64>>| {
        geo::LineString::new(
            ring.iter()
                .filter_map(|position| {
                    Some(Coord {
                        x: *position.first()?,
                        y: *position.get(1)?,
                    })
                })
                .collect(),
        )
    };
    let exterior = rings
        .first()
        .map(ring_to_linestring)
        .unwrap_or_else(|| geo::LineString::new(vec![]));
    let holes = rings.iter().skip(1).map(ring_to_linestring).collect();
    Polygon::new(exterior, holes)
}
