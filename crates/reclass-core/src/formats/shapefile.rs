//! Shapefile reading
//!
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj)
//! and are read with the pure Rust `shapefile` crate. Shapes are converted
//! to GeoJSON geometries so that every vector source shares one feature
//! model.

use geojson::{Feature, Geometry, JsonObject};
use serde_json::{json, Value};
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::Shape;
use std::path::{Path, PathBuf};

use crate::error::{ReclassError, Result};
use crate::ports::FeatureTable;

const REQUIRED_COMPONENTS: &[&str] = &["shp", "shx", "dbf"];

/// Read every shape and its attribute record
pub fn read(path: &Path) -> Result<FeatureTable> {
    verify_components(path)?;

    let mut reader = shapefile::Reader::from_path(path)
        .map_err(|e| ReclassError::format("Shapefile", format!("Failed to open Shapefile: {}", e)))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result
            .map_err(|e| ReclassError::format("Shapefile", format!("Failed to read feature: {}", e)))?;

        let geometry = match shape_to_json(&shape)? {
            Some(value) => Some(
                Geometry::from_json_value(value)
                    .map_err(|e| ReclassError::format("Shapefile", e.to_string()))?,
            ),
            None => None,
        };

        features.push(Feature {
            bbox: None,
            geometry,
            id: None,
            properties: Some(record_properties(record)),
            foreign_members: None,
        });
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string();

    Ok(FeatureTable {
        name,
        features,
        foreign_members: None,
    })
}

fn component_base(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Verify that all required component files exist
fn verify_components(path: &Path) -> Result<()> {
    let base = component_base(path);
    let missing: Vec<String> = REQUIRED_COMPONENTS
        .iter()
        .filter(|ext| !base.with_extension(ext).exists())
        .map(|ext| format!(".{}", ext))
        .collect();

    if !missing.is_empty() {
        return Err(ReclassError::format(
            "Shapefile",
            format!("Missing required component files: {}", missing.join(", ")),
        ));
    }
    Ok(())
}

fn rings_2d<'a>(parts: impl Iterator<Item = &'a [shapefile::Point]>) -> Vec<Vec<[f64; 2]>> {
    parts
        .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

fn line_value(mut coordinates: Vec<Vec<[f64; 2]>>) -> Value {
    if coordinates.len() == 1 {
        json!({"type": "LineString", "coordinates": coordinates.remove(0)})
    } else {
        json!({"type": "MultiLineString", "coordinates": coordinates})
    }
}

/// Convert a shape to a GeoJSON geometry value. Z and M measures are
/// dropped; only the planar position matters for reclassification.
fn shape_to_json(shape: &Shape) -> Result<Option<Value>> {
    let value = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => json!({"type": "Point", "coordinates": [p.x, p.y]}),
        Shape::PointM(p) => json!({"type": "Point", "coordinates": [p.x, p.y]}),
        Shape::PointZ(p) => json!({"type": "Point", "coordinates": [p.x, p.y]}),
        Shape::Polyline(line) => line_value(rings_2d(line.parts().iter().map(|p| p.as_slice()))),
        Shape::PolylineM(line) => line_value(
            line.parts()
                .iter()
                .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        ),
        Shape::PolylineZ(line) => line_value(
            line.parts()
                .iter()
                .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        ),
        Shape::Polygon(polygon) => json!({
            "type": "Polygon",
            "coordinates": rings_2d(polygon.rings().iter().map(|r| r.points())),
        }),
        Shape::PolygonM(polygon) => {
            let rings: Vec<Vec<[f64; 2]>> = polygon
                .rings()
                .iter()
                .map(|r| r.points().iter().map(|p| [p.x, p.y]).collect())
                .collect();
            json!({"type": "Polygon", "coordinates": rings})
        }
        Shape::PolygonZ(polygon) => {
            let rings: Vec<Vec<[f64; 2]>> = polygon
                .rings()
                .iter()
                .map(|r| r.points().iter().map(|p| [p.x, p.y]).collect())
                .collect();
            json!({"type": "Polygon", "coordinates": rings})
        }
        Shape::Multipoint(mp) => {
            let coordinates: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            json!({"type": "MultiPoint", "coordinates": coordinates})
        }
        Shape::MultipointM(mp) => {
            let coordinates: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            json!({"type": "MultiPoint", "coordinates": coordinates})
        }
        Shape::MultipointZ(mp) => {
            let coordinates: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            json!({"type": "MultiPoint", "coordinates": coordinates})
        }
        Shape::Multipatch(_) => {
            return Err(ReclassError::format(
                "Shapefile",
                "Multipatch geometry type is not supported",
            ))
        }
    };
    Ok(Some(value))
}

fn record_properties(record: shapefile::dbase::Record) -> JsonObject {
    record
        .into_iter()
        .map(|(name, value)| (name, dbase_to_json(value)))
        .collect()
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Convert a dBase field value to JSON
fn dbase_to_json(value: DbaseFieldValue) -> Value {
    match value {
        DbaseFieldValue::Character(Some(s)) => Value::String(s),
        DbaseFieldValue::Numeric(Some(n)) => number(n),
        DbaseFieldValue::Float(Some(f)) => number(f as f64),
        DbaseFieldValue::Integer(i) => Value::from(i),
        DbaseFieldValue::Double(d) => number(d),
        DbaseFieldValue::Currency(c) => number(c),
        DbaseFieldValue::Logical(Some(b)) => Value::Bool(b),
        DbaseFieldValue::Memo(s) => Value::String(s),
        DbaseFieldValue::Date(Some(date)) => {
            Value::String(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
        }
        _ => Value::Null,
    }
}
