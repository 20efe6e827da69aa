//! GeoJSON reading and writing

use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs;
use std::path::Path;

use crate::error::{ReclassError, Result};
use crate::ports::FeatureTable;

/// Read a GeoJSON file into a feature table
pub fn read(path: &Path) -> Result<FeatureTable> {
    let content = fs::read_to_string(path)?;

    let geojson: GeoJson = content
        .parse()
        .map_err(|e| ReclassError::format("GeoJSON", format!("Failed to parse GeoJSON: {}", e)))?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(feature) => (vec![feature], None),
        GeoJson::Geometry(geometry) => {
            // A bare geometry becomes a single feature without properties
            let feature = Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            };
            (vec![feature], None)
        }
    };

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string();

    Ok(FeatureTable {
        name,
        features,
        foreign_members,
    })
}

/// Write a feature table as a GeoJSON FeatureCollection
pub fn write(path: &Path, table: &FeatureTable) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features: table.features.clone(),
        foreign_members: table.foreign_members.clone(),
    };

    let content = serde_json::to_string_pretty(&GeoJson::FeatureCollection(collection))
        .map_err(|e| ReclassError::Serialization(format!("Failed to serialize GeoJSON: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.geojson");
        let content = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                    "properties": {"landuse": "forest", "area": 12}
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [1.0, 1.0]},
                    "properties": {"landuse": "crop"}
                }
            ]
        }"#;
        fs::write(&path, content).unwrap();

        let table = read(&path).unwrap();
        assert_eq!(table.name, "parcels");
        assert_eq!(table.len(), 2);
        assert!(table.foreign_members.as_ref().unwrap().contains_key("crs"));
        let names: Vec<_> = table.property_names().into_iter().collect();
        assert_eq!(names, vec!["area", "landuse"]);
    }

    #[test]
    fn test_read_single_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.geojson");
        fs::write(&path, r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#).unwrap();

        let table = read(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.features[0].geometry.is_some());
        assert!(table.property_names().is_empty());
    }

    #[test]
    fn test_read_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        fs::write(&path, "not valid json").unwrap();

        assert!(matches!(read(&path), Err(ReclassError::Format { .. })));
    }

    #[test]
    fn test_write_keeps_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");

        let mut props = geojson::JsonObject::new();
        props.insert("landuse".to_string(), json!("forest"));
        let table = FeatureTable {
            name: "out".to_string(),
            features: vec![Feature {
                bbox: None,
                geometry: None,
                id: None,
                properties: Some(props),
                foreign_members: None,
            }],
            foreign_members: None,
        };

        write(&path, &table).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(
            back.features[0].property("landuse"),
            Some(&json!("forest"))
        );
    }
}
