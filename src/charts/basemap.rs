//! Base Map Module
//! Loads US state-boundary polygons from a GeoJSON FeatureCollection.

use super::map::{BoundingBox, MapError};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Outline of one state as a list of closed rings of (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct StateBoundary {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// The state-boundary layer drawn underneath accident points.
#[derive(Debug, Clone, Default)]
pub struct BaseMap {
    states: Vec<StateBoundary>,
}

impl BaseMap {
    /// Load boundaries from a GeoJSON file.
    pub fn from_geojson_file(path: &Path) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MapError::BoundariesRead(path.to_path_buf(), e))?;
        Self::from_geojson_str(&text).map_err(|e| MapError::BoundariesParse(path.to_path_buf(), e))
    }

    /// Parse boundaries from GeoJSON text.
    ///
    /// Polygon and MultiPolygon features are kept; other geometries are ignored.
    /// The feature name comes from the `name` (or `NAME`) property.
    pub fn from_geojson_str(text: &str) -> Result<Self, serde_json::Error> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        let mut states = Vec::new();

        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let polygons: Vec<Vec<Vec<Vec<f64>>>> = match geometry.kind.as_str() {
                "Polygon" => vec![serde_json::from_value(geometry.coordinates)?],
                "MultiPolygon" => serde_json::from_value(geometry.coordinates)?,
                _ => continue,
            };

            let rings = polygons
                .into_iter()
                .flatten()
                .map(|ring| {
                    ring.into_iter()
                        .filter(|position| position.len() >= 2)
                        .map(|position| (position[0], position[1]))
                        .collect::<Vec<_>>()
                })
                .filter(|ring| !ring.is_empty())
                .collect();

            let name = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("name").or_else(|| props.get("NAME")))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            states.push(StateBoundary { name, rings });
        }

        Ok(Self { states })
    }

    pub fn states(&self) -> &[StateBoundary] {
        &self.states
    }

    /// Rings that reach into `bounds`, across all states.
    pub fn rings_within<'a>(
        &'a self,
        bounds: &'a BoundingBox,
    ) -> impl Iterator<Item = &'a [(f64, f64)]> + 'a {
        self.states
            .iter()
            .flat_map(|state| state.rings.iter())
            .filter(move |ring| {
                BoundingBox::from_points(ring.iter().copied())
                    .is_some_and(|ring_bounds| ring_bounds.intersects(bounds))
            })
            .map(|ring| ring.as_slice())
    }
}
