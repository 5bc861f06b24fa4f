use serde_json::{Map, Value};

/// One GeoJSON feature as delivered by the backend.
///
/// Geometry is kept as raw JSON: it is only ever handed to the map library,
/// never inspected client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: Value,
}

impl Feature {
    /// Property value, treating JSON `null` as absent.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string property.
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.property(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Numeric property; numeric strings are accepted too.
    pub fn f64_property(&self, key: &str) -> Option<f64> {
        match self.property(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Flag property. Databases hand these out as `true`, `1` or `"1"`.
    pub fn bool_property(&self, key: &str) -> bool {
        match self.property(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "True" | "TRUE"),
            _ => false,
        }
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), id.clone());
        }
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        obj.insert("geometry".to_string(), self.geometry.clone());
        Value::Object(obj)
    }
}

/// A decoded `FeatureCollection` plus the optional `metadata` envelope some
/// endpoints attach.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub metadata: Map<String, Value>,
    /// Features dropped because they carried no geometry.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureCollectionError {
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureCollectionError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| FeatureCollectionError::Json(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, FeatureCollectionError> {
        let Value::Object(mut obj) = value else {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        };
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        }

        let Some(Value::Array(raw_features)) = obj.remove("features") else {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        };

        let metadata = match obj.remove("metadata") {
            Some(Value::Object(m)) => m,
            _ => Map::new(),
        };

        let mut features = Vec::with_capacity(raw_features.len());
        let mut skipped = 0;
        for (index, raw) in raw_features.into_iter().enumerate() {
            let Value::Object(mut feat) = raw else {
                return Err(FeatureCollectionError::InvalidFeature {
                    index,
                    reason: "feature must be an object".to_string(),
                });
            };

            match feat.get("type").and_then(Value::as_str) {
                Some("Feature") => {}
                Some(other) => {
                    return Err(FeatureCollectionError::InvalidFeature {
                        index,
                        reason: format!("unexpected feature type: {other}"),
                    });
                }
                None => {
                    return Err(FeatureCollectionError::InvalidFeature {
                        index,
                        reason: "feature missing type".to_string(),
                    });
                }
            }

            // The map library silently drops geometry-less features, which would
            // shift feature indices; drop them here instead.
            let geometry = match feat.remove("geometry") {
                Some(Value::Null) | None => {
                    skipped += 1;
                    continue;
                }
                Some(g) => g,
            };

            let properties = match feat.remove("properties") {
                Some(Value::Object(p)) => p,
                _ => Map::new(),
            };

            features.push(Feature {
                id: feat.remove("id").filter(|v| !v.is_null()),
                properties,
                geometry,
            });
        }

        Ok(Self {
            features,
            metadata,
            skipped,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Feature) -> bool) {
        self.features.retain(keep);
    }

    /// Numeric `metadata` entry; zero counts as absent.
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| *v != 0.0 && v.is_finite())
    }

    /// Re-encodes the features for the map library. Metadata is not included.
    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        root.insert(
            "features".to_string(),
            Value::Array(self.features.iter().map(Feature::to_geojson_value).collect()),
        );
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn damage_payload() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {
                        "damage_id": 7,
                        "building_category": "Residential",
                        "protection_value_pound": "1200.5",
                        "is_key_greenspace": 1,
                        "postcode": null
                    },
                    "geometry": { "type": "Point", "coordinates": [-3.25, 55.92] }
                },
                { "type": "Feature", "properties": {}, "geometry": null }
            ],
            "metadata": { "max_protection_value": 250000.0, "total_count": 1 }
        })
    }

    #[test]
    fn decodes_features_and_metadata() {
        let fc = FeatureCollection::from_geojson_value(damage_payload()).expect("decode");
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.skipped, 1);
        assert_eq!(fc.metadata_f64("max_protection_value"), Some(250000.0));

        let f = &fc.features[0];
        assert_eq!(f.f64_property("damage_id"), Some(7.0));
        assert_eq!(f.str_property("building_category"), Some("Residential"));
        assert_eq!(f.f64_property("protection_value_pound"), Some(1200.5));
        assert!(f.bool_property("is_key_greenspace"));
        assert_eq!(f.property("postcode"), None);
    }

    #[test]
    fn zero_metadata_counts_as_missing() {
        let fc = FeatureCollection::from_geojson_value(json!({
            "type": "FeatureCollection",
            "features": [],
            "metadata": { "max_protection_value": 0 }
        }))
        .expect("decode");
        assert_eq!(fc.metadata_f64("max_protection_value"), None);
    }

    #[test]
    fn rejects_other_documents() {
        assert_eq!(
            FeatureCollection::from_geojson_value(json!({ "error": "boom" })),
            Err(FeatureCollectionError::NotAFeatureCollection)
        );
        assert!(matches!(
            FeatureCollection::from_geojson_str("{not json"),
            Err(FeatureCollectionError::Json(_))
        ));
        assert!(matches!(
            FeatureCollection::from_geojson_value(json!({
                "type": "FeatureCollection",
                "features": [{ "type": "Polygon" }]
            })),
            Err(FeatureCollectionError::InvalidFeature { index: 0, .. })
        ));
    }

    #[test]
    fn reencodes_for_the_map() {
        let fc = FeatureCollection::from_geojson_value(damage_payload()).expect("decode");
        let out = fc.to_geojson_value();
        assert_eq!(out["type"], "FeatureCollection");
        assert_eq!(out["features"].as_array().map(Vec::len), Some(1));
        assert_eq!(out["features"][0]["geometry"]["type"], "Point");
        assert!(out.get("metadata").is_none());
    }
}
