use foundation::LatLng;
use runtime::{DEFAULT_DURATION_MS, DEFAULT_VISIBILITY_THRESHOLD};
use serde::Deserialize;
use streaming::ApiBase;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid page configuration: {0}")]
    Json(String),
    #[error("invalid page configuration: {0}")]
    Invalid(String),
}

/// One bar of the greenspace storage ranking chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedGreenspace {
    pub name: String,
    pub storage_volume_m3: f64,
}

impl RankedGreenspace {
    fn new(name: &str, storage_volume_m3: f64) -> Self {
        Self {
            name: name.to_string(),
            storage_volume_m3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center: LatLng,
    pub zoom: f64,
    pub tile_url: String,
    pub attribution: String,
    pub max_zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: LatLng::new(55.92, -3.25),
            zoom: 12.0,
            tile_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            attribution: "© OpenStreetMap contributors © CARTO".to_string(),
            max_zoom: 19.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub study_area_padding: f64,
    pub feature_padding: f64,
    pub building_padding: f64,
    pub building_max_zoom: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            study_area_padding: 20.0,
            feature_padding: 50.0,
            building_padding: 100.0,
            building_max_zoom: 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub duration_ms: f64,
    pub visibility_threshold: f64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
        }
    }
}

/// Page configuration, read from an optional JSON block in the page.
/// Every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub map: MapConfig,
    pub fit: FitConfig,
    pub counters: CounterConfig,
    /// Ramp maximum when a flood-damage response carries none.
    pub default_max_protection: f64,
    pub sidebar_resize_delay_ms: u32,
    /// Names kept by the `selected` greenspace filter.
    pub selected_greenspaces: Vec<String>,
    pub greenspace_ranking: Vec<RankedGreenspace>,
    pub api_base: Option<String>,
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            fit: FitConfig::default(),
            counters: CounterConfig::default(),
            default_max_protection: 500_000.0,
            sidebar_resize_delay_ms: 300,
            selected_greenspaces: [
                "Spylaw Public Park",
                "Colinton and Craiglockhart Dells",
                "Hailes Quarry Park",
                "Saughton Allotments",
                "Saughton Sports Complex",
                "Saughton Rose Gardens",
                "Saughton Park and Gardens",
                "Murray Field",
                "Murrayfield",
                "Roseburn Public Park",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            greenspace_ranking: vec![
                RankedGreenspace::new("Saughton Park and Gardens", 103_265.0),
                RankedGreenspace::new("Hailes Quarry Park", 86_560.0),
                RankedGreenspace::new("Colinton and Craiglockhart Dells", 41_855.0),
                RankedGreenspace::new("Spylaw Public Park", 13_518.0),
                RankedGreenspace::new("Saughton Allotments", 10_478.0),
                RankedGreenspace::new("Roseburn Public Park", 6_214.0),
                RankedGreenspace::new("Murray Field", 5_431.0),
            ],
            api_base: None,
            log_level: None,
        }
    }
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.map.center.is_finite() {
            return Err(ConfigError::Invalid("map.center must be finite".to_string()));
        }
        if !(self.counters.visibility_threshold >= 0.0 && self.counters.visibility_threshold <= 1.0)
        {
            return Err(ConfigError::Invalid(
                "counters.visibility_threshold must be within 0..=1".to_string(),
            ));
        }
        if !(self.counters.duration_ms > 0.0) {
            return Err(ConfigError::Invalid(
                "counters.duration_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured API root, or the one derived from the page's directory.
    pub fn api_base(&self, page_directory: &str) -> ApiBase {
        match self.api_base.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(base) => ApiBase::new(base),
            None => ApiBase::from_directory_path(page_directory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AppConfig::from_json_str(r#"{ "map": { "zoom": 14 }, "log_level": "debug" }"#)
            .expect("config");
        assert_eq!(config.map.zoom, 14.0);
        assert_eq!(config.map.center, LatLng::new(55.92, -3.25));
        assert_eq!(config.fit, FitConfig::default());
        assert_eq!(config.greenspace_ranking.len(), 7);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_malformed_and_out_of_range() {
        assert!(matches!(
            AppConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            AppConfig::from_json_str(r#"{ "counters": { "visibility_threshold": 2.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn api_base_override_wins() {
        let mut config = AppConfig::default();
        assert_eq!(config.api_base("/webmap/").as_str(), "/webmap/api");
        config.api_base = Some("https://maps.example.org/api/".to_string());
        assert_eq!(config.api_base("/webmap/").as_str(), "https://maps.example.org/api");
    }
}
