use formats::{Feature, FeatureCollection};
use serde_json::Value;

use crate::layer::LayerKey;
use crate::popup::popup_html;
use crate::symbology::{
    PathStyle, flood_damage_style, flood_zone_style, greenspace_style, postcode_style,
    simd_style, study_area_style,
};

/// Inputs to styling that depend on the whole collection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StyleContext {
    pub max_protection: f64,
}

impl StyleContext {
    /// Uses the collection's `max_protection_value` metadata when present and
    /// non-zero, else `fallback_max`.
    pub fn for_collection(collection: &FeatureCollection, fallback_max: f64) -> Self {
        Self {
            max_protection: collection
                .metadata_f64("max_protection_value")
                .unwrap_or(fallback_max),
        }
    }
}

/// Per-feature presentation, index-aligned with the collection's features.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub style: PathStyle,
    pub popup: Option<String>,
    /// The feature reacts to clicks beyond opening its popup.
    pub clickable: bool,
}

/// A layer ready to hand to the map library.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub key: LayerKey,
    pub geojson: Value,
    pub features: Vec<RenderedFeature>,
}

pub fn base_style(key: LayerKey, feature: &Feature, ctx: &StyleContext) -> PathStyle {
    match key {
        LayerKey::StudyArea => study_area_style(),
        LayerKey::Postcode => postcode_style(),
        LayerKey::Simd => simd_style(feature.f64_property("simd_decile")),
        LayerKey::Greenspaces => greenspace_style(feature.bool_property("is_key_greenspace")),
        LayerKey::FloodZones => flood_zone_style(),
        LayerKey::FloodDamage => flood_damage_style(
            feature.f64_property("protection_value_pound").unwrap_or(0.0),
            ctx.max_protection,
        ),
    }
}

pub fn render_layer(
    key: LayerKey,
    collection: &FeatureCollection,
    ctx: &StyleContext,
) -> RenderedLayer {
    let features = collection
        .iter()
        .map(|f| RenderedFeature {
            style: base_style(key, f, ctx),
            popup: popup_html(key, f),
            clickable: key == LayerKey::Postcode && f.str_property("Postcode").is_some(),
        })
        .collect();

    RenderedLayer {
        key,
        geojson: collection.to_geojson_value(),
        features,
    }
}
