//! Popup and info-panel markup.

use formats::Feature;
use foundation::{format_fixed, format_number, title_case_key};
use maud::{Markup, html};
use serde_json::{Map, Value};

use crate::layer::LayerKey;
use crate::symbology::vulnerability_label;

/// Text for a property, treating empty strings, zero and `false` as absent.
fn truthy_text(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => n.as_f64().filter(|v| *v != 0.0).map(plain_number),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Shortest decimal rendering: `3.0` -> `3`, `0.25` -> `0.25`.
fn plain_number(v: f64) -> String {
    format!("{v}")
}

fn row(label: &str, value: impl maud::Render) -> Markup {
    html! {
        div class="popup-row" {
            span class="popup-label" { (label) }
            span class="popup-value" { (value) }
        }
    }
}

fn model_button(class: &str, name: &str, path: &str) -> Markup {
    html! {
        button class=(class) type="button" data-model-name=(name) data-model-path=(path) {
            "🏔️ View 3D"
        }
    }
}

/// Name and path of a feature's 3D model, when it has one.
pub fn model_link(properties: &Map<String, Value>) -> Option<(String, String)> {
    let has_model = match properties.get("has_3d_model") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "True" | "TRUE"),
        _ => false,
    };
    let path = properties
        .get("model_path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())?;
    if !has_model {
        return None;
    }
    let name = properties
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or("Greenspace");
    Some((name.to_string(), path.to_string()))
}

/// Popup markup for a feature of `key`. The study area has none.
pub fn popup_html(key: LayerKey, feature: &Feature) -> Option<String> {
    let markup = match key {
        LayerKey::StudyArea => return None,
        LayerKey::Postcode => postcode_popup(feature),
        LayerKey::Simd => simd_popup(feature),
        LayerKey::Greenspaces => greenspace_popup(feature),
        LayerKey::FloodZones => flood_zone_popup(feature),
        LayerKey::FloodDamage => flood_damage_popup(feature),
    };
    Some(markup.into_string())
}

fn postcode_popup(f: &Feature) -> Markup {
    let title = truthy_text(f, "Postcode").unwrap_or_else(|| "Postcode".to_string());
    let affected = truthy_text(f, "affected_count").unwrap_or_else(|| "0".to_string());
    html! {
        div class="popup-content" {
            div class="popup-title" { "📮 " (title) }
            (row("District:", truthy_text(f, "District").unwrap_or_else(|| "N/A".to_string())))
            (row("Sector:", truthy_text(f, "Sector").unwrap_or_else(|| "N/A".to_string())))
            (row("Affected:", format!("{affected} buildings")))
            (row("Total Damage:", format!("£{}", format_number(f.f64_property("total_damage")))))
        }
    }
}

fn simd_popup(f: &Feature) -> Markup {
    let decile = f.f64_property("simd_decile");
    html! {
        div class="popup-content" {
            div class="popup-title" {
                (truthy_text(f, "datazone_name").unwrap_or_else(|| "SIMD Zone".to_string()))
            }
            (row("DataZone:", truthy_text(f, "datazone_code").unwrap_or_else(|| "N/A".to_string())))
            (row("SIMD Decile:", truthy_text(f, "simd_decile").unwrap_or_else(|| "N/A".to_string())))
            (row("Vulnerability:", vulnerability_label(decile)))
        }
    }
}

fn greenspace_popup(f: &Feature) -> Markup {
    let name = truthy_text(f, "name").unwrap_or_else(|| "Greenspace".to_string());
    html! {
        div class="popup-content" {
            div class="popup-title" { "🌳 " (name) }
            (row("Type:", truthy_text(f, "function_type").unwrap_or_else(|| "N/A".to_string())))
            (row("Storage:", format!("{} m³", format_number(f.f64_property("storage_volume_m3")))))
            @if let Some((model_name, path)) = model_link(&f.properties) {
                (model_button("popup-3d-btn", &model_name, &path))
            }
        }
    }
}

fn flood_zone_popup(f: &Feature) -> Markup {
    html! {
        div class="popup-content" {
            div class="popup-title" { "🌊 Flood Zone" }
            (row("Probability:", truthy_text(f, "probability").unwrap_or_else(|| "N/A".to_string())))
            (row("Depth Band:", truthy_text(f, "depth_band").unwrap_or_else(|| "N/A".to_string())))
        }
    }
}

fn flood_damage_popup(f: &Feature) -> Markup {
    let category = truthy_text(f, "building_category").unwrap_or_else(|| "Building".to_string());
    let depth = f
        .f64_property("flood_depth_m")
        .filter(|d| *d != 0.0)
        .map(|d| format_fixed(d, 2))
        .unwrap_or_else(|| "0".to_string());
    html! {
        div class="popup-content" {
            div class="popup-title" { "🏠 " (category) }
            (row("Flood Depth:", format!("{depth} m")))
            (row("Damage (2024):", format!("£{}", format_number(f.f64_property("damage_2024_pound")))))
            div class="popup-row" {
                span class="popup-label" { "Protection Value:" }
                span class="popup-value" style="color: #27ae60; font-weight: bold;" {
                    "£" (format_number(f.f64_property("protection_value_pound")))
                }
            }
        }
    }
}

/// Info-panel rows for every non-null property except the raw geometry.
pub fn feature_info_html(properties: &Map<String, Value>) -> String {
    let rows: Vec<(String, String)> = properties
        .iter()
        .filter(|(k, v)| k.as_str() != "geom_json" && !v.is_null())
        .map(|(k, v)| (title_case_key(k), info_value(v)))
        .collect();

    html! {
        @for (label, value) in &rows {
            div class="info-row" {
                span class="info-label" { (label) ":" }
                span class="info-value" { (value) }
            }
        }
        @if let Some((name, path)) = model_link(properties) {
            (model_button("view-3d-btn", &name, &path))
        }
    }
    .into_string()
}

fn info_value(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) if v > 1000.0 => format_number(Some(v)),
            Some(v) => format_fixed(v, 2),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(properties: Value) -> Feature {
        let Value::Object(properties) = properties else {
            panic!("properties must be an object");
        };
        Feature {
            id: None,
            properties,
            geometry: json!({ "type": "Point", "coordinates": [0.0, 0.0] }),
        }
    }

    #[test]
    fn study_area_has_no_popup() {
        assert_eq!(popup_html(LayerKey::StudyArea, &feature(json!({}))), None);
    }

    #[test]
    fn postcode_popup_falls_back_for_missing_fields() {
        let html = popup_html(LayerKey::Postcode, &feature(json!({ "total_damage": 1234.5 })))
            .expect("popup");
        assert!(html.contains("📮 Postcode"));
        assert!(html.contains("N/A"));
        assert!(html.contains("0 buildings"));
        assert!(html.contains("£1,235"));
    }

    #[test]
    fn greenspace_popup_carries_model_attributes() {
        let html = popup_html(
            LayerKey::Greenspaces,
            &feature(json!({
                "name": "Saughton Park",
                "storage_volume_m3": 103265,
                "has_3d_model": 1,
                "model_path": "models/saughton.html"
            })),
        )
        .expect("popup");
        assert!(html.contains("🌳 Saughton Park"));
        assert!(html.contains("103,265 m³"));
        assert!(html.contains(r#"data-model-name="Saughton Park""#));
        assert!(html.contains(r#"data-model-path="models/saughton.html""#));

        let without = popup_html(
            LayerKey::Greenspaces,
            &feature(json!({ "name": "Roseburn", "has_3d_model": false, "model_path": "x" })),
        )
        .expect("popup");
        assert!(!without.contains("data-model-path"));
    }

    #[test]
    fn flood_damage_popup_formats_depth_and_values() {
        let html = popup_html(
            LayerKey::FloodDamage,
            &feature(json!({
                "building_category": "Residential",
                "flood_depth_m": 0.456,
                "damage_2024_pound": 25000.0,
                "protection_value_pound": null
            })),
        )
        .expect("popup");
        assert!(html.contains("🏠 Residential"));
        assert!(html.contains("0.46 m"));
        assert!(html.contains("£25,000"));
        assert!(html.contains("£0"));
    }

    #[test]
    fn popup_text_is_escaped() {
        let html = popup_html(
            LayerKey::FloodZones,
            &feature(json!({ "probability": "<b>High</b>" })),
        )
        .expect("popup");
        assert!(html.contains("&lt;b&gt;High&lt;/b&gt;"));
    }

    #[test]
    fn info_panel_skips_geometry_and_nulls() {
        let f = feature(json!({
            "storage_volume_m3": 41855.2,
            "area_ha": 12.5,
            "geom_json": "{...}",
            "district": null,
            "name": "Hailes Quarry Park"
        }));
        let html = feature_info_html(&f.properties);
        assert!(html.contains("Storage Volume M3:"));
        assert!(html.contains("41,855"));
        assert!(html.contains("12.50"));
        assert!(!html.contains("Geom Json"));
        assert!(!html.contains("District"));
        assert!(!html.contains("view-3d-btn"));
    }
}
