use serde::Serialize;

/// Path style options understood by the map library.
///
/// Unset fields are omitted when serialized so a partial style only touches
/// what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<&'static str>,
}

impl PathStyle {
    pub const fn outline(color: &'static str, weight: f64) -> Self {
        Self {
            color: Some(color),
            weight: Some(weight),
            fill_color: None,
            fill_opacity: None,
            dash_array: None,
        }
    }

    pub fn fill(mut self, color: &'static str, opacity: f64) -> Self {
        self.fill_color = Some(color);
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn fill_opacity(mut self, opacity: f64) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn dashed(mut self, pattern: &'static str) -> Self {
        self.dash_array = Some(pattern);
        self
    }
}

pub const STUDY_AREA_COLOR: &str = "#1e3a5f";
pub const POSTCODE_COLOR: &str = "#3498db";
pub const POSTCODE_HIGHLIGHT_COLOR: &str = "#2980b9";
pub const GREENSPACE_KEY_COLOR: &str = "#27ae60";
pub const GREENSPACE_COLOR: &str = "#82e0aa";
pub const GREENSPACE_BORDER_COLOR: &str = "#1e8449";
pub const HIGHLIGHT_COLOR: &str = "#e74c3c";
pub const FLOOD_ZONE_COLOR: &str = "#3498db";
pub const FLOOD_ZONE_BORDER_COLOR: &str = "#2980b9";
pub const DARK_BORDER_COLOR: &str = "#333";

pub const SIMD_HIGH_COLOR: &str = "#e74c3c";
pub const SIMD_MEDIUM_COLOR: &str = "#f39c12";
pub const SIMD_LOW_COLOR: &str = "#27ae60";
pub const SIMD_UNKNOWN_COLOR: &str = "#999";

/// Sequential ramp for protection value, low to high.
pub const PROTECTION_RAMP: [&str; 6] = [
    "#ffffcc", "#c7e9b4", "#7fcdbb", "#41b6c4", "#2c7fb8", "#253494",
];

pub fn study_area_style() -> PathStyle {
    PathStyle::outline(STUDY_AREA_COLOR, 3.0)
        .fill(STUDY_AREA_COLOR, 0.1)
        .dashed("5, 5")
}

pub fn postcode_style() -> PathStyle {
    PathStyle::outline(POSTCODE_COLOR, 1.0).fill(POSTCODE_COLOR, 0.2)
}

/// Restyle applied to a searched postcode. Fill colour is left alone.
pub fn postcode_highlight_style() -> PathStyle {
    PathStyle::outline(POSTCODE_HIGHLIGHT_COLOR, 4.0).fill_opacity(0.5)
}

/// Restyle applied to every non-matching postcode during a search.
pub fn postcode_reset_style() -> PathStyle {
    PathStyle::outline(POSTCODE_COLOR, 1.0).fill_opacity(0.2)
}

pub fn simd_style(decile: Option<f64>) -> PathStyle {
    PathStyle::outline(DARK_BORDER_COLOR, 1.0).fill(simd_color(decile), 0.6)
}

pub fn greenspace_style(is_key: bool) -> PathStyle {
    let fill = if is_key {
        GREENSPACE_KEY_COLOR
    } else {
        GREENSPACE_COLOR
    };
    PathStyle::outline(GREENSPACE_BORDER_COLOR, 2.0).fill(fill, 0.7)
}

pub fn greenspace_highlight_style() -> PathStyle {
    PathStyle::outline(HIGHLIGHT_COLOR, 5.0)
}

pub fn greenspace_reset_style() -> PathStyle {
    PathStyle::outline(GREENSPACE_BORDER_COLOR, 2.0)
}

pub fn flood_zone_style() -> PathStyle {
    PathStyle::outline(FLOOD_ZONE_BORDER_COLOR, 1.0).fill(FLOOD_ZONE_COLOR, 0.5)
}

pub fn flood_damage_style(protection_value: f64, max_protection: f64) -> PathStyle {
    PathStyle::outline(DARK_BORDER_COLOR, 1.0)
        .fill(protection_color(protection_value, max_protection), 0.8)
}

pub fn building_highlight_style() -> PathStyle {
    PathStyle::outline(HIGHLIGHT_COLOR, 4.0).fill_opacity(0.9)
}

/// Decile bucket used for both colour and label. `None` covers missing and 0.
fn simd_band(decile: Option<f64>) -> Option<u8> {
    let d = decile.filter(|d| d.is_finite() && *d != 0.0)?;
    Some(if d <= 3.0 {
        0
    } else if d <= 7.0 {
        1
    } else {
        2
    })
}

pub fn simd_color(decile: Option<f64>) -> &'static str {
    match simd_band(decile) {
        None => SIMD_UNKNOWN_COLOR,
        Some(0) => SIMD_HIGH_COLOR,
        Some(1) => SIMD_MEDIUM_COLOR,
        Some(_) => SIMD_LOW_COLOR,
    }
}

pub fn vulnerability_label(decile: Option<f64>) -> &'static str {
    match simd_band(decile) {
        None => "Unknown",
        Some(0) => "High",
        Some(1) => "Medium",
        Some(_) => "Low",
    }
}

pub fn protection_color(value: f64, max: f64) -> &'static str {
    let ratio = if max > 0.0 && value.is_finite() {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let last = PROTECTION_RAMP.len() - 1;
    let index = ((ratio * PROTECTION_RAMP.len() as f64).floor() as usize).min(last);
    PROTECTION_RAMP[index]
}
