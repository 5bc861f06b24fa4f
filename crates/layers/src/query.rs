use formats::{Feature, FeatureCollection};
use streaming::{Endpoint, QueryParams};

use crate::layer::LayerKey;

/// Greenspace type value that selects the curated list client-side.
pub const SELECTED_GREENSPACES: &str = "selected";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostcodeFilter {
    /// `affected` / `unaffected`; anything else returns every postcode.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimdFilter {
    pub risk_level: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GreenspaceFilter {
    pub kind: Option<String>,
    pub min_storage: Option<String>,
    pub max_storage: Option<String>,
}

impl GreenspaceFilter {
    pub fn wants_selected(&self) -> bool {
        self.kind.as_deref() == Some(SELECTED_GREENSPACES)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloodZoneFilter {
    pub depth: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloodDamageFilter {
    pub building_type: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
}

/// One layer load with its filter parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRequest {
    StudyArea,
    Postcodes(PostcodeFilter),
    Simd(SimdFilter),
    Greenspaces(GreenspaceFilter),
    FloodZones(FloodZoneFilter),
    FloodDamage(FloodDamageFilter),
}

impl LayerRequest {
    /// Unfiltered load for `key`.
    pub fn unfiltered(key: LayerKey) -> Self {
        match key {
            LayerKey::StudyArea => Self::StudyArea,
            LayerKey::Postcode => Self::Postcodes(PostcodeFilter::default()),
            LayerKey::Simd => Self::Simd(SimdFilter::default()),
            LayerKey::Greenspaces => Self::Greenspaces(GreenspaceFilter::default()),
            LayerKey::FloodZones => Self::FloodZones(FloodZoneFilter::default()),
            LayerKey::FloodDamage => Self::FloodDamage(FloodDamageFilter::default()),
        }
    }

    pub fn key(&self) -> LayerKey {
        match self {
            Self::StudyArea => LayerKey::StudyArea,
            Self::Postcodes(_) => LayerKey::Postcode,
            Self::Simd(_) => LayerKey::Simd,
            Self::Greenspaces(_) => LayerKey::Greenspaces,
            Self::FloodZones(_) => LayerKey::FloodZones,
            Self::FloodDamage(_) => LayerKey::FloodDamage,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::StudyArea => Endpoint::StudyArea,
            Self::Postcodes(_) => Endpoint::Postcodes,
            Self::Simd(_) => Endpoint::SimdZones,
            Self::Greenspaces(_) => Endpoint::Greenspaces,
            Self::FloodZones(_) => Endpoint::FloodZones,
            Self::FloodDamage(_) => Endpoint::FloodDamage,
        }
    }

    pub fn query(&self) -> QueryParams {
        let mut q = QueryParams::new();
        match self {
            Self::StudyArea => {}
            Self::Postcodes(f) => {
                q.push_non_empty("filter", f.filter.as_deref());
            }
            Self::Simd(f) => {
                q.push_non_empty("risk_level", f.risk_level.as_deref())
                    .push_non_empty("min", f.min.as_deref())
                    .push_non_empty("max", f.max.as_deref());
            }
            Self::Greenspaces(f) => {
                let kind = f.kind.as_deref().filter(|_| !f.wants_selected());
                q.push_non_empty("type", kind)
                    .push_non_empty("min_storage", f.min_storage.as_deref())
                    .push_non_empty("max_storage", f.max_storage.as_deref());
            }
            Self::FloodZones(f) => {
                q.push_non_empty("depth", f.depth.as_deref());
            }
            Self::FloodDamage(f) => {
                q.push_non_empty("type", f.building_type.as_deref())
                    .push_non_empty("min_value", f.min_value.as_deref())
                    .push_non_empty("max_value", f.max_value.as_deref());
            }
        }
        q
    }

    /// Client-side filtering applied after the response decodes.
    pub fn post_filter(&self, collection: &mut FeatureCollection, curated: &[String]) {
        match self {
            Self::Greenspaces(f) if f.wants_selected() => {
                retain_selected_greenspaces(collection, curated);
            }
            _ => {}
        }
    }
}

/// Case-insensitive substring match in either direction, ignoring
/// whitespace.
///
/// Tolerates naming variants such as "Murray Field" vs "Murrayfield".
/// An empty name never matches.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = squash(a);
    let b = squash(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Picks the building-type option matching a chart category: an exact
/// case-insensitive match, or an option contained in the category.
pub fn match_category_option<'a>(category: &str, options: &'a [String]) -> Option<&'a str> {
    let category = category.trim().to_lowercase();
    options
        .iter()
        .map(String::as_str)
        .find(|opt| {
            let opt_lower = opt.trim().to_lowercase();
            !opt_lower.is_empty() && (opt_lower == category || category.contains(&opt_lower))
        })
}

/// Keeps greenspaces whose `name` matches any curated name.
pub fn retain_selected_greenspaces(collection: &mut FeatureCollection, curated: &[String]) {
    collection.retain(|f| feature_name_matches(f, curated));
}

fn feature_name_matches(feature: &Feature, curated: &[String]) -> bool {
    feature
        .str_property("name")
        .is_some_and(|name| curated.iter().any(|c| names_match(name, c)))
}
