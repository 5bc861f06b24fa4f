use std::fmt;

/// Root under which every backend route lives, e.g. `/webmap/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self(base.trim_end_matches('/').to_string())
    }

    /// Derives the API root from the directory path the page was served
    /// from (`new URL('.', location.href).pathname`).
    pub fn from_directory_path(path: &str) -> Self {
        Self(format!("{}/api", path.trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self, endpoint: &Endpoint, query: &QueryParams) -> String {
        let mut url = format!("{}/{}", self.0, endpoint.path());
        let encoded = query.encode();
        if !encoded.is_empty() {
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend routes consumed by the map page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    StudyArea,
    Postcodes,
    SimdZones,
    Greenspaces,
    FloodZones,
    FloodDamage,
    Summary,
    DamageByCategory,
    PostcodeSearch,
    /// `/export/{type}`; the type is path-encoded.
    Export(String),
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Self::StudyArea => "study_area".to_string(),
            Self::Postcodes => "postcodes".to_string(),
            Self::SimdZones => "simd_zones".to_string(),
            Self::Greenspaces => "greenspaces".to_string(),
            Self::FloodZones => "flood_zones".to_string(),
            Self::FloodDamage => "flood_damage".to_string(),
            Self::Summary => "summary".to_string(),
            Self::DamageByCategory => "damage_by_category".to_string(),
            Self::PostcodeSearch => "postcode/search".to_string(),
            Self::Export(kind) => format!("export/{}", urlencoding::encode(kind)),
        }
    }
}

/// Ordered query string builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    /// Appends the pair only when `value` is present and not blank.
    pub fn push_non_empty(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.pairs.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
