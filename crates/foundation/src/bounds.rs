use serde::{Deserialize, Serialize};

/// WGS84 position in degrees.
///
/// Serialized as `[lat, lng]`, the pair order the map library expects.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        LatLng { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lng]
    }
}

/// Lat/lng bounding box, serialized as `[[south, west], [north, east]]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[LatLng; 2]", into = "[LatLng; 2]")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Builds a box from two opposite corners given in any order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        LatLngBounds {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// A box the map can fit to: finite corners inside the WGS84 latitude range.
    pub fn is_valid(&self) -> bool {
        self.south_west.is_finite()
            && self.north_east.is_finite()
            && self.south_west.lat >= -90.0
            && self.north_east.lat <= 90.0
    }
}

impl From<[LatLng; 2]> for LatLngBounds {
    fn from([a, b]: [LatLng; 2]) -> Self {
        LatLngBounds::from_corners(a, b)
    }
}

impl From<LatLngBounds> for [LatLng; 2] {
    fn from(b: LatLngBounds) -> Self {
        [b.south_west, b.north_east]
    }
}
