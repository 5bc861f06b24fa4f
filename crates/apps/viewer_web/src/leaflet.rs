//! Thin bindings over the page's global Leaflet `L`.
//!
//! Features inside a GeoJSON layer are addressed by their index in the
//! collection that produced it.

use foundation::LatLngBounds;
use layers::RenderedLayer;
use serde_json::json;
use session::MapConfig;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = r#"
function fitOptions(padding, maxZoom) {
    const opts = { padding: [padding, padding] };
    if (maxZoom !== undefined && maxZoom !== null) opts.maxZoom = maxZoom;
    return opts;
}

function featureAt(layer, index) {
    let found = null;
    layer.eachLayer((l) => {
        if (l.feature && l.feature.__wolIndex === index) found = l;
    });
    return found;
}

export function wol_map_create(containerId, lat, lng, zoom, tileUrl, attribution, maxZoom) {
    const map = L.map(containerId, { center: [lat, lng], zoom, zoomControl: true });
    L.tileLayer(tileUrl, { attribution, maxZoom }).addTo(map);
    L.control.scale({ position: 'bottomleft', metric: true, imperial: false }).addTo(map);
    const NorthArrow = L.Control.extend({
        options: { position: 'bottomleft' },
        onAdd: () => {
            const el = L.DomUtil.create('div', 'leaflet-control-north');
            el.innerHTML = '<span class="north-letter">N</span><span class="north-arrow">&#9650;</span>';
            return el;
        },
    });
    new NorthArrow().addTo(map);
    return map;
}

export function wol_geojson_create(dataJson, featuresJson, onClick) {
    const data = JSON.parse(dataJson);
    const meta = JSON.parse(featuresJson);
    data.features.forEach((f, i) => { f.__wolIndex = i; });
    return L.geoJSON(data, {
        pointToLayer: (f, latlng) => L.circleMarker(latlng),
        style: (f) => meta[f.__wolIndex].style,
        onEachFeature: (f, layer) => {
            const i = f.__wolIndex;
            const m = meta[i];
            if (m.popup) layer.bindPopup(m.popup);
            if (m.clickable) layer.on('click', () => onClick(i));
        },
    });
}

export function wol_set_attached(map, layer, attached) {
    if (attached && !map.hasLayer(layer)) layer.addTo(map);
    if (!attached && map.hasLayer(layer)) map.removeLayer(layer);
}

export function wol_bring_to_front(map, layer) {
    if (map.hasLayer(layer)) layer.bringToFront();
}

export function wol_fit_layer(map, layer, padding, maxZoom) {
    const bounds = layer.getBounds();
    if (bounds.isValid()) map.fitBounds(bounds, fitOptions(padding, maxZoom));
}

export function wol_fit_feature(map, layer, index, padding, maxZoom) {
    const f = featureAt(layer, index);
    if (!f) return false;
    const bounds = f.getBounds ? f.getBounds() : L.latLngBounds([f.getLatLng()]);
    map.fitBounds(bounds, fitOptions(padding, maxZoom));
    return true;
}

export function wol_fit_bounds(map, south, west, north, east, padding, maxZoom) {
    map.fitBounds([[south, west], [north, east]], fitOptions(padding, maxZoom));
}

export function wol_style_feature(layer, index, styleJson) {
    const f = featureAt(layer, index);
    if (!f || !f.setStyle) return false;
    f.setStyle(JSON.parse(styleJson));
    return true;
}

export function wol_open_popup(layer, index) {
    const f = featureAt(layer, index);
    if (!f) return false;
    f.openPopup();
    return true;
}

export function wol_invalidate_size(map) {
    map.invalidateSize();
}
"#)]
extern "C" {
    pub type LeafletMap;
    pub type GeoJsonLayer;

    #[wasm_bindgen(catch)]
    fn wol_map_create(
        container_id: &str,
        lat: f64,
        lng: f64,
        zoom: f64,
        tile_url: &str,
        attribution: &str,
        max_zoom: f64,
    ) -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(catch)]
    fn wol_geojson_create(
        data_json: &str,
        features_json: &str,
        on_click: &Closure<dyn FnMut(u32)>,
    ) -> Result<GeoJsonLayer, JsValue>;

    fn wol_set_attached(map: &LeafletMap, layer: &GeoJsonLayer, attached: bool);

    fn wol_bring_to_front(map: &LeafletMap, layer: &GeoJsonLayer);

    fn wol_fit_layer(map: &LeafletMap, layer: &GeoJsonLayer, padding: f64, max_zoom: Option<f64>);

    fn wol_fit_feature(
        map: &LeafletMap,
        layer: &GeoJsonLayer,
        index: u32,
        padding: f64,
        max_zoom: Option<f64>,
    ) -> bool;

    fn wol_fit_bounds(
        map: &LeafletMap,
        south: f64,
        west: f64,
        north: f64,
        east: f64,
        padding: f64,
        max_zoom: Option<f64>,
    );

    fn wol_style_feature(layer: &GeoJsonLayer, index: u32, style_json: &str) -> bool;

    fn wol_open_popup(layer: &GeoJsonLayer, index: u32) -> bool;

    fn wol_invalidate_size(map: &LeafletMap);
}

pub fn create_map(container_id: &str, config: &MapConfig) -> Result<LeafletMap, JsValue> {
    wol_map_create(
        container_id,
        config.center.lat,
        config.center.lng,
        config.zoom,
        &config.tile_url,
        &config.attribution,
        config.max_zoom,
    )
}

/// A GeoJSON layer plus the click callback it holds on to.
pub struct MapLayer {
    layer: GeoJsonLayer,
    _on_click: Closure<dyn FnMut(u32)>,
}

impl MapLayer {
    /// Builds a detached layer; `on_click` receives the feature index of
    /// clickable features.
    pub fn build(
        rendered: &RenderedLayer,
        on_click: Closure<dyn FnMut(u32)>,
    ) -> Result<Self, JsValue> {
        let meta: Vec<serde_json::Value> = rendered
            .features
            .iter()
            .map(|f| {
                json!({
                    "style": f.style,
                    "popup": f.popup,
                    "clickable": f.clickable,
                })
            })
            .collect();
        let meta = serde_json::to_string(&meta).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let data = rendered.geojson.to_string();
        let layer = wol_geojson_create(&data, &meta, &on_click)?;
        Ok(Self {
            layer,
            _on_click: on_click,
        })
    }

    pub fn set_attached(&self, map: &LeafletMap, attached: bool) {
        wol_set_attached(map, &self.layer, attached);
    }

    pub fn bring_to_front(&self, map: &LeafletMap) {
        wol_bring_to_front(map, &self.layer);
    }

    pub fn fit(&self, map: &LeafletMap, padding: f64, max_zoom: Option<f64>) {
        wol_fit_layer(map, &self.layer, padding, max_zoom);
    }

    pub fn fit_feature(&self, map: &LeafletMap, index: usize, padding: f64, max_zoom: Option<f64>) -> bool {
        wol_fit_feature(map, &self.layer, index as u32, padding, max_zoom)
    }

    pub fn style_feature(&self, index: usize, style: &layers::PathStyle) -> Result<bool, JsValue> {
        let style = serde_json::to_string(style).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(wol_style_feature(&self.layer, index as u32, &style))
    }

    pub fn open_popup(&self, index: usize) -> bool {
        wol_open_popup(&self.layer, index as u32)
    }
}

pub fn fit_bounds(map: &LeafletMap, bounds: &LatLngBounds, padding: f64, max_zoom: Option<f64>) {
    wol_fit_bounds(
        map,
        bounds.south_west.lat,
        bounds.south_west.lng,
        bounds.north_east.lat,
        bounds.north_east.lng,
        padding,
        max_zoom,
    );
}

pub fn invalidate_size(map: &LeafletMap) {
    wol_invalidate_size(map);
}
