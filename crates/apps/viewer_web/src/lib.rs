use console_error_panic_hook::set_once;
use session::{AppConfig, AppState, ConfigError, Effect};
use std::cell::RefCell;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

mod chart;
mod counters;
mod dom;
mod fetch;
mod leaflet;
mod logging;
mod scroll;
mod view;
mod wiring;

use view::MapView;

const CONFIG_ELEMENT_ID: &str = "webmap-config";
const MAP_CONTAINER_ID: &str = "map";

thread_local! {
    static APP: RefCell<Option<AppState>> = const { RefCell::new(None) };
}

/// Runs `handler` against the app state, then applies the effects it
/// returned. The state borrow ends before any effect runs.
pub(crate) fn dispatch(handler: impl FnOnce(&mut AppState) -> Vec<Effect>) {
    let effects = APP.with(|app| app.borrow_mut().as_mut().map(handler));
    if let Some(effects) = effects {
        view::execute(effects);
    }
}

/// Page configuration from `<script type="application/json" id="webmap-config">`.
fn read_config() -> (AppConfig, Option<ConfigError>) {
    let raw = dom::document()
        .ok()
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|el| el.text_content())
        .filter(|text| !text.trim().is_empty());
    match raw {
        None => (AppConfig::default(), None),
        Some(raw) => match AppConfig::from_json_str(&raw) {
            Ok(config) => (config, None),
            Err(err) => (AppConfig::default(), Some(err)),
        },
    }
}

/// Path of the directory holding the current page, e.g. `/webmap/`.
fn page_directory() -> Result<String, JsValue> {
    let href = dom::window()?.location().href()?;
    Ok(web_sys::Url::new_with_base(".", &href)?.pathname())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();

    let (config, config_error) = read_config();
    logging::init(config.log_level.as_deref());
    if let Some(err) = config_error {
        warn!(error = %err, "ignoring page configuration");
    }

    if let Err(err) = scroll::install() {
        warn!(error = %err, "scroll behaviour not installed");
    }
    if let Err(err) = counters::install(&config.counters) {
        warn!(error = %err, "counter widgets not installed");
    }

    if dom::document()?.get_element_by_id(MAP_CONTAINER_ID).is_none() {
        info!("no map container on this page");
        return Ok(());
    }

    let api = config.api_base(&page_directory()?);
    info!(api = %api, "starting map");
    let map = leaflet::create_map(MAP_CONTAINER_ID, &config.map)?;
    view::install(MapView::new(map));

    let mut app = AppState::new(config, api, wiring::read_visibility());
    app.set_building_type_options(wiring::building_type_options());
    APP.with(|slot| *slot.borrow_mut() = Some(app));

    wiring::install();
    dispatch(AppState::bootstrap);
    Ok(())
}

#[wasm_bindgen]
pub fn search_postcode(postcode: &str) {
    dispatch(|app| app.search_postcode(postcode));
}

#[wasm_bindgen]
pub fn zoom_to_building(damage_id: f64) {
    if damage_id.is_finite() {
        dispatch(|app| app.zoom_to_building(damage_id as i64));
    }
}

#[wasm_bindgen]
pub fn open_3d_model(name: &str, model_path: &str) {
    dispatch(|app| app.open_model_viewer(name, model_path));
}
