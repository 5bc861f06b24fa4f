//! Applies effects to Leaflet, Chart.js and the DOM.

use std::cell::RefCell;
use std::collections::BTreeMap;

use layers::LayerSlots;
use session::{ChartSlot, Effect, FitTarget, Sidebar};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlIFrameElement, HtmlSelectElement};

use crate::chart::BarChart;
use crate::dom::{self, DomError};
use crate::fetch;
use crate::leaflet::{self, LeafletMap, MapLayer};

const SEARCH_RESULT_ID: &str = "postcodeResult";
const STATS_CARD_ID: &str = "postcodeStats";
const STATS_CONTENT_ID: &str = "postcodeStatsContent";
const FEATURE_INFO_ID: &str = "featureInfo";
const FEATURE_DETAILS_ID: &str = "featureDetails";
const SEARCH_INPUT_ID: &str = "postcodeInput";
const MODEL_TITLE_ID: &str = "modal3DTitle";
const MODEL_IFRAME_ID: &str = "model3DIframe";

/// Everything on the page that the app state does not own.
pub struct MapView {
    map: LeafletMap,
    layers: LayerSlots<MapLayer>,
    charts: BTreeMap<ChartSlot, BarChart>,
}

impl MapView {
    pub fn new(map: LeafletMap) -> Self {
        Self {
            map,
            layers: LayerSlots::new(),
            charts: BTreeMap::new(),
        }
    }

    fn apply(&mut self, effect: Effect) -> Result<(), DomError> {
        match effect {
            Effect::Fetch { kind, token, url } => fetch::spawn(kind, token, url),
            Effect::RenderLayer { layer, attach } => {
                let key = layer.key;
                let on_click = Closure::<dyn FnMut(u32)>::new(move |index: u32| {
                    crate::dispatch(|app| app.on_feature_click(key, index as usize));
                });
                let (built, failure) = match MapLayer::build(&layer, on_click) {
                    Ok(built) => (Some(built), None),
                    Err(err) => (None, Some(err)),
                };
                if let Some(previous) = self.layers.install(key, built) {
                    previous.set_attached(&self.map, false);
                }
                if let Some(err) = failure {
                    return Err(err.into());
                }
                if let Some(current) = self.layers.get(key) {
                    current.set_attached(&self.map, attach);
                }
            }
            Effect::SetLayerAttached { key, attached } => {
                if let Some(layer) = self.layers.get(key) {
                    layer.set_attached(&self.map, attached);
                }
            }
            Effect::SetCheckbox { key, checked } => {
                dom::input(key.checkbox_id())?.set_checked(checked);
            }
            Effect::Restack(keys) => {
                for key in keys {
                    if let Some(layer) = self.layers.get(key) {
                        layer.bring_to_front(&self.map);
                    }
                }
            }
            Effect::FitBounds {
                target,
                padding,
                max_zoom,
            } => self.fit(target, padding, max_zoom),
            Effect::StyleFeature { key, index, style } => {
                if let Some(layer) = self.layers.get(key) {
                    if !layer.style_feature(index, &style)? {
                        debug!(layer = %key, index, "feature not styleable");
                    }
                }
            }
            Effect::OpenPopup { key, index } => {
                if let Some(layer) = self.layers.get(key) {
                    layer.open_popup(index);
                }
            }
            Effect::SearchResult { tone, html } => {
                let el = dom::element(SEARCH_RESULT_ID)?;
                el.set_inner_html(&html);
                el.set_class_name(tone.class_name());
            }
            Effect::PostcodeStats { html } => {
                dom::set_html(STATS_CONTENT_ID, &html)?;
                dom::set_display(STATS_CARD_ID, "block")?;
            }
            Effect::HidePostcodeStats => dom::set_display(STATS_CARD_ID, "none")?,
            Effect::FeatureInfo { html } => {
                dom::set_html(FEATURE_DETAILS_ID, &html)?;
                dom::set_display(FEATURE_INFO_ID, "block")?;
            }
            Effect::SetSearchInput(value) => dom::input(SEARCH_INPUT_ID)?.set_value(&value),
            Effect::SetSelectValue { id, value } => {
                dom::typed::<HtmlSelectElement>(id, "select")?.set_value(&value);
            }
            Effect::SetText { id, text } => dom::set_text(id, &text)?,
            Effect::RenderChart { slot, config } => {
                if let Some(previous) = self.charts.remove(&slot) {
                    previous.destroy();
                }
                let on_click = Closure::<dyn FnMut(u32)>::new(move |index: u32| {
                    let index = index as usize;
                    match slot {
                        ChartSlot::Category => {
                            crate::dispatch(|app| app.on_category_chart_click(index))
                        }
                        ChartSlot::Ranking => crate::dispatch(|app| app.on_ranking_chart_click(index)),
                    }
                });
                match BarChart::create(slot, &config, on_click)? {
                    Some(chart) => {
                        self.charts.insert(slot, chart);
                    }
                    None => debug!(canvas = slot.canvas_id(), "chart canvas not on page"),
                }
            }
            Effect::SetSidebar { side, collapsed } => set_sidebar(side, collapsed)?,
            Effect::InvalidateMapSize { delay_ms } => {
                let callback = Closure::once_into_js(|| {
                    with_view(|view| leaflet::invalidate_size(&view.map));
                });
                dom::window()?.set_timeout_with_callback_and_timeout_and_arguments_0(
                    callback.unchecked_ref(),
                    delay_ms as i32,
                )?;
            }
            Effect::ShowModal(id) => dom::set_class(id.element_id(), "show", true)?,
            Effect::HideModal(id) => dom::set_class(id.element_id(), "show", false)?,
            Effect::SetModelViewer { title, src } => {
                if let Some(title) = title {
                    dom::set_text(MODEL_TITLE_ID, &title)?;
                }
                dom::typed::<HtmlIFrameElement>(MODEL_IFRAME_ID, "iframe")?.set_src(&src);
            }
            Effect::OpenWindow(url) => {
                dom::window()?.open_with_url_and_target(&url, "_blank")?;
            }
        }
        Ok(())
    }

    fn fit(&self, target: FitTarget, padding: f64, max_zoom: Option<f64>) {
        match target {
            FitTarget::Bounds(bounds) => leaflet::fit_bounds(&self.map, &bounds, padding, max_zoom),
            FitTarget::Layer(key) => {
                if let Some(layer) = self.layers.get(key) {
                    layer.fit(&self.map, padding, max_zoom);
                }
            }
            FitTarget::Feature { key, index } => {
                let found = self
                    .layers
                    .get(key)
                    .is_some_and(|layer| layer.fit_feature(&self.map, index, padding, max_zoom));
                if !found {
                    debug!(layer = %key, index, "no feature to fit");
                }
            }
        }
    }
}

fn set_sidebar(side: Sidebar, collapsed: bool) -> Result<(), DomError> {
    dom::set_class(side.element_id(), "collapsed", collapsed)?;
    dom::set_text(side.toggle_id(), side.glyph(collapsed))
}

thread_local! {
    static VIEW: RefCell<Option<MapView>> = const { RefCell::new(None) };
}

pub fn install(view: MapView) {
    VIEW.with(|slot| *slot.borrow_mut() = Some(view));
}

fn with_view(f: impl FnOnce(&mut MapView)) {
    VIEW.with(|slot| {
        if let Some(view) = slot.borrow_mut().as_mut() {
            f(view);
        }
    });
}

/// Executes effects in order. A failing effect is logged and skipped.
pub fn execute(effects: Vec<Effect>) {
    with_view(|view| {
        for effect in effects {
            let label = effect_label(&effect);
            if let Err(err) = view.apply(effect) {
                warn!(effect = label, error = %err, "effect failed");
            }
        }
    });
}

fn effect_label(effect: &Effect) -> &'static str {
    match effect {
        Effect::Fetch { .. } => "fetch",
        Effect::RenderLayer { .. } => "render_layer",
        Effect::SetLayerAttached { .. } => "set_layer_attached",
        Effect::SetCheckbox { .. } => "set_checkbox",
        Effect::Restack(_) => "restack",
        Effect::FitBounds { .. } => "fit_bounds",
        Effect::StyleFeature { .. } => "style_feature",
        Effect::OpenPopup { .. } => "open_popup",
        Effect::SearchResult { .. } => "search_result",
        Effect::PostcodeStats { .. } => "postcode_stats",
        Effect::HidePostcodeStats => "hide_postcode_stats",
        Effect::FeatureInfo { .. } => "feature_info",
        Effect::SetSearchInput(_) => "set_search_input",
        Effect::SetSelectValue { .. } => "set_select_value",
        Effect::SetText { .. } => "set_text",
        Effect::RenderChart { .. } => "render_chart",
        Effect::SetSidebar { .. } => "set_sidebar",
        Effect::InvalidateMapSize { .. } => "invalidate_map_size",
        Effect::ShowModal(_) => "show_modal",
        Effect::HideModal(_) => "hide_modal",
        Effect::SetModelViewer { .. } => "set_model_viewer",
        Effect::OpenWindow(_) => "open_window",
    }
}
