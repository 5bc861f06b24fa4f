use std::collections::{BTreeMap, BTreeSet};

use formats::{FeatureCollection, FeatureCollectionError};
use foundation::format_number;
use layers::popup::feature_info_html;
use layers::{
    FloodDamageFilter, LayerKey, LayerOrder, LayerRequest, LayerSlots, LayerVisibility,
    StyleContext, base_style, building_highlight_style, greenspace_highlight_style, greenspace_reset_style,
    match_category_option, names_match, postcode_highlight_style, postcode_reset_style,
    render_layer,
};
use runtime::EventBus;
use streaming::{
    ApiBase, ApiError, CategoryTotal, Endpoint, HttpResponse, LoadSequencer,
    PostcodeSearchResponse, QueryParams, RequestToken, StatusPolicy, Summary,
};
use tracing::{debug, info, warn};

use crate::charts::{category_chart_config, ranking_chart_config};
use crate::config::AppConfig;
use crate::effect::{ChartSlot, Effect, FitTarget, LoadKind, Tone};
use crate::modal::{ModalController, ModalId};
use crate::panel::{Sidebar, SidebarState};
use crate::search::{
    EMPTY_INPUT_MESSAGE, SEARCH_FAILED_MESSAGE, SEARCHING_MESSAGE, affected_html,
    buildings_from_damage, message_html, normalize_postcode, not_found_html, postcode_key,
    stats_html, unaffected_html,
};

pub const BUILDING_TYPE_SELECT_ID: &str = "buildingTypeFilter";

/// Why a load left the UI unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Collection(#[from] FeatureCollectionError),
}

/// Loads issued together at startup; one restack once all have settled.
#[derive(Debug, Clone)]
struct BulkLoad {
    outstanding: BTreeSet<LoadKind>,
    failures: Vec<String>,
}

impl BulkLoad {
    fn new(kinds: impl IntoIterator<Item = LoadKind>) -> Self {
        Self {
            outstanding: kinds.into_iter().collect(),
            failures: Vec::new(),
        }
    }

    /// Marks `kind` settled. Returns `true` when this was the last one.
    fn settle(&mut self, kind: LoadKind, failure: Option<String>) -> bool {
        if !self.outstanding.remove(&kind) {
            return false;
        }
        if let Some(failure) = failure {
            self.failures.push(format!("{kind}: {failure}"));
        }
        self.outstanding.is_empty()
    }
}

/// All page state for one map session.
#[derive(Debug)]
pub struct AppState {
    config: AppConfig,
    api: ApiBase,
    visibility: LayerVisibility,
    order: LayerOrder,
    /// Collections currently rendered, index-aligned with the map's features.
    data: LayerSlots<FeatureCollection>,
    sequencer: LoadSequencer<LoadKind>,
    pending_layers: BTreeMap<RequestToken, LayerRequest>,
    pending_searches: BTreeMap<RequestToken, String>,
    bulk: Option<BulkLoad>,
    category_rows: Vec<CategoryTotal>,
    building_type_options: Vec<String>,
    greenspace_highlight: Vec<usize>,
    building_highlight: Vec<usize>,
    modals: ModalController,
    sidebars: SidebarState,
}

impl AppState {
    pub fn new(config: AppConfig, api: ApiBase, visibility: LayerVisibility) -> Self {
        Self {
            config,
            api,
            visibility,
            order: LayerOrder::default(),
            data: LayerSlots::new(),
            sequencer: LoadSequencer::new(),
            pending_layers: BTreeMap::new(),
            pending_searches: BTreeMap::new(),
            bulk: None,
            category_rows: Vec::new(),
            building_type_options: Vec::new(),
            greenspace_highlight: Vec::new(),
            building_highlight: Vec::new(),
            modals: ModalController::default(),
            sidebars: SidebarState::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiBase {
        &self.api
    }

    pub fn order(&self) -> &LayerOrder {
        &self.order
    }

    pub fn visibility(&self) -> &LayerVisibility {
        &self.visibility
    }

    pub fn layer_data(&self, key: LayerKey) -> Option<&FeatureCollection> {
        self.data.get(key)
    }

    /// A layer is on the map when it has loaded and its checkbox is ticked.
    pub fn is_attached(&self, key: LayerKey) -> bool {
        self.data.contains(key) && self.visibility.is_checked(key)
    }

    pub fn is_bulk_loading(&self) -> bool {
        self.bulk.is_some()
    }

    pub fn is_modal_open(&self, id: ModalId) -> bool {
        self.modals.is_open(id)
    }

    /// Values of the building-type dropdown, used to map chart categories.
    pub fn set_building_type_options(&mut self, options: Vec<String>) {
        self.building_type_options = options;
    }

    fn restack(&self) -> Effect {
        Effect::Restack(self.order.restack_plan(|k| self.is_attached(k)))
    }

    fn issue(&mut self, kind: LoadKind) -> RequestToken {
        if let Some(superseded) = self.sequencer.latest(kind) {
            self.pending_layers.remove(&superseded);
            self.pending_searches.remove(&superseded);
        }
        self.sequencer.issue(kind)
    }

    /// Startup: the ranking chart plus every layer and statistic, fetched
    /// concurrently.
    pub fn bootstrap(&mut self) -> Vec<Effect> {
        let mut bus = EventBus::new();
        bus.emit(Effect::RenderChart {
            slot: ChartSlot::Ranking,
            config: ranking_chart_config(&self.config.greenspace_ranking),
        });

        let kinds = LayerKey::ALL
            .into_iter()
            .map(LoadKind::Layer)
            .chain([LoadKind::Summary, LoadKind::DamageByCategory]);
        self.bulk = Some(BulkLoad::new(kinds));

        for key in LayerKey::ALL {
            bus.extend(self.load_layer(LayerRequest::unfiltered(key)));
        }
        bus.emit(self.load_stat(LoadKind::Summary, Endpoint::Summary));
        bus.emit(self.load_stat(LoadKind::DamageByCategory, Endpoint::DamageByCategory));
        info!(loads = 8, "initial load started");
        bus.drain()
    }

    /// Fetches a layer with the given filters. The response replaces whatever
    /// is rendered for that layer.
    pub fn load_layer(&mut self, request: LayerRequest) -> Vec<Effect> {
        let key = request.key();
        let token = self.issue(LoadKind::Layer(key));
        let url = self.api.url(&request.endpoint(), &request.query());
        debug!(layer = %key, %token, %url, "loading layer");
        self.pending_layers.insert(token, request);
        vec![Effect::Fetch {
            kind: LoadKind::Layer(key),
            token,
            url,
        }]
    }

    fn load_stat(&mut self, kind: LoadKind, endpoint: Endpoint) -> Effect {
        let token = self.issue(kind);
        Effect::Fetch {
            kind,
            token,
            url: self.api.url(&endpoint, &QueryParams::new()),
        }
    }

    /// Handles a finished fetch. Responses whose token has been superseded are
    /// dropped without touching any state beyond bulk-load bookkeeping.
    pub fn on_fetch_complete(
        &mut self,
        kind: LoadKind,
        token: RequestToken,
        result: Result<HttpResponse, ApiError>,
    ) -> Vec<Effect> {
        let mut bus = EventBus::new();

        if !self.sequencer.is_current(kind, token) {
            debug!(load = %kind, %token, "discarding stale response");
            self.pending_layers.remove(&token);
            self.pending_searches.remove(&token);
            self.settle_bulk(kind, None, &mut bus);
            return bus.drain();
        }

        let outcome = match kind {
            LoadKind::Layer(key) => {
                let request = self.pending_layers.remove(&token);
                self.complete_layer(key, request, result, &mut bus)
            }
            LoadKind::Summary => self.complete_summary(result, &mut bus),
            LoadKind::DamageByCategory => self.complete_categories(result, &mut bus),
            LoadKind::PostcodeSearch => {
                let query = self.pending_searches.remove(&token).unwrap_or_default();
                self.complete_search(&query, result, &mut bus)
            }
        };

        let failure = match outcome {
            Ok(()) => None,
            Err(err) => {
                warn!(load = %kind, error = %err, "load failed");
                Some(err.to_string())
            }
        };
        self.settle_bulk(kind, failure, &mut bus);
        bus.drain()
    }

    fn settle_bulk(&mut self, kind: LoadKind, failure: Option<String>, bus: &mut EventBus<Effect>) {
        let Some(bulk) = self.bulk.as_mut() else {
            return;
        };
        if !bulk.settle(kind, failure) {
            return;
        }
        if let Some(done) = self.bulk.take() {
            if done.failures.is_empty() {
                info!("initial load complete");
            } else {
                warn!(
                    failed = done.failures.len(),
                    details = %done.failures.join("; "),
                    "initial load finished with failures"
                );
            }
        }
        bus.emit(self.restack());
    }

    fn complete_layer(
        &mut self,
        key: LayerKey,
        request: Option<LayerRequest>,
        result: Result<HttpResponse, ApiError>,
        bus: &mut EventBus<Effect>,
    ) -> Result<(), LoadError> {
        let response = result?;
        if !response.is_ok() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }
        let mut collection = FeatureCollection::from_geojson_str(&response.body)?;
        if let Some(request) = &request {
            request.post_filter(&mut collection, &self.config.selected_greenspaces);
        }
        if collection.skipped > 0 {
            debug!(layer = %key, skipped = collection.skipped, "dropped features without geometry");
        }

        let ctx = StyleContext::for_collection(&collection, self.config.default_max_protection);
        let layer = render_layer(key, &collection, &ctx);
        let attach = self.visibility.is_checked(key);
        let fit_study_area = key == LayerKey::StudyArea && !collection.is_empty();
        let count = collection.len();

        let _previous = self.data.replace(key, collection);
        match key {
            LayerKey::Greenspaces => self.greenspace_highlight.clear(),
            LayerKey::FloodDamage => self.building_highlight.clear(),
            _ => {}
        }

        bus.emit(Effect::RenderLayer { layer, attach });
        if fit_study_area {
            bus.emit(Effect::FitBounds {
                target: FitTarget::Layer(LayerKey::StudyArea),
                padding: self.config.fit.study_area_padding,
                max_zoom: None,
            });
        }
        if attach && self.bulk.is_none() {
            bus.emit(self.restack());
        }
        debug!(layer = %key, features = count, attached = attach, "layer rendered");
        Ok(())
    }

    fn complete_summary(
        &mut self,
        result: Result<HttpResponse, ApiError>,
        bus: &mut EventBus<Effect>,
    ) -> Result<(), LoadError> {
        let summary: Summary = result?.decode(StatusPolicy::RequireOk)?;
        let rate = summary
            .protection_percentage
            .map(|v| format!("{v}"))
            .unwrap_or_else(|| "0".to_string());
        bus.extend([
            Effect::SetText {
                id: "statTotalProtection",
                text: format!("£{}", format_number(summary.total_protection_value)),
            },
            Effect::SetText {
                id: "statProtectionRate",
                text: format!("{rate}%"),
            },
            Effect::SetText {
                id: "statBuildingCount",
                text: format_number(summary.affected_buildings),
            },
            Effect::SetText {
                id: "statStorage",
                text: format!("{} m³", format_number(summary.total_storage_m3)),
            },
        ]);
        Ok(())
    }

    fn complete_categories(
        &mut self,
        result: Result<HttpResponse, ApiError>,
        bus: &mut EventBus<Effect>,
    ) -> Result<(), LoadError> {
        let rows: Vec<CategoryTotal> = result?.decode(StatusPolicy::RequireOk)?;
        bus.emit(Effect::RenderChart {
            slot: ChartSlot::Category,
            config: category_chart_config(&rows),
        });
        self.category_rows = rows;
        Ok(())
    }

    /// Runs a postcode search from free text.
    pub fn search_postcode(&mut self, raw: &str) -> Vec<Effect> {
        let postcode = normalize_postcode(raw);
        if postcode.is_empty() {
            return vec![Effect::SearchResult {
                tone: Tone::Error,
                html: message_html(EMPTY_INPUT_MESSAGE),
            }];
        }

        let token = self.issue(LoadKind::PostcodeSearch);
        let mut query = QueryParams::new();
        query.push("postcode", postcode.as_str());
        let url = self.api.url(&Endpoint::PostcodeSearch, &query);
        debug!(%postcode, %token, "searching postcode");
        self.pending_searches.insert(token, postcode);

        vec![
            Effect::SearchResult {
                tone: Tone::Pending,
                html: message_html(SEARCHING_MESSAGE),
            },
            Effect::Fetch {
                kind: LoadKind::PostcodeSearch,
                token,
                url,
            },
        ]
    }

    fn complete_search(
        &mut self,
        query: &str,
        result: Result<HttpResponse, ApiError>,
        bus: &mut EventBus<Effect>,
    ) -> Result<(), LoadError> {
        let response: PostcodeSearchResponse =
            match result.and_then(|r| r.decode(StatusPolicy::AcceptErrorBody)) {
                Ok(response) => response,
                Err(err) => {
                    bus.emit(Effect::SearchResult {
                        tone: Tone::Error,
                        html: message_html(SEARCH_FAILED_MESSAGE),
                    });
                    bus.emit(Effect::HidePostcodeStats);
                    return Err(err.into());
                }
            };

        if let Some(message) = response.error_message() {
            bus.emit(Effect::SearchResult {
                tone: Tone::Error,
                html: message_html(message),
            });
            bus.emit(Effect::HidePostcodeStats);
            return Ok(());
        }

        if !response.found {
            bus.emit(Effect::SearchResult {
                tone: Tone::Warning,
                html: not_found_html(query),
            });
            bus.emit(Effect::HidePostcodeStats);
            return Ok(());
        }

        let matched = response
            .postcode
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(query)
            .to_string();

        if response.affected_count() == 0 {
            bus.emit(Effect::SearchResult {
                tone: Tone::Success,
                html: unaffected_html(query),
            });
            bus.emit(Effect::HidePostcodeStats);
            if let Some(bounds) = response.bounds {
                bus.emit(Effect::FitBounds {
                    target: FitTarget::Bounds(bounds),
                    padding: self.config.fit.feature_padding,
                    max_zoom: None,
                });
            }
        } else {
            bus.emit(Effect::SearchResult {
                tone: Tone::Warning,
                html: affected_html(query, &response),
            });
            let buildings = match response.buildings.as_deref() {
                Some(list) if !list.is_empty() => list.to_vec(),
                _ => buildings_from_damage(&matched, self.data.get(LayerKey::FloodDamage)),
            };
            bus.emit(Effect::PostcodeStats {
                html: stats_html(&matched, &response, &buildings),
            });
        }

        self.highlight_postcode(&matched, bus);
        Ok(())
    }

    /// Ticks the checkbox for `key` and puts the layer on the map if loaded.
    fn show_layer(&mut self, key: LayerKey, bus: &mut EventBus<Effect>) {
        self.visibility.set(key, true);
        bus.emit(Effect::SetCheckbox { key, checked: true });
        if self.data.contains(key) {
            bus.emit(Effect::SetLayerAttached {
                key,
                attached: true,
            });
            bus.emit(self.restack());
        }
    }

    /// Restyles every postcode polygon: the match is emphasised and focused,
    /// all others reset. Linear in the number of rendered postcodes.
    fn highlight_postcode(&mut self, postcode: &str, bus: &mut EventBus<Effect>) {
        if !self.data.contains(LayerKey::Postcode) {
            return;
        }
        self.show_layer(LayerKey::Postcode, bus);

        let Some(collection) = self.data.get(LayerKey::Postcode) else {
            return;
        };
        let wanted = postcode_key(postcode);
        let mut focused = false;
        for (index, feature) in collection.iter().enumerate() {
            let hit = feature
                .str_property("Postcode")
                .is_some_and(|pc| postcode_key(pc) == wanted);
            if !hit {
                bus.emit(Effect::StyleFeature {
                    key: LayerKey::Postcode,
                    index,
                    style: postcode_reset_style(),
                });
                continue;
            }
            bus.emit(Effect::StyleFeature {
                key: LayerKey::Postcode,
                index,
                style: postcode_highlight_style(),
            });
            if !focused {
                focused = true;
                bus.emit(Effect::FitBounds {
                    target: FitTarget::Feature {
                        key: LayerKey::Postcode,
                        index,
                    },
                    padding: self.config.fit.feature_padding,
                    max_zoom: None,
                });
                bus.emit(Effect::OpenPopup {
                    key: LayerKey::Postcode,
                    index,
                });
            }
        }
    }

    /// "View on Map" from the search result.
    pub fn zoom_to_postcode(&mut self, postcode: &str) -> Vec<Effect> {
        let mut bus = EventBus::new();
        self.highlight_postcode(postcode, &mut bus);
        bus.drain()
    }

    /// Focuses the flood-damage polygon(s) with `damage_id`.
    pub fn zoom_to_building(&mut self, damage_id: i64) -> Vec<Effect> {
        let hits: Vec<usize> = match self.data.get(LayerKey::FloodDamage) {
            Some(collection) => collection
                .iter()
                .enumerate()
                .filter(|(_, f)| f.f64_property("damage_id") == Some(damage_id as f64))
                .map(|(i, _)| i)
                .collect(),
            None => return Vec::new(),
        };
        let Some(&first) = hits.first() else {
            debug!(damage_id, "building not in loaded flood damage layer");
            return Vec::new();
        };

        let mut bus = EventBus::new();
        self.reset_building_highlight(&mut bus);
        self.show_layer(LayerKey::FloodDamage, &mut bus);
        for &index in &hits {
            bus.emit(Effect::StyleFeature {
                key: LayerKey::FloodDamage,
                index,
                style: building_highlight_style(),
            });
        }
        bus.emit(Effect::FitBounds {
            target: FitTarget::Feature {
                key: LayerKey::FloodDamage,
                index: first,
            },
            padding: self.config.fit.building_padding,
            max_zoom: Some(self.config.fit.building_max_zoom),
        });
        bus.emit(Effect::OpenPopup {
            key: LayerKey::FloodDamage,
            index: first,
        });
        self.building_highlight = hits;
        bus.drain()
    }

    /// Restores the protection-ramp style of previously focused buildings.
    fn reset_building_highlight(&mut self, bus: &mut EventBus<Effect>) {
        let previous = std::mem::take(&mut self.building_highlight);
        let Some(collection) = self.data.get(LayerKey::FloodDamage) else {
            return;
        };
        let ctx = StyleContext::for_collection(collection, self.config.default_max_protection);
        for index in previous {
            if let Some(feature) = collection.features.get(index) {
                bus.emit(Effect::StyleFeature {
                    key: LayerKey::FloodDamage,
                    index,
                    style: base_style(LayerKey::FloodDamage, feature, &ctx),
                });
            }
        }
    }

    /// Click on a feature beyond its popup. Postcode polygons run a search.
    pub fn on_feature_click(&mut self, key: LayerKey, index: usize) -> Vec<Effect> {
        if key != LayerKey::Postcode {
            return Vec::new();
        }
        let Some(postcode) = self
            .data
            .get(key)
            .and_then(|c| c.features.get(index))
            .and_then(|f| f.str_property("Postcode"))
            .map(str::to_string)
        else {
            return Vec::new();
        };

        let mut effects = vec![Effect::SetSearchInput(postcode.clone())];
        effects.extend(self.search_postcode(&postcode));
        effects
    }

    pub fn set_layer_visible(&mut self, key: LayerKey, visible: bool) -> Vec<Effect> {
        self.visibility.set(key, visible);
        if !self.data.contains(key) {
            return Vec::new();
        }
        let mut effects = vec![Effect::SetLayerAttached {
            key,
            attached: visible,
        }];
        if visible {
            effects.push(self.restack());
        }
        effects
    }

    /// Applies a new panel order read back after a drag. Invalid orders are
    /// logged and ignored.
    pub fn reorder_layers<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<Effect> {
        match LayerOrder::from_names(names) {
            Ok(order) => {
                self.order = order;
                vec![self.restack()]
            }
            Err(err) => {
                warn!(error = %err, "ignoring invalid layer order");
                Vec::new()
            }
        }
    }

    /// Category bar click: filter buildings to that category.
    pub fn on_category_chart_click(&mut self, index: usize) -> Vec<Effect> {
        let Some(category) = self
            .category_rows
            .get(index)
            .and_then(|row| row.category.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
        else {
            debug!(index, "category bar without a category");
            return Vec::new();
        };

        let mut bus = EventBus::new();
        if let Some(option) = match_category_option(&category, &self.building_type_options) {
            bus.emit(Effect::SetSelectValue {
                id: BUILDING_TYPE_SELECT_ID,
                value: option.to_string(),
            });
        }
        bus.extend(self.load_layer(LayerRequest::FloodDamage(FloodDamageFilter {
            building_type: Some(category.to_lowercase()),
            ..Default::default()
        })));
        self.show_layer(LayerKey::FloodDamage, &mut bus);
        bus.drain()
    }

    /// Ranking bar click: highlight that greenspace on the map.
    pub fn on_ranking_chart_click(&mut self, index: usize) -> Vec<Effect> {
        match self.config.greenspace_ranking.get(index) {
            Some(entry) => {
                let name = entry.name.clone();
                self.highlight_greenspace(&name)
            }
            None => Vec::new(),
        }
    }

    /// Emphasises greenspaces whose name matches `name`, resetting the
    /// previous highlight, and focuses the first match.
    pub fn highlight_greenspace(&mut self, name: &str) -> Vec<Effect> {
        let mut bus = EventBus::new();
        for index in std::mem::take(&mut self.greenspace_highlight) {
            bus.emit(Effect::StyleFeature {
                key: LayerKey::Greenspaces,
                index,
                style: greenspace_reset_style(),
            });
        }
        self.show_layer(LayerKey::Greenspaces, &mut bus);

        let Some(collection) = self.data.get(LayerKey::Greenspaces) else {
            return bus.drain();
        };
        let hits: Vec<usize> = collection
            .iter()
            .enumerate()
            .filter(|(_, f)| f.str_property("name").is_some_and(|n| names_match(n, name)))
            .map(|(i, _)| i)
            .collect();

        for &index in &hits {
            bus.emit(Effect::StyleFeature {
                key: LayerKey::Greenspaces,
                index,
                style: greenspace_highlight_style(),
            });
        }
        if let Some(&first) = hits.first() {
            bus.emit(Effect::FitBounds {
                target: FitTarget::Feature {
                    key: LayerKey::Greenspaces,
                    index: first,
                },
                padding: self.config.fit.feature_padding,
                max_zoom: None,
            });
            bus.emit(Effect::OpenPopup {
                key: LayerKey::Greenspaces,
                index: first,
            });
            bus.emit(Effect::FeatureInfo {
                html: feature_info_html(&collection.features[first].properties),
            });
        } else {
            debug!(name, "no rendered greenspace matches");
        }
        self.greenspace_highlight = hits;
        bus.drain()
    }

    pub fn open_modal(&mut self, id: ModalId) -> Vec<Effect> {
        self.modals.open(id)
    }

    pub fn close_modal(&mut self, id: ModalId) -> Vec<Effect> {
        self.modals.close(id)
    }

    pub fn close_all_modals(&mut self) -> Vec<Effect> {
        self.modals.close_all()
    }

    pub fn open_model_viewer(&mut self, name: &str, path: &str) -> Vec<Effect> {
        self.modals.open_model(name, path)
    }

    /// Opens a backend export in a new browsing context.
    pub fn export(&self, data_type: &str, format: &str) -> Vec<Effect> {
        let data_type = data_type.trim();
        if data_type.is_empty() {
            warn!("export button without a data type");
            return Vec::new();
        }
        let mut query = QueryParams::new();
        query.push_non_empty("format", Some(format));
        let url = self
            .api
            .url(&Endpoint::Export(data_type.to_string()), &query);
        vec![Effect::OpenWindow(url)]
    }

    pub fn toggle_sidebar(&mut self, side: Sidebar) -> Vec<Effect> {
        let collapsed = self.sidebars.toggle(side);
        vec![
            Effect::SetSidebar { side, collapsed },
            Effect::InvalidateMapSize {
                delay_ms: self.config.sidebar_resize_delay_ms,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn state() -> AppState {
        AppState::new(
            AppConfig::default(),
            ApiBase::from_directory_path("/"),
            LayerVisibility::default(),
        )
    }

    fn collection(features: Vec<Value>) -> HttpResponse {
        let features: Vec<Value> = features
            .into_iter()
            .map(|properties| {
                json!({
                    "type": "Feature",
                    "properties": properties,
                    "geometry": { "type": "Point", "coordinates": [-3.25, 55.92] }
                })
            })
            .collect();
        HttpResponse::new(
            200,
            json!({ "type": "FeatureCollection", "features": features }).to_string(),
        )
    }

    fn fetches(effects: &[Effect]) -> Vec<(LoadKind, RequestToken, String)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Fetch { kind, token, url } => Some((*kind, *token, url.clone())),
                _ => None,
            })
            .collect()
    }

    fn only_fetch(effects: &[Effect]) -> (LoadKind, RequestToken, String) {
        let mut all = fetches(effects);
        assert_eq!(all.len(), 1, "expected exactly one fetch in {effects:?}");
        all.remove(0)
    }

    fn bootstrap_fetch(state: &mut AppState, wanted: LoadKind) -> (LoadKind, RequestToken) {
        fetches(&state.bootstrap())
            .into_iter()
            .find(|(kind, _, _)| *kind == wanted)
            .map(|(kind, token, _)| (kind, token))
            .expect("bootstrap issues every load")
    }

    fn load(state: &mut AppState, key: LayerKey, response: HttpResponse) -> Vec<Effect> {
        let (kind, token, _) = only_fetch(&state.load_layer(LayerRequest::unfiltered(key)));
        state.on_fetch_complete(kind, token, Ok(response))
    }

    fn search(state: &mut AppState, input: &str, body: Value) -> Vec<Effect> {
        let (kind, token, _) = only_fetch(&state.search_postcode(input));
        state.on_fetch_complete(kind, token, Ok(HttpResponse::new(200, body.to_string())))
    }

    fn postcodes() -> HttpResponse {
        collection(vec![
            json!({ "Postcode": "EH4 2LA", "affected_count": 3 }),
            json!({ "Postcode": "EH4 9ZZ", "affected_count": 0 }),
        ])
    }

    #[test]
    fn layer_attach_follows_checkbox_and_replaces_previous() {
        let mut state = state();
        state.set_layer_visible(LayerKey::Simd, false);

        let effects = load(&mut state, LayerKey::Simd, collection(vec![json!({ "simd_decile": 2 })]));
        let attach: Vec<bool> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::RenderLayer { attach, .. } => Some(*attach),
                _ => None,
            })
            .collect();
        assert_eq!(attach, vec![false]);
        assert!(!state.is_attached(LayerKey::Simd));

        load(&mut state, LayerKey::Simd, collection(vec![json!({}), json!({})]));
        assert_eq!(state.layer_data(LayerKey::Simd).map(FeatureCollection::len), Some(2));

        let effects = state.set_layer_visible(LayerKey::Simd, true);
        assert_eq!(
            effects[0],
            Effect::SetLayerAttached {
                key: LayerKey::Simd,
                attached: true
            }
        );
        assert!(state.is_attached(LayerKey::Simd));
    }

    #[test]
    fn failed_layer_load_keeps_previous_layer() {
        let mut state = state();
        load(&mut state, LayerKey::FloodZones, collection(vec![json!({ "depth_band": "0-0.3m" })]));

        let effects = load(
            &mut state,
            LayerKey::FloodZones,
            HttpResponse::new(500, r#"{"error":"Database connection failed"}"#),
        );
        assert_eq!(effects, Vec::new());
        assert_eq!(state.layer_data(LayerKey::FloodZones).map(FeatureCollection::len), Some(1));

        let (kind, token, _) = only_fetch(&state.load_layer(LayerRequest::unfiltered(LayerKey::FloodZones)));
        let effects =
            state.on_fetch_complete(kind, token, Err(ApiError::Transport("offline".to_string())));
        assert_eq!(effects, Vec::new());
    }

    #[test]
    fn stale_layer_response_is_discarded() {
        let mut state = state();
        let first = only_fetch(&state.load_layer(LayerRequest::unfiltered(LayerKey::FloodDamage)));
        let second = only_fetch(&state.load_layer(LayerRequest::FloodDamage(FloodDamageFilter {
            building_type: Some("residential".to_string()),
            ..Default::default()
        })));
        assert!(second.2.ends_with("/api/flood_damage?type=residential"));

        let effects = state.on_fetch_complete(
            second.0,
            second.1,
            Ok(collection(vec![json!({ "building_category": "Residential" })])),
        );
        assert!(matches!(effects[0], Effect::RenderLayer { .. }));

        let effects = state.on_fetch_complete(
            first.0,
            first.1,
            Ok(collection(vec![json!({}), json!({}), json!({})])),
        );
        assert_eq!(effects, Vec::new());
        assert_eq!(state.layer_data(LayerKey::FloodDamage).map(FeatureCollection::len), Some(1));
    }

    #[test]
    fn bulk_load_restacks_once_after_everything_settles() {
        let mut state = state();
        let effects = state.bootstrap();
        assert!(matches!(
            effects[0],
            Effect::RenderChart {
                slot: ChartSlot::Ranking,
                ..
            }
        ));
        let issued = fetches(&effects);
        assert_eq!(issued.len(), 8);
        assert!(state.is_bulk_loading());

        let mut restacks = 0;
        for (i, (kind, token, _)) in issued.iter().enumerate() {
            let result = match kind {
                LoadKind::Summary => Err(ApiError::Transport("offline".to_string())),
                LoadKind::DamageByCategory => Ok(HttpResponse::new(
                    200,
                    r#"[{"category": "Residential", "total_protection": 2500000}]"#,
                )),
                _ => Ok(collection(vec![json!({ "name": "Spylaw Public Park" })])),
            };
            let effects = state.on_fetch_complete(*kind, *token, result);
            let n = effects.iter().filter(|e| matches!(e, Effect::Restack(_))).count();
            if i + 1 < issued.len() {
                assert_eq!(n, 0, "restacked early after {kind}");
            }
            restacks += n;
        }
        assert_eq!(restacks, 1);
        assert!(!state.is_bulk_loading());
    }

    #[test]
    fn bulk_load_counts_superseded_requests_as_settled() {
        let mut state = state();
        let issued = fetches(&state.bootstrap());
        let reload = only_fetch(&state.load_layer(LayerRequest::unfiltered(LayerKey::Postcode)));

        let mut last = Vec::new();
        for (kind, token, _) in issued {
            last = state.on_fetch_complete(kind, token, Ok(collection(Vec::new())));
        }
        assert!(last.iter().any(|e| matches!(e, Effect::Restack(_))));
        assert!(!state.is_bulk_loading());

        let effects = state.on_fetch_complete(reload.0, reload.1, Ok(postcodes()));
        assert!(matches!(effects[0], Effect::RenderLayer { .. }));
    }

    #[test]
    fn study_area_fits_map_when_not_empty() {
        let mut state = state();
        let effects = load(&mut state, LayerKey::StudyArea, collection(vec![json!({})]));
        assert!(effects.contains(&Effect::FitBounds {
            target: FitTarget::Layer(LayerKey::StudyArea),
            padding: 20.0,
            max_zoom: None,
        }));

        let effects = load(&mut state, LayerKey::StudyArea, collection(Vec::new()));
        assert!(!effects.iter().any(|e| matches!(e, Effect::FitBounds { .. })));
    }

    #[test]
    fn empty_postcode_is_rejected_without_fetching() {
        let mut state = state();
        let effects = state.search_postcode("   ");
        assert_eq!(
            effects,
            vec![Effect::SearchResult {
                tone: Tone::Error,
                html: EMPTY_INPUT_MESSAGE.to_string(),
            }]
        );
    }

    #[test]
    fn postcode_input_is_normalized_before_querying() {
        let mut state = state();
        let effects = state.search_postcode("eh4 2la ");
        assert_eq!(
            effects[0],
            Effect::SearchResult {
                tone: Tone::Pending,
                html: SEARCHING_MESSAGE.to_string(),
            }
        );
        let (_, _, url) = only_fetch(&effects);
        assert_eq!(url, "/api/postcode/search?postcode=EH4%202LA");
    }

    #[test]
    fn unknown_postcode_leaves_viewport_alone() {
        let mut state = state();
        load(&mut state, LayerKey::Postcode, postcodes());

        let effects = search(
            &mut state,
            "EH10",
            json!({ "found": false, "postcode": "EH10", "message": "Postcode not found in study area" }),
        );
        assert_eq!(
            effects,
            vec![
                Effect::SearchResult {
                    tone: Tone::Warning,
                    html: "Postcode &quot;EH10&quot; not found in study area".to_string(),
                },
                Effect::HidePostcodeStats,
            ]
        );
    }

    #[test]
    fn unaffected_postcode_fits_bounds_without_stats() {
        let mut state = state();
        load(&mut state, LayerKey::Postcode, postcodes());

        let effects = search(
            &mut state,
            "EH4 9ZZ",
            json!({
                "found": true, "postcode": "EH4 9ZZ", "affected_buildings": 0,
                "bounds": [[55.95, -3.26], [55.96, -3.25]]
            }),
        );
        assert!(matches!(
            &effects[0],
            Effect::SearchResult { tone: Tone::Success, html } if html.contains("Good news!")
        ));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::FitBounds {
                target: FitTarget::Bounds(_),
                ..
            }
        )));
        assert!(!effects.iter().any(|e| matches!(e, Effect::PostcodeStats { .. })));
    }

    #[test]
    fn affected_postcode_lists_every_building_and_highlights_polygon() {
        let mut state = state();
        load(&mut state, LayerKey::Postcode, postcodes());

        let effects = search(
            &mut state,
            "eh4 2la",
            json!({
                "found": true, "postcode": "EH4 2LA", "affected_buildings": 3,
                "total_damage": 54000, "protection_value": 12000,
                "buildings": [
                    { "damage_id": 1, "building_category": "Residential" },
                    { "damage_id": 2, "building_category": "Residential" },
                    { "damage_id": 3, "building_category": "Retail" }
                ]
            }),
        );

        assert!(matches!(
            &effects[0],
            Effect::SearchResult { tone: Tone::Warning, html } if html.contains("£54,000")
        ));
        let stats = effects
            .iter()
            .find_map(|e| match e {
                Effect::PostcodeStats { html } => Some(html.clone()),
                _ => None,
            })
            .expect("stats card");
        assert_eq!(stats.matches("class=\"building-item\"").count(), 3);

        let styles: Vec<(usize, PathStyleKind)> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::StyleFeature {
                    key: LayerKey::Postcode,
                    index,
                    style,
                } => Some((*index, PathStyleKind::of(style))),
                _ => None,
            })
            .collect();
        assert_eq!(
            styles,
            vec![(0, PathStyleKind::Highlight), (1, PathStyleKind::Reset)]
        );
        assert!(effects.contains(&Effect::OpenPopup {
            key: LayerKey::Postcode,
            index: 0
        }));
        assert!(effects.contains(&Effect::SetCheckbox {
            key: LayerKey::Postcode,
            checked: true
        }));
    }

    #[derive(Debug, PartialEq)]
    enum PathStyleKind {
        Highlight,
        Reset,
    }

    impl PathStyleKind {
        fn of(style: &layers::PathStyle) -> Self {
            if *style == postcode_highlight_style() {
                Self::Highlight
            } else {
                Self::Reset
            }
        }
    }

    #[test]
    fn later_searches_hide_previous_statistics() {
        let mut state = state();
        load(&mut state, LayerKey::Postcode, postcodes());

        let effects = search(
            &mut state,
            "EH4 2LA",
            json!({
                "found": true, "postcode": "EH4 2LA", "affected_buildings": 2,
                "buildings": [{ "damage_id": 1 }, { "damage_id": 2 }]
            }),
        );
        assert!(effects.iter().any(|e| matches!(e, Effect::PostcodeStats { .. })));
        assert!(!effects.contains(&Effect::HidePostcodeStats));

        let effects = search(&mut state, "EH10", json!({ "found": false }));
        assert!(effects.contains(&Effect::HidePostcodeStats));

        let effects = search(
            &mut state,
            "EH4 9ZZ",
            json!({ "found": true, "postcode": "EH4 9ZZ", "affected_buildings": 0 }),
        );
        assert!(effects.contains(&Effect::HidePostcodeStats));
        assert!(!effects.iter().any(|e| matches!(e, Effect::PostcodeStats { .. })));
    }

    #[test]
    fn search_failure_and_backend_error_are_shown() {
        let mut state = state();
        let (kind, token, _) = only_fetch(&state.search_postcode("EH4"));
        let effects =
            state.on_fetch_complete(kind, token, Err(ApiError::Transport("offline".to_string())));
        assert_eq!(
            effects,
            vec![
                Effect::SearchResult {
                    tone: Tone::Error,
                    html: SEARCH_FAILED_MESSAGE.to_string(),
                },
                Effect::HidePostcodeStats,
            ]
        );

        let (kind, token, _) = only_fetch(&state.search_postcode("EH4"));
        let effects = state.on_fetch_complete(
            kind,
            token,
            Ok(HttpResponse::new(500, r#"{"error": "cache unavailable", "found": false}"#)),
        );
        assert_eq!(
            effects,
            vec![
                Effect::SearchResult {
                    tone: Tone::Error,
                    html: "cache unavailable".to_string(),
                },
                Effect::HidePostcodeStats,
            ]
        );
    }

    #[test]
    fn clicking_a_postcode_polygon_searches_it() {
        let mut state = state();
        load(&mut state, LayerKey::Postcode, postcodes());
        let effects = state.on_feature_click(LayerKey::Postcode, 1);
        assert_eq!(effects[0], Effect::SetSearchInput("EH4 9ZZ".to_string()));
        let (_, _, url) = only_fetch(&effects);
        assert!(url.ends_with("postcode=EH4%209ZZ"));
    }

    #[test]
    fn reorder_puts_last_item_on_top() {
        let mut state = state();
        for key in LayerKey::ALL {
            load(&mut state, key, collection(vec![json!({})]));
        }
        let effects = state.reorder_layers(&[
            "floodDamage",
            "studyArea",
            "postcode",
            "simd",
            "greenspaces",
            "floodZones",
        ]);
        let [Effect::Restack(plan)] = effects.as_slice() else {
            panic!("expected a single restack, got {effects:?}");
        };
        assert_eq!(plan.last(), Some(&LayerKey::FloodZones));
        assert_eq!(plan.len(), 6);

        assert_eq!(state.reorder_layers(&["floodZones"]), Vec::new());
        assert_eq!(state.order().keys().last(), Some(&LayerKey::FloodZones));
    }

    #[test]
    fn category_click_selects_option_and_reloads_damage_once() {
        let mut state = state();
        state.set_building_type_options(vec![
            String::new(),
            "residential".to_string(),
            "commercial".to_string(),
        ]);
        let (kind, token) = bootstrap_fetch(&mut state, LoadKind::DamageByCategory);
        state.on_fetch_complete(
            kind,
            token,
            Ok(HttpResponse::new(
                200,
                r#"[{"category": "Commercial Retail", "total_protection": 1.0},
                    {"category": "Residential", "total_protection": 2.0}]"#,
            )),
        );

        let effects = state.on_category_chart_click(1);
        assert_eq!(
            effects[0],
            Effect::SetSelectValue {
                id: BUILDING_TYPE_SELECT_ID,
                value: "residential".to_string()
            }
        );
        let (kind, _, url) = only_fetch(&effects);
        assert_eq!(kind, LoadKind::Layer(LayerKey::FloodDamage));
        assert!(url.ends_with("/api/flood_damage?type=residential"));
        assert!(effects.contains(&Effect::SetCheckbox {
            key: LayerKey::FloodDamage,
            checked: true
        }));

        assert_eq!(state.on_category_chart_click(9), Vec::new());
    }

    #[test]
    fn greenspace_highlight_resets_previous_and_shows_info() {
        let mut state = state();
        load(
            &mut state,
            LayerKey::Greenspaces,
            collection(vec![
                json!({ "name": "Saughton Park and Gardens", "storage_volume_m3": 103265.0 }),
                json!({ "name": "Murray Field", "has_3d_model": true, "model_path": "m/murray.html" }),
            ]),
        );

        let effects = state.on_ranking_chart_click(0);
        assert!(effects.contains(&Effect::StyleFeature {
            key: LayerKey::Greenspaces,
            index: 0,
            style: greenspace_highlight_style(),
        }));
        assert!(effects.iter().any(|e| matches!(e, Effect::FeatureInfo { html } if html.contains("103,265"))));

        let effects = state.highlight_greenspace("murray field");
        assert_eq!(
            effects[0],
            Effect::StyleFeature {
                key: LayerKey::Greenspaces,
                index: 0,
                style: greenspace_reset_style(),
            }
        );
        assert!(effects.contains(&Effect::OpenPopup {
            key: LayerKey::Greenspaces,
            index: 1
        }));
        assert!(effects.iter().any(|e| matches!(e, Effect::FeatureInfo { html } if html.contains("data-model-path"))));
    }

    #[test]
    fn selected_greenspace_filter_is_applied_client_side() {
        let mut state = state();
        let (kind, token, url) = only_fetch(&state.load_layer(LayerRequest::Greenspaces(
            layers::GreenspaceFilter {
                kind: Some(layers::SELECTED_GREENSPACES.to_string()),
                ..Default::default()
            },
        )));
        assert!(url.ends_with("/api/greenspaces"));
        state.on_fetch_complete(
            kind,
            token,
            Ok(collection(vec![
                json!({ "name": "Hailes Quarry Park" }),
                json!({ "name": "Inverleith Park" }),
            ])),
        );
        assert_eq!(state.layer_data(LayerKey::Greenspaces).map(FeatureCollection::len), Some(1));
    }

    #[test]
    fn zoom_to_building_focuses_and_shows_damage_layer() {
        let mut state = state();
        state.set_layer_visible(LayerKey::FloodDamage, false);
        load(
            &mut state,
            LayerKey::FloodDamage,
            collection(vec![json!({ "damage_id": 7 }), json!({ "damage_id": 8 })]),
        );

        let effects = state.zoom_to_building(8);
        assert!(effects.contains(&Effect::SetLayerAttached {
            key: LayerKey::FloodDamage,
            attached: true
        }));
        assert!(effects.contains(&Effect::FitBounds {
            target: FitTarget::Feature {
                key: LayerKey::FloodDamage,
                index: 1
            },
            padding: 100.0,
            max_zoom: Some(18.0),
        }));
        assert!(state.is_attached(LayerKey::FloodDamage));
        assert_eq!(state.zoom_to_building(99), Vec::new());
    }

    #[test]
    fn zooming_another_building_resets_the_previous_one() {
        let mut state = state();
        load(
            &mut state,
            LayerKey::FloodDamage,
            collection(vec![
                json!({ "damage_id": 7, "protection_value_pound": 250000.0 }),
                json!({ "damage_id": 8 }),
            ]),
        );
        state.zoom_to_building(7);

        let effects = state.zoom_to_building(8);
        let restyled: Vec<(usize, bool)> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::StyleFeature {
                    key: LayerKey::FloodDamage,
                    index,
                    style,
                } => Some((*index, *style == building_highlight_style())),
                _ => None,
            })
            .collect();
        assert_eq!(restyled, vec![(0, false), (1, true)]);

        let ctx = StyleContext::for_collection(
            state.layer_data(LayerKey::FloodDamage).expect("loaded"),
            state.config().default_max_protection,
        );
        let first = &state.layer_data(LayerKey::FloodDamage).expect("loaded").features[0];
        assert_eq!(
            effects[0],
            Effect::StyleFeature {
                key: LayerKey::FloodDamage,
                index: 0,
                style: base_style(LayerKey::FloodDamage, first, &ctx),
            }
        );

        load(&mut state, LayerKey::FloodDamage, collection(vec![json!({ "damage_id": 9 })]));
        let effects = state.zoom_to_building(9);
        assert!(!effects.iter().any(|e| matches!(
            e,
            Effect::StyleFeature { style, .. } if *style != building_highlight_style()
        )));
    }

    #[test]
    fn summary_fills_widgets() {
        let mut state = state();
        let (kind, token) = bootstrap_fetch(&mut state, LoadKind::Summary);
        let effects = state.on_fetch_complete(
            kind,
            token,
            Ok(HttpResponse::new(
                200,
                r#"{"total_protection_value": 1234567.8, "protection_percentage": 81.3,
                    "affected_buildings": 412, "total_storage_m3": 267321}"#,
            )),
        );
        assert_eq!(
            effects,
            vec![
                Effect::SetText {
                    id: "statTotalProtection",
                    text: "£1,234,568".to_string()
                },
                Effect::SetText {
                    id: "statProtectionRate",
                    text: "81.3%".to_string()
                },
                Effect::SetText {
                    id: "statBuildingCount",
                    text: "412".to_string()
                },
                Effect::SetText {
                    id: "statStorage",
                    text: "267,321 m³".to_string()
                },
            ]
        );
    }

    #[test]
    fn export_and_sidebar_effects() {
        let mut state = state();
        assert_eq!(
            state.export("flood_damage", "csv"),
            vec![Effect::OpenWindow("/api/export/flood_damage?format=csv".to_string())]
        );
        assert_eq!(state.export(" ", "csv"), Vec::new());
        assert_eq!(
            state.toggle_sidebar(Sidebar::Left),
            vec![
                Effect::SetSidebar {
                    side: Sidebar::Left,
                    collapsed: true
                },
                Effect::InvalidateMapSize { delay_ms: 300 },
            ]
        );
    }
}
