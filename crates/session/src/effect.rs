use std::fmt;

use foundation::LatLngBounds;
use layers::{LayerKey, PathStyle, RenderedLayer};
use serde_json::Value;
use streaming::RequestToken;

use crate::modal::ModalId;
use crate::panel::Sidebar;

/// What a fetch is for. Each kind is sequenced independently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadKind {
    Layer(LayerKey),
    Summary,
    DamageByCategory,
    PostcodeSearch,
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadKind::Layer(key) => write!(f, "{key}"),
            LoadKind::Summary => f.write_str("summary"),
            LoadKind::DamageByCategory => f.write_str("damageByCategory"),
            LoadKind::PostcodeSearch => f.write_str("postcodeSearch"),
        }
    }
}

/// Styling tone of the postcode search result box.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tone {
    Pending,
    Success,
    Warning,
    Error,
}

impl Tone {
    /// Class list applied to the result element.
    pub fn class_name(self) -> &'static str {
        match self {
            Tone::Pending => "search-result show",
            Tone::Success => "search-result show success",
            Tone::Warning => "search-result show warning",
            Tone::Error => "search-result show error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitTarget {
    Bounds(LatLngBounds),
    /// Everything currently in a layer.
    Layer(LayerKey),
    /// One feature of a layer, by index into its rendered features.
    Feature { key: LayerKey, index: usize },
}

/// Chart canvases on the page.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartSlot {
    Category,
    Ranking,
}

impl ChartSlot {
    pub fn canvas_id(self) -> &'static str {
        match self {
            ChartSlot::Category => "categoryChart",
            ChartSlot::Ranking => "greenspaceChart",
        }
    }
}

/// A side effect for the host to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch {
        kind: LoadKind,
        token: RequestToken,
        url: String,
    },
    /// Replace the layer for `layer.key`, detaching the old one first.
    RenderLayer { layer: RenderedLayer, attach: bool },
    SetLayerAttached { key: LayerKey, attached: bool },
    SetCheckbox { key: LayerKey, checked: bool },
    /// Bring these layers to front in sequence; the last ends on top.
    Restack(Vec<LayerKey>),
    FitBounds {
        target: FitTarget,
        padding: f64,
        max_zoom: Option<f64>,
    },
    StyleFeature {
        key: LayerKey,
        index: usize,
        style: PathStyle,
    },
    OpenPopup { key: LayerKey, index: usize },
    SearchResult { tone: Tone, html: String },
    /// Fill and show the postcode statistics card.
    PostcodeStats { html: String },
    /// Hide the statistics card left by an earlier search.
    HidePostcodeStats,
    /// Fill and show the feature info panel.
    FeatureInfo { html: String },
    SetSearchInput(String),
    SetSelectValue { id: &'static str, value: String },
    SetText { id: &'static str, text: String },
    /// Destroy any chart in `slot` and build a new one from `config`.
    RenderChart { slot: ChartSlot, config: Value },
    SetSidebar { side: Sidebar, collapsed: bool },
    InvalidateMapSize { delay_ms: u32 },
    ShowModal(ModalId),
    HideModal(ModalId),
    /// Set the 3D viewer's iframe source, and its title when given.
    SetModelViewer { title: Option<String>, src: String },
    OpenWindow(String),
}
