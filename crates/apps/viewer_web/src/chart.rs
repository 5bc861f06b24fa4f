//! Chart.js bindings for the two dashboard bar charts.

use serde_json::Value;
use session::ChartSlot;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = r#"
export function wol_chart_create(canvasId, configJson, groupTicks, onBarClick) {
    const canvas = document.getElementById(canvasId);
    if (!canvas) return null;
    const config = JSON.parse(configJson);
    config.options = config.options || {};
    config.options.onClick = (event, elements) => {
        if (elements.length > 0) onBarClick(elements[0].index);
    };
    if (groupTicks && config.options.scales && config.options.scales.x) {
        config.options.scales.x.ticks = { callback: (value) => value.toLocaleString() };
    }
    return new Chart(canvas.getContext('2d'), config);
}

export function wol_chart_destroy(chart) {
    chart.destroy();
}
"#)]
extern "C" {
    pub type ChartJs;

    #[wasm_bindgen(catch)]
    fn wol_chart_create(
        canvas_id: &str,
        config_json: &str,
        group_ticks: bool,
        on_bar_click: &Closure<dyn FnMut(u32)>,
    ) -> Result<Option<ChartJs>, JsValue>;

    fn wol_chart_destroy(chart: &ChartJs);
}

/// A live chart and its click callback. Dropping it does not destroy the
/// chart; call [`BarChart::destroy`].
pub struct BarChart {
    chart: ChartJs,
    _on_click: Closure<dyn FnMut(u32)>,
}

impl BarChart {
    /// `None` when the slot's canvas is not on the page.
    pub fn create(
        slot: ChartSlot,
        config: &Value,
        on_click: Closure<dyn FnMut(u32)>,
    ) -> Result<Option<Self>, JsValue> {
        let group_ticks = matches!(slot, ChartSlot::Ranking);
        let chart = wol_chart_create(slot.canvas_id(), &config.to_string(), group_ticks, &on_click)?;
        Ok(chart.map(|chart| Self {
            chart,
            _on_click: on_click,
        }))
    }

    pub fn destroy(self) {
        wol_chart_destroy(&self.chart);
    }
}
