//! Chart.js configurations for the two dashboard charts.
//!
//! Click handlers and tick formatters are attached by the host; the configs
//! here are plain JSON.

use foundation::truncate_text;
use serde_json::{Value, json};
use streaming::CategoryTotal;

use crate::config::RankedGreenspace;

pub const CATEGORY_PALETTE: [&str; 4] = ["#3498db", "#e74c3c", "#f39c12", "#9b59b6"];
pub const RANKING_COLOR: &str = "#27ae60";
pub const RANKING_LABEL_CHARS: usize = 20;

pub fn category_label(row: &CategoryTotal) -> String {
    row.category
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Pounds to millions, rounded to two decimals.
pub fn to_millions(pounds: Option<f64>) -> f64 {
    let v = pounds.filter(|v| v.is_finite()).unwrap_or(0.0) / 1_000_000.0;
    (v * 100.0).round() / 100.0
}

fn horizontal_bar(labels: Vec<String>, dataset: Value, axis_title: &str) -> Value {
    json!({
        "type": "bar",
        "data": {
            "labels": labels,
            "datasets": [dataset]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "indexAxis": "y",
            "plugins": { "legend": { "display": false } },
            "scales": {
                "x": {
                    "beginAtZero": true,
                    "title": { "display": true, "text": axis_title }
                }
            }
        }
    })
}

pub fn category_chart_config(rows: &[CategoryTotal]) -> Value {
    let labels = rows.iter().map(category_label).collect();
    let data: Vec<f64> = rows.iter().map(|r| to_millions(r.total_protection)).collect();
    horizontal_bar(
        labels,
        json!({
            "label": "Protection Value (£M)",
            "data": data,
            "backgroundColor": CATEGORY_PALETTE,
            "borderWidth": 0
        }),
        "£ Million",
    )
}

pub fn ranking_chart_config(ranking: &[RankedGreenspace]) -> Value {
    let labels = ranking
        .iter()
        .map(|g| truncate_text(&g.name, RANKING_LABEL_CHARS))
        .collect();
    let data: Vec<f64> = ranking.iter().map(|g| g.storage_volume_m3).collect();
    horizontal_bar(
        labels,
        json!({
            "label": "Storage (m³)",
            "data": data,
            "backgroundColor": RANKING_COLOR,
            "borderWidth": 0
        }),
        "m³",
    )
}
