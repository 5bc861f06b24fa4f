//! Postcode search: input normalization and result markup.

use formats::FeatureCollection;
use foundation::format_number;
use maud::{Markup, html};
use streaming::{BuildingSummary, PostcodeSearchResponse};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a postcode";
pub const SEARCHING_MESSAGE: &str = "Searching...";
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed. Please try again.";

pub fn normalize_postcode(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Comparison key that ignores case and inner spacing (`eh4 2la` == `EH42LA`).
pub fn postcode_key(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn not_found_html(postcode: &str) -> String {
    html! { (format!("Postcode \"{postcode}\" not found in study area")) }.into_string()
}

pub fn message_html(message: &str) -> String {
    html! { (message) }.into_string()
}

pub fn unaffected_html(postcode: &str) -> String {
    html! {
        div class="result-title" { "✅ " (postcode) }
        div class="result-stats" {
            span { "Good news! No buildings in this postcode are affected by flooding." }
        }
    }
    .into_string()
}

pub fn affected_html(postcode: &str, response: &PostcodeSearchResponse) -> String {
    html! {
        div class="result-title" { "⚠️ " (postcode) }
        div class="result-stats" {
            span { "Affected Buildings: " strong { (response.affected_count()) } }
            span { "Total Damage: " strong { "£" (format_number(response.total_damage)) } }
            span { "Protection Value: " strong { "£" (format_number(response.protection_value)) } }
        }
        span class="jump-link" data-postcode=(postcode) { "📍 View on Map" }
    }
    .into_string()
}

fn stat_row(label: &str, value: Markup, highlight: bool) -> Markup {
    html! {
        div class="stat-row" {
            span class="stat-label" { (label) }
            span class=(if highlight { "stat-value highlight" } else { "stat-value" }) { (value) }
        }
    }
}

/// Statistics card body for a postcode with affected buildings.
pub fn stats_html(
    postcode: &str,
    response: &PostcodeSearchResponse,
    buildings: &[BuildingSummary],
) -> String {
    html! {
        (stat_row("Postcode", html! { (postcode) }, false))
        (stat_row("Affected Buildings", html! { (response.affected_count()) }, false))
        (stat_row("Total Damage (2024)", html! { "£" (format_number(response.total_damage)) }, false))
        (stat_row("Protection Value", html! { "£" (format_number(response.protection_value)) }, true))
        @if !buildings.is_empty() {
            div class="building-list" {
                strong { "Affected Buildings:" }
                @for b in buildings {
                    div class="building-item" data-damage-id=[b.damage_id] {
                        span class="building-type" {
                            (b.building_category.as_deref().filter(|c| !c.is_empty()).unwrap_or("Building"))
                        }
                        br;
                        span { "Damage: £" (format_number(b.damage_2024_pound)) }
                        " | "
                        span class="building-value" { "Protected: £" (format_number(b.protection_value_pound)) }
                    }
                }
            }
        }
    }
    .into_string()
}

/// Per-building entries for `postcode` taken from the loaded flood-damage
/// features, used when the search response lists none.
pub fn buildings_from_damage(
    postcode: &str,
    damage: Option<&FeatureCollection>,
) -> Vec<BuildingSummary> {
    let Some(damage) = damage else {
        return Vec::new();
    };
    let wanted = postcode_key(postcode);
    damage
        .iter()
        .filter(|f| {
            f.str_property("postcode")
                .or_else(|| f.str_property("Postcode"))
                .is_some_and(|pc| postcode_key(pc) == wanted)
        })
        .map(|f| BuildingSummary {
            damage_id: f.f64_property("damage_id").map(|v| v as i64),
            building_category: f.str_property("building_category").map(str::to_string),
            damage_2024_pound: f.f64_property("damage_2024_pound"),
            protection_value_pound: f.f64_property("protection_value_pound"),
        })
        .collect()
}
