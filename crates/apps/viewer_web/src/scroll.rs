use session::scroll::{anchor_target, should_reset_scroll};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Event, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition, ScrollRestoration,
};

use crate::dom::{self, DomError};

fn scroll_to_top() {
    if let Some(window) = web_sys::window() {
        window.scroll_to_with_x_and_y(0.0, 0.0);
    }
}

fn current_hash() -> String {
    web_sys::window()
        .and_then(|w| w.location().hash().ok())
        .unwrap_or_default()
}

/// Smooth in-page anchors, and a page that always opens at the top unless
/// the URL names a fragment.
pub fn install() -> Result<(), DomError> {
    let window = dom::window()?;
    if let Ok(history) = window.history() {
        let _ = history.set_scroll_restoration(ScrollRestoration::Manual);
    }

    for anchor in dom::query_document(r##"a[href^="#"]"##)? {
        let link = anchor.clone();
        dom::on(&anchor, "click", move |event: Event| {
            let Some(href) = link.get_attribute("href") else {
                return;
            };
            let Some(selector) = anchor_target(&href) else {
                return;
            };
            let Ok(Some(target)) = dom::document().map(|d| d.query_selector(selector).ok().flatten())
            else {
                return;
            };
            event.prevent_default();
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            options.set_block(ScrollLogicalPosition::Start);
            target.scroll_into_view_with_scroll_into_view_options(&options);
        })?;
    }

    if should_reset_scroll(&current_hash()) {
        scroll_to_top();
    }

    dom::on(&window, "load", move |_: Event| {
        if !should_reset_scroll(&current_hash()) {
            return;
        }
        let deferred = Closure::once_into_js(scroll_to_top);
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                deferred.unchecked_ref(),
                0,
            );
        }
    })?;
    Ok(())
}
