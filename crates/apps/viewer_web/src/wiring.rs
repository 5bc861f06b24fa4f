//! DOM event listeners for the map page. Every listener turns its event into
//! one `AppState` call through [`crate::dispatch`].

use std::cell::RefCell;
use std::rc::Rc;

use layers::{
    FloodDamageFilter, FloodZoneFilter, GreenspaceFilter, LayerKey, LayerRequest,
    LayerVisibility, PostcodeFilter, SimdFilter,
};
use session::{DropPlacement, ModalId, Sidebar};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    DragEvent, Element, Event, HtmlOptionElement, HtmlSelectElement, KeyboardEvent, Node,
};

use crate::dispatch;
use crate::dom::{self, DomError};

const SEARCH_INPUT_ID: &str = "postcodeInput";
const SEARCH_BUTTON_ID: &str = "postcodeSearchBtn";
const LAYER_LIST_ID: &str = "layerList";
const BUILDING_TYPE_ID: &str = "buildingTypeFilter";

/// Checkbox states as the page was served.
pub fn read_visibility() -> LayerVisibility {
    let mut visibility = LayerVisibility::default();
    for key in LayerKey::ALL {
        if let Ok(input) = dom::input(key.checkbox_id()) {
            visibility.set(key, input.checked());
        }
    }
    visibility
}

/// Values of the building-type dropdown options.
pub fn building_type_options() -> Vec<String> {
    let Ok(select) = dom::typed::<HtmlSelectElement>(BUILDING_TYPE_ID, "select") else {
        return Vec::new();
    };
    dom::query_all(&select, "option")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|el| el.dyn_into::<HtmlOptionElement>().ok())
        .map(|option| option.value())
        .collect()
}

pub fn install() {
    let steps: [(&str, fn() -> Result<(), DomError>); 9] = [
        ("search", wire_search),
        ("layer checkboxes", wire_checkboxes),
        ("layer expanders", wire_expanders),
        ("filters", wire_filters),
        ("layer order", wire_layer_list),
        ("sidebars", wire_sidebars),
        ("modals", wire_modals),
        ("export", wire_export),
        ("delegated clicks", wire_delegated_clicks),
    ];
    for (name, step) in steps {
        if let Err(err) = step() {
            warn!(controls = name, error = %err, "controls not wired");
        }
    }
}

/// Wires every item, logging the ones that fail instead of stopping at the
/// first. Returns how many failed.
fn wire_each<T>(
    controls: &str,
    items: impl IntoIterator<Item = T>,
    mut wire: impl FnMut(T) -> Result<(), DomError>,
) -> usize {
    let mut failed = 0;
    for item in items {
        if let Err(err) = wire(item) {
            warn!(controls, error = %err, "control not wired");
            failed += 1;
        }
    }
    failed
}

fn wire_search() -> Result<(), DomError> {
    dom::on_id(SEARCH_BUTTON_ID, "click", |_| search_from_input())?;
    let input = dom::input(SEARCH_INPUT_ID)?;
    dom::on(&input, "keypress", |event: KeyboardEvent| {
        if event.key() == "Enter" {
            search_from_input();
        }
    })
}

fn search_from_input() {
    let raw = dom::input(SEARCH_INPUT_ID)
        .map(|input| input.value())
        .unwrap_or_default();
    dispatch(|app| app.search_postcode(&raw));
}

fn wire_checkboxes() -> Result<(), DomError> {
    wire_each("layer checkbox", LayerKey::ALL, |key| {
        let input = dom::input(key.checkbox_id())?;
        let source = input.clone();
        dom::on(&input, "change", move |_: Event| {
            let checked = source.checked();
            dispatch(|app| app.set_layer_visible(key, checked));
        })
    });
    Ok(())
}

fn wire_expanders() -> Result<(), DomError> {
    for button in dom::query_document(".layer-expand")? {
        let this = button.clone();
        dom::on(&button, "click", move |event: Event| {
            event.stop_propagation();
            let options = this
                .closest(".layer-item")
                .ok()
                .flatten()
                .and_then(|item| item.query_selector(".layer-options").ok().flatten());
            if let Some(options) = options {
                let _ = options.class_list().toggle("show");
                let _ = this.class_list().toggle("expanded");
            }
        })?;
    }
    Ok(())
}

/// `change` on a filter control reloads its layer with the control's value.
fn on_filter_change(
    id: &'static str,
    request: impl Fn(Option<String>) -> LayerRequest + 'static,
) -> Result<(), DomError> {
    dom::on_id(id, "change", move |_| {
        let request = request(dom::field_value(id));
        dispatch(|app| app.load_layer(request));
    })
}

fn on_apply(id: &str, request: impl Fn() -> LayerRequest + 'static) -> Result<(), DomError> {
    dom::on_id(id, "click", move |_| {
        let request = request();
        dispatch(|app| app.load_layer(request));
    })
}

fn wire_filters() -> Result<(), DomError> {
    let filters: [fn() -> Result<(), DomError>; 8] = [
        || {
            on_filter_change("postcodeFilter", |filter| {
                LayerRequest::Postcodes(PostcodeFilter { filter })
            })
        },
        || {
            on_filter_change("simdFilter", |risk_level| {
                LayerRequest::Simd(SimdFilter {
                    risk_level,
                    ..Default::default()
                })
            })
        },
        || {
            on_apply("applySimdRange", || {
                LayerRequest::Simd(SimdFilter {
                    risk_level: None,
                    min: dom::field_value("simdMin"),
                    max: dom::field_value("simdMax"),
                })
            })
        },
        || {
            on_filter_change("greenspaceFilter", |kind| {
                LayerRequest::Greenspaces(GreenspaceFilter {
                    kind,
                    ..Default::default()
                })
            })
        },
        || {
            on_apply("applyGsRange", || {
                LayerRequest::Greenspaces(GreenspaceFilter {
                    kind: None,
                    min_storage: dom::field_value("gsMin"),
                    max_storage: dom::field_value("gsMax"),
                })
            })
        },
        || {
            on_filter_change("floodDepthFilter", |depth| {
                LayerRequest::FloodZones(FloodZoneFilter { depth })
            })
        },
        || {
            on_filter_change(BUILDING_TYPE_ID, |building_type| {
                LayerRequest::FloodDamage(FloodDamageFilter {
                    building_type,
                    ..Default::default()
                })
            })
        },
        || {
            on_apply("applyDmgRange", || {
                LayerRequest::FloodDamage(FloodDamageFilter {
                    building_type: dom::field_value(BUILDING_TYPE_ID),
                    min_value: dom::field_value("dmgMin"),
                    max_value: dom::field_value("dmgMax"),
                })
            })
        },
    ];
    wire_each("filter", filters, |wire| wire());
    Ok(())
}

fn clear_drop_markers(list: &Element) {
    if let Ok(items) = dom::query_all(list, ".layer-item") {
        for item in items {
            let _ = item.class_list().remove_2(
                DropPlacement::Before.marker_class(),
                DropPlacement::After.marker_class(),
            );
        }
    }
}

fn drop_placement(item: &Element, event: &DragEvent) -> DropPlacement {
    let rect = item.get_bounding_client_rect();
    DropPlacement::from_pointer(f64::from(event.client_y()), rect.top(), rect.height())
}

fn commit_layer_order(list: &Element) {
    let names: Vec<String> = dom::query_all(list, ".layer-item")
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.get_attribute("data-layer"))
        .collect();
    dispatch(|app| app.reorder_layers(names.as_slice()));
}

fn wire_layer_list() -> Result<(), DomError> {
    let list = dom::element(LAYER_LIST_ID)?;
    let dragged: Rc<RefCell<Option<Element>>> = Rc::default();

    for item in dom::query_all(&list, ".layer-item")? {
        let (this, source) = (item.clone(), dragged.clone());
        dom::on(&item, "dragstart", move |event: DragEvent| {
            let _ = this.class_list().add_1("dragging");
            if let Some(transfer) = event.data_transfer() {
                transfer.set_effect_allowed("move");
            }
            *source.borrow_mut() = Some(this.clone());
        })?;

        let (this, root, source) = (item.clone(), list.clone(), dragged.clone());
        dom::on(&item, "dragend", move |_: DragEvent| {
            let _ = this.class_list().remove_1("dragging");
            source.borrow_mut().take();
            clear_drop_markers(&root);
            commit_layer_order(&root);
        })?;

        let (this, source) = (item.clone(), dragged.clone());
        dom::on(&item, "dragover", move |event: DragEvent| {
            event.prevent_default();
            if source.borrow().as_ref() == Some(&this) {
                return;
            }
            let placement = drop_placement(&this, &event);
            let classes = this.class_list();
            let _ = classes.remove_2(
                DropPlacement::Before.marker_class(),
                DropPlacement::After.marker_class(),
            );
            let _ = classes.add_1(placement.marker_class());
        })?;

        let this = item.clone();
        dom::on(&item, "dragleave", move |_: DragEvent| {
            let _ = this.class_list().remove_2(
                DropPlacement::Before.marker_class(),
                DropPlacement::After.marker_class(),
            );
        })?;

        let (this, root, source) = (item.clone(), list.clone(), dragged.clone());
        dom::on(&item, "drop", move |event: DragEvent| {
            event.prevent_default();
            let Some(moving) = source.borrow().clone() else {
                return;
            };
            if moving == this {
                return;
            }
            let reference = match drop_placement(&this, &event) {
                DropPlacement::Before => Some(Node::clone(&this)),
                DropPlacement::After => this.next_sibling(),
            };
            if let Err(err) = root.insert_before(&moving, reference.as_ref()) {
                warn!(error = ?err, "layer drop failed");
            }
            let _ = this.class_list().remove_2(
                DropPlacement::Before.marker_class(),
                DropPlacement::After.marker_class(),
            );
        })?;
    }
    Ok(())
}

fn wire_sidebars() -> Result<(), DomError> {
    wire_each("sidebar toggle", [Sidebar::Left, Sidebar::Right], |side| {
        dom::on_id(side.toggle_id(), "click", move |_| {
            dispatch(|app| app.toggle_sidebar(side));
        })
    });
    Ok(())
}

fn wire_modals() -> Result<(), DomError> {
    wire_each("modal open button", ModalId::ALL, |id| match id.open_button_id() {
        Some(open) => dom::on_id(open, "click", move |_| dispatch(|app| app.open_modal(id))),
        None => Ok(()),
    });
    wire_each("modal close button", ModalId::ALL, |id| {
        dom::on_id(id.close_button_id(), "click", move |_| {
            dispatch(|app| app.close_modal(id))
        })
    });
    // Clicks on the backdrop itself, not its content.
    wire_each("modal backdrop", ModalId::ALL, |id| {
        dom::on_id(id.element_id(), "click", move |event| {
            if dom::event_element(&event).is_some_and(|el| el.id() == id.element_id()) {
                dispatch(|app| app.close_modal(id));
            }
        })
    });
    dom::on(&dom::document()?.into(), "keydown", |event: KeyboardEvent| {
        if event.key() == "Escape" {
            dispatch(|app| app.close_all_modals());
        }
    })
}

fn wire_export() -> Result<(), DomError> {
    for button in dom::query_document(".export-btn")? {
        let this = button.clone();
        dom::on(&button, "click", move |_: Event| {
            let kind = this.get_attribute("data-type").unwrap_or_default();
            let format = this.get_attribute("data-format").unwrap_or_default();
            dispatch(|app| app.export(&kind, &format));
        })?;
    }
    Ok(())
}

fn closest(target: &Element, selector: &str) -> Option<Element> {
    target.closest(selector).ok().flatten()
}

/// Buttons generated inside popups, result cards and the info panel.
///
/// Registered in the capture phase: map popups stop click propagation.
fn wire_delegated_clicks() -> Result<(), DomError> {
    let handler = Closure::<dyn FnMut(Event)>::new(|event: Event| {
        let Some(target) = dom::event_element(&event) else {
            return;
        };
        if let Some(button) = closest(&target, "[data-model-path]") {
            let name = button.get_attribute("data-model-name").unwrap_or_default();
            let path = button.get_attribute("data-model-path").unwrap_or_default();
            dispatch(|app| app.open_model_viewer(&name, &path));
        } else if let Some(link) = closest(&target, ".jump-link[data-postcode]") {
            let postcode = link.get_attribute("data-postcode").unwrap_or_default();
            dispatch(|app| app.zoom_to_postcode(&postcode));
        } else if let Some(item) = closest(&target, ".building-item[data-damage-id]") {
            let id = item
                .get_attribute("data-damage-id")
                .and_then(|raw| raw.trim().parse::<i64>().ok());
            if let Some(id) = id {
                dispatch(|app| app.zoom_to_building(id));
            }
        }
    });
    dom::document()?.add_event_listener_with_callback_and_bool(
        "click",
        handler.as_ref().unchecked_ref(),
        true,
    )?;
    handler.forget();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_control_does_not_stop_the_rest() {
        let mut wired = Vec::new();
        let failed = wire_each("modal open button", ["exportBtn", "helpBtn", "close3D"], |id| {
            if id == "helpBtn" {
                return Err(DomError::MissingElement(id.to_string()));
            }
            wired.push(id);
            Ok(())
        });
        assert_eq!(failed, 1);
        assert_eq!(wired, vec!["exportBtn", "close3D"]);
    }
}
