use wasm_bindgen::JsCast;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, Window};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("window missing")]
    NoWindow,
    #[error("document missing")]
    NoDocument,
    #[error("element #{0} missing")]
    MissingElement(String),
    #[error("element #{id} is not a {expected}")]
    WrongType { id: String, expected: &'static str },
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        DomError::Js(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

impl From<DomError> for JsValue {
    fn from(err: DomError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub fn window() -> Result<Window, DomError> {
    web_sys::window().ok_or(DomError::NoWindow)
}

pub fn document() -> Result<Document, DomError> {
    window()?.document().ok_or(DomError::NoDocument)
}

pub fn element(id: &str) -> Result<Element, DomError> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| DomError::MissingElement(id.to_string()))
}

/// Element `id` cast to `T`.
pub fn typed<T: JsCast>(id: &str, expected: &'static str) -> Result<T, DomError> {
    element(id)?.dyn_into::<T>().map_err(|_| DomError::WrongType {
        id: id.to_string(),
        expected,
    })
}

pub fn input(id: &str) -> Result<HtmlInputElement, DomError> {
    typed(id, "input")
}

/// Current value of an input or select, `None` when blank.
pub fn field_value(id: &str) -> Option<String> {
    let el = element(id).ok()?;
    let value = if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else if let Some(select) = el.dyn_ref::<web_sys::HtmlSelectElement>() {
        select.value()
    } else {
        return None;
    };
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

pub fn set_text(id: &str, text: &str) -> Result<(), DomError> {
    element(id)?.set_text_content(Some(text));
    Ok(())
}

pub fn set_html(id: &str, html: &str) -> Result<(), DomError> {
    element(id)?.set_inner_html(html);
    Ok(())
}

pub fn set_display(id: &str, display: &str) -> Result<(), DomError> {
    typed::<HtmlElement>(id, "html element")?
        .style()
        .set_property("display", display)?;
    Ok(())
}

pub fn set_class(id: &str, class: &str, on: bool) -> Result<(), DomError> {
    element(id)?.class_list().toggle_with_force(class, on)?;
    Ok(())
}

/// Every element matching `selector`, in document order.
pub fn query_all(root: &Element, selector: &str) -> Result<Vec<Element>, DomError> {
    let list = root.query_selector_all(selector)?;
    Ok((0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

pub fn query_document(selector: &str) -> Result<Vec<Element>, DomError> {
    let root = document()?
        .document_element()
        .ok_or(DomError::NoDocument)?;
    query_all(&root, selector)
}

/// Attaches `handler` for the page's lifetime.
pub fn on<E, F>(target: &EventTarget, event: &str, handler: F) -> Result<(), DomError>
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

pub fn on_id<F>(id: &str, event: &str, handler: F) -> Result<(), DomError>
where
    F: FnMut(Event) + 'static,
{
    on(&element(id)?.into(), event, handler)
}

/// The element under the event, if it is one.
pub fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}
