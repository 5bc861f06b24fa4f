//! Count-up statistic widgets (`[data-target]`), started once they scroll
//! into view.

use std::cell::RefCell;
use std::rc::Rc;

use foundation::TimestampMs;
use runtime::{Counter, CounterSpec};
use session::CounterConfig;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use crate::dom::{self, DomError};

const COUNTED_CLASS: &str = "counted";

struct Widget {
    element: Element,
    counter: Counter,
}

fn now() -> TimestampMs {
    TimestampMs(
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0),
    )
}

fn read_widgets(config: &CounterConfig) -> Result<Vec<Widget>, DomError> {
    Ok(dom::query_document("[data-target]")?
        .into_iter()
        .filter_map(|element| {
            let target = element.get_attribute("data-target")?;
            let spec = CounterSpec::from_attributes(
                &target,
                element.get_attribute("data-prefix"),
                element.get_attribute("data-suffix"),
            )?;
            let counter = Counter::new(spec, config.duration_ms, config.visibility_threshold);
            Some(Widget { element, counter })
        })
        .collect())
}

/// Drives one widget with `requestAnimationFrame` until it settles.
fn animate(widgets: Rc<RefCell<Vec<Widget>>>, index: usize) {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = frame.clone();

    *frame.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
        let done = {
            let mut widgets = widgets.borrow_mut();
            let Some(widget) = widgets.get_mut(index) else {
                return;
            };
            match widget.counter.tick(TimestampMs(timestamp)) {
                Some(step) => {
                    widget.element.set_text_content(Some(&step.text));
                    step.done
                }
                None => true,
            }
        };
        if done {
            next.borrow_mut().take();
        } else if let Some(callback) = next.borrow().as_ref() {
            request_frame(callback);
        }
    }));

    if let Some(callback) = frame.borrow().as_ref() {
        request_frame(callback);
    }
}

fn request_frame(callback: &Closure<dyn FnMut(f64)>) {
    if let Some(window) = web_sys::window() {
        let _ = window.request_animation_frame(callback.as_ref().unchecked_ref());
    }
}

pub fn install(config: &CounterConfig) -> Result<(), DomError> {
    let widgets = read_widgets(config)?;
    if widgets.is_empty() {
        return Ok(());
    }
    debug!(count = widgets.len(), "counter widgets found");
    let widgets = Rc::new(RefCell::new(widgets));

    let observed = widgets.clone();
    let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
        move |entries: js_sys::Array, observer: IntersectionObserver| {
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };
                let target = entry.target();
                let started = {
                    let mut widgets = observed.borrow_mut();
                    let found = widgets.iter().position(|w| w.element == target);
                    found.filter(|&i| {
                        widgets[i].counter.observe(
                            entry.is_intersecting(),
                            entry.intersection_ratio(),
                            now(),
                        )
                    })
                };
                if let Some(index) = started {
                    let _ = target.class_list().add_1(COUNTED_CLASS);
                    observer.unobserve(&target);
                    animate(observed.clone(), index);
                }
            }
        },
    );

    let init = IntersectionObserverInit::new();
    init.set_threshold(&JsValue::from_f64(config.visibility_threshold));
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
    for widget in widgets.borrow().iter() {
        observer.observe(&widget.element);
    }
    callback.forget();
    Ok(())
}
