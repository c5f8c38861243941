//! DOM element bindings.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Window};

pub const ROOT_ID: &str = "app-container";

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}

fn doc() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("window has no document"))
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().ok()?.get_element_by_id(id)
}

/// Nearest ancestor (or self) of the event target matching `selector`.
pub fn closest_from_event(event: &web_sys::Event, selector: &str) -> Option<Element> {
    let target = event.target()?;
    let element: Element = target.dyn_into().ok()?;
    element.closest(selector).ok()?
}

/// Element references used by the checker. Cheap to clone.
#[derive(Clone)]
pub struct Elements {
    pub root: Element,
}

impl Elements {
    /// Resolve all DOM references. Call once after DOMContentLoaded.
    pub fn bind() -> Result<Elements, JsValue> {
        Ok(Elements {
            root: by_id(ROOT_ID)
                .ok_or_else(|| JsValue::from_str(&format!("missing element #{ROOT_ID}")))?,
        })
    }
}
