use wasm_bindgen::prelude::*;

use crate::layout::LayoutEngine;
use crate::model::{Element, ElementPatch, Page};
use crate::signature::SignatureProcessor;

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn reflow(pages: JsValue) -> Result<JsValue, JsValue> {
    let pages: Vec<Page> = from_js(pages, "pages")?;
    to_js(&LayoutEngine::new().reflow(&pages))
}

#[wasm_bindgen]
pub fn paginate(elements: JsValue) -> Result<JsValue, JsValue> {
    let elements: Vec<Element> = from_js(elements, "elements")?;
    to_js(&LayoutEngine::new().paginate(&elements))
}

#[wasm_bindgen(js_name = updateElement)]
pub fn update_element(pages: JsValue, page_id: &str, element_id: &str, updates: JsValue) -> Result<JsValue, JsValue> {
    let pages: Vec<Page> = from_js(pages, "pages")?;
    let patch: ElementPatch = from_js(updates, "updates")?;
    to_js(&LayoutEngine::new().update_element(pages, page_id, element_id, &patch))
}

/// Takes a data URI and resolves to `{ src, width, height }`. Never throws:
/// an unusable source comes back as itself with zero dimensions.
#[wasm_bindgen(js_name = processSignature)]
pub fn process_signature(src: &str) -> Result<JsValue, JsValue> {
    to_js(&SignatureProcessor::new().process_source(src))
}

/// Same as `processSignature` for raw encoded bytes.
#[wasm_bindgen(js_name = processSignatureBytes)]
pub fn process_signature_bytes(data: &[u8]) -> Result<JsValue, JsValue> {
    let processed = SignatureProcessor::new().process_bytes(data);
    let result = js_sys::Object::new();
    js_sys::Reflect::set(&result, &"data".into(), &js_sys::Uint8Array::from(processed.data.as_slice()))?;
    js_sys::Reflect::set(&result, &"width".into(), &processed.width.into())?;
    js_sys::Reflect::set(&result, &"height".into(), &processed.height.into())?;
    Ok(result.into())
}
