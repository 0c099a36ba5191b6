//! # Folio
//!
//! A page-aware layout engine for WYSIWYG document editors.
//!
//! An editor lets people drag, resize and type into elements that sit on
//! fixed-height pages. Every one of those edits can change where content
//! belongs: a paragraph that grows pushes the next section onto another page,
//! a template authored as one tall canvas has to be split into real pages, and
//! repeating headers must never end up on top of content. Folio owns those
//! decisions, and the pixel work needed to turn a photographed signature into
//! a clean transparent image element.
//!
//! ## Architecture
//!
//! ```text
//! host edit ──→ [layout::update] ──→ [layout::reflow] ──→ new pages
//! template  ──→ [layout::paginate] ───────────────────→ initial pages
//! capture   ──→ [signature] ──→ image element ──→ [editor]
//! ```
//!
//! - [`model`]: pages and positioned elements, as JSON the host exchanges.
//! - [`layout`]: reflow, template pagination and incremental updates.
//! - [`signature`]: grayscale, blur, adaptive threshold, component filter,
//!   soft alpha and crop.
//! - [`editor`]: the document state the host mutates through the engine.
//!
//! Layout is pure and synchronous; nothing here does I/O. Logging goes
//! through the `log` facade and is silent until the host installs a logger.

pub mod editor;
pub mod error;
pub mod layout;
pub mod model;
pub mod signature;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::FolioError;
pub use layout::{LayoutConfig, LayoutEngine};
pub use signature::{process_signature, ProcessedSignature, SignatureConfig, SignatureProcessor};

use model::{Element, ElementPatch, Page};

/// Recompute page boundaries with the default configuration.
pub fn reflow(pages: &[Page]) -> Vec<Page> {
    LayoutEngine::new().reflow(pages)
}

/// Split a template's flat element list into pages with the default
/// configuration.
pub fn paginate(elements: &[Element]) -> Vec<Page> {
    LayoutEngine::new().paginate(elements)
}

/// Apply one element edit with the default configuration.
pub fn update_element(pages: Vec<Page>, page_id: &str, element_id: &str, patch: &ElementPatch) -> Vec<Page> {
    LayoutEngine::new().update_element(pages, page_id, element_id, patch)
}

/// Reflow pages given as JSON, returning JSON.
pub fn reflow_json(pages: &str) -> Result<String, FolioError> {
    let pages: Vec<Page> = serde_json::from_str(pages)?;
    Ok(serde_json::to_string(&reflow(&pages))?)
}

/// Paginate a template element list given as JSON, returning JSON pages.
pub fn paginate_json(elements: &str) -> Result<String, FolioError> {
    let elements: Vec<Element> = serde_json::from_str(elements)?;
    Ok(serde_json::to_string(&paginate(&elements))?)
}

/// Apply a JSON patch to one element of JSON pages, returning JSON pages.
pub fn update_element_json(pages: &str, page_id: &str, element_id: &str, patch: &str) -> Result<String, FolioError> {
    let pages: Vec<Page> = serde_json::from_str(pages)?;
    let patch: ElementPatch = serde_json::from_str(patch)?;
    Ok(serde_json::to_string(&update_element(pages, page_id, element_id, &patch))?)
}
