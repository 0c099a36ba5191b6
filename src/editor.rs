//! # Editor State
//!
//! The document as the host editor holds it: pages, the selected element, the
//! current page and the zoom factor. Every operation produces the next state
//! from the previous one through the layout engine; the host serializes
//! calls, so there is no locking here.
//!
//! Invariants kept by every operation: at least one page exists, and page
//! numbers run densely from 1.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::layout::update::UpdatePlan;
use crate::layout::LayoutEngine;
use crate::model::{Element, ElementPatch, ElementRef, ElementStyle, Page};
use crate::signature::ProcessedSignature;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub pages: Vec<Page>,
    #[serde(default)]
    pub selected: Option<ElementRef>,
    /// Index into `pages`.
    #[serde(default)]
    pub current_page: usize,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            pages: vec![Page::new("page-1", 1)],
            selected: None,
            current_page: 0,
            zoom: default_zoom(),
        }
    }
}

impl EditorState {
    /// One empty page at 100% zoom.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing pages, restoring the invariants.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        let mut state = Self {
            pages,
            ..Self::default()
        };
        state.normalize();
        state
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn element(&self, page_id: &str, element_id: &str) -> Option<&Element> {
        self.page(page_id)?.find(element_id)
    }

    /// Apply a partial update to one element (see [`crate::layout::update`]).
    /// Returns the plan that ran, or `None` when the target was missing.
    pub fn update_element(
        &mut self,
        engine: &LayoutEngine,
        page_id: &str,
        element_id: &str,
        patch: &ElementPatch,
    ) -> Option<UpdatePlan> {
        let pages = std::mem::take(&mut self.pages);
        let outcome = crate::layout::update::update_element(pages, page_id, element_id, patch, engine.config());
        self.pages = outcome.pages;
        self.normalize();
        outcome.plan
    }

    /// Append a page carrying the first page's backgrounds.
    pub fn add_page(&mut self) -> &Page {
        let number = self.pages.len() as u32 + 1;
        let id = self.unused_page_id(number);
        let backgrounds = self
            .pages
            .first()
            .map(|first| first.backgrounds().map(|b| b.page_copy(number)).collect())
            .unwrap_or_default();
        self.pages.push(Page::with_elements(&id, number, backgrounds));
        self.current_page = self.pages.len() - 1;
        debug!("editor: added page {}", id);
        &self.pages[self.current_page]
    }

    /// Remove a page. The last remaining page is never removed.
    pub fn remove_page(&mut self, page_id: &str) -> bool {
        if self.pages.len() <= 1 {
            return false;
        }
        let Some(index) = self.pages.iter().position(|p| p.id == page_id) else {
            return false;
        };
        self.pages.remove(index);
        if self.selected.as_ref().is_some_and(|s| s.page_id == page_id) {
            self.selected = None;
        }
        self.normalize();
        true
    }

    /// Add an element on top of a page's z-order and select it.
    pub fn add_element(&mut self, page_id: &str, element: Element) -> bool {
        let Some(page) = self.pages.iter_mut().find(|p| p.id == page_id) else {
            return false;
        };
        self.selected = Some(ElementRef {
            page_id: page_id.to_string(),
            element_id: element.id.clone(),
        });
        page.elements.push(element);
        true
    }

    /// Delete an element and reflow. A missing target is a no-op.
    pub fn delete_element(&mut self, engine: &LayoutEngine, page_id: &str, element_id: &str) -> bool {
        let Some(page) = self.pages.iter_mut().find(|p| p.id == page_id) else {
            return false;
        };
        let before = page.elements.len();
        page.elements.retain(|e| e.id != element_id);
        if page.elements.len() == before {
            return false;
        }
        let deleted = ElementRef {
            page_id: page_id.to_string(),
            element_id: element_id.to_string(),
        };
        if self.selected.as_ref() == Some(&deleted) {
            self.selected = None;
        }
        self.pages = engine.reflow(&self.pages);
        self.normalize();
        true
    }

    /// Select an element. Selecting something that doesn't exist clears the
    /// selection.
    pub fn select(&mut self, page_id: &str, element_id: &str) {
        self.selected = self.element(page_id, element_id).map(|_| ElementRef {
            page_id: page_id.to_string(),
            element_id: element_id.to_string(),
        });
        if let Some(index) = self.pages.iter().position(|p| p.id == page_id) {
            self.current_page = index;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            default_zoom()
        };
    }

    /// Replace the document with a paginated template.
    pub fn apply_template(&mut self, engine: &LayoutEngine, elements: &[Element]) {
        self.pages = engine.paginate(elements);
        self.selected = None;
        self.current_page = 0;
        self.normalize();
    }

    /// Cover a region with an opaque white rectangle (erasing imported page
    /// content underneath). Returns the new element's id.
    pub fn add_erase_patch(&mut self, page_id: &str, x: f64, y: f64, width: f64, height: f64) -> Option<String> {
        let page = self.pages.iter().find(|p| p.id == page_id)?;
        let id = unused_element_id(page, "erase");
        let mut patch = Element::shape(&id, x, y, width, height);
        patch.style = ElementStyle {
            background_color: Some("#ffffff".to_string()),
            opacity: Some(1.0),
            ..Default::default()
        };
        self.add_element(page_id, patch);
        Some(id)
    }

    /// Place a processed signature as an image element at `(x, y)`.
    /// Fallback results (undecodable input) are not placed.
    pub fn place_signature(&mut self, page_id: &str, signature: &ProcessedSignature, x: f64, y: f64) -> Option<String> {
        if signature.is_fallback() {
            return None;
        }
        let page = self.pages.iter().find(|p| p.id == page_id)?;
        let id = unused_element_id(page, "signature");
        let element = Element::image(&id, x, y, signature.width as f64, signature.height as f64, &signature.src);
        self.add_element(page_id, element);
        Some(id)
    }

    fn unused_page_id(&self, number: u32) -> String {
        let mut id = format!("page-{}", number);
        let mut attempt = 1;
        while self.pages.iter().any(|p| p.id == id) {
            attempt += 1;
            id = format!("page-{}-{}", number, attempt);
        }
        id
    }

    /// At least one page, dense numbering, in-range current page, and a
    /// selection that still points at something.
    fn normalize(&mut self) {
        if self.pages.is_empty() {
            self.pages.push(Page::new("page-1", 1));
        }
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.number = i as u32 + 1;
        }
        self.current_page = self.current_page.min(self.pages.len() - 1);
        if let Some(sel) = self.selected.clone() {
            if self.element(&sel.page_id, &sel.element_id).is_none() {
                self.selected = self.relocate(&sel.element_id);
            }
        }
    }

    /// Content ids survive reflow, but the element may have changed page.
    fn relocate(&self, element_id: &str) -> Option<ElementRef> {
        self.pages.iter().find_map(|p| {
            p.find(element_id).map(|_| ElementRef {
                page_id: p.id.clone(),
                element_id: element_id.to_string(),
            })
        })
    }
}

fn unused_element_id(page: &Page, prefix: &str) -> String {
    let mut n = page.elements.len() + 1;
    loop {
        let id = format!("{}-{}", prefix, n);
        if page.find(&id).is_none() {
            return id;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;

    fn text(id: &str, y: f64, height: f64) -> Element {
        Element::text(id, 40.0, y, 500.0, height, id)
    }

    #[test]
    fn new_state_has_one_page() {
        let state = EditorState::new();
        assert_eq!(state.pages.len(), 1);
        assert_eq!(state.pages[0].number, 1);
        assert_eq!(state.zoom, 1.0);
    }

    #[test]
    fn empty_document_is_restored_to_one_page() {
        let state = EditorState::from_pages(vec![]);
        assert_eq!(state.pages.len(), 1);
    }

    #[test]
    fn last_page_cannot_be_removed() {
        let mut state = EditorState::new();
        assert!(!state.remove_page("page-1"));
        state.add_page();
        assert!(state.remove_page("page-1"));
        assert_eq!(state.pages.len(), 1);
        assert_eq!(state.pages[0].id, "page-2");
        assert_eq!(state.pages[0].number, 1);
    }

    #[test]
    fn added_pages_copy_backgrounds() {
        let mut state = EditorState::from_pages(vec![Page::with_elements(
            "p1",
            1,
            vec![Element::shape("sidebar", 0.0, 0.0, 180.0, 842.0).into_background()],
        )]);
        let page = state.add_page();
        assert_eq!(page.number, 2);
        assert_eq!(page.elements[0].id, "sidebar-pg2");
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn selection_follows_element_across_reflow() {
        let engine = LayoutEngine::new();
        let mut state =
            EditorState::from_pages(vec![Page::with_elements("p1", 1, vec![text("a", 100.0, 40.0), text("b", 700.0, 60.0)])]);
        state.select("p1", "b");
        let plan = state.update_element(&engine, "p1", "a", &ElementPatch::height(120.0));
        assert!(plan.is_some_and(|p| p.reflow));
        assert_eq!(state.pages.len(), 2);
        let selected = state.selected.clone().unwrap();
        assert_eq!(selected.element_id, "b");
        assert_eq!(selected.page_id, state.pages[1].id);
    }

    #[test]
    fn deleting_selected_element_clears_selection() {
        let engine = LayoutEngine::new();
        let mut state = EditorState::from_pages(vec![Page::with_elements("p1", 1, vec![text("a", 100.0, 40.0)])]);
        state.select("p1", "a");
        assert!(state.delete_element(&engine, "p1", "a"));
        assert!(state.selected.is_none());
        assert!(!state.delete_element(&engine, "p1", "a"));
    }

    #[test]
    fn selecting_missing_element_clears_selection() {
        let mut state = EditorState::from_pages(vec![Page::with_elements("p1", 1, vec![text("a", 100.0, 40.0)])]);
        state.select("p1", "a");
        state.select("p1", "ghost");
        assert!(state.selected.is_none());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut state = EditorState::new();
        state.set_zoom(12.0);
        assert_eq!(state.zoom, 5.0);
        state.set_zoom(0.0);
        assert_eq!(state.zoom, 0.1);
        state.set_zoom(f64::NAN);
        assert_eq!(state.zoom, 1.0);
    }

    #[test]
    fn erase_patch_is_opaque_white_shape() {
        let mut state = EditorState::new();
        let id = state.add_erase_patch("page-1", 10.0, 20.0, 100.0, 30.0).unwrap();
        let el = state.element("page-1", &id).unwrap();
        assert!(el.is_shape());
        assert_eq!(el.style.background_color.as_deref(), Some("#ffffff"));
        assert_eq!(state.selected.as_ref().map(|s| s.element_id.as_str()), Some(id.as_str()));
        let second = state.add_erase_patch("page-1", 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_ne!(id, second);
    }

    #[test]
    fn fallback_signature_is_not_placed() {
        let mut state = EditorState::new();
        let failed = crate::signature::process_signature(b"nope nope");
        assert!(state.place_signature("page-1", &failed, 0.0, 0.0).is_none());
        assert!(state.pages[0].elements.is_empty());
    }

    #[test]
    fn processed_signature_becomes_image_element() {
        let mut state = EditorState::new();
        let signature = ProcessedSignature {
            data: vec![],
            src: "data:image/png;base64,AA==".to_string(),
            width: 120,
            height: 48,
        };
        let id = state.place_signature("page-1", &signature, 300.0, 700.0).unwrap();
        let el = state.element("page-1", &id).unwrap();
        assert_eq!((el.width, el.height), (120.0, 48.0));
        assert!(matches!(&el.kind, ElementKind::Image { src } if src == &signature.src));
    }

    #[test]
    fn template_replaces_pages() {
        let engine = LayoutEngine::new();
        let mut state = EditorState::new();
        state.apply_template(&engine, &[text("a", 100.0, 600.0), text("b", 750.0, 100.0)]);
        assert_eq!(state.pages.len(), 2);
        assert_eq!(state.pages[1].number, 2);
    }
}
