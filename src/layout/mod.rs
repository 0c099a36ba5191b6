//! # Page-Aware Layout
//!
//! Decides where content physically lands across a multi-page document.
//!
//! The host editor keeps elements in page-local coordinates. Layout works the
//! other way round: it lines every page up end to end, reads content in
//! virtual document order (`y + page_index * page_height`), and lets content
//! flow *into* pages again, pushing anything that would cross a margin onto
//! the next page.
//!
//! Three entry points:
//!
//! - [`reflow`] re-derives page boundaries from scratch for an edited document.
//! - [`paginate`] splits a hand-authored template (one tall canvas) into pages,
//!   keeping section headers with the content that follows them.
//! - [`update`] applies a single element edit, pushes siblings locally, and
//!   calls reflow only when the edit can move page boundaries.
//!
//! All three are pure functions from old state to new state. None of them
//! fail: missing targets are no-ops and degenerate geometry is defaulted.

pub mod paginate;
pub mod reflow;
pub mod update;

use serde::{Deserialize, Serialize};

use crate::model::{Element, ElementPatch, Page};

/// Height of one page in points (A4 at 72 DPI).
pub const PAGE_HEIGHT: f64 = 842.0;
/// Default top margin for content on continuation pages.
pub const MARGIN_TOP: f64 = 50.0;
/// Bottom margin used by reflow.
pub const REFLOW_MARGIN_BOTTOM: f64 = 40.0;
/// Bottom margin used by template pagination. Deliberately distinct from
/// [`REFLOW_MARGIN_BOTTOM`]; both are persisted product constants.
pub const PAGINATE_MARGIN_BOTTOM: f64 = 20.0;
/// Background elements starting above this line count as repeating headers.
pub const HEADER_THRESHOLD: f64 = 250.0;

/// Layout constants. Every field is optional in JSON and defaults to the
/// product value, so a host can override one without restating the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub page_height: f64,
    pub margin_top: f64,
    pub reflow_margin_bottom: f64,
    pub paginate_margin_bottom: f64,
    /// Background elements with `y` below this are repeating headers.
    pub header_threshold: f64,
    /// Minimum extra top margin added when a repeating header exists.
    pub header_clearance: f64,
    /// Gap kept between the tallest header's bottom and reflowed content.
    pub header_gap: f64,
    /// Height used for elements with a missing, zero or negative height.
    pub default_element_height: f64,
    /// How many following elements a section header peeks at.
    pub orphan_lookahead: usize,
    /// Siblings starting this far above a resized element's bottom edge are
    /// still pushed with it.
    pub push_tolerance: f64,
    /// Height changes at or below this are ignored for local push.
    pub height_epsilon: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_height: PAGE_HEIGHT,
            margin_top: MARGIN_TOP,
            reflow_margin_bottom: REFLOW_MARGIN_BOTTOM,
            paginate_margin_bottom: PAGINATE_MARGIN_BOTTOM,
            header_threshold: HEADER_THRESHOLD,
            header_clearance: 120.0,
            header_gap: 20.0,
            default_element_height: 20.0,
            orphan_lookahead: 3,
            push_tolerance: 5.0,
            height_epsilon: 0.1,
        }
    }
}

impl LayoutConfig {
    /// The height layout uses for `element`.
    pub fn element_height(&self, element: &Element) -> f64 {
        if element.height.is_finite() && element.height > 0.0 {
            element.height
        } else {
            self.default_element_height
        }
    }

    /// Is `element` a background that repeats as a page header?
    pub fn is_header_background(&self, element: &Element) -> bool {
        element.is_background && element.y < self.header_threshold
    }

    /// Top margin for content on continuation pages. Grows to clear the
    /// tallest repeating header so reflowed content never sits under it.
    ///
    /// A header reaching the bottom of the page (a full-height sidebar starts
    /// at the top too) would leave no room at all, so the margin is capped to
    /// keep one default-height line above the reflow bottom margin.
    pub fn content_margin_top<'a>(&self, backgrounds: impl IntoIterator<Item = &'a Element>) -> f64 {
        let tallest_header_bottom = backgrounds
            .into_iter()
            .filter(|e| self.is_header_background(e))
            .map(|e| finite_or_zero(e.y) + self.element_height(e))
            .fold(None, |acc: Option<f64>, bottom| {
                Some(acc.map_or(bottom, |a| a.max(bottom)))
            });

        match tallest_header_bottom {
            Some(bottom) => (self.margin_top + self.header_clearance)
                .max(bottom + self.header_gap)
                .min(self.reflow_content_bottom() - self.default_element_height)
                .max(self.margin_top),
            None => self.margin_top,
        }
    }

    /// Lowest point content may reach during reflow.
    pub fn reflow_content_bottom(&self) -> f64 {
        self.page_height - self.reflow_margin_bottom
    }

    /// Lowest point content may reach during template pagination.
    pub fn paginate_content_bottom(&self) -> f64 {
        self.page_height - self.paginate_margin_bottom
    }

    /// Position in the virtual document formed by stacking pages end to end.
    pub fn virtual_offset(&self, page_index: usize, y: f64) -> f64 {
        page_index as f64 * self.page_height + finite_or_zero(y)
    }

    /// Split a virtual offset back into (page index, page-local y).
    /// Offsets above the first page stay on it.
    pub fn locate(&self, virtual_y: f64) -> (usize, f64) {
        if virtual_y.is_nan() || virtual_y <= 0.0 || self.page_height.is_nan() || self.page_height <= 0.0 {
            return (0, finite_or_zero(virtual_y));
        }
        let index = (virtual_y / self.page_height).floor();
        (index as usize, virtual_y - index * self.page_height)
    }
}

pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A layout engine bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Recompute page boundaries for the whole document.
    pub fn reflow(&self, pages: &[Page]) -> Vec<Page> {
        reflow::reflow(pages, &self.config)
    }

    /// Split a template's flat element list into pages.
    pub fn paginate(&self, elements: &[Element]) -> Vec<Page> {
        paginate::paginate(elements, &self.config)
    }

    /// Apply one element edit and reflow if the edit warrants it.
    pub fn update_element(
        &self,
        pages: Vec<Page>,
        page_id: &str,
        element_id: &str,
        patch: &ElementPatch,
    ) -> Vec<Page> {
        update::update_element(pages, page_id, element_id, patch, &self.config).pages
    }
}
