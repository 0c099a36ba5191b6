//! # Incremental Updates
//!
//! The host calls this on every drag frame, resize step and keystroke, so a
//! full reflow per call is both too slow and too jumpy. Each edit is run
//! through a small decision table instead:
//!
//! ```text
//! Idle → Editing → [height changed?] → LocalPush → [layout field touched?] → GlobalReflow → Idle
//! ```
//!
//! A height change pushes the siblings below the element by the same amount
//! right away. A full reflow runs only when the patch touches `height`, `y`
//! or content; cosmetic edits (colour, font, opacity, rotation) never move
//! page boundaries.

use log::debug;

use super::{reflow, LayoutConfig};
use crate::model::{Element, ElementPatch, Page};

/// The phases one edit passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    Editing,
    LocalPush,
    GlobalReflow,
}

/// What an edit will do to the layout, decided before anything moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdatePlan {
    /// Amount to push siblings below the element by, if the height changed.
    pub push_by: Option<f64>,
    /// Whether the edit warrants a full reflow.
    pub reflow: bool,
}

impl UpdatePlan {
    /// Classify `patch` against the element's current state.
    pub fn for_patch(current: &Element, patch: &ElementPatch, config: &LayoutConfig) -> Self {
        let push_by = patch.height.and_then(|h| {
            let mut resized = current.clone();
            resized.height = h;
            let diff = config.element_height(&resized) - config.element_height(current);
            (diff.abs() > config.height_epsilon).then_some(diff)
        });
        let reflow = patch.height.is_some() || patch.y.is_some() || patch.touches_content();
        Self { push_by, reflow }
    }

    /// The phase sequence this plan walks through.
    pub fn phases(&self) -> Vec<EditPhase> {
        let mut phases = vec![EditPhase::Idle, EditPhase::Editing];
        if self.push_by.is_some() {
            phases.push(EditPhase::LocalPush);
        }
        if self.reflow {
            phases.push(EditPhase::GlobalReflow);
        }
        phases.push(EditPhase::Idle);
        phases
    }
}

/// The result of one edit.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub pages: Vec<Page>,
    /// `None` when the target page or element does not exist.
    pub plan: Option<UpdatePlan>,
}

/// Apply `patch` to element `element_id` on page `page_id`.
///
/// A missing page or element is not an error: the UI may race an edit against
/// a deletion, so the pages come back unchanged.
pub fn update_element(
    mut pages: Vec<Page>,
    page_id: &str,
    element_id: &str,
    patch: &ElementPatch,
    config: &LayoutConfig,
) -> UpdateOutcome {
    let Some(page_index) = pages.iter().position(|p| p.id == page_id) else {
        debug!("update: page {} not found, ignoring", page_id);
        return UpdateOutcome { pages, plan: None };
    };
    let Some(index) = pages[page_index].elements.iter().position(|e| e.id == element_id) else {
        debug!("update: element {} not found on {}, ignoring", element_id, page_id);
        return UpdateOutcome { pages, plan: None };
    };

    let page = &mut pages[page_index];
    let before = page.elements[index].clone();
    let plan = UpdatePlan::for_patch(&before, patch, config);
    patch.apply_to(&mut page.elements[index]);

    if let Some(diff) = plan.push_by {
        push_siblings(page, index, &before, diff, config);
    }

    debug!("update: {} on {} -> {:?}", element_id, page_id, plan.phases());

    let pages = if plan.reflow {
        reflow::reflow(&pages, config)
    } else {
        pages
    };
    UpdateOutcome {
        pages,
        plan: Some(plan),
    }
}

/// Move every content sibling that starts at or below the element's old
/// bottom edge (within the tolerance band) by `diff`.
fn push_siblings(page: &mut Page, index: usize, before: &Element, diff: f64, config: &LayoutConfig) {
    let threshold = before.y + config.element_height(before) - config.push_tolerance;
    for (i, sibling) in page.elements.iter_mut().enumerate() {
        if i != index && !sibling.is_background && sibling.y >= threshold {
            sibling.y += diff;
        }
    }
}
