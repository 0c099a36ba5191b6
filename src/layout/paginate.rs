//! # Template Pagination
//!
//! Templates are authored as one tall canvas. Pagination splits that canvas
//! into real pages on first load: backgrounds repeat on every page, content
//! elements are read top to bottom, and an element that would cross the
//! bottom margin starts a new page at the content margin.
//!
//! Unlike reflow, pagination looks ahead. A section header that still fits
//! is moved to the next page anyway when the lines right after it would not,
//! so a header is never stranded alone at the bottom of a page.

use log::{debug, trace};

use super::{finite_or_zero, LayoutConfig};
use crate::model::{Element, Page};

/// What to do with the next content element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Place it on the current page.
    Place,
    /// It crosses the bottom margin: start a new page with it.
    MoveToNextPage,
    /// It fits, but it is a header whose following content does not: start a
    /// new page so they stay together.
    KeepWithNext,
}

/// Split a template's flat element list into pages.
pub fn paginate(elements: &[Element], config: &LayoutConfig) -> Vec<Page> {
    let backgrounds: Vec<&Element> = elements.iter().filter(|e| e.is_background).collect();
    let mut content: Vec<&Element> = elements.iter().filter(|e| !e.is_background).collect();
    content.sort_by(|a, b| finite_or_zero(a.y).total_cmp(&finite_or_zero(b.y)));

    let margin_top = config.content_margin_top(backgrounds.iter().copied());
    let page_bottom = config.paginate_content_bottom();

    let mut pages: Vec<Page> = Vec::new();
    let mut current: Vec<Element> = Vec::new();
    let mut y_offset = 0.0;

    for (index, element) in content.iter().enumerate() {
        let authored_y = finite_or_zero(element.y);
        let element_y = authored_y + y_offset;
        let mut decision = decide_break(element, element_y, &content[index + 1..], y_offset, page_bottom, config);
        if current.is_empty() && margin_top + config.element_height(element) > page_bottom {
            // Too tall for any page: a break would only add a blank page.
            decision = BreakDecision::Place;
        }

        if decision != BreakDecision::Place {
            trace!("paginate: {:?} at {} (y={})", decision, element.id, element_y);
            pages.push(finish_page(pages.len() as u32 + 1, &backgrounds, std::mem::take(&mut current)));
            y_offset = margin_top - authored_y;
        }

        let mut placed = (*element).clone();
        placed.y = authored_y + y_offset;
        current.push(placed);
    }
    pages.push(finish_page(pages.len() as u32 + 1, &backgrounds, current));

    debug!(
        "paginate: {} content elements into {} pages (margin {}..{})",
        content.len(),
        pages.len(),
        margin_top,
        page_bottom
    );
    pages
}

/// Decide whether `element`, flowing at `element_y`, stays on the current page.
///
/// `following` is the rest of the content in reading order. Shapes never
/// trigger a break: they are decoration and may straddle a page boundary.
pub fn decide_break(
    element: &Element,
    element_y: f64,
    following: &[&Element],
    y_offset: f64,
    page_bottom: f64,
    config: &LayoutConfig,
) -> BreakDecision {
    if element.is_shape() {
        return BreakDecision::Place;
    }

    let height = config.element_height(element);
    if element_y + height > page_bottom {
        return BreakDecision::MoveToNextPage;
    }

    if element.is_section_header() && strands_header(element_y + height, following, y_offset, page_bottom, config) {
        return BreakDecision::KeepWithNext;
    }

    BreakDecision::Place
}

/// Would any of the next few elements overflow, either stacked directly under
/// the header or at their own authored position?
fn strands_header(
    header_bottom: f64,
    following: &[&Element],
    y_offset: f64,
    page_bottom: f64,
    config: &LayoutConfig,
) -> bool {
    let mut flow_y = header_bottom;
    for next in following.iter().take(config.orphan_lookahead) {
        let height = config.element_height(next);
        if next.is_shape() {
            continue;
        }
        let stacked_overflow = flow_y + height > page_bottom;
        let authored_overflow = finite_or_zero(next.y) + y_offset + height > page_bottom;
        if stacked_overflow || authored_overflow {
            return true;
        }
        flow_y += height;
    }
    false
}

/// Assemble a page: backgrounds first, then content, all keyed for this page.
fn finish_page(number: u32, backgrounds: &[&Element], content: Vec<Element>) -> Page {
    let elements = backgrounds
        .iter()
        .map(|b| b.page_copy(number))
        .chain(content.iter().map(|e| e.page_copy(number)))
        .collect();
    Page::with_elements(&format!("page-{}", number), number, elements)
}
