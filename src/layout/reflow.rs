//! # Reflow
//!
//! Global recomputation of page boundaries.
//!
//! Every non-background element is lifted into one virtual coordinate space,
//! read in vertical order, and placed again with a running shift: an element
//! that lands above the top margin of a continuation page is pushed down to
//! it, and an element that would cross the bottom margin moves to the top of
//! the next page. The shift carries forward, so gaps between later elements
//! are preserved.
//!
//! The output is a complete replacement page list. Pages that existed in the
//! input keep their id, metadata and background elements; pages created for
//! overflow receive suffixed copies of the first page's backgrounds. Trailing
//! input pages that end up empty are kept, not dropped.

use std::collections::HashSet;

use log::{debug, trace};

use super::LayoutConfig;
use crate::model::{Element, Page};

/// Tolerance for comparisons against margins, so a second pass over already
/// reflowed output never nudges anything.
const EPSILON: f64 = 1e-6;

/// An element lifted out of its page, with its reading-order key.
struct FlowItem {
    virtual_y: f64,
    /// (source page index, index within page). Restores z-order at the end.
    rank: (usize, usize),
    element: Element,
}

/// Reflow `pages` with `config`. Zero pages in, zero pages out.
pub fn reflow(pages: &[Page], config: &LayoutConfig) -> Vec<Page> {
    if pages.is_empty() {
        return Vec::new();
    }

    let margin_top = config.content_margin_top(pages[0].backgrounds());
    let content_bottom = config.reflow_content_bottom();
    let usable_height = content_bottom - margin_top;

    let mut flow: Vec<FlowItem> = pages
        .iter()
        .enumerate()
        .flat_map(|(page_index, page)| {
            page.elements
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.is_background)
                .map(move |(index, e)| FlowItem {
                    virtual_y: config.virtual_offset(page_index, e.y),
                    rank: (page_index, index),
                    element: e.clone(),
                })
        })
        .collect();
    // Stable: ties keep page order, then array order.
    flow.sort_by(|a, b| a.virtual_y.total_cmp(&b.virtual_y));

    debug!(
        "reflow: {} elements over {} pages, content margin {}..{}",
        flow.len(),
        pages.len(),
        margin_top,
        content_bottom
    );

    let mut builder = PageSetBuilder::new(pages);
    let mut shift = 0.0;

    for item in flow {
        let height = config.element_height(&item.element);
        let (mut page_index, mut y) = config.locate(item.virtual_y + shift);

        if page_index > 0 && y < margin_top - EPSILON {
            shift += margin_top - y;
            y = margin_top;
        }

        // An element taller than a whole page's content area would overflow
        // anywhere; leave it where it is instead of chasing it forward.
        if y + height > content_bottom + EPSILON && height <= usable_height + EPSILON {
            let target = config.virtual_offset(page_index + 1, margin_top);
            shift += target - config.virtual_offset(page_index, y);
            page_index += 1;
            y = margin_top;
        }

        trace!(
            "reflow: {} -> page {} at y={}",
            item.element.id,
            page_index + 1,
            y
        );

        let mut element = item.element;
        element.y = y;
        builder.place(page_index, item.rank, element);
    }

    builder.finish()
}

/// Lazily materialized output pages.
struct PageSetBuilder<'a> {
    source: &'a [Page],
    pages: Vec<(Page, Vec<((usize, usize), Element)>)>,
    used_ids: HashSet<String>,
}

impl<'a> PageSetBuilder<'a> {
    fn new(source: &'a [Page]) -> Self {
        Self {
            source,
            pages: Vec::new(),
            used_ids: source.iter().map(|p| p.id.clone()).collect(),
        }
    }

    fn place(&mut self, page_index: usize, rank: (usize, usize), element: Element) {
        self.ensure(page_index);
        self.pages[page_index].1.push((rank, element));
    }

    fn ensure(&mut self, page_index: usize) {
        while self.pages.len() <= page_index {
            let page = self.blank_page(self.pages.len());
            self.pages.push((page, Vec::new()));
        }
    }

    /// A page carrying only backgrounds. Input pages keep their identity;
    /// overflow pages copy the first page's backgrounds under fresh keys.
    fn blank_page(&mut self, index: usize) -> Page {
        let number = index as u32 + 1;
        if let Some(original) = self.source.get(index) {
            return Page {
                number,
                elements: original.backgrounds().cloned().collect(),
                ..original.clone()
            };
        }

        let id = self.fresh_page_id(number);
        debug!("reflow: materialized overflow page {} ({})", number, id);
        Page {
            elements: self.source[0]
                .backgrounds()
                .map(|b| b.page_copy(number))
                .collect(),
            ..Page::new(&id, number)
        }
    }

    fn fresh_page_id(&mut self, number: u32) -> String {
        let mut id = format!("page-{}", number);
        let mut attempt = 1;
        while self.used_ids.contains(&id) {
            attempt += 1;
            id = format!("page-{}-{}", number, attempt);
        }
        self.used_ids.insert(id.clone());
        id
    }

    fn finish(mut self) -> Vec<Page> {
        self.ensure(self.source.len().max(1) - 1);
        self.pages
            .into_iter()
            .map(|(mut page, mut content)| {
                content.sort_by_key(|(rank, _)| *rank);
                page.elements.extend(content.into_iter().map(|(_, e)| e));
                page
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn text(id: &str, y: f64, height: f64) -> Element {
        Element::text(id, 40.0, y, 500.0, height, id)
    }

    fn page(id: &str, number: u32, elements: Vec<Element>) -> Page {
        Page::with_elements(id, number, elements)
    }

    fn find<'a>(pages: &'a [Page], id: &str) -> (usize, &'a Element) {
        pages
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.find(id).map(|e| (i, e)))
            .unwrap_or_else(|| panic!("element {} not found", id))
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(reflow(&[], &config()).is_empty());
    }

    #[test]
    fn empty_page_is_kept() {
        let out = reflow(&[page("p1", 1, vec![])], &config());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "p1");
        assert!(out[0].elements.is_empty());
    }

    #[test]
    fn element_fitting_above_bottom_margin_stays() {
        let pages = [page("p1", 1, vec![text("a", 700.0, 100.0), text("b", 50.0, 30.0)])];
        let out = reflow(&pages, &config());
        assert_eq!(out.len(), 1);
        assert_eq!(find(&out, "a"), (0, &text("a", 700.0, 100.0)));
        assert_eq!(find(&out, "b").1.y, 50.0);
    }

    #[test]
    fn overflowing_element_moves_to_next_page_margin() {
        let pages = [page(
            "p1",
            1,
            vec![text("a", 700.0, 100.0), text("b", 50.0, 30.0), text("c", 780.0, 100.0)],
        )];
        let out = reflow(&pages, &config());
        assert_eq!(out.len(), 2);
        let (page_index, c) = find(&out, "c");
        assert_eq!(page_index, 1);
        assert_eq!(c.y, 50.0);
        assert_eq!(out[1].number, 2);
    }

    #[test]
    fn shift_carries_to_later_elements() {
        // c moves from 780 to page 2 at 50: a shift of 112. d sat 30 below c's
        // top and must keep that gap.
        let pages = [page("p1", 1, vec![text("c", 780.0, 100.0), text("d", 810.0, 10.0)])];
        let out = reflow(&pages, &config());
        let (_, d) = find(&out, "d");
        assert_eq!(find(&out, "d").0, 1);
        assert!((d.y - 80.0).abs() < 1e-9);
    }

    #[test]
    fn continuation_content_pushed_below_header_margin() {
        let header = Element::shape("banner", 0.0, 0.0, 595.0, 200.0).into_background();
        let pages = [
            page("p1", 1, vec![header.clone(), text("a", 300.0, 40.0)]),
            page("p2", 2, vec![header.page_copy(2), text("b", 60.0, 40.0)]),
        ];
        let out = reflow(&pages, &config());
        let (page_index, b) = find(&out, "b");
        assert_eq!(page_index, 1);
        assert_eq!(b.y, 220.0);
        // Backgrounds of existing pages are kept as they were.
        assert_eq!(out[1].elements[0].id, "banner-pg2");
    }

    #[test]
    fn first_page_content_is_not_pushed_to_margin() {
        let header = Element::shape("banner", 0.0, 0.0, 595.0, 200.0).into_background();
        let pages = [page("p1", 1, vec![header, text("a", 10.0, 40.0)])];
        let out = reflow(&pages, &config());
        assert_eq!(find(&out, "a").1.y, 10.0);
    }

    #[test]
    fn overflow_pages_receive_background_copies() {
        let sidebar = Element::shape("sidebar", 0.0, 300.0, 180.0, 542.0).into_background();
        let pages = [page("p1", 1, vec![sidebar, text("a", 790.0, 50.0)])];
        let out = reflow(&pages, &config());
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].id, "page-2");
        let copy = &out[1].elements[0];
        assert_eq!(copy.id, "sidebar-pg2");
        assert_eq!(copy.origin.as_deref(), Some("sidebar"));
        assert!(copy.is_background);
    }

    #[test]
    fn fresh_page_ids_avoid_collisions() {
        let pages = [page("page-2", 1, vec![text("a", 790.0, 50.0)])];
        let out = reflow(&pages, &config());
        assert_eq!(out.len(), 2);
        assert_ne!(out[1].id, out[0].id);
    }

    #[test]
    fn trailing_pages_are_preserved_with_their_ids() {
        let pages = [
            page("p1", 1, vec![text("a", 100.0, 40.0)]),
            page("blank-a", 2, vec![]),
            page("blank-b", 3, vec![Element::shape("bg", 0.0, 0.0, 10.0, 10.0).into_background()]),
        ];
        let out = reflow(&pages, &config());
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].id, "blank-a");
        assert_eq!(out[2].id, "blank-b");
        assert_eq!(out[2].elements.len(), 1);
        assert_eq!(out.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn page_metadata_survives_reflow() {
        let mut first = page("p1", 1, vec![text("a", 100.0, 40.0)]);
        first.background_image = Some("data:image/png;base64,AA==".to_string());
        first.drawing_layer = Some("data:image/png;base64,BB==".to_string());
        let out = reflow(&[first.clone()], &config());
        assert_eq!(out[0].background_image, first.background_image);
        assert_eq!(out[0].drawing_layer, first.drawing_layer);
    }

    #[test]
    fn reading_order_follows_virtual_offset_across_pages() {
        let pages = [
            page("p1", 1, vec![text("late", 760.0, 60.0)]),
            page("p2", 2, vec![text("next", 20.0, 30.0)]),
        ];
        let out = reflow(&pages, &config());
        let (late_page, late) = find(&out, "late");
        let (next_page, next) = find(&out, "next");
        assert_eq!(late_page, 1);
        assert_eq!(late.y, 50.0);
        assert!(next_page > late_page || (next_page == late_page && next.y >= late.y));
    }

    #[test]
    fn z_order_preserved_among_co_resident_elements() {
        // "photo" is drawn first (below) but sits lower on the page.
        let pages = [page("p1", 1, vec![text("photo", 200.0, 100.0), text("caption", 100.0, 20.0)])];
        let out = reflow(&pages, &config());
        let ids: Vec<&str> = out[0].elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["photo", "caption"]);
    }

    #[test]
    fn oversized_element_is_tolerated_not_chased() {
        let pages = [page("p1", 1, vec![text("huge", 100.0, 2000.0), text("after", 2200.0, 20.0)])];
        let out = reflow(&pages, &config());
        assert_eq!(find(&out, "huge"), (0, &text("huge", 100.0, 2000.0)));
        let twice = reflow(&out, &config());
        assert_eq!(twice, out);
    }

    #[test]
    fn degenerate_geometry_does_not_panic() {
        let mut nan = text("nan", f64::NAN, f64::NAN);
        nan.width = f64::NAN;
        let pages = [page(
            "p1",
            1,
            vec![text("neg", -40.0, -10.0), text("zero", 800.0, 0.0), nan],
        )];
        let out = reflow(&pages, &config());
        assert!(!out.is_empty());
        // Zero height defaults to 20: 800 + 20 crosses 802.
        assert_eq!(find(&out, "zero").0, 1);
    }

    #[test]
    fn reflow_is_idempotent() {
        let header = Element::shape("banner", 0.0, 0.0, 595.0, 120.0).into_background();
        let mut elements = vec![header];
        for i in 0..40 {
            elements.push(text(&format!("row{}", i), 150.0 + i as f64 * 37.5, 30.0 + (i % 4) as f64 * 9.0));
        }
        let once = reflow(&[page("p1", 1, elements)], &config());
        let twice = reflow(&once, &config());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.elements.len(), b.elements.len());
            for (ea, eb) in a.elements.iter().zip(&b.elements) {
                assert_eq!(ea.id, eb.id);
                assert_eq!((ea.x, ea.y, ea.width, ea.height), (eb.x, eb.y, eb.width, eb.height));
            }
        }
    }

    #[test]
    fn reflowed_content_respects_margins() {
        let header = Element::shape("banner", 0.0, 0.0, 595.0, 90.0).into_background();
        let mut elements = vec![header];
        for i in 0..30 {
            elements.push(text(&format!("e{}", i), 100.0 + i as f64 * 61.0, 55.0));
        }
        let cfg = config();
        let out = reflow(&[page("p1", 1, elements)], &cfg);
        let margin_top = cfg.content_margin_top(out[0].backgrounds());
        assert_eq!(margin_top, 170.0);
        for (i, p) in out.iter().enumerate() {
            for e in p.content() {
                if i > 0 {
                    assert!(e.y >= margin_top, "{} above margin on page {}", e.id, i + 1);
                }
                assert!(e.y + e.height <= cfg.reflow_content_bottom(), "{} crosses bottom", e.id);
            }
        }
    }
}
