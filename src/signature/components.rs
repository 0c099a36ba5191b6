//! Noise rejection through connected components.
//!
//! The ink mask is dilated first so the fragments of one pen stroke (and the
//! letters of one signature) join into a single component. Components are
//! then labelled with union-find and measured by how much real ink they hold;
//! anything below the noise floor is dropped.

use super::filters::Mask;

/// Disjoint-set forest with path compression and union by rank.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    /// Root of the set containing `x`.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression, iterative so long strokes can't blow the stack.
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Binary dilation with a `size × size` square structuring element.
pub fn dilate(mask: &Mask, size: usize) -> Mask {
    let radius = size / 2;
    let (w, h) = (mask.width, mask.height);
    if w == 0 || h == 0 {
        return mask.clone();
    }

    // Separable: a square is a horizontal pass followed by a vertical one.
    let mut horizontal = Mask::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(w - 1);
            if (x0..=x1).any(|sx| mask.get(sx, y)) {
                horizontal.set(x, y, true);
            }
        }
    }

    let mut out = Mask::new(w, h);
    for y in 0..h {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(h - 1);
        for x in 0..w {
            if (y0..=y1).any(|sy| horizontal.get(x, sy)) {
                out.set(x, y, true);
            }
        }
    }
    out
}

/// The outcome of component filtering.
#[derive(Debug, Clone)]
pub struct ComponentFilter {
    /// Dilated pixels that belong to a kept component.
    pub kept: Mask,
    /// Number of components found.
    pub components: usize,
    /// Number of components that survived.
    pub kept_components: usize,
    /// Ink area of the largest component.
    pub largest_area: usize,
    /// Minimum ink area a component needed to survive.
    pub noise_floor: f64,
}

/// Label 8-connected components of `region` and keep those whose ink area
/// (pixels set in `ink`) reaches `max(min_area, ratio * largest)`.
pub fn filter_components(ink: &Mask, region: &Mask, min_area: usize, ratio: f64) -> ComponentFilter {
    let (w, h) = (region.width, region.height);
    let mut sets = UnionFind::new(w * h);

    for y in 0..h {
        for x in 0..w {
            if !region.get(x, y) {
                continue;
            }
            let i = y * w + x;
            // Already-visited neighbours: west, north-west, north, north-east.
            if x > 0 && region.get(x - 1, y) {
                sets.union(i, i - 1);
            }
            if y > 0 {
                if x > 0 && region.get(x - 1, y - 1) {
                    sets.union(i, i - w - 1);
                }
                if region.get(x, y - 1) {
                    sets.union(i, i - w);
                }
                if x + 1 < w && region.get(x + 1, y - 1) {
                    sets.union(i, i - w + 1);
                }
            }
        }
    }

    let mut labels = vec![usize::MAX; w * h];
    let mut areas: Vec<usize> = Vec::new();
    let mut root_to_label = std::collections::HashMap::new();
    for i in 0..w * h {
        if !region.bits[i] {
            continue;
        }
        let root = sets.find(i);
        let label = *root_to_label.entry(root).or_insert_with(|| {
            areas.push(0);
            areas.len() - 1
        });
        labels[i] = label;
        if ink.bits[i] {
            areas[label] += 1;
        }
    }

    let largest_area = areas.iter().copied().max().unwrap_or(0);
    let noise_floor = (min_area as f64).max(ratio * largest_area as f64);
    let keep: Vec<bool> = areas.iter().map(|&a| a as f64 >= noise_floor).collect();

    let mut kept = Mask::new(w, h);
    for (bit, &label) in kept.bits.iter_mut().zip(&labels) {
        *bit = label != usize::MAX && keep[label];
    }

    ComponentFilter {
        kept,
        components: areas.len(),
        kept_components: keep.iter().filter(|&&k| k).count(),
        largest_area,
        noise_floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: usize, height: usize, points: impl IntoIterator<Item = (usize, usize)>) -> Mask {
        let mut mask = Mask::new(width, height);
        for (x, y) in points {
            mask.set(x, y, true);
        }
        mask
    }

    #[test]
    fn union_find_groups() {
        let mut uf = UnionFind::new(5);
        assert_ne!(uf.find(0), uf.find(1));
        uf.union(0, 1);
        uf.union(2, 3);
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(0), uf.find(2));
        uf.union(1, 2);
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(4), uf.find(0));
    }

    #[test]
    fn dilation_grows_single_pixel_to_square() {
        let mask = mask_with(11, 11, [(5, 5)]);
        let dilated = dilate(&mask, 5);
        assert_eq!(dilated.count(), 25);
        assert!(dilated.get(3, 3) && dilated.get(7, 7));
        assert!(!dilated.get(2, 5));
    }

    #[test]
    fn dilation_bridges_small_gaps() {
        // Two stroke fragments three pixels apart become one component.
        let ink = mask_with(20, 5, (2..8).map(|x| (x, 2)).chain((11..17).map(|x| (x, 2))));
        let filtered = filter_components(&ink, &dilate(&ink, 5), 1, 0.0);
        assert_eq!(filtered.components, 1);
        let apart = filter_components(&ink, &ink, 1, 0.0);
        assert_eq!(apart.components, 2);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let ink = mask_with(4, 4, [(0, 0), (1, 1), (2, 2), (3, 1)]);
        let filtered = filter_components(&ink, &ink, 1, 0.0);
        assert_eq!(filtered.components, 1);
    }

    #[test]
    fn specks_below_noise_floor_are_dropped() {
        // One 40×50 block (area 2000) and five isolated 2-pixel specks.
        let block = (20..60).flat_map(|x| (20..70).map(move |y| (x, y)));
        let specks = [(120, 20), (150, 60), (120, 110), (170, 150), (30, 160)]
            .into_iter()
            .flat_map(|(x, y)| [(x, y), (x + 1, y)]);
        let ink = mask_with(200, 200, block.chain(specks));
        let filtered = filter_components(&ink, &dilate(&ink, 5), 50, 0.05);

        assert_eq!(filtered.components, 6);
        assert_eq!(filtered.largest_area, 2000);
        assert_eq!(filtered.noise_floor, 100.0);
        assert_eq!(filtered.kept_components, 1);
        assert!(filtered.kept.get(40, 40));
        for (x, y) in [(120, 20), (150, 60), (120, 110), (170, 150), (30, 160)] {
            assert!(!filtered.kept.get(x, y), "speck at {},{} survived", x, y);
        }
    }

    #[test]
    fn fractional_floor_is_not_rounded_down() {
        // Largest is 41×49 = 2009, so the floor is 100.45: a 100-pixel block
        // is noise, a 101-pixel one is not.
        let block = (10..51).flat_map(|x| (10..59).map(move |y| (x, y)));
        let hundred = (100..110).flat_map(|x| (10..20).map(move |y| (x, y)));
        let hundred_one = (100..110)
            .flat_map(|x| (60..70).map(move |y| (x, y)))
            .chain([(110, 60)]);
        let ink = mask_with(140, 90, block.chain(hundred).chain(hundred_one));
        let filtered = filter_components(&ink, &dilate(&ink, 5), 50, 0.05);

        assert_eq!(filtered.components, 3);
        assert_eq!(filtered.largest_area, 2009);
        assert!((filtered.noise_floor - 100.45).abs() < 1e-9);
        assert_eq!(filtered.kept_components, 2);
        assert!(!filtered.kept.get(105, 15));
        assert!(filtered.kept.get(105, 65));
    }

    #[test]
    fn absolute_floor_applies_to_small_signatures() {
        // Largest component is 40 pixels: 5% would be 2, but the floor is 50.
        let ink = mask_with(60, 10, (5..45).map(|x| (x, 5)));
        let filtered = filter_components(&ink, &dilate(&ink, 5), 50, 0.05);
        assert_eq!(filtered.noise_floor, 50.0);
        assert_eq!(filtered.kept_components, 0);
        assert_eq!(filtered.kept.count(), 0);
    }

    #[test]
    fn empty_mask_keeps_nothing() {
        let ink = Mask::new(8, 8);
        let filtered = filter_components(&ink, &dilate(&ink, 5), 50, 0.05);
        assert_eq!(filtered.components, 0);
        assert_eq!(filtered.largest_area, 0);
        assert_eq!(filtered.noise_floor, 50.0);
    }
}
