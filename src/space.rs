//! Broad-phase overlap queries for axis-aligned rectangles.
//!
//! [`RectIndex`] answers "which of these rectangles might overlap that one?".
//! Rectangles are stored by their x-extent in a segment tree; a query walks
//! the tree nodes whose x-ranges meet the query's x-range and then filters
//! the candidates by y.

use kurbo::Rect;

use crate::num::EPSILON;

/// Do two rectangles overlap (including touching)?
#[inline]
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

// Could probably halve the size of this by
// compressing the payload indices to u32.
#[derive(Clone, Debug, Default)]
struct SegmentTreeNode {
    // The splitting coordinate, or `None` for a leaf.
    x: Option<f64>,
    payload_idx: usize,
    payload_len: usize,
}

/// A segment tree over x-intervals, each carrying a payload.
///
/// Every interval is stored in the `O(log n)` canonical nodes whose ranges
/// exactly cover it.
#[derive(Clone, Debug)]
pub struct SegmentTree<T> {
    tree: Vec<SegmentTreeNode>,
    payloads: Vec<T>,
    min: f64,
    max: f64,
}

fn fill_heap(heap: &mut [SegmentTreeNode], heap_idx: usize, values: &[f64]) {
    if values.is_empty() {
        return;
    }

    let idx = values.len() / 2;
    heap[heap_idx].x = Some(values[idx]);

    fill_heap(heap, heap_idx * 2 + 1, &values[..idx]);
    fill_heap(heap, heap_idx * 2 + 2, &values[(idx + 1)..]);
}

/// Finds the canonical nodes covering `interval`, whose endpoints must be
/// among the tree's break points.
fn find_nodes(
    tree: &[SegmentTreeNode],
    interval: (f64, f64),
    tree_bounds: (f64, f64),
    out: &mut Vec<usize>,
) {
    fn find_nodes_inner(
        tree: &[SegmentTreeNode],
        idx: usize,
        interval: (f64, f64),
        bounds: (f64, f64),
        out: &mut Vec<usize>,
    ) {
        if interval.0 <= bounds.0 && bounds.1 <= interval.1 {
            out.push(idx);
            return;
        }

        let Some(x) = tree.get(idx).and_then(|node| node.x) else {
            return;
        };
        if x > interval.0 {
            find_nodes_inner(tree, 2 * idx + 1, interval, (bounds.0, x), out);
        }
        if x < interval.1 {
            find_nodes_inner(tree, 2 * idx + 2, interval, (x, bounds.1), out);
        }
    }

    find_nodes_inner(tree, 0, interval, tree_bounds, out)
}

impl<T: Clone> SegmentTree<T> {
    /// Builds a tree from `(start, end, payload)` triples, with `start < end`.
    ///
    /// Empty intervals cover no elementary interval, and are never found.
    pub fn new(intervals: &[(f64, f64, T)]) -> Self {
        let mut points: Vec<f64> = Vec::with_capacity(intervals.len() * 2 + 1);
        points.extend(intervals.iter().map(|(start, _, _)| start));
        points.extend(intervals.iter().map(|(_, end, _)| end));
        points.sort_by(|x, y| x.total_cmp(y));
        points.dedup();

        if points.len() < 2 {
            return Self {
                tree: Vec::new(),
                payloads: Vec::new(),
                min: 0.0,
                max: 0.0,
            };
        }
        let min = points[0];
        let max = points[points.len() - 1];

        let mut tree = vec![SegmentTreeNode::default(); (2 * points.len() - 3).next_power_of_two()];
        fill_heap(&mut tree, 0, &points[1..points.len() - 1]);

        let mut buf = Vec::new();
        for (x0, x1, _) in intervals {
            buf.clear();
            find_nodes(&tree, (*x0, *x1), (min, max), &mut buf);
            for &idx in &buf {
                tree[idx].payload_len += 1;
            }
        }

        let mut sum = 0;
        for node in &mut tree {
            sum += node.payload_len;
            node.payload_idx = sum;
        }

        // Each node's payload_idx currently points one past the end of its
        // range; the second pass walks it back to the start while filling.
        let mut payloads = vec![intervals[0].2.clone(); sum];
        for (x0, x1, payload) in intervals {
            buf.clear();
            find_nodes(&tree, (*x0, *x1), (min, max), &mut buf);
            for &idx in &buf {
                let node = &mut tree[idx];
                node.payload_idx -= 1;
                payloads[node.payload_idx] = payload.clone();
            }
        }

        Self {
            tree,
            payloads,
            min,
            max,
        }
    }

    /// Calls `f` on the payload of every interval that meets `[x0, x1]`.
    ///
    /// A payload may be visited more than once.
    pub fn for_each_overlapping(&self, x0: f64, x1: f64, mut f: impl FnMut(&T)) {
        if self.tree.is_empty() || x1 < self.min || x0 > self.max {
            return;
        }
        self.visit(0, (self.min, self.max), (x0, x1), &mut f);
    }

    fn visit(&self, idx: usize, bounds: (f64, f64), query: (f64, f64), f: &mut impl FnMut(&T)) {
        let Some(node) = self.tree.get(idx) else {
            return;
        };
        if bounds.1 < query.0 || bounds.0 > query.1 {
            return;
        }
        for payload in &self.payloads[node.payload_idx..(node.payload_idx + node.payload_len)] {
            f(payload);
        }
        if let Some(x) = node.x {
            self.visit(2 * idx + 1, (bounds.0, x), query, f);
            self.visit(2 * idx + 2, (x, bounds.1), query, f);
        }
    }
}

/// An index over a fixed collection of rectangles.
#[derive(Clone, Debug)]
pub struct RectIndex {
    rects: Vec<Rect>,
    tree: SegmentTree<usize>,
}

impl RectIndex {
    /// Indexes `rects`; query results refer to positions in this slice.
    pub fn new(rects: &[Rect]) -> Self {
        let intervals: Vec<_> = rects
            .iter()
            .enumerate()
            .map(|(i, r)| {
                // Vertical segments have zero-width boxes.
                let pad = EPSILON.max(r.x0.abs().max(r.x1.abs()) * 1e-12);
                (r.x0 - pad, r.x1 + pad, i)
            })
            .collect();
        RectIndex {
            rects: rects.to_vec(),
            tree: SegmentTree::new(&intervals),
        }
    }

    /// The indices of every stored rectangle that comes within [`EPSILON`]
    /// of `query`, sorted and without duplicates.
    ///
    /// There are no false negatives; the result is exact up to the tolerance.
    pub fn query(&self, query: Rect) -> Vec<usize> {
        let query = query.inflate(EPSILON, EPSILON);
        let mut ret = Vec::new();
        self.tree.for_each_overlapping(query.x0, query.x1, |&i| {
            if rects_overlap(self.rects[i], query) {
                ret.push(i);
            }
        });
        ret.sort_unstable();
        ret.dedup();
        ret
    }

    /// The number of indexed rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Is the index empty?
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}
