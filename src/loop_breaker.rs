//! Resolving self-intersecting contours into simple loops.
//!
//! A contour that crosses or touches itself is cut at every point where it
//! does so, and the resulting arcs are stitched back together (see
//! [`crate::graph`]) into loops that don't. The signed areas of the loops
//! add up to the signed area of the original contour, and the winding number
//! of any point with respect to the original contour is the sum of its winding
//! numbers with respect to the loops.

use kurbo::{ParamCurve, PathSeg, Point};

use crate::{
    contour::Contour,
    graph::{cut_into_arcs, sort_cuts, ArcGraph, NodeClusters, Position},
    intersect::{intersect, overlap_params, SegmentIntersection},
    num::{almost_zero, snap_param, EPSILON},
    segment::{cubic_self_intersection, nearest},
    space::RectIndex,
};

/// Splits a contour into simple closed loops.
///
/// Loops enclosing no area (within tolerance) are dropped, so a contour that
/// doubles back on itself can produce no loops at all.
pub fn break_loops(contour: &Contour) -> Vec<Contour> {
    break_at(contour, &[])
}

/// Splits a contour into simple closed loops, additionally treating every
/// point in `cuts` that the contour passes through more than once as a place
/// where it touches itself.
pub fn break_at(contour: &Contour, cuts: &[Point]) -> Vec<Contour> {
    let segs = contour.path_segs();
    let mut clusters = NodeClusters::default();
    for (p, pos) in self_contacts(segs) {
        clusters.insert(p, pos);
    }
    for &p in cuts {
        for (i, seg) in segs.iter().enumerate() {
            let (dist, t) = nearest(seg, p);
            if dist <= EPSILON {
                let t = snap_param(t).unwrap_or(t);
                clusters.insert(p, Position::new(i, t, segs.len()));
            }
        }
    }

    let mut graph = ArcGraph::new();
    let mut positions = Vec::new();
    for (_, p, seen) in clusters.iter() {
        if seen.len() >= 2 {
            let node = graph.add_node(p);
            positions.extend(seen.iter().map(|&pos| (pos, node)));
        }
    }

    if positions.is_empty() {
        return if almost_zero(contour.signed_area()) {
            Vec::new()
        } else {
            vec![contour.clone()]
        };
    }

    sort_cuts(&mut positions);
    for edge in cut_into_arcs(segs, &positions) {
        graph.add_edge(edge);
    }

    let loops: Vec<Contour> = graph
        .trace_loops()
        .into_iter()
        .filter_map(|segs| Contour::from_path_segs(segs, true))
        .filter(|c| !almost_zero(c.signed_area()))
        .collect();
    log::debug!(
        "broke a contour of {} segments at {} positions into {} loops",
        segs.len(),
        positions.len(),
        loops.len()
    );
    loops
}

// Every place where the contour meets itself, other than the shared
// endpoints of consecutive segments.
fn self_contacts(segs: &[PathSeg]) -> Vec<(Point, Position)> {
    let n = segs.len();
    let boxes: Vec<_> = segs
        .iter()
        .map(kurbo::ParamCurveExtrema::bounding_box)
        .collect();
    let index = RectIndex::new(&boxes);
    let mut ret = Vec::new();
    let mut push = |i: usize, s: f64, j: usize, t: f64| {
        let p = segs[i].eval(s);
        ret.push((p, Position::new(i, s, n)));
        ret.push((p, Position::new(j, t, n)));
    };

    for (i, seg) in segs.iter().enumerate() {
        if let PathSeg::Cubic(c) = seg {
            if let Some((s, t)) = cubic_self_intersection(c) {
                push(i, s, i, t);
            }
        }

        for j in index.query(boxes[i]).into_iter().filter(|&j| j > i) {
            let next = j == i + 1;
            let wraps = i == 0 && j == n - 1;
            let is_shared_vertex =
                |s: f64, t: f64| (next && s == 1.0 && t == 0.0) || (wraps && s == 0.0 && t == 1.0);

            match intersect(seg, &segs[j]) {
                SegmentIntersection::NoIntersection => {}
                SegmentIntersection::FiniteSet(params) => {
                    for (s, t) in params {
                        if !is_shared_vertex(s, t) {
                            push(i, s, j, t);
                        }
                    }
                }
                SegmentIntersection::Overlapping => {
                    for (s, t) in overlap_params(seg, &segs[j]) {
                        if !is_shared_vertex(s, t) {
                            push(i, s, j, t);
                        }
                    }
                }
            }
        }
    }
    ret
}
