//! The relationship between two shapes.
//!
//! An [`IntersectionTable`] finds every place where the boundaries of two
//! shapes meet, cuts both boundaries into arcs between those places, and
//! classifies every arc by where it lies relative to the other shape. From
//! that classification we can read off how the two shapes are related (see
//! [`Overlap`]), and for any boolean operation we can pick out the arcs that
//! bound the result and stitch them together.
//!
//! Usually each side is a single simple, positively oriented contour. A side
//! can also be a whole [`Solid`](crate::Solid): its outer contour followed by
//! its negatively oriented holes. Every contour keeps its interior on the
//! left, so the same rules work in both cases.

use kurbo::{ParamCurve, ParamCurveArclen, PathSeg, Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::{
    contour::Contour,
    graph::{cut_into_arcs, sort_cuts, ArcGraph, Edge, NodeClusters, NodeIdx, Place, Position},
    intersect::{intersect, overlap_params, SegmentIntersection},
    num::{almost_zero, EPSILON},
    segment::tangent,
    space::RectIndex,
    BinaryOp,
};

/// How two shapes are related.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Overlap {
    /// The interiors are disjoint. The boundaries may still touch.
    None,
    /// The boundaries trace out the same curves.
    Equal,
    /// The left shape encloses the right one.
    Superset,
    /// The right shape encloses the left one.
    Subset,
    /// Each shape has parts inside and parts outside of the other.
    Crossing,
}

/// Where an arc of one shape's boundary lies relative to the other shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArcClass {
    /// Strictly inside the other shape.
    Inside,
    /// Strictly outside the other shape.
    Outside,
    /// On the other boundary, with the interiors on the same side.
    SharedSame,
    /// On the other boundary, with the interiors on opposite sides.
    SharedOpposite,
}

impl ArcClass {
    /// Does this arc run along the other boundary?
    pub fn is_shared(self) -> bool {
        matches!(self, ArcClass::SharedSame | ArcClass::SharedOpposite)
    }
}

/// One of the two operands of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The first operand.
    Left,
    /// The second operand.
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SidePos {
    side: Side,
    contour: usize,
    pos: Position,
}

impl Place for SidePos {
    fn is_near(&self, other: &SidePos) -> bool {
        self.side == other.side && self.contour == other.contour && self.pos.is_near(&other.pos)
    }
}

/// An arc of one contour, between two nodes.
#[derive(Clone, Debug)]
pub struct ClassifiedArc {
    /// The arc, with its nodes.
    pub edge: Edge,
    /// Where it lies relative to the other shape.
    pub class: ArcClass,
}

// The arcs of one contour. A contour that doesn't meet the other shape at all
// isn't cut, and gets classified as a whole.
#[derive(Clone, Debug)]
enum Arcs {
    Whole(ArcClass),
    Cut(Vec<ClassifiedArc>),
}

impl Arcs {
    fn classes(&self) -> impl Iterator<Item = ArcClass> + '_ {
        let (whole, cut) = match self {
            Arcs::Whole(class) => (Some(*class), &[][..]),
            Arcs::Cut(arcs) => (None, &arcs[..]),
        };
        whole.into_iter().chain(cut.iter().map(|a| a.class))
    }
}

// The contours making up one operand, and what became of them.
#[derive(Clone, Debug)]
struct Operand<'a> {
    contours: Vec<&'a Contour>,
    arcs: Vec<Arcs>,
    looping: Vec<Point>,
}

impl Operand<'_> {
    fn classes(&self) -> Vec<ArcClass> {
        self.arcs.iter().flat_map(Arcs::classes).collect()
    }
}

/// Where two shapes meet, and what that means for combining them.
#[derive(Clone, Debug)]
pub struct IntersectionTable<'a> {
    left: Operand<'a>,
    right: Operand<'a>,
    nodes: ArcGraph,
    overlap: Overlap,
}

impl<'a> IntersectionTable<'a> {
    /// Intersects two positively oriented contours.
    pub fn new(left: &'a Contour, right: &'a Contour) -> Self {
        IntersectionTable::between(vec![left], vec![right])
    }

    /// Intersects two shapes, each given by its boundary contours.
    ///
    /// Each shape is the set of points with non-zero winding number, and
    /// must not overlap itself: an outer contour with holes inside it is
    /// fine, two overlapping positive contours are not.
    pub fn between(left: Vec<&'a Contour>, right: Vec<&'a Contour>) -> Self {
        let left_segs: Vec<&[PathSeg]> = left.iter().map(|c| c.path_segs()).collect();
        let right_segs: Vec<&[PathSeg]> = right.iter().map(|c| c.path_segs()).collect();

        let mut clusters = NodeClusters::<SidePos>::default();
        let mut shared_left: Vec<Vec<bool>> =
            left_segs.iter().map(|s| vec![false; s.len()]).collect();
        let mut shared_right: Vec<Vec<bool>> =
            right_segs.iter().map(|s| vec![false; s.len()]).collect();

        // Every right segment, as (contour, segment).
        let right_flat: Vec<(usize, usize)> = right_segs
            .iter()
            .enumerate()
            .flat_map(|(k, segs)| (0..segs.len()).map(move |j| (k, j)))
            .collect();
        let right_boxes: Vec<_> = right_flat
            .iter()
            .map(|&(k, j)| kurbo::ParamCurveExtrema::bounding_box(&right_segs[k][j]))
            .collect();
        let index = RectIndex::new(&right_boxes);

        for (ci, segs) in left_segs.iter().enumerate() {
            for (i, a) in segs.iter().enumerate() {
                let bbox = kurbo::ParamCurveExtrema::bounding_box(a);
                for idx in index.query(bbox) {
                    let (cj, j) = right_flat[idx];
                    let b = &right_segs[cj][j];
                    let params = match intersect(a, b) {
                        SegmentIntersection::NoIntersection => continue,
                        SegmentIntersection::FiniteSet(params) => params,
                        SegmentIntersection::Overlapping => {
                            shared_left[ci][i] = true;
                            shared_right[cj][j] = true;
                            overlap_params(a, b)
                        }
                    };
                    for (s, t) in params {
                        let p = a.eval(s);
                        clusters.insert(
                            p,
                            SidePos {
                                side: Side::Left,
                                contour: ci,
                                pos: Position::new(i, s, segs.len()),
                            },
                        );
                        clusters.insert(
                            p,
                            SidePos {
                                side: Side::Right,
                                contour: cj,
                                pos: Position::new(j, t, right_segs[cj].len()),
                            },
                        );
                    }
                }
            }
        }

        let mut nodes = ArcGraph::new();
        let mut left_cuts = vec![Vec::new(); left.len()];
        let mut right_cuts = vec![Vec::new(); right.len()];
        let mut left_looping = Vec::new();
        let mut right_looping = Vec::new();
        for (_, p, places) in clusters.iter() {
            let node = nodes.add_node(p);
            let mut seen: Vec<(Side, usize)> = Vec::new();
            let mut looping = [false; 2];
            for place in places {
                let key = (place.side, place.contour);
                let cuts = match place.side {
                    Side::Left => &mut left_cuts,
                    Side::Right => &mut right_cuts,
                };
                cuts[place.contour].push((place.pos, node));
                if seen.contains(&key) {
                    looping[(place.side == Side::Right) as usize] = true;
                } else {
                    seen.push(key);
                }
            }
            if looping[0] {
                left_looping.push(p);
            }
            if looping[1] {
                right_looping.push(p);
            }
        }

        let left_arcs = left_cuts
            .iter_mut()
            .zip(&left)
            .map(|(cuts, c)| classify(c, cuts, &right))
            .collect();
        let right_arcs = right_cuts
            .iter_mut()
            .zip(&right)
            .map(|(cuts, c)| classify(c, cuts, &left))
            .collect();

        let all_shared = |shared: &[Vec<bool>]| shared.iter().flatten().all(|&s| s);
        let every_seg_shared = all_shared(&shared_left) || all_shared(&shared_right);
        let left = Operand {
            contours: left,
            arcs: left_arcs,
            looping: left_looping,
        };
        let right = Operand {
            contours: right,
            arcs: right_arcs,
            looping: right_looping,
        };
        let overlap = relationship(&left.classes(), &right.classes(), every_seg_shared);
        log::debug!(
            "intersection table: {} + {} contours, {} nodes, {overlap:?}",
            left.contours.len(),
            right.contours.len(),
            clusters.len(),
        );

        IntersectionTable {
            left,
            right,
            nodes,
            overlap,
        }
    }

    /// How the two shapes are related.
    pub fn overlap(&self) -> Overlap {
        self.overlap
    }

    /// Do the two boundaries meet at all?
    pub fn touches(&self) -> bool {
        self.nodes.nodes().next().is_some()
    }

    /// Do the boundaries run along one another somewhere?
    pub fn shares_boundary(&self) -> bool {
        [&self.left, &self.right]
            .iter()
            .any(|op| op.classes().iter().any(|c| c.is_shared()))
    }

    /// The arcs of one contour of one side, or `None` if that contour doesn't
    /// meet the other shape.
    ///
    /// Contours are numbered in the order they were given; a table made by
    /// [`IntersectionTable::new`] has contour 0 on each side.
    pub fn arcs(&self, side: Side, contour: usize) -> Option<&[ClassifiedArc]> {
        match self.operand(side).arcs.get(contour)? {
            Arcs::Whole(_) => None,
            Arcs::Cut(arcs) => Some(arcs),
        }
    }

    /// Nodes that one of the given side's contours passes through more than
    /// once.
    ///
    /// A simple contour only does that if it touches itself, which makes the
    /// arcs around the node ambiguous.
    pub fn looping(&self, side: Side) -> &[Point] {
        &self.operand(side).looping
    }

    /// Is either side looping?
    pub fn is_looping(&self) -> bool {
        !self.left.looping.is_empty() || !self.right.looping.is_empty()
    }

    fn operand(&self, side: Side) -> &Operand<'a> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Collects the arcs bounding `left op right` into closed loops.
    ///
    /// Loops bounding the result are positively oriented; loops bounding holes
    /// in it are negatively oriented.
    pub fn combine(&self, op: BinaryOp) -> Vec<Contour> {
        let mut graph = self.nodes.clone();
        let mut ret = Vec::new();

        for side in [Side::Left, Side::Right] {
            let operand = self.operand(side);
            for (contour, arcs) in operand.contours.iter().zip(&operand.arcs) {
                match arcs {
                    Arcs::Whole(class) => match keep(op, side, *class) {
                        Some(false) => ret.push((*contour).clone()),
                        Some(true) => ret.push(contour.reversed()),
                        None => {}
                    },
                    Arcs::Cut(arcs) => {
                        for arc in arcs {
                            match keep(op, side, arc.class) {
                                Some(false) => graph.add_edge(arc.edge.clone()),
                                Some(true) => graph.add_edge(arc.edge.reversed()),
                                None => None,
                            };
                        }
                    }
                }
            }
        }

        ret.extend(
            graph
                .trace_loops()
                .into_iter()
                .filter_map(|segs| Contour::from_path_segs(segs, true))
                .filter(|c| !almost_zero(c.signed_area())),
        );
        log::debug!("{op:?} traced {} loops", ret.len());
        ret
    }
}

// Whether an arc of the given class belongs to the boundary of the result,
// and if so whether it needs reversing.
fn keep(op: BinaryOp, side: Side, class: ArcClass) -> Option<bool> {
    use ArcClass::*;
    match (op, side, class) {
        (BinaryOp::Union, _, Outside) | (BinaryOp::Union, Side::Left, SharedSame) => Some(false),
        (BinaryOp::Intersection, _, Inside)
        | (BinaryOp::Intersection, Side::Left, SharedSame) => Some(false),
        (BinaryOp::Difference, Side::Left, Outside | SharedOpposite) => Some(false),
        (BinaryOp::Difference, Side::Right, Inside) => Some(true),
        (BinaryOp::Xor, _, Outside) => Some(false),
        (BinaryOp::Xor, _, Inside) => Some(true),
        _ => None,
    }
}

fn classify(this: &Contour, cuts: &mut [(Position, NodeIdx)], other: &[&Contour]) -> Arcs {
    if cuts.is_empty() {
        return Arcs::Whole(class_at(this.boundary_point(), None, other));
    }
    sort_cuts(cuts);
    Arcs::Cut(
        cut_into_arcs(this.path_segs(), cuts)
            .into_iter()
            .filter(|e| !e.segs.is_empty())
            .map(|edge| {
                let class = arc_class(&edge.segs, other);
                ClassifiedArc { edge, class }
            })
            .collect(),
    )
}

// Classifies an arc by a point in the middle of its longest piece, which is
// as far from the nodes as we can conveniently get.
fn arc_class(segs: &[PathSeg], other: &[&Contour]) -> ArcClass {
    let longest = segs
        .iter()
        .max_by(|a, b| a.arclen(1e-6).total_cmp(&b.arclen(1e-6)))
        .unwrap_or(&segs[0]);
    class_at(longest.eval(0.5), Some(tangent(longest, 0.5)), other)
}

fn class_at(p: Point, dir: Option<Vec2>, other: &[&Contour]) -> ArcClass {
    let nearest = other
        .iter()
        .map(|c| (c, c.nearest(p)))
        .min_by(|(_, a), (_, b)| a.0.total_cmp(&b.0));
    if let Some((c, (dist, seg, t))) = nearest {
        if dist <= EPSILON {
            let other_dir = tangent(&c.path_segs()[seg], t);
            return match dir {
                Some(dir) if dir.dot(other_dir) < 0.0 => ArcClass::SharedOpposite,
                _ => ArcClass::SharedSame,
            };
        }
    }
    if other.iter().map(|c| c.winding(p)).sum::<i32>() != 0 {
        ArcClass::Inside
    } else {
        ArcClass::Outside
    }
}

fn relationship(left: &[ArcClass], right: &[ArcClass], every_seg_shared: bool) -> Overlap {
    use ArcClass::*;
    let all = |classes: &[ArcClass], ok: &[ArcClass]| classes.iter().all(|c| ok.contains(c));

    if every_seg_shared && all(left, &[SharedSame]) && all(right, &[SharedSame]) {
        Overlap::Equal
    } else if all(left, &[Inside, SharedSame]) && !right.contains(&Inside) {
        Overlap::Subset
    } else if all(right, &[Inside, SharedSame]) && !left.contains(&Inside) {
        Overlap::Superset
    } else if all(left, &[Outside, SharedOpposite]) && all(right, &[Outside, SharedOpposite]) {
        Overlap::None
    } else {
        Overlap::Crossing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::tests::polygon;

    fn square(x: f64, y: f64, size: f64) -> Contour {
        polygon(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    fn area(loops: &[Contour]) -> f64 {
        loops.iter().map(|c| c.signed_area()).sum()
    }

    #[test]
    fn disjoint() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(2.0, 0.0, 1.0);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::None);
        assert!(!table.touches());
        assert_eq!(table.combine(BinaryOp::Union).len(), 2);
        assert!(table.combine(BinaryOp::Intersection).is_empty());
    }

    #[test]
    fn nested() {
        let a = square(0.0, 0.0, 4.0);
        let b = square(1.0, 1.0, 1.0);
        assert_eq!(IntersectionTable::new(&a, &b).overlap(), Overlap::Superset);
        assert_eq!(IntersectionTable::new(&b, &a).overlap(), Overlap::Subset);

        // The difference is the big square with a hole.
        let diff = IntersectionTable::new(&a, &b).combine(BinaryOp::Difference);
        assert_eq!(diff.len(), 2);
        assert!((area(&diff) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn equal_up_to_starting_point() {
        let a = square(0.0, 0.0, 1.0);
        let b = polygon(&[(1.0, 1.0), (0.0, 1.0), (0.0, 0.0), (1.0, 0.0)]);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::Equal);
        assert!(table.shares_boundary());
        assert!(table.combine(BinaryOp::Difference).is_empty());
        assert!((area(&table.combine(BinaryOp::Union)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offset_squares() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::Crossing);
        assert!(table.shares_boundary());

        let union = table.combine(BinaryOp::Union);
        assert_eq!(union.len(), 1);
        assert!((area(&union) - 1.5).abs() < 1e-9);

        let inter = table.combine(BinaryOp::Intersection);
        assert_eq!(inter.len(), 1);
        assert!((area(&inter) - 0.5).abs() < 1e-9);

        let diff = table.combine(BinaryOp::Difference);
        assert_eq!(diff.len(), 1);
        assert!((area(&diff) - 0.5).abs() < 1e-9);

        let xor = table.combine(BinaryOp::Xor);
        assert_eq!(xor.len(), 2);
        assert!((area(&xor) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn plus_sign() {
        let a = polygon(&[(0.0, 1.0), (3.0, 1.0), (3.0, 2.0), (0.0, 2.0)]);
        let b = polygon(&[(1.0, 0.0), (2.0, 0.0), (2.0, 3.0), (1.0, 3.0)]);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::Crossing);
        assert!(!table.shares_boundary());
        assert_eq!(table.arcs(Side::Left, 0).map(|a| a.len()), Some(4));

        let union = table.combine(BinaryOp::Union);
        assert_eq!(union.len(), 1);
        assert!((area(&union) - 5.0).abs() < 1e-9);

        // Subtracting the vertical bar cuts the horizontal one in two.
        let diff = table.combine(BinaryOp::Difference);
        assert_eq!(diff.len(), 2);
        assert!((area(&diff) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn union_with_a_hole() {
        // Two C-shapes that close up into a ring.
        let a = polygon(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (3.0, 2.0),
            (3.0, 3.0),
            (0.0, 3.0),
        ]);
        let b = polygon(&[
            (2.0, 0.0),
            (4.0, 0.0),
            (4.0, 3.0),
            (2.0, 3.0),
            (2.0, 2.0),
            (3.0, 2.0),
            (3.0, 1.0),
            (2.0, 1.0),
        ]);
        let table = IntersectionTable::new(&a, &b);
        let union = table.combine(BinaryOp::Union);
        let mut areas: Vec<f64> = union.iter().map(|c| c.signed_area()).collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas.len(), 2);
        assert!((areas[0] + 2.0).abs() < 1e-9);
        assert!((areas[1] - 12.0).abs() < 1e-9);
    }

    #[test]
    fn touching_corners() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 1.0, 1.0);
        let table = IntersectionTable::new(&a, &b);
        assert!(table.touches());
        assert!(!table.shares_boundary());
        assert_eq!(table.overlap(), Overlap::None);
        assert!(!table.is_looping());
    }

    #[test]
    fn shared_edge() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 0.0, 1.0);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::None);
        assert!(table.shares_boundary());
        let union = table.combine(BinaryOp::Union);
        assert_eq!(union.len(), 1);
        assert!((area(&union) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn notch_in_a_corner() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 0.0, 1.0);
        let table = IntersectionTable::new(&a, &b);
        assert_eq!(table.overlap(), Overlap::Superset);
        let diff = table.combine(BinaryOp::Difference);
        assert_eq!(diff.len(), 1);
        assert!((area(&diff) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ring_and_plug() {
        let outer = square(0.0, 0.0, 4.0);
        let hole = square(1.0, 1.0, 2.0).reversed();
        let plug = square(1.0, 1.0, 2.0);
        let table = IntersectionTable::between(vec![&outer, &hole], vec![&plug]);
        assert_eq!(table.overlap(), Overlap::None);
        assert!(table.shares_boundary());
        assert!(table.arcs(Side::Left, 0).is_none());
        assert!(table.arcs(Side::Left, 1).is_some());

        let union = table.combine(BinaryOp::Union);
        assert_eq!(union.len(), 1);
        assert!((area(&union) - 16.0).abs() < 1e-9);
        assert!(table.combine(BinaryOp::Intersection).is_empty());
    }

    #[test]
    fn bar_across_a_ring() {
        let outer = square(0.0, 0.0, 4.0);
        let hole = square(1.0, 1.0, 2.0).reversed();
        let bar = polygon(&[(-1.0, 1.5), (5.0, 1.5), (5.0, 2.5), (-1.0, 2.5)]);
        let table = IntersectionTable::between(vec![&outer, &hole], vec![&bar]);
        assert_eq!(table.overlap(), Overlap::Crossing);

        // The bar covers two 1x1 pieces of the ring.
        let inter = table.combine(BinaryOp::Intersection);
        assert_eq!(inter.len(), 2);
        assert!((area(&inter) - 2.0).abs() < 1e-9);

        // What's left of the ring is two U-shapes.
        let diff = table.combine(BinaryOp::Difference);
        assert_eq!(diff.len(), 2);
        assert!((area(&diff) - 10.0).abs() < 1e-9);

        let union = table.combine(BinaryOp::Union);
        assert!((area(&union) - (12.0 + 6.0 - 2.0)).abs() < 1e-9);
    }
}
