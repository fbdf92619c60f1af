//! Simple shapes with holes, and boolean operations between two of them.

use std::sync::Arc;

use kurbo::{Affine, Point, Rect};

use crate::{
    cache::{Id, OpCache},
    contour::Contour,
    loop_breaker::break_at,
    region::Region,
    table::{IntersectionTable, Overlap, Side},
    BinaryOp, Error,
};

/// A simple, positively oriented outer contour, together with some negatively
/// oriented holes.
///
/// The holes lie inside the outer contour and don't overlap one another.
/// Solids are immutable and cheap to clone; clones share their identity (and
/// their memoized operations).
#[derive(Clone)]
pub struct Solid {
    inner: Arc<SolidInner>,
}

struct SolidInner {
    outer: Contour,
    holes: Vec<Contour>,
    area: f64,
    bbox: Rect,
    id: Id,
    cache: OpCache<Option<Vec<Solid>>>,
}

impl std::fmt::Debug for Solid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solid")
            .field("id", &self.inner.id)
            .field("area", &self.inner.area)
            .field("outer", &self.inner.outer.to_bez_path().to_svg())
            .field("holes", &self.inner.holes.len())
            .finish()
    }
}

impl Solid {
    /// Creates a solid, fixing up the orientations of the contours if
    /// necessary.
    pub fn new(outer: Contour, holes: Vec<Contour>) -> Solid {
        let outer = if outer.signed_area() < 0.0 {
            outer.reversed()
        } else {
            outer
        };
        let holes: Vec<Contour> = holes
            .into_iter()
            .map(|h| if h.signed_area() > 0.0 { h.reversed() } else { h })
            .collect();
        let area = outer.signed_area() + holes.iter().map(|h| h.signed_area()).sum::<f64>();
        let bbox = outer.bounding_box();
        Solid {
            inner: Arc::new(SolidInner {
                outer,
                holes,
                area,
                bbox,
                id: Id::fresh(),
                cache: OpCache::default(),
            }),
        }
    }

    /// A solid without holes.
    pub fn simple(outer: Contour) -> Solid {
        Solid::new(outer, Vec::new())
    }

    /// The outer boundary.
    pub fn outer(&self) -> &Contour {
        &self.inner.outer
    }

    /// The holes.
    pub fn holes(&self) -> &[Contour] {
        &self.inner.holes
    }

    /// The outer boundary followed by the holes.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> + '_ {
        std::iter::once(&self.inner.outer).chain(&self.inner.holes)
    }

    /// The enclosed area: the area of the outer contour minus the areas of
    /// the holes.
    pub fn area(&self) -> f64 {
        self.inner.area
    }

    /// The bounding box (of the outer contour).
    pub fn bounding_box(&self) -> Rect {
        self.inner.bbox
    }

    /// This solid's identity.
    pub fn id(&self) -> Id {
        self.inner.id
    }

    /// Is `p` inside the outer contour but not inside any hole?
    pub fn contains(&self, p: Point) -> bool {
        self.inner.outer.contains(p) && !self.inner.holes.iter().any(|h| h.contains(p))
    }

    /// Applies an affine transformation.
    pub fn transformed(&self, transform: &Affine) -> Result<Solid, Error> {
        let outer = self.inner.outer.transformed(transform)?;
        let holes = self
            .inner
            .holes
            .iter()
            .map(|h| h.transformed(transform))
            .collect::<Result<_, _>>()?;
        Ok(Solid::new(outer, holes))
    }

    // Is this solid strictly inside one of the other's holes?
    fn sits_in_hole_of(&self, other: &Solid) -> bool {
        let bbox = self.bounding_box();
        other.holes().iter().any(|hole| {
            if hole.bounding_box().union(bbox) != hole.bounding_box() {
                return false;
            }
            let hole = hole.reversed();
            let table = IntersectionTable::new(&hole, self.outer());
            table.overlap() == Overlap::Superset && !table.shares_boundary()
        })
    }

    fn has_holes(&self) -> bool {
        !self.inner.holes.is_empty()
    }

    fn memoized(
        &self,
        op: BinaryOp,
        other: &Solid,
        f: impl FnOnce() -> Option<Vec<Solid>>,
    ) -> Option<Vec<Solid>> {
        if let Some(ret) = self.inner.cache.get(op, other.id()) {
            return ret;
        }
        if op != BinaryOp::Difference {
            if let Some(ret) = other.inner.cache.get(op, self.id()) {
                return ret;
            }
        }
        let ret = f();
        let ids = ret.iter().flatten().map(Solid::id);
        self.inner.cache.insert(
            op,
            &other.inner.cache,
            other.id(),
            self.id().max(other.id()),
            ids,
            &ret,
        );
        ret
    }

    /// The union of two solids.
    ///
    /// Returns `None` if the two solids don't interact: their interiors are
    /// disjoint and their boundaries meet at most at isolated points. In that
    /// case their union is just the two of them side by side.
    pub fn union(&self, other: &Solid) -> Option<Vec<Solid>> {
        self.memoized(BinaryOp::Union, other, || {
            if self.sits_in_hole_of(other) || other.sits_in_hole_of(self) {
                return None;
            }
            if !self.has_holes() && !other.has_holes() {
                return combine_outers(self.outer(), other.outer(), BinaryOp::Union);
            }
            combine_with_holes(self, other, BinaryOp::Union)
        })
    }

    /// The intersection of two solids.
    pub fn intersection(&self, other: &Solid) -> Vec<Solid> {
        self.memoized(BinaryOp::Intersection, other, || {
            if self.sits_in_hole_of(other) || other.sits_in_hole_of(self) {
                return None;
            }
            if !self.has_holes() && !other.has_holes() {
                return combine_outers(self.outer(), other.outer(), BinaryOp::Intersection);
            }
            combine_with_holes(self, other, BinaryOp::Intersection)
        })
        .unwrap_or_default()
    }

    /// The part of this solid that isn't in `other`.
    pub fn subtracting(&self, other: &Solid) -> Vec<Solid> {
        self.memoized(BinaryOp::Difference, other, || {
            let ret = if other.sits_in_hole_of(self) || self.sits_in_hole_of(other) {
                None
            } else if !self.has_holes() && !other.has_holes() {
                combine_outers(self.outer(), other.outer(), BinaryOp::Difference)
            } else {
                combine_with_holes(self, other, BinaryOp::Difference)
            };
            Some(ret.unwrap_or_else(|| vec![self.clone()]))
        })
        .unwrap_or_default()
    }

    /// Does this solid's interior overlap the other's?
    ///
    /// This only looks at one point of each outer boundary, so it can miss
    /// overlaps. It's meant for sanity checks.
    #[cfg(feature = "slow-asserts")]
    pub(crate) fn obviously_overlaps(&self, other: &Solid) -> bool {
        let inside = |a: &Solid, b: &Solid| {
            let p = a.outer().boundary_point();
            b.outer().nearest(p).0 > crate::num::EPSILON && b.contains(p)
        };
        inside(self, other) || inside(other, self)
    }
}

// Combines the outer contours of two solids. Returns `None` if they don't
// interact.
fn combine_outers(a: &Contour, b: &Contour, op: BinaryOp) -> Option<Vec<Solid>> {
    let table = IntersectionTable::new(a, b);
    if table.is_looping() {
        if let Some(ret) = combine_looping(a, b, &table, op) {
            return Some(ret);
        }
    }

    let shares = table.shares_boundary();
    let simple = |c: &Contour| Solid::simple(c.clone());
    let ret = match (table.overlap(), op) {
        (Overlap::None, _) if !shares => return None,
        (Overlap::Equal, BinaryOp::Union | BinaryOp::Intersection) => vec![simple(a)],
        (Overlap::Equal, BinaryOp::Difference | BinaryOp::Xor) => Vec::new(),
        (Overlap::Superset, BinaryOp::Union) => vec![simple(a)],
        (Overlap::Superset, BinaryOp::Intersection) => vec![simple(b)],
        (Overlap::Superset, BinaryOp::Difference | BinaryOp::Xor) if !shares => {
            vec![Solid::new(a.clone(), vec![b.clone()])]
        }
        (Overlap::Subset, BinaryOp::Union) => vec![simple(b)],
        (Overlap::Subset, BinaryOp::Intersection) => vec![simple(a)],
        (Overlap::Subset, BinaryOp::Difference) => Vec::new(),
        (Overlap::Subset, BinaryOp::Xor) if !shares => {
            vec![Solid::new(b.clone(), vec![a.clone()])]
        }
        _ => assemble_solids(table.combine(op)),
    };
    Some(ret)
}

// Combines two solids, at least one of which has holes, by cutting up all of
// their contours at once. Returns `None` if they don't interact.
fn combine_with_holes(a: &Solid, b: &Solid, op: BinaryOp) -> Option<Vec<Solid>> {
    let table = IntersectionTable::between(a.contours().collect(), b.contours().collect());
    if table.overlap() == Overlap::None && !table.shares_boundary() {
        return None;
    }
    if table.is_looping() {
        log::debug!("tracing through a looping node of a solid with holes");
    }
    Some(assemble_solids(table.combine(op)))
}

// One of the contours passes through a node twice. Cutting it there and
// combining the pieces one at a time avoids having to untangle that node.
fn combine_looping(
    a: &Contour,
    b: &Contour,
    table: &IntersectionTable<'_>,
    op: BinaryOp,
) -> Option<Vec<Solid>> {
    let cuts: Vec<Point> = table
        .looping(Side::Left)
        .iter()
        .chain(table.looping(Side::Right))
        .copied()
        .collect();
    let a_loops = break_at(a, &cuts);
    let b_loops = break_at(b, &cuts);
    if a_loops.len() <= 1 && b_loops.len() <= 1 {
        return None;
    }
    log::debug!(
        "cut looping contours into {} and {} pieces",
        a_loops.len(),
        b_loops.len()
    );

    let a = Region::from_solids(assemble_solids(a_loops));
    let b = Region::from_solids(assemble_solids(b_loops));
    Some(a.apply(op, &b).solids().to_vec())
}

/// Groups loops that don't cross one another into solids.
///
/// Positively oriented loops become outer contours, and each negatively
/// oriented loop becomes a hole in the smallest outer contour containing it.
pub fn assemble_solids(loops: Vec<Contour>) -> Vec<Solid> {
    let (mut outers, holes): (Vec<_>, Vec<_>) =
        loops.into_iter().partition(|c| c.signed_area() > 0.0);
    outers.sort_by(|a, b| a.signed_area().total_cmp(&b.signed_area()));

    let mut outer_holes = vec![Vec::new(); outers.len()];
    for hole in holes {
        let p = hole.boundary_point();
        let container = outers
            .iter()
            .position(|o| o.signed_area() > -hole.signed_area() && o.contains(p));
        match container {
            Some(idx) => outer_holes[idx].push(hole),
            None => log::warn!(
                "dropping a hole of area {} that isn't inside anything",
                -hole.signed_area()
            ),
        }
    }

    outers
        .into_iter()
        .zip(outer_holes)
        .map(|(outer, holes)| Solid::new(outer, holes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::tests::polygon;

    fn square(x: f64, y: f64, size: f64) -> Contour {
        polygon(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    fn area(solids: &[Solid]) -> f64 {
        solids.iter().map(Solid::area).sum()
    }

    #[test]
    fn orientation_is_fixed_up() {
        let s = Solid::new(square(0.0, 0.0, 4.0).reversed(), vec![square(1.0, 1.0, 1.0)]);
        assert!(s.outer().signed_area() > 0.0);
        assert!(s.holes()[0].signed_area() < 0.0);
        assert!((s.area() - 15.0).abs() < 1e-9);
        assert!(s.contains(Point::new(0.5, 0.5)));
        assert!(!s.contains(Point::new(1.5, 1.5)));
        assert_eq!(s.contours().count(), 2);
    }

    #[test]
    fn disjoint_solids_dont_interact() {
        let a = Solid::simple(square(0.0, 0.0, 1.0));
        let b = Solid::simple(square(2.0, 0.0, 1.0));
        assert!(a.union(&b).is_none());
        assert!(a.intersection(&b).is_empty());
        let diff = a.subtracting(&b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].id(), a.id());
    }

    #[test]
    fn subtracting_a_nested_solid_makes_a_hole() {
        let a = Solid::simple(square(0.0, 0.0, 4.0));
        let b = Solid::simple(square(1.0, 1.0, 1.0));
        let diff = a.subtracting(&b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].holes().len(), 1);
        assert!((diff[0].area() - 15.0).abs() < 1e-9);
        assert!(b.subtracting(&a).is_empty());
    }

    #[test]
    fn union_fills_a_hole() {
        let ring = Solid::new(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 2.0)]);
        let plug = Solid::simple(square(1.0, 1.0, 2.0));
        let union = ring.union(&plug).unwrap();
        assert_eq!(union.len(), 1);
        assert!(union[0].holes().is_empty());
        assert!((area(&union) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn union_shrinks_a_hole() {
        let ring = Solid::new(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 2.0)]);
        let patch = Solid::simple(square(0.5, 0.5, 1.5));
        let union = ring.union(&patch).unwrap();
        assert_eq!(union.len(), 1);
        assert!((area(&union) - (16.0 - 4.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn solid_in_a_hole_doesnt_interact() {
        let ring = Solid::new(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 2.0)]);
        let island = Solid::simple(square(1.5, 1.5, 1.0));
        assert!(ring.union(&island).is_none());
        assert!(island.union(&ring).is_none());
        assert!(ring.intersection(&island).is_empty());
        assert_eq!(island.subtracting(&ring).len(), 1);
    }

    #[test]
    fn intersection_keeps_holes() {
        let ring = Solid::new(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 2.0)]);
        let half = Solid::simple(polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0), (0.0, 4.0)]));
        let inter = ring.intersection(&half);
        assert!((area(&inter) - (8.0 - 2.0)).abs() < 1e-9);
    }

    #[test]
    fn subtracting_a_ring_keeps_its_middle() {
        let big = Solid::simple(square(0.0, 0.0, 6.0));
        let ring = Solid::new(square(1.0, 1.0, 4.0), vec![square(2.0, 2.0, 2.0)]);
        let diff = big.subtracting(&ring);
        assert_eq!(diff.len(), 2);
        assert!((area(&diff) - (36.0 - 16.0 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn subtracting_around_a_hole() {
        let holed = Solid::new(square(0.0, 0.0, 10.0), vec![square(4.0, 4.0, 1.0)]);
        let mid = Solid::simple(square(2.0, 2.0, 6.0));
        let diff = holed.subtracting(&mid);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].holes().len(), 1);
        assert!((area(&diff) - 64.0).abs() < 1e-9);

        // The old hole is inside `mid`, so `mid` loses exactly it.
        let rest = mid.subtracting(&holed);
        assert_eq!(rest.len(), 1);
        assert!((area(&rest) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn patch_over_a_hole_edge() {
        let ring = Solid::new(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 2.0)]);
        let patch = Solid::simple(square(2.0, 2.0, 1.5));
        let diff = ring.subtracting(&patch);
        assert_eq!(diff.len(), 1);
        assert!((area(&diff) - (12.0 - 1.25)).abs() < 1e-9);
        let inter = ring.intersection(&patch);
        assert!((area(&inter) - 1.25).abs() < 1e-9);
        let union = ring.union(&patch).unwrap();
        assert!((area(&union) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn results_are_memoized() {
        let a = Solid::simple(square(0.0, 0.0, 1.0));
        let b = Solid::simple(square(0.5, 0.5, 1.0));
        let first = a.union(&b).unwrap();
        let second = b.union(&a).unwrap();
        assert_eq!(first[0].id(), second[0].id());
    }

    #[test]
    fn pinched_contour_is_cut() {
        // Two squares touching at a corner, traced as one contour.
        let pinched = Solid::simple(polygon(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (2.0, 1.0),
            (2.0, 2.0),
            (1.0, 2.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ]));
        let corner = Solid::simple(square(1.0, 0.0, 1.0));
        let union = pinched.union(&corner).unwrap();
        assert!((area(&union) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn assembling() {
        let loops = vec![
            square(1.0, 1.0, 1.0).reversed(),
            square(0.0, 0.0, 10.0),
            square(20.0, 0.0, 1.0),
            square(4.0, 4.0, 4.0),
            square(5.0, 5.0, 1.0).reversed(),
        ];
        let mut solids = assemble_solids(loops);
        solids.sort_by(|a, b| a.area().total_cmp(&b.area()));
        let holes: Vec<usize> = solids.iter().map(|s| s.holes().len()).collect();
        assert_eq!(holes, vec![0, 1, 1]);
        assert!((solids[2].area() - 99.0).abs() < 1e-9);
    }
}
