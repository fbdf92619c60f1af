//! Regions: the values that boolean operations act on.

use std::sync::{Arc, OnceLock};

use kurbo::{Affine, BezPath, Point, Rect};

use crate::{
    cache::{Id, OpCache},
    check_bbox,
    contour::Contour,
    loop_breaker::break_loops,
    solid::Solid,
    space::{rects_overlap, RectIndex},
    BinaryOp, Error, FillRule,
};

/// A set of solids with disjoint interiors.
///
/// Regions are immutable and cheap to clone. The results of boolean
/// operations are remembered, so combining the same two regions twice only
/// does the work once.
#[derive(Clone)]
pub struct Region {
    inner: Arc<RegionInner>,
}

struct RegionInner {
    solids: Vec<Solid>,
    area: f64,
    bbox: Rect,
    id: Id,
    cache: OpCache<Region>,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.inner.id)
            .field("area", &self.inner.area)
            .field("solids", &self.inner.solids)
            .finish()
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::empty()
    }
}

impl Region {
    /// The empty region.
    pub fn empty() -> Region {
        Region::from_solids(Vec::new())
    }

    /// Creates a region from solids whose interiors don't overlap.
    pub fn from_solids(solids: Vec<Solid>) -> Region {
        #[cfg(feature = "slow-asserts")]
        for (i, a) in solids.iter().enumerate() {
            for b in &solids[(i + 1)..] {
                assert!(!a.obviously_overlaps(b), "{a:?} overlaps {b:?}");
            }
        }

        let area = solids.iter().fold(0.0, |acc, s| acc + s.area());
        let bbox = solids
            .iter()
            .map(Solid::bounding_box)
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);
        Region {
            inner: Arc::new(RegionInner {
                solids,
                area,
                bbox,
                id: Id::fresh(),
                cache: OpCache::default(),
            }),
        }
    }

    /// Creates a region from some contours, which may cross themselves and
    /// one another, using a fill rule to decide what's inside.
    pub fn from_contours<'a>(
        contours: impl IntoIterator<Item = &'a Contour>,
        fill_rule: FillRule,
    ) -> Result<Region, Error> {
        let contours: Vec<&Contour> = contours.into_iter().collect();
        for c in &contours {
            check_bbox(c.bounding_box())?;
        }
        Ok(Region::filled(contours, fill_rule))
    }

    /// Creates a region from a path, using a fill rule to decide what's inside.
    pub fn from_path(path: &BezPath, fill_rule: FillRule) -> Result<Region, Error> {
        let contours = Contour::from_bez_path(path)?;
        Region::from_contours(&contours, fill_rule)
    }

    fn filled(contours: Vec<&Contour>, fill_rule: FillRule) -> Region {
        let loops: Vec<Contour> = contours.into_iter().flat_map(break_loops).collect();
        let single = |c: Contour| Region::from_solids(vec![Solid::simple(c)]);
        match fill_rule {
            FillRule::EvenOdd => loops
                .into_iter()
                .fold(Region::empty(), |acc, l| acc.symmetric_difference(&single(l))),
            FillRule::NonZero => {
                // The winding number of a point is the number of positive
                // loops around it minus the number of negative ones. It's
                // non-zero exactly when, for some k, one of those numbers is
                // at least k and the other isn't.
                let mut positive = Vec::new();
                let mut negative = Vec::new();
                for l in loops {
                    if l.signed_area() > 0.0 {
                        add_coverage(&mut positive, single(l));
                    } else {
                        add_coverage(&mut negative, single(l));
                    }
                }
                let levels = positive.len().max(negative.len());
                let empty = Region::empty();
                (0..levels).fold(Region::empty(), |acc, k| {
                    let p = positive.get(k).unwrap_or(&empty);
                    let n = negative.get(k).unwrap_or(&empty);
                    acc.union(&p.symmetric_difference(n))
                })
            }
        }
    }

    /// The solids making up this region.
    pub fn solids(&self) -> &[Solid] {
        &self.inner.solids
    }

    /// Is this region empty?
    pub fn is_empty(&self) -> bool {
        self.inner.solids.is_empty()
    }

    /// The total area.
    pub fn area(&self) -> f64 {
        self.inner.area
    }

    /// The bounding box. The empty region has an empty bounding box at the origin.
    pub fn bounding_box(&self) -> Rect {
        self.inner.bbox
    }

    /// This region's identity.
    pub fn id(&self) -> Id {
        self.inner.id
    }

    /// Is `p` in this region?
    pub fn contains(&self, p: Point) -> bool {
        rects_overlap(self.inner.bbox, Rect::from_points(p, p))
            && self.inner.solids.iter().any(|s| s.contains(p))
    }

    /// The boundary of this region: the outer contour of each solid,
    /// positively oriented, followed by its holes, negatively oriented.
    ///
    /// Filling these contours with either fill rule gives back this region.
    pub fn to_contours(&self) -> Vec<Contour> {
        self.inner
            .solids
            .iter()
            .flat_map(|s| s.contours().cloned())
            .collect()
    }

    /// The boundary of this region as a single path (see [`Region::to_contours`]).
    pub fn to_bez_path(&self) -> BezPath {
        let mut ret = BezPath::new();
        for s in &self.inner.solids {
            for c in s.contours() {
                ret.extend(c.to_bez_path());
            }
        }
        ret
    }

    /// Applies an affine transformation.
    ///
    /// A degenerate transformation (one that squashes everything onto a line
    /// or a point) gives the empty region, as does one that overflows.
    pub fn transformed(&self, transform: &Affine) -> Region {
        let solids: Result<Vec<_>, _> = self
            .inner
            .solids
            .iter()
            .map(|s| s.transformed(transform))
            .collect();
        match solids {
            Ok(solids) => Region::from_solids(solids),
            Err(e) => {
                log::debug!("transforming a region by {transform:?}: {e}");
                Region::empty()
            }
        }
    }

    /// Applies a binary operation.
    pub fn apply(&self, op: BinaryOp, other: &Region) -> Region {
        match op {
            BinaryOp::Union => self.union(other),
            BinaryOp::Intersection => self.intersection(other),
            BinaryOp::Difference => self.subtracting(other),
            BinaryOp::Xor => self.symmetric_difference(other),
        }
    }

    fn memoized(&self, op: BinaryOp, other: &Region, f: impl FnOnce() -> Region) -> Region {
        if let Some(ret) = self.inner.cache.get(op, other.id()) {
            return ret;
        }
        if op != BinaryOp::Difference {
            if let Some(ret) = other.inner.cache.get(op, self.id()) {
                return ret;
            }
        }
        let ret = f();
        self.inner.cache.insert(
            op,
            &other.inner.cache,
            other.id(),
            self.id().max(other.id()),
            [ret.id()],
            &ret,
        );
        ret
    }

    fn disjoint_from(&self, other: &Region) -> bool {
        !rects_overlap(self.inner.bbox, other.inner.bbox)
    }

    fn side_by_side(&self, other: &Region) -> Region {
        let mut solids = self.inner.solids.clone();
        solids.extend_from_slice(&other.inner.solids);
        Region::from_solids(solids)
    }

    /// Everything that's in either region.
    pub fn union(&self, other: &Region) -> Region {
        if other.is_empty() || self.id() == other.id() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        if self.disjoint_from(other) {
            return self.side_by_side(other);
        }
        self.memoized(BinaryOp::Union, other, || {
            Region::from_solids(merge_solids(self.solids(), other.solids()))
        })
    }

    /// Everything that's in both regions.
    pub fn intersection(&self, other: &Region) -> Region {
        if self.id() == other.id() {
            return self.clone();
        }
        if self.is_empty() || other.is_empty() || self.disjoint_from(other) {
            return Region::empty();
        }
        self.memoized(BinaryOp::Intersection, other, || {
            let boxes: Vec<_> = other.solids().iter().map(Solid::bounding_box).collect();
            let index = RectIndex::new(&boxes);
            let mut solids = Vec::new();
            for a in self.solids() {
                for j in index.query(a.bounding_box()) {
                    solids.extend(a.intersection(&other.solids()[j]));
                }
            }
            Region::from_solids(solids)
        })
    }

    /// Everything that's in this region but not in `other`.
    pub fn subtracting(&self, other: &Region) -> Region {
        if self.id() == other.id() {
            return Region::empty();
        }
        if self.is_empty() || other.is_empty() || self.disjoint_from(other) {
            return self.clone();
        }
        self.memoized(BinaryOp::Difference, other, || {
            let boxes: Vec<_> = other.solids().iter().map(Solid::bounding_box).collect();
            let index = RectIndex::new(&boxes);
            let mut solids = Vec::new();
            for a in self.solids() {
                let mut pieces = vec![a.clone()];
                for j in index.query(a.bounding_box()) {
                    let b = &other.solids()[j];
                    pieces = pieces
                        .into_iter()
                        .flat_map(|p| {
                            if rects_overlap(p.bounding_box(), b.bounding_box()) {
                                p.subtracting(b)
                            } else {
                                vec![p]
                            }
                        })
                        .collect();
                }
                solids.extend(pieces);
            }
            Region::from_solids(solids)
        })
    }

    /// Everything that's in exactly one of the two regions.
    pub fn symmetric_difference(&self, other: &Region) -> Region {
        if self.id() == other.id() {
            return Region::empty();
        }
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        if self.disjoint_from(other) {
            return self.side_by_side(other);
        }
        self.memoized(BinaryOp::Xor, other, || {
            self.subtracting(other).union(&other.subtracting(self))
        })
    }

    /// Draws this region, for debugging.
    #[cfg(feature = "debug-svg")]
    pub fn dump_svg(&self) -> svg::Document {
        let bbox = self.inner.bbox;
        let pad = 1.0 + bbox.width().max(bbox.height()) / 32.0;
        let stroke_width = bbox.width().max(bbox.height()) / 512.0;
        let mut document = svg::Document::new().set(
            "viewBox",
            (
                bbox.x0 - pad,
                bbox.y0 - pad,
                bbox.width() + 2.0 * pad,
                bbox.height() + 2.0 * pad,
            ),
        );

        let colors = ["#005F73", "#0A9396", "#94D2BD", "#EE9B00", "#CA6702", "#AE2012"];
        for (solid, color) in self.inner.solids.iter().zip(colors.iter().cycle()) {
            let mut path = BezPath::new();
            for c in solid.contours() {
                path.extend(c.to_bez_path());
            }
            let path = svg::node::element::Path::new()
                .set("d", path.to_svg())
                .set("stroke", "black")
                .set("stroke-width", stroke_width)
                .set("stroke-linejoin", "round")
                .set("fill-rule", "nonzero")
                .set("fill", *color);
            document = document.add(path);
        }
        document
    }
}

// Adds a region to the stack of coverage levels, where `levels[k]` is
// everything covered at least `k + 1` times.
fn add_coverage(levels: &mut Vec<Region>, region: Region) {
    let mut carry = region;
    for level in levels.iter_mut() {
        let deeper = level.intersection(&carry);
        *level = level.union(&carry);
        carry = deeper;
        if carry.is_empty() {
            return;
        }
    }
    levels.push(carry);
}

// Merging solids can make them overlap others that they didn't overlap
// before, but it can't go on forever.
const MAX_MERGE_STEPS_PER_SOLID: usize = 64;

// The union of two sets of solids, each with disjoint interiors.
fn merge_solids(a: &[Solid], b: &[Solid]) -> Vec<Solid> {
    let mut done = a.to_vec();
    let mut pending = b.to_vec();
    let max_steps = MAX_MERGE_STEPS_PER_SOLID * (a.len() + b.len());
    let mut steps = 0;

    while let Some(s) = pending.pop() {
        steps += 1;
        if steps > max_steps {
            log::warn!(
                "giving up merging after {steps} steps, with {} solids left",
                pending.len() + 1
            );
            done.push(s);
            done.append(&mut pending);
            break;
        }

        let merged = done.iter().enumerate().find_map(|(i, d)| {
            if !rects_overlap(d.bounding_box(), s.bounding_box()) {
                return None;
            }
            d.union(&s).map(|m| (i, m))
        });
        match merged {
            Some((i, m)) => {
                done.swap_remove(i);
                pending.extend(m);
            }
            None => done.push(s),
        }
    }
    done
}

/// A set of contours, along with the regions they fill under each fill rule.
///
/// The regions are computed on demand, and at most once.
#[derive(Debug)]
pub struct Shape {
    contours: Vec<Contour>,
    nonzero: OnceLock<Region>,
    evenodd: OnceLock<Region>,
}

impl Shape {
    /// Creates a shape from some contours.
    pub fn new(contours: Vec<Contour>) -> Result<Shape, Error> {
        for c in &contours {
            check_bbox(c.bounding_box())?;
        }
        Ok(Shape {
            contours,
            nonzero: OnceLock::new(),
            evenodd: OnceLock::new(),
        })
    }

    /// Creates a shape from the subpaths of a path.
    pub fn from_path(path: &BezPath) -> Result<Shape, Error> {
        Shape::new(Contour::from_bez_path(path)?)
    }

    /// The contours.
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// The region filled by the contours under a fill rule.
    pub fn region(&self, fill_rule: FillRule) -> &Region {
        let slot = match fill_rule {
            FillRule::NonZero => &self.nonzero,
            FillRule::EvenOdd => &self.evenodd,
        };
        slot.get_or_init(|| Region::filled(self.contours.iter().collect(), fill_rule))
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Circle, Shape as _};

    use super::*;
    use crate::contour::tests::polygon;

    fn square(x: f64, y: f64, size: f64) -> Contour {
        polygon(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    fn region(contours: &[Contour]) -> Region {
        Region::from_contours(contours, FillRule::NonZero).unwrap()
    }

    #[test]
    fn empty() {
        let e = Region::empty();
        assert!(e.is_empty());
        assert_eq!(e.area(), 0.0);
        assert_eq!(e.area().to_string(), "0");
        let a = region(&[square(0.0, 0.0, 1.0)]);
        assert_eq!(a.union(&e).id(), a.id());
        assert_eq!(e.union(&a).id(), a.id());
        assert!(a.intersection(&e).is_empty());
        assert_eq!(a.subtracting(&e).id(), a.id());
        assert!(e.subtracting(&a).is_empty());
        assert_eq!(a.symmetric_difference(&e).id(), a.id());
    }

    #[test]
    fn union_merges_chains() {
        // Three squares in a row, the middle one overlapping both of the others.
        let outer = region(&[square(0.0, 0.0, 1.0), square(1.5, 0.0, 1.0)]);
        assert_eq!(outer.solids().len(), 2);
        let middle = region(&[square(0.75, 0.0, 1.0)]);
        let union = outer.union(&middle);
        assert_eq!(union.solids().len(), 1);
        assert!((union.area() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn nonzero_overlap_is_counted_once() {
        let r = region(&[square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        assert_eq!(r.solids().len(), 1);
        assert!((r.area() - 7.0).abs() < 1e-9);

        let eo = Region::from_contours(
            &[square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)],
            FillRule::EvenOdd,
        )
        .unwrap();
        assert!((eo.area() - 6.0).abs() < 1e-9);
        assert!(!eo.contains(Point::new(1.5, 1.5)));
    }

    #[test]
    fn nonzero_cancels_opposite_windings() {
        let r = region(&[square(0.0, 0.0, 4.0), square(1.0, 1.0, 2.0).reversed()]);
        assert_eq!(r.solids().len(), 1);
        assert_eq!(r.solids()[0].holes().len(), 1);
        assert!((r.area() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn nonzero_double_winding() {
        // Winding number two in the middle, minus one: still inside.
        let r = region(&[
            square(0.0, 0.0, 4.0),
            square(1.0, 1.0, 2.0),
            square(1.5, 1.5, 1.0).reversed(),
        ]);
        assert!((r.area() - 16.0).abs() < 1e-9);
        assert!(r.contains(Point::new(2.0, 2.0)));

        let eo = Region::from_contours(
            &[
                square(0.0, 0.0, 4.0),
                square(1.0, 1.0, 2.0),
                square(1.5, 1.5, 1.0).reversed(),
            ],
            FillRule::EvenOdd,
        )
        .unwrap();
        assert!((eo.area() - (16.0 - 4.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn round_trip() {
        let r = region(&[square(0.0, 0.0, 4.0), square(1.0, 1.0, 2.0).reversed()]);
        let again = region(&r.to_contours());
        assert!((again.area() - r.area()).abs() < 1e-9);
        assert_eq!(again.solids().len(), r.solids().len());

        let eo = Region::from_contours(&r.to_contours(), FillRule::EvenOdd).unwrap();
        assert!((eo.area() - r.area()).abs() < 1e-9);
    }

    #[test]
    fn transforms() {
        let r = region(&[square(0.0, 0.0, 1.0)]);
        let flipped = r.transformed(&(Affine::FLIP_Y * Affine::scale(2.0)));
        assert!((flipped.area() - 4.0).abs() < 1e-9);
        assert!(flipped.solids()[0].outer().signed_area() > 0.0);
        assert!(r.transformed(&Affine::scale(0.0)).is_empty());
    }

    #[test]
    fn memoized() {
        let a = region(&[square(0.0, 0.0, 1.0)]);
        let b = region(&[square(0.5, 0.5, 1.0)]);
        let first = a.union(&b);
        assert_eq!(b.union(&a).id(), first.id());
        assert_eq!(a.union(&b).id(), first.id());

        let diff = a.subtracting(&b);
        assert_ne!(b.subtracting(&a).id(), diff.id());
        assert_eq!(a.subtracting(&b).id(), diff.id());
    }

    #[test]
    fn shape_caches_its_regions() {
        let circle = Circle::new((0.0, 0.0), 1.0).to_path(1e-6);
        let shape = Shape::from_path(&circle).unwrap();
        let first = shape.region(FillRule::NonZero).id();
        assert_eq!(shape.region(FillRule::NonZero).id(), first);
        assert_ne!(shape.region(FillRule::EvenOdd).id(), first);
        assert!((shape.region(FillRule::EvenOdd).area() - std::f64::consts::PI).abs() < 1e-6);
        assert_eq!(shape.contours().len(), 1);
    }
}
