//! Stitching arcs back together into closed loops.
//!
//! Both the loop breaker and the intersection table cut boundaries into
//! arcs that run between crossing points ("nodes"), pick some of those arcs,
//! and then need to reassemble the picked arcs into closed loops. That
//! reassembly happens here.
//!
//! At each node, the incoming and outgoing arcs are sorted by angle and paired
//! up like parentheses, so that the pairs never cross one another. Following
//! the pairing from arc to arc gives closed cycles that don't cross themselves
//! or each other, although a cycle may still pass through the same node more
//! than once (where two loops touch). Those cycles get cut at every repeated
//! node, leaving simple loops.

use std::collections::HashMap;

use kurbo::{ParamCurve, PathSeg, Point, Vec2};

use crate::{
    num::points_coincide,
    segment::is_degenerate,
};

/// The index of a node in an [`ArcGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

/// A vector indexed by nodes.
#[derive(Clone)]
pub struct NodeVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(NodeVec, NodeIdx, "node");

/// The index of an arc in an [`ArcGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIdx(usize);

/// A vector indexed by arcs.
#[derive(Clone)]
pub struct EdgeVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(EdgeVec, EdgeIdx, "edge");

/// A directed arc between two nodes.
#[derive(Clone, Debug)]
pub struct Edge {
    /// The node this arc leaves from.
    pub from: NodeIdx,
    /// The node this arc arrives at.
    pub to: NodeIdx,
    /// The boundary pieces making up this arc, in order. Never empty.
    pub segs: Vec<PathSeg>,
}

impl Edge {
    /// The same arc, traversed backwards.
    pub fn reversed(&self) -> Edge {
        Edge {
            from: self.to,
            to: self.from,
            segs: self.segs.iter().rev().map(|s| s.reverse()).collect(),
        }
    }

    // The direction in which we leave the start node. Sampling a short way
    // along the curve (instead of taking the tangent) separates arcs that
    // leave in the same direction but curve apart.
    fn departure(&self) -> Vec2 {
        let seg = &self.segs[0];
        short_chord(seg, seg.start(), 1e-3)
    }

    // The direction, from the end node, back along the arc.
    fn arrival(&self) -> Vec2 {
        let seg = &self.segs[self.segs.len() - 1];
        short_chord(seg, seg.end(), 1.0 - 1e-3)
    }
}

fn short_chord(seg: &PathSeg, from: Point, t: f64) -> Vec2 {
    let d = seg.eval(t) - from;
    if d.hypot2() > 0.0 {
        d
    } else {
        seg.eval(0.5) - from
    }
}

/// A place on a contour: a segment index and a parameter on that segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    /// The segment index.
    pub seg: usize,
    /// The parameter, in `[0, 1)`.
    pub t: f64,
}

impl Position {
    /// A position on a contour with `len` segments. The end of a segment is
    /// recorded as the start of the next one, so that every point on the
    /// contour has only one position.
    pub fn new(seg: usize, t: f64, len: usize) -> Position {
        if t >= 1.0 {
            Position {
                seg: (seg + 1) % len,
                t: 0.0,
            }
        } else {
            Position { seg, t }
        }
    }
}

/// Something recorded at a node, which might get recorded more than once
/// with slightly different rounding.
pub trait Place: Copy {
    /// Are these the same up to rounding?
    fn is_near(&self, other: &Self) -> bool;
}

impl Place for Position {
    // Two passes of the same contour through one node are never this close
    // in parameter space.
    fn is_near(&self, other: &Position) -> bool {
        self.seg == other.seg && (self.t - other.t).abs() < 1e-6
    }
}

/// Groups crossing points into nodes, merging points within [`EPSILON`](crate::num::EPSILON).
#[derive(Debug)]
pub struct NodeClusters<P = Position> {
    points: NodeVec<Point>,
    places: NodeVec<Vec<P>>,
}

impl<P> Default for NodeClusters<P> {
    fn default() -> Self {
        NodeClusters {
            points: NodeVec::default(),
            places: NodeVec::default(),
        }
    }
}

impl<P: Place> NodeClusters<P> {
    /// Records that `place` lies at `p`, returning the node of `p`.
    pub fn insert(&mut self, p: Point, place: P) -> NodeIdx {
        let found = self
            .points
            .iter()
            .find(|(_, q)| points_coincide(p, **q))
            .map(|(node, _)| node);
        let node = match found {
            Some(node) => node,
            None => {
                self.places.push(Vec::new());
                self.points.push(p)
            }
        };
        let places = &mut self.places[node];
        if !places.iter().any(|q| q.is_near(&place)) {
            places.push(place);
        }
        node
    }

    /// The nodes, with their locations and everything recorded at them.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIdx, Point, &[P])> + '_ {
        self.points
            .iter()
            .map(|(idx, p)| (idx, *p, self.places[idx].as_slice()))
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Are there no nodes?
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sorts cut positions into the order they appear along the contour.
pub fn sort_cuts(cuts: &mut [(Position, NodeIdx)]) {
    cuts.sort_by(|(a, _), (b, _)| a.seg.cmp(&b.seg).then(a.t.total_cmp(&b.t)));
}

/// Cuts a closed contour into arcs between consecutive cut positions.
///
/// `cuts` must be sorted (see [`sort_cuts`]) and non-empty. Each arc runs
/// from one cut to the next, with the last one wrapping around to the
/// first. Zero-length pieces are left out.
pub fn cut_into_arcs(segs: &[PathSeg], cuts: &[(Position, NodeIdx)]) -> Vec<Edge> {
    (0..cuts.len())
        .map(|i| {
            let (from_pos, from) = cuts[i];
            let (to_pos, to) = cuts[(i + 1) % cuts.len()];
            Edge {
                from,
                to,
                segs: pieces_between(segs, from_pos, to_pos),
            }
        })
        .collect()
}

// The pieces of the contour from one position to the next, going forwards
// (and all the way around, if they're the same).
fn pieces_between(segs: &[PathSeg], from: Position, to: Position) -> Vec<PathSeg> {
    let mut ret = Vec::new();
    let mut push = |seg: &PathSeg, t0: f64, t1: f64| {
        let piece = if t0 == 0.0 && t1 == 1.0 {
            *seg
        } else {
            seg.subsegment(t0..t1)
        };
        if !is_degenerate(&piece) {
            ret.push(piece);
        }
    };

    let mut seg = from.seg;
    let mut t0 = from.t;
    for step in 0..=segs.len() {
        if step > 0 && seg == to.seg && t0 == to.t {
            break;
        }
        if seg == to.seg && to.t > t0 {
            push(&segs[seg], t0, to.t);
            break;
        }
        push(&segs[seg], t0, 1.0);
        seg = (seg + 1) % segs.len();
        t0 = 0.0;
    }
    ret
}

#[derive(Clone, Copy, Debug)]
enum HalfEdge {
    In(EdgeIdx),
    Out(EdgeIdx),
}

/// A directed multigraph of boundary arcs between crossing points.
#[derive(Clone, Debug, Default)]
pub struct ArcGraph {
    nodes: NodeVec<Point>,
    edges: EdgeVec<Edge>,
}

impl ArcGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node at the given location.
    pub fn add_node(&mut self, p: Point) -> NodeIdx {
        self.nodes.push(p)
    }

    /// The location of a node.
    pub fn node(&self, idx: NodeIdx) -> Point {
        self.nodes[idx]
    }

    /// The nodes, with their locations.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, Point)> + '_ {
        self.nodes.iter().map(|(idx, p)| (idx, *p))
    }

    /// Adds an arc. Arcs without any segments are ignored.
    pub fn add_edge(&mut self, edge: Edge) -> Option<EdgeIdx> {
        (!edge.segs.is_empty()).then(|| self.edges.push(edge))
    }

    /// The number of arcs.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Reassembles all the arcs into simple closed loops.
    ///
    /// Every arc ends up in exactly one loop, unless the graph is unbalanced
    /// (some node has more arcs arriving than leaving, or vice versa). The
    /// arcs that can't be closed up in that case are dropped with a warning.
    pub fn trace_loops(&self) -> Vec<Vec<PathSeg>> {
        let next = self.pair_half_edges();

        let mut ret = Vec::new();
        let mut visited = EdgeVec::filled(false, self.edges.len());
        for start in self.edges.indices() {
            if visited[start] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut cur = start;
            let closed = loop {
                visited[cur] = true;
                cycle.push(cur);
                match next[cur] {
                    Some(n) if n == start => break true,
                    Some(n) if !visited[n] => cur = n,
                    _ => break false,
                }
            };
            if closed {
                self.split_at_repeats(&cycle, &mut ret);
            } else {
                log::warn!("dropping an unclosed chain of {} arcs", cycle.len());
            }
        }
        ret
    }

    // For each arc, the arc that follows it.
    fn pair_half_edges(&self) -> EdgeVec<Option<EdgeIdx>> {
        let mut around: NodeVec<Vec<(f64, HalfEdge)>> = NodeVec::filled(Vec::new(), self.nodes.len());
        for (idx, e) in self.edges.iter() {
            around[e.from].push((e.departure().atan2(), HalfEdge::Out(idx)));
            around[e.to].push((e.arrival().atan2(), HalfEdge::In(idx)));
        }

        let mut next = EdgeVec::filled(None, self.edges.len());
        for node in around.indices() {
            let halves = &mut around[node];
            if halves.is_empty() {
                continue;
            }
            halves.sort_by(|(a, _), (b, _)| a.total_cmp(b));

            // Rotate so that, reading around the node, there are never more
            // outgoing arcs than incoming ones so far.
            let mut depth = 0i32;
            let mut min_depth = 0;
            let mut min_pos = 0;
            for (i, (_, h)) in halves.iter().enumerate() {
                depth += match h {
                    HalfEdge::In(_) => 1,
                    HalfEdge::Out(_) => -1,
                };
                if depth < min_depth {
                    min_depth = depth;
                    min_pos = i + 1;
                }
            }
            if depth != 0 {
                log::warn!("{node:?} is unbalanced: {depth} more arriving arcs than leaving");
            }
            let len = halves.len();
            halves.rotate_left(min_pos % len);

            let mut open = Vec::new();
            for &(_, h) in halves.iter() {
                match h {
                    HalfEdge::In(e) => open.push(e),
                    HalfEdge::Out(e) => {
                        if let Some(prev) = open.pop() {
                            next[prev] = Some(e);
                        }
                    }
                }
            }
        }
        next
    }

    // Cuts a closed cycle of arcs at every node that it visits twice.
    fn split_at_repeats(&self, cycle: &[EdgeIdx], out: &mut Vec<Vec<PathSeg>>) {
        let mut stack: Vec<EdgeIdx> = Vec::with_capacity(cycle.len());
        // For each node on the current path, the stack height when we were there.
        let mut seen: HashMap<NodeIdx, usize> = HashMap::new();
        seen.insert(self.edges[cycle[0]].from, 0);

        for &e in cycle {
            stack.push(e);
            let to = self.edges[e].to;
            if let Some(&pos) = seen.get(&to) {
                let piece = stack.split_off(pos);
                out.push(
                    piece
                        .iter()
                        .flat_map(|&e| self.edges[e].segs.iter().copied())
                        .collect(),
                );
                seen.retain(|_, p| *p <= pos);
            } else {
                seen.insert(to, stack.len());
            }
        }
        debug_assert!(stack.is_empty());
    }
}
