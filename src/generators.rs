//! Synthetic inputs for benchmarks, demos, and tests.

use kurbo::{Circle, Point, Shape as _};

use crate::{contour::Contour, segment::Segment};

fn quad(points: [Point; 4]) -> Option<Contour> {
    let segs = points[1..]
        .iter()
        .chain(std::iter::once(&points[0]))
        .map(|&p| Segment::Line(p));
    Contour::new(points[0], segs, true).ok()
}

/// Generate a bunch of squares, arranged in a grid.
///
/// The top-left of the first square is at (x0, y0). Each square has size `size
/// x size`, and the distance between squares (both horizontally and vertically)
/// is `offset`.
///
/// If `slant` is non-zero, generates parallelograms instead of squares: the
/// right-hand side of each square gets translated down by `slant`.
fn squares(
    (x0, y0): (f64, f64),
    size: f64,
    offset: f64,
    slant: f64,
    count: usize,
) -> Vec<Contour> {
    let mut ret = Vec::new();
    for i in 0..count {
        let x = x0 + i as f64 * offset;
        for j in 0..count {
            let y = y0 + j as f64 * offset;
            ret.extend(quad([
                Point::new(x, y),
                Point::new(x + size, y + slant),
                Point::new(x + size, y + size + slant),
                Point::new(x, y + size),
            ]));
        }
    }
    ret
}

/// Generate an `n` by `n` checkerboard-like pattern with overlapping squares.
/// For `n = 2`, it looks like:
///
/// ```text
/// +------+   +------+
/// |      |   |      |
/// |   +--+---+--+   |
/// +---+--+   +--+---+
///     |         |
/// +---+--+   +--+---+
/// |   +--+---+--+   |
/// |      |   |      |
/// +------+   +------+
/// ```
///
/// The pattern comes in two parts: the outer collection of `n x n`
/// non-overlapping squares, and the inner collection of `(n - 1) x (n - 1)`
/// non-overlapping squares.
pub fn checkerboard(n: usize) -> (Vec<Contour>, Vec<Contour>) {
    (
        squares((0.0, 0.0), 30.0, 40.0, 0.0, n),
        squares((20.0, 20.0), 30.0, 40.0, 0.0, n.saturating_sub(1)),
    )
}


/// Like `checkerboard`, but with no exactly-horizontal lines.
pub fn slanted_checkerboard(n: usize) -> (Vec<Contour>, Vec<Contour>) {
    (
        squares((0.0, 0.0), 30.0, 40.0, 1.0, n),
        squares((20.0, 20.0), 30.0, 40.0, 1.0, n.saturating_sub(1)),
    )
}

/// Generate `n` circles of radius 12 around a circle of radius 20, each one
/// overlapping its neighbors if `n` is at least 6.
///
/// The circles are made of cubic Béziers, so combining them exercises the
/// curve intersector rather than the line-line special case.
pub fn rings(n: usize) -> Vec<Contour> {
    (0..n)
        .flat_map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / n as f64;
            let center = Point::new(20.0 * angle.cos(), 20.0 * angle.sin());
            let path = Circle::new(center, 12.0).to_path(1e-3);
            Contour::from_bez_path(&path).unwrap_or_default()
        })
        .collect()
}
