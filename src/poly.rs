//! Polynomials in power basis, and a real-root finder.
//!
//! This is the numerically sensitive core of the curve intersector: the
//! resultant of two curves is a polynomial of degree up to 9, and every
//! intersection parameter comes out of [`Poly::roots_between`].

use std::ops::{Add, Mul, Neg, Sub};

/// Maximum number of bisection steps per isolated root.
const MAX_BISECTIONS: usize = 100;

/// A polynomial with `f64` coefficients, stored in ascending order of degree.
///
/// `Poly::new(vec![1.0, 0.0, 2.0])` represents `1 + 2x²`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Poly {
    coeffs: Vec<f64>,
}

impl Poly {
    /// Creates a polynomial from its coefficients, constant term first.
    pub fn new(coeffs: impl Into<Vec<f64>>) -> Self {
        Poly {
            coeffs: coeffs.into(),
        }
    }

    /// The constant polynomial `c`.
    pub fn constant(c: f64) -> Self {
        Poly { coeffs: vec![c] }
    }

    /// The coefficients, constant term first.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// The index of the highest non-zero coefficient, or `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.iter().rposition(|&c| c != 0.0)
    }

    /// Evaluates the polynomial at `x`, using Horner's method.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    /// The derivative.
    pub fn deriv(&self) -> Poly {
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, &c)| i as f64 * c)
                .collect(),
        }
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: f64) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|&c| c * factor).collect(),
        }
    }

    /// The largest absolute value of any coefficient.
    pub fn max_abs(&self) -> f64 {
        self.coeffs.iter().fold(0.0, |m, c| m.max(c.abs()))
    }

    /// Finds all the real roots in the closed interval `[lo, hi]`, sorted.
    ///
    /// The derivative's roots split the interval into pieces on which this
    /// polynomial is monotone. Every piece whose endpoints have strictly
    /// opposite signs is bisected to a root. A piece endpoint at which the
    /// polynomial is at most `threshold` in absolute value is itself reported
    /// as a root; this is how tangencies (even-multiplicity roots, with no sign
    /// change) get found.
    ///
    /// The zero polynomial and non-zero constants have no isolated roots.
    pub fn roots_between(&self, lo: f64, hi: f64, threshold: f64) -> Vec<f64> {
        let mut ret = Vec::new();
        match self.degree() {
            None | Some(0) => return ret,
            Some(1) => {
                let r = -self.coeffs[0] / self.coeffs[1];
                if lo <= r && r <= hi {
                    ret.push(r);
                }
                return ret;
            }
            Some(_) => {}
        }

        let mut breaks = Vec::with_capacity(self.coeffs.len() + 1);
        breaks.push(lo);
        breaks.extend(self.deriv().roots_between(lo, hi, 0.0));
        breaks.push(hi);

        for w in breaks.windows(2) {
            let (a, b) = (w[0], w[1]);
            let fa = self.eval(a);
            let fb = self.eval(b);
            if fa.abs() <= threshold {
                ret.push(a);
            } else if fb.abs() <= threshold {
                // Reported by the next piece, or after the loop.
            } else if (fa < 0.0) != (fb < 0.0) {
                ret.push(self.bisect(a, b, fa));
            }
        }
        if self.eval(hi).abs() <= threshold {
            ret.push(hi);
        }

        ret.dedup_by(|x, y| (*x - *y).abs() <= f64::EPSILON * 4.0);
        ret
    }

    fn bisect(&self, mut a: f64, mut b: f64, fa: f64) -> f64 {
        let a_negative = fa < 0.0;
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (a + b);
            if mid <= a || mid >= b {
                break;
            }
            let fm = self.eval(mid);
            if fm == 0.0 {
                return mid;
            }
            if (fm < 0.0) == a_negative {
                a = mid;
            } else {
                b = mid;
            }
        }
        0.5 * (a + b)
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, other: &Poly) -> Poly {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| self.coeffs.get(i).unwrap_or(&0.0) + other.coeffs.get(i).unwrap_or(&0.0))
            .collect();
        Poly { coeffs }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, other: &Poly) -> Poly {
        self + &(-other)
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        self.scale(-1.0)
    }
}

impl Mul for &Poly {
    type Output = Poly;

    fn mul(self, other: &Poly) -> Poly {
        if self.coeffs.is_empty() || other.coeffs.is_empty() {
            return Poly::default();
        }
        let mut coeffs = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Poly { coeffs }
    }
}

impl Add for Poly {
    type Output = Poly;

    fn add(self, other: Poly) -> Poly {
        &self + &other
    }
}

impl Sub for Poly {
    type Output = Poly;

    fn sub(self, other: Poly) -> Poly {
        &self - &other
    }
}

impl Mul for Poly {
    type Output = Poly;

    fn mul(self, other: Poly) -> Poly {
        &self * &other
    }
}
