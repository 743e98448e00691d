use num_complex::Complex64;
use num_traits::{One, Zero};

/// Two weights closer than this are treated as equal, weights smaller than this as zero.
pub const TOLERANCE: f64 = 2e-13;

/// Hashable representative of a weight, equal for weights within the same tolerance bucket.
pub type WeightKey = (i64, i64);

/// Quantize a weight for use in hash keys.
#[inline]
pub fn weight_key(w: Complex64) -> WeightKey {
    (quantize(w.re), quantize(w.im))
}

#[inline]
fn quantize(x: f64) -> i64 {
    // Saturating cast, out of range values are never produced by normalized diagrams.
    (x / TOLERANCE).round() as i64
}

/// Whether `w` is within tolerance of zero.
#[inline]
pub fn approx_zero(w: Complex64) -> bool {
    w.re.abs() < TOLERANCE && w.im.abs() < TOLERANCE
}

/// Whether `w` is within tolerance of one.
#[inline]
pub fn approx_one(w: Complex64) -> bool {
    approx_eq(w, Complex64::one())
}

/// Whether two weights are within tolerance of each other.
#[inline]
pub fn approx_eq(a: Complex64, b: Complex64) -> bool {
    (a.re - b.re).abs() < TOLERANCE && (a.im - b.im).abs() < TOLERANCE
}

/// Snap components which are within tolerance of `0`, `1` or `-1` to the exact value.
///
/// This keeps repeated normalizations from drifting apart and splitting otherwise shared nodes.
pub fn snap(w: Complex64) -> Complex64 {
    Complex64::new(snap_component(w.re), snap_component(w.im))
}

fn snap_component(x: f64) -> f64 {
    if x.abs() < TOLERANCE {
        0.0
    } else if (x - 1.0).abs() < TOLERANCE {
        1.0
    } else if (x + 1.0).abs() < TOLERANCE {
        -1.0
    } else {
        x
    }
}

/// The zero weight.
#[inline]
pub fn zero() -> Complex64 {
    Complex64::zero()
}

/// The unit weight.
#[inline]
pub fn one() -> Complex64 {
    Complex64::one()
}

#[cfg(test)]
mod complex_tests {
    use super::*;

    #[test]
    fn test_snap() {
        let w = snap(Complex64::new(1.0 - 1e-14, -1e-15));
        assert_eq!(w, Complex64::new(1.0, 0.0));
        let w = snap(Complex64::new(-1.0 + 1e-14, 0.5));
        assert_eq!(w, Complex64::new(-1.0, 0.5));
    }

    #[test]
    fn test_key_matches_close_weights() {
        let a = Complex64::new(0.5, 0.25);
        let b = Complex64::new(0.5 + 1e-15, 0.25 - 1e-15);
        assert_eq!(weight_key(a), weight_key(b));
        assert_ne!(weight_key(a), weight_key(Complex64::new(0.5, 0.26)));
    }

    #[test]
    fn test_approx() {
        assert!(approx_zero(Complex64::new(1e-14, -1e-14)));
        assert!(!approx_zero(Complex64::new(1e-10, 0.0)));
        assert!(approx_one(Complex64::new(1.0, 1e-14)));
    }
}
