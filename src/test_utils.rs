#[cfg(test)]
use crate::{Element, Shape4, Tensor4};
#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};

/// Asserts that two tensors are exactly equal in both shape and values
///
/// # Arguments
/// * `a` - First tensor
/// * `b` - Second tensor
#[cfg(test)]
pub fn assert_tensors_eq<T: Element + PartialEq>(a: &Tensor4<T>, b: &Tensor4<T>) {
    assert_eq!(a.shape, b.shape);
    assert_eq!(a.data.len(), b.data.len());
    for (x, y) in a.data.iter().zip(b.data.iter()) {
        assert_eq!(x, y)
    }
}

/// Asserts that every element outside the interior window is exactly zero
///
/// # Arguments
/// * `t` - Padded tensor
/// * `vpadding` - Border rows on top and bottom
/// * `hpadding` - Border columns on the left and right
#[cfg(test)]
pub fn assert_border_zero(t: &Tensor4<f32>, vpadding: usize, hpadding: usize) {
    let Shape4 { n, c, h, w } = t.shape;
    for b in 0..n {
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let inside = y >= vpadding
                        && y < h - vpadding
                        && x >= hpadding
                        && x < w - hpadding;
                    if !inside {
                        assert_eq!(
                            t.get(b, ch, y, x).to_bits(),
                            0.0f32.to_bits(),
                            "border cell ({}, {}, {}, {}) not zero",
                            b,
                            ch,
                            y,
                            x
                        );
                    }
                }
            }
        }
    }
}

/// Seeded standard-normal tensor for reproducible fixtures
#[cfg(test)]
pub fn random_tensor(shape: impl Into<Shape4>, seed: u64) -> Tensor4<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Tensor4::randn(shape, &mut rng)
}
