use crate::{LayoutError, Result, Shape4};

/// Symmetric padding relating a smaller tensor to a larger one.
///
/// `h`/`w` are the spatial dims of the smaller (unpadded) tensor and
/// `new_h`/`new_w` those of the larger (padded) one, regardless of whether
/// the caller is padding or shrinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub h: usize,
    pub w: usize,
    pub new_h: usize,
    pub new_w: usize,
    pub vpadding: usize,
    pub hpadding: usize,
}

impl Padding {
    /// Derives the padding between `smaller` and `larger` spatial dims.
    ///
    /// # Errors
    /// * `InvalidOperation` - both tensors already share their spatial dims
    /// * `UnsupportedPadding` - a delta is odd or negative
    pub fn between(operation: &'static str, smaller: Shape4, larger: Shape4) -> Result<Padding> {
        let (h, w) = (smaller.h, smaller.w);
        let (new_h, new_w) = (larger.h, larger.w);

        if h == new_h && w == new_w {
            return Err(LayoutError::InvalidOperation { operation, h, w });
        }

        let unsupported = LayoutError::UnsupportedPadding {
            operation,
            h,
            w,
            new_h,
            new_w,
        };
        let (Some(dh), Some(dw)) = (new_h.checked_sub(h), new_w.checked_sub(w)) else {
            return Err(unsupported);
        };

        let vpadding = dh / 2;
        let hpadding = dw / 2;
        if h + 2 * vpadding != new_h || w + 2 * hpadding != new_w {
            return Err(unsupported);
        }

        Ok(Padding {
            h,
            w,
            new_h,
            new_w,
            vpadding,
            hpadding,
        })
    }
}

/// Checks the outer axes of a pair. `transposed` expects the larger tensor's
/// (n, c) to be the smaller tensor's (c, n).
pub(crate) fn check_outer_axes(
    operation: &'static str,
    smaller: Shape4,
    larger: Shape4,
    transposed: bool,
) -> Result<()> {
    let expected = if transposed { smaller.swap01() } else { smaller };
    if (expected.n, expected.c) != (larger.n, larger.c) {
        return Err(LayoutError::ShapeMismatch {
            operation,
            reason: format!(
                "outer axes of {} do not match {} (expected ({}, {}, _, _))",
                larger, smaller, expected.n, expected.c
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_symmetric() {
        let p = Padding::between("pad", Shape4::new(1, 1, 2, 3), Shape4::new(1, 1, 4, 7)).unwrap();
        assert_eq!(
            p,
            Padding {
                h: 2,
                w: 3,
                new_h: 4,
                new_w: 7,
                vpadding: 1,
                hpadding: 2,
            }
        );
    }

    #[test]
    fn test_between_one_axis_only() {
        let p = Padding::between("pad", Shape4::new(1, 1, 5, 5), Shape4::new(1, 1, 5, 9)).unwrap();
        assert_eq!((p.vpadding, p.hpadding), (0, 2));
    }

    #[test]
    fn test_between_same_dims() {
        let err = Padding::between("pad", Shape4::new(2, 3, 4, 4), Shape4::new(2, 3, 4, 4))
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidOperation { h: 4, w: 4, .. }));
    }

    #[test]
    fn test_between_odd_delta() {
        let err = Padding::between("pad", Shape4::new(1, 1, 4, 4), Shape4::new(1, 1, 7, 6))
            .unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedPadding { .. }));
    }

    #[test]
    fn test_between_negative_delta() {
        let err = Padding::between("shrink", Shape4::new(1, 1, 6, 6), Shape4::new(1, 1, 4, 8))
            .unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedPadding { .. }));
    }

    #[test]
    fn test_check_outer_axes() {
        let small = Shape4::new(2, 3, 4, 4);
        assert!(check_outer_axes("pad", small, Shape4::new(2, 3, 6, 6), false).is_ok());
        assert!(check_outer_axes("pad", small, Shape4::new(3, 2, 6, 6), false).is_err());
        assert!(check_outer_axes("t", small, Shape4::new(3, 2, 6, 6), true).is_ok());
        assert!(check_outer_axes("t", small, Shape4::new(2, 3, 6, 6), true).is_err());
    }
}
