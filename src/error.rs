use crate::{DType, Shape4};
use thiserror::Error;

/// Errors raised before a kernel touches any data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Source and destination spatial dims are equal, nothing to pad or shrink
    #[error("invalid operation '{operation}': spatial dims {h}x{w} already match")]
    InvalidOperation {
        operation: &'static str,
        h: usize,
        w: usize,
    },

    #[error(
        "unsupported padding in '{operation}': cannot pad {h}x{w} to {new_h}x{new_w} symmetrically"
    )]
    UnsupportedPadding {
        operation: &'static str,
        h: usize,
        w: usize,
        new_h: usize,
        new_w: usize,
    },

    #[error("unsupported dtype in '{operation}': expected {expected}, got {got}")]
    UnsupportedDtype {
        operation: &'static str,
        expected: DType,
        got: DType,
    },

    #[error("shape mismatch in '{operation}': {reason}")]
    ShapeMismatch {
        operation: &'static str,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LayoutError {
    pub(crate) fn buffer_len(operation: &'static str, shape: Shape4, len: usize) -> Self {
        LayoutError::ShapeMismatch {
            operation,
            reason: format!(
                "buffer holds {} elements but shape {} needs {}",
                len,
                shape,
                shape.numel()
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
