use crate::{LayoutError, Result};
use num_traits::Zero;
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// Element types understood by the dtype-tagged API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
        };
        f.write_str(name)
    }
}

/// Scalar types the layout kernels can move around.
///
/// Kernels only copy values and write zeros, so any `Copy + Zero` type that
/// can cross threads qualifies.
pub trait Element: Copy + Zero + Send + Sync + fmt::Debug + 'static {
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
}

impl Element for u8 {
    const DTYPE: DType = DType::U8;
}

/// Shape of a 4D tensor as (batch, channels, height, width)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape4 {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

impl Shape4 {
    pub fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Shape4 { n, c, h, w }
    }

    pub fn numel(&self) -> usize {
        self.n * self.c * self.h * self.w
    }

    /// Number of elements in one (h, w) plane
    pub fn plane(&self) -> usize {
        self.h * self.w
    }

    /// Number of (h, w) planes, i.e. n * c
    pub fn images(&self) -> usize {
        self.n * self.c
    }

    /// Flat offset of element (n, c, y, x) in row-major order
    pub fn offset(&self, n: usize, c: usize, y: usize, x: usize) -> usize {
        ((n * self.c + c) * self.h + y) * self.w + x
    }

    /// Same spatial dims with axes 0 and 1 swapped
    pub fn swap01(&self) -> Shape4 {
        Shape4::new(self.c, self.n, self.h, self.w)
    }
}

impl From<(usize, usize, usize, usize)> for Shape4 {
    fn from((n, c, h, w): (usize, usize, usize, usize)) -> Self {
        Shape4::new(n, c, h, w)
    }
}

impl fmt::Display for Shape4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.n, self.c, self.h, self.w)
    }
}

/// Contiguous row-major 4D tensor in NCHW layout
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor4<T = f32> {
    /// Flattened storage of tensor elements
    pub data: Vec<T>,
    pub shape: Shape4,
}

impl<T: Element> Tensor4<T> {
    /// Wraps an existing buffer, checking that its length matches the shape
    pub fn new_with_shape(data: Vec<T>, shape: impl Into<Shape4>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(LayoutError::buffer_len("new_with_shape", shape, data.len()));
        }
        Ok(Tensor4 { data, shape })
    }

    /// Creates a tensor filled with zeros
    pub fn zeros(shape: impl Into<Shape4>) -> Self {
        let shape = shape.into();
        Tensor4 {
            data: vec![T::zero(); shape.numel()],
            shape,
        }
    }

    /// Creates a tensor filled with `value`
    pub fn full(shape: impl Into<Shape4>, value: T) -> Self {
        let shape = shape.into();
        Tensor4 {
            data: vec![value; shape.numel()],
            shape,
        }
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn get(&self, n: usize, c: usize, y: usize, x: usize) -> T {
        self.data[self.shape.offset(n, c, y, x)]
    }

    /// Returns the (h, w) plane of image (n, c) as a flat slice
    pub fn plane(&self, n: usize, c: usize) -> &[T] {
        let start = self.shape.offset(n, c, 0, 0);
        &self.data[start..start + self.shape.plane()]
    }

    /// Checks that the buffer still holds exactly `shape.numel()` elements.
    /// Fields are public, so a caller may have resized one without the other.
    pub(crate) fn check_len(&self, operation: &'static str) -> Result<()> {
        if self.data.len() != self.shape.numel() {
            return Err(LayoutError::buffer_len(
                operation,
                self.shape,
                self.data.len(),
            ));
        }
        Ok(())
    }
}

impl Tensor4<f32> {
    /// Creates a tensor of standard-normal samples
    pub fn randn<R: Rng + ?Sized>(shape: impl Into<Shape4>, rng: &mut R) -> Self {
        let shape = shape.into();
        let data = (0..shape.numel())
            .map(|_| StandardNormal.sample(rng))
            .collect();
        Tensor4 { data, shape }
    }
}
