//! Dtype-tagged entry points.
//!
//! Callers that only know the element type at runtime hand in [`AnyTensor`]s.
//! These wrappers accept float32 buffers and reject everything else with
//! `UnsupportedDtype` before any data is touched. The typed kernels in
//! [`crate::kernels`] stay generic over [`Element`].

use crate::{kernels, DType, Element, LayoutError, Result, Shape4, Tensor4};

/// A 4D tensor whose element type is only known at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTensor {
    F32(Tensor4<f32>),
    F64(Tensor4<f64>),
    I32(Tensor4<i32>),
    I64(Tensor4<i64>),
    U8(Tensor4<u8>),
}

impl AnyTensor {
    pub fn dtype(&self) -> DType {
        match self {
            AnyTensor::F32(_) => DType::F32,
            AnyTensor::F64(_) => DType::F64,
            AnyTensor::I32(_) => DType::I32,
            AnyTensor::I64(_) => DType::I64,
            AnyTensor::U8(_) => DType::U8,
        }
    }

    pub fn shape(&self) -> Shape4 {
        match self {
            AnyTensor::F32(t) => t.shape,
            AnyTensor::F64(t) => t.shape,
            AnyTensor::I32(t) => t.shape,
            AnyTensor::I64(t) => t.shape,
            AnyTensor::U8(t) => t.shape,
        }
    }
}

macro_rules! impl_from_tensor {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Tensor4<$ty>> for AnyTensor {
                fn from(tensor: Tensor4<$ty>) -> Self {
                    AnyTensor::$variant(tensor)
                }
            }
        )*
    };
}

impl_from_tensor!(f32 => F32, f64 => F64, i32 => I32, i64 => I64, u8 => U8);

type Kernel = fn(&Tensor4<f32>, &mut Tensor4<f32>) -> Result<()>;

/// Unwraps both buffers as float32 or fails with `UnsupportedDtype`
fn dispatch_f32(
    operation: &'static str,
    matrix_in: &AnyTensor,
    matrix_out: &mut AnyTensor,
    kernel: Kernel,
) -> Result<()> {
    let in_dtype = matrix_in.dtype();
    let out_dtype = matrix_out.dtype();
    match (matrix_in, matrix_out) {
        (AnyTensor::F32(input), AnyTensor::F32(output)) => kernel(input, output),
        _ => {
            let got = if in_dtype != f32::DTYPE {
                in_dtype
            } else {
                out_dtype
            };
            Err(LayoutError::UnsupportedDtype {
                operation,
                expected: f32::DTYPE,
                got,
            })
        }
    }
}

pub fn pad(matrix_in: &AnyTensor, matrix_out: &mut AnyTensor) -> Result<()> {
    dispatch_f32("pad", matrix_in, matrix_out, kernels::pad)
}

pub fn transpose01_and_pad(matrix_in: &AnyTensor, matrix_out: &mut AnyTensor) -> Result<()> {
    dispatch_f32(
        "transpose01_and_pad",
        matrix_in,
        matrix_out,
        kernels::transpose01_and_pad,
    )
}

pub fn shrink(matrix_in: &AnyTensor, matrix_out: &mut AnyTensor) -> Result<()> {
    dispatch_f32("shrink", matrix_in, matrix_out, kernels::shrink)
}

pub fn shrink_naive(matrix_in: &AnyTensor, matrix_out: &mut AnyTensor) -> Result<()> {
    dispatch_f32("shrink_naive", matrix_in, matrix_out, kernels::shrink_naive)
}

pub fn shrink_block(matrix_in: &AnyTensor, matrix_out: &mut AnyTensor) -> Result<()> {
    dispatch_f32("shrink_block", matrix_in, matrix_out, kernels::shrink_block)
}
