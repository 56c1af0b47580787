use super::pad::pad_plane;
use super::par_static_units;
use crate::padding::check_outer_axes;
use crate::{Element, Padding, Result, Tensor4};
use log::debug;

/// Pads like [`pad`](super::pad) while swapping axes 0 and 1: `matrix_in` is
/// (C, N, h, w) and `matrix_out` is (N, C, new_h, new_w).
///
/// Output plane (n, c) is filled from input plane (c, n), so no transposed
/// intermediate is ever materialized. Border rows are zeroed with `vpadding`
/// and border columns with `hpadding`, exactly as in the plain pad.
pub fn transpose01_and_pad<T: Element>(
    matrix_in: &Tensor4<T>,
    matrix_out: &mut Tensor4<T>,
) -> Result<()> {
    const OP: &str = "transpose01_and_pad";
    matrix_in.check_len(OP)?;
    matrix_out.check_len(OP)?;
    check_outer_axes(OP, matrix_in.shape, matrix_out.shape, true)?;
    let padding = Padding::between(OP, matrix_in.shape, matrix_out.shape)?;

    debug!(
        "transpose01_and_pad {} -> {} (vpadding={}, hpadding={})",
        matrix_in.shape, matrix_out.shape, padding.vpadding, padding.hpadding
    );

    let in_shape = matrix_in.shape;
    let channels = matrix_out.shape.c;
    let out_plane = matrix_out.shape.plane();
    let input = &matrix_in.data;

    par_static_units(&mut matrix_out.data, channels * out_plane, |first_n, chunk| {
        for (k, dst_plane) in chunk.chunks_exact_mut(out_plane).enumerate() {
            let n = first_n + k / channels;
            let c = k % channels;
            let start = in_shape.offset(c, n, 0, 0);
            pad_plane(&input[start..start + in_shape.plane()], dst_plane, &padding);
        }
    });

    Ok(())
}
