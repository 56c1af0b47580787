use super::par_static_units;
use crate::padding::check_outer_axes;
use crate::{Element, Padding, Result, Tensor4};
use log::debug;

/// Copies `matrix_in` (N, C, h, w) into the interior of `matrix_out`
/// (N, C, h + 2*vpadding, w + 2*hpadding) and zeroes the border.
///
/// The output is fully overwritten, so it may hold anything on entry.
/// Work is split over the batch axis.
///
/// # Errors
/// * `ShapeMismatch` - a buffer disagrees with its shape, or N/C differ
/// * `InvalidOperation` - spatial dims are already equal
/// * `UnsupportedPadding` - the size deltas are odd or negative
pub fn pad<T: Element>(matrix_in: &Tensor4<T>, matrix_out: &mut Tensor4<T>) -> Result<()> {
    const OP: &str = "pad";
    matrix_in.check_len(OP)?;
    matrix_out.check_len(OP)?;
    check_outer_axes(OP, matrix_in.shape, matrix_out.shape, false)?;
    let padding = Padding::between(OP, matrix_in.shape, matrix_out.shape)?;

    debug!(
        "pad {} -> {} (vpadding={}, hpadding={})",
        matrix_in.shape, matrix_out.shape, padding.vpadding, padding.hpadding
    );

    let channels = matrix_in.shape.c;
    let in_plane = matrix_in.shape.plane();
    let out_plane = matrix_out.shape.plane();
    let input = &matrix_in.data;

    par_static_units(&mut matrix_out.data, channels * out_plane, |first_n, chunk| {
        for (k, dst_plane) in chunk.chunks_exact_mut(out_plane).enumerate() {
            let n = first_n + k / channels;
            let c = k % channels;
            let start = (n * channels + c) * in_plane;
            pad_plane(&input[start..start + in_plane], dst_plane, &padding);
        }
    });

    Ok(())
}

/// Writes one padded (new_h, new_w) plane from an unpadded (h, w) plane in a
/// single top-to-bottom pass. Shared with the transposing variant, which only
/// differs in which source plane it hands in.
pub(crate) fn pad_plane<T: Element>(src: &[T], dst: &mut [T], padding: &Padding) {
    let zero = T::zero();
    let Padding {
        h,
        w,
        new_w,
        vpadding,
        hpadding,
        ..
    } = *padding;

    let (top, rest) = dst.split_at_mut(vpadding * new_w);
    let (interior, bottom) = rest.split_at_mut(h * new_w);

    // Top and bottom strips have the same number of rows
    for (top_row, bottom_row) in top
        .chunks_exact_mut(new_w)
        .zip(bottom.chunks_exact_mut(new_w))
    {
        top_row.fill(zero);
        bottom_row.fill(zero);
    }

    if w == 0 {
        interior.fill(zero);
        return;
    }

    for (dst_row, src_row) in interior.chunks_exact_mut(new_w).zip(src.chunks_exact(w)) {
        let (left, rest) = dst_row.split_at_mut(hpadding);
        let (body, right) = rest.split_at_mut(w);
        left.fill(zero);
        body.copy_from_slice(src_row);
        right.fill(zero);
    }
}
