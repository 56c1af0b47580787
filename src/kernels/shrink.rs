use super::par_static_units;
use crate::padding::check_outer_axes;
use crate::{Element, Padding, Result, Tensor4};
use log::debug;

/// Copies the interior of a padded `matrix_in` (N, C, inh, inw) into
/// `matrix_out` (N, C, h, w), one element at a time.
///
/// Work is split over the flattened N*C image index.
pub fn shrink_naive<T: Element>(matrix_in: &Tensor4<T>, matrix_out: &mut Tensor4<T>) -> Result<()> {
    shrink_with(matrix_in, matrix_out, "shrink_naive", shrink_plane_naive)
}

/// Same contract as [`shrink_naive`], copying whole rows as contiguous
/// blocks. Output is bit-identical to the naive variant.
pub fn shrink_block<T: Element>(matrix_in: &Tensor4<T>, matrix_out: &mut Tensor4<T>) -> Result<()> {
    shrink_with(matrix_in, matrix_out, "shrink_block", shrink_plane_block)
}

/// Default shrink, the block-copy variant
pub fn shrink<T: Element>(matrix_in: &Tensor4<T>, matrix_out: &mut Tensor4<T>) -> Result<()> {
    shrink_block(matrix_in, matrix_out)
}

fn shrink_with<T: Element>(
    matrix_in: &Tensor4<T>,
    matrix_out: &mut Tensor4<T>,
    operation: &'static str,
    shrink_plane: fn(&[T], &mut [T], &Padding),
) -> Result<()> {
    matrix_in.check_len(operation)?;
    matrix_out.check_len(operation)?;
    check_outer_axes(operation, matrix_out.shape, matrix_in.shape, false)?;
    // Roles are reversed relative to pad: the output is the smaller tensor
    let padding = Padding::between(operation, matrix_out.shape, matrix_in.shape)?;

    debug!(
        "{} {} -> {} (vpadding={}, hpadding={})",
        operation, matrix_in.shape, matrix_out.shape, padding.vpadding, padding.hpadding
    );

    let in_plane = matrix_in.shape.plane();
    let out_plane = matrix_out.shape.plane();
    let input = &matrix_in.data;

    par_static_units(&mut matrix_out.data, out_plane, |first_image, chunk| {
        for (k, dst_plane) in chunk.chunks_exact_mut(out_plane).enumerate() {
            let start = (first_image + k) * in_plane;
            shrink_plane(&input[start..start + in_plane], dst_plane, &padding);
        }
    });

    Ok(())
}

/// Walks the `h` interior rows with running offsets: the input offset moves
/// by `new_w` per row (skipping `2*hpadding` border elements), the output by `w`.
fn shrink_plane_naive<T: Element>(src: &[T], dst: &mut [T], padding: &Padding) {
    let mut in_offset = padding.vpadding * padding.new_w + padding.hpadding;
    let mut out_offset = 0;

    for _ in 0..padding.h {
        for x in 0..padding.w {
            dst[out_offset + x] = src[in_offset + x];
        }
        in_offset += padding.new_w;
        out_offset += padding.w;
    }
}

#[inline(always)]
fn copy_row<T: Element>(dst: &mut [T], out_offset: usize, src: &[T], in_offset: usize, w: usize) {
    dst[out_offset..out_offset + w].copy_from_slice(&src[in_offset..in_offset + w]);
}

/// Row-wise block copy. With `h` a positive multiple of 4 the row loop is
/// unrolled by 4; row `r` of a group sits `r * new_w` after the group start in
/// `src` and `r * w` after it in `dst`.
fn shrink_plane_block<T: Element>(src: &[T], dst: &mut [T], padding: &Padding) {
    let Padding {
        h,
        w,
        new_w: in_stride,
        vpadding,
        hpadding,
        ..
    } = *padding;

    let mut in_offset = vpadding * in_stride + hpadding;
    let mut out_offset = 0;

    if h >= 4 && h % 4 == 0 {
        let (in_d1, in_d2, in_d3) = (in_stride, 2 * in_stride, 3 * in_stride);
        let (out_d1, out_d2, out_d3) = (w, 2 * w, 3 * w);

        for _ in 0..h / 4 {
            copy_row(dst, out_offset, src, in_offset, w);
            copy_row(dst, out_offset + out_d1, src, in_offset + in_d1, w);
            copy_row(dst, out_offset + out_d2, src, in_offset + in_d2, w);
            copy_row(dst, out_offset + out_d3, src, in_offset + in_d3, w);
            in_offset += 4 * in_stride;
            out_offset += 4 * w;
        }
    } else {
        for _ in 0..h {
            copy_row(dst, out_offset, src, in_offset, w);
            in_offset += in_stride;
            out_offset += w;
        }
    }
}
