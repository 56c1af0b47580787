use rayon::prelude::*;

mod pad;
mod shrink;
mod transpose_pad;

pub use pad::pad;
pub use shrink::{shrink, shrink_block, shrink_naive};
pub use transpose_pad::transpose01_and_pad;

/// Splits `data` into one contiguous chunk of whole units per rayon worker
/// and runs `f(first_unit, chunk)` on each chunk in parallel.
///
/// A unit is `unit_len` consecutive elements (one batch item or one image).
/// Chunks are disjoint, so `f` may write its chunk without synchronization.
pub(crate) fn par_static_units<T, F>(data: &mut [T], unit_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if unit_len == 0 || data.is_empty() {
        return;
    }
    let units = data.len() / unit_len;
    let threads = rayon::current_num_threads().max(1);
    let units_per_chunk = ((units + threads - 1) / threads).max(1);

    data.par_chunks_mut(units_per_chunk * unit_len)
        .enumerate()
        .for_each(|(i, chunk)| f(i * units_per_chunk, chunk));
}
