//! Row-parallel variants of the blend operators.
//!
//! Rows of the overlap rectangle are independent, so splitting them across a
//! rayon pool and running the scalar row functions yields bit-identical
//! results.

use rayon::prelude::*;

use crate::blend::kernels::{self, check_len, overlap};
use crate::foundation::core::Extents;
use crate::foundation::error::{CompositorError, CompositorResult};

/// Build the pool backing [`crate::BlendStrategy::Threaded`].
pub(crate) fn build_thread_pool(threads: Option<usize>) -> CompositorResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CompositorError::validation(
            "blend threads must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CompositorError::unavailable(format!("failed to build rayon thread pool: {e}")))
}

/// Threaded [`kernels::blend_front_to_back`].
pub fn blend_front_to_back(
    pool: &rayon::ThreadPool,
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
) -> CompositorResult<()> {
    par_overlap_rows(pool, src, src_ext, clip, dst, dst_ext, kernels::front_to_back_row)
}

/// Threaded [`kernels::blend_back_to_front`].
pub fn blend_back_to_front(
    pool: &rayon::ThreadPool,
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
) -> CompositorResult<()> {
    par_overlap_rows(pool, src, src_ext, clip, dst, dst_ext, kernels::back_to_front_row)
}

fn par_overlap_rows(
    pool: &rayon::ThreadPool,
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
    row: fn(&[f32], &mut [f32]),
) -> CompositorResult<()> {
    check_len("source", src, src_ext)?;
    check_len("destination", dst, dst_ext)?;
    let Some(ov) = overlap(src_ext, clip, dst_ext) else {
        return Ok(());
    };

    let dst_stride = dst_ext.width() as usize * 4;
    let src_stride = src_ext.width() as usize * 4;
    let first_row = (ov.min_y - dst_ext.min_y) as usize;
    let rows = ov.height() as usize;
    let dst_rows = &mut dst[first_row * dst_stride..(first_row + rows) * dst_stride];

    let dst_col = (ov.min_x - dst_ext.min_x) as usize * 4;
    let src_col = (ov.min_x - src_ext.min_x) as usize * 4;
    let src_row0 = (ov.min_y - src_ext.min_y) as usize;
    let span = ov.width() as usize * 4;

    pool.install(|| {
        dst_rows
            .par_chunks_mut(dst_stride)
            .enumerate()
            .for_each(|(i, d)| {
                let s = (src_row0 + i) * src_stride + src_col;
                row(&src[s..s + span], &mut d[dst_col..dst_col + span]);
            });
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/blend/parallel.rs"]
mod tests;
