//! Scalar pixel kernels.
//!
//! Every two-buffer kernel works on the overlap of the source extents, the
//! destination extents and an optional clip rectangle. Pixels outside the
//! overlap are never touched.

use std::ops::Range;

use crate::foundation::core::{Extents, RgbaF32};
use crate::foundation::error::{CompositorError, CompositorResult};

/// Write a constant color to every pixel.
pub fn fill(pixels: &mut [f32], color: RgbaF32) {
    let c = color.to_array();
    for px in pixels.chunks_exact_mut(4) {
        px.copy_from_slice(&c);
    }
}

/// Copy `src` into the matching sub-rectangle of `dst` without blending.
pub fn place(src: &[f32], src_ext: Extents, dst: &mut [f32], dst_ext: Extents) -> CompositorResult<()> {
    for_each_overlap_row(src, src_ext, None, dst, dst_ext, |s, d| d.copy_from_slice(s))
}

/// Composite the image over an opaque backdrop: `rgba = bg * (1 - a) + rgba`.
pub fn blend_background(pixels: &mut [f32], bg: RgbaF32) {
    let bg = bg.to_array();
    for px in pixels.chunks_exact_mut(4) {
        let alpha = 1.0 - px[3];
        for i in 0..4 {
            px[i] += bg[i] * alpha;
        }
    }
}

/// Front-to-back "under" blend; contributions must arrive nearest first.
///
/// Destination pixels that are already opaque are left alone.
pub fn blend_front_to_back(
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
) -> CompositorResult<()> {
    for_each_overlap_row(src, src_ext, clip, dst, dst_ext, front_to_back_row)
}

/// Back-to-front "over" blend; contributions must arrive farthest first.
pub fn blend_back_to_front(
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
) -> CompositorResult<()> {
    for_each_overlap_row(src, src_ext, clip, dst, dst_ext, back_to_front_row)
}

pub(crate) fn front_to_back_row(src: &[f32], dst: &mut [f32]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        if d[3] < 1.0 {
            let trans = 1.0 - d[3];
            for i in 0..4 {
                d[i] = (s[i] * trans + d[i]).clamp(0.0, 1.0);
            }
        }
    }
}

pub(crate) fn back_to_front_row(src: &[f32], dst: &mut [f32]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let trans = 1.0 - s[3];
        for i in 0..4 {
            d[i] = (d[i] * trans + s[i]).clamp(0.0, 1.0);
        }
    }
}

/// Overlap of source, destination and clip, `None` when there is no work.
pub(crate) fn overlap(src_ext: Extents, clip: Option<Extents>, dst_ext: Extents) -> Option<Extents> {
    let ov = src_ext.intersect(dst_ext)?;
    match clip {
        Some(c) => ov.intersect(c),
        None => Some(ov),
    }
}

/// Float range of row `y` restricted to the columns of `ov`.
pub(crate) fn row_span(ext: Extents, ov: Extents, y: i32) -> Range<usize> {
    let w = ext.width() as usize;
    let start = ((y - ext.min_y) as usize * w + (ov.min_x - ext.min_x) as usize) * 4;
    start..start + ov.width() as usize * 4
}

pub(crate) fn check_len(what: &str, buf: &[f32], ext: Extents) -> CompositorResult<()> {
    if buf.len() != ext.rgba_len() {
        return Err(CompositorError::validation(format!(
            "{what} buffer holds {} floats, extents need {}",
            buf.len(),
            ext.rgba_len()
        )));
    }
    Ok(())
}

fn for_each_overlap_row(
    src: &[f32],
    src_ext: Extents,
    clip: Option<Extents>,
    dst: &mut [f32],
    dst_ext: Extents,
    mut f: impl FnMut(&[f32], &mut [f32]),
) -> CompositorResult<()> {
    check_len("source", src, src_ext)?;
    check_len("destination", dst, dst_ext)?;
    let Some(ov) = overlap(src_ext, clip, dst_ext) else {
        return Ok(());
    };
    for y in ov.min_y..ov.max_y {
        f(
            &src[row_span(src_ext, ov, y)],
            &mut dst[row_span(dst_ext, ov, y)],
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/blend/kernels.rs"]
mod tests;
