use std::cmp::Ordering;

use crate::foundation::core::Extents;
use crate::foundation::error::{CompositorError, CompositorResult};

/// Number of `f64` fields a record occupies on the wire.
pub const RECORD_FIELDS: usize = 6;

/// Metadata describing one clipped patch slice sent to a band owner:
/// `(patch id, min_x, max_x, min_y, max_y, depth)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchRecord {
    /// Id of the patch on its owning rank.
    pub patch_id: u32,
    /// Extents of the slice; rows are already clipped to the band.
    pub extents: Extents,
    /// Compositing order key.
    pub depth: f32,
}

impl PatchRecord {
    /// Append the wire form.
    pub fn encode_into(&self, out: &mut Vec<f64>) {
        let e = self.extents;
        out.extend_from_slice(&[
            f64::from(self.patch_id),
            f64::from(e.min_x),
            f64::from(e.max_x),
            f64::from(e.min_y),
            f64::from(e.max_y),
            f64::from(self.depth),
        ]);
    }

    /// Decode a flat buffer holding whole records.
    pub fn decode_all(buf: &[f64]) -> CompositorResult<Vec<Self>> {
        if !buf.len().is_multiple_of(RECORD_FIELDS) {
            return Err(CompositorError::protocol(format!(
                "record buffer of {} values is not a multiple of {RECORD_FIELDS}",
                buf.len()
            )));
        }
        Ok(buf
            .chunks_exact(RECORD_FIELDS)
            .map(|r| Self {
                patch_id: r[0] as u32,
                extents: Extents::new(r[1] as i32, r[2] as i32, r[3] as i32, r[4] as i32),
                depth: r[5] as f32,
            })
            .collect())
    }

    /// Pixel floats the slice carries.
    pub fn pixel_len(&self) -> usize {
        self.extents.rgba_len()
    }
}

/// Front-to-back order: nearest depth first, ties broken by owning rank and
/// then patch id so the result never depends on arrival order.
pub fn depth_order(a: (f32, usize, u32), b: (f32, usize, u32)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then(a.2.cmp(&b.2))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/record.rs"]
mod tests;
