//! Fixed-band direct send with one patch per rank.
//!
//! Every active rank sends a (possibly empty) slice to every other band
//! owner, so receive counts are known up front without a size exchange.

use crate::blend::BlendKernel;
use crate::comm::{Communicator, Payload, RecvRequest, wait_all_send};
use crate::composite::band::{BandResult, layout_bands};
use crate::composite::record::{PatchRecord, depth_order};
use crate::foundation::config::MessageTags;
use crate::foundation::core::Extents;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::raster::buffer::Patch;
use crate::region::partition::RegionMap;

/// Run the single-patch exchange. Returns the owned band, or `None` when this
/// rank is not in the region list.
#[tracing::instrument(skip_all, fields(rank = comm.rank(), regions = regions.len()))]
pub(crate) fn parallel_direct_send<C: Communicator + ?Sized>(
    comm: &C,
    kernel: &BlendKernel,
    tags: MessageTags,
    patch: Option<&Patch>,
    regions: &RegionMap,
    full: Extents,
) -> CompositorResult<Option<BandResult>> {
    let me = comm.rank();
    let Some(my_region) = regions.position_of(me) else {
        tracing::debug!("rank is not an active region owner");
        return Ok(None);
    };
    let layout = layout_bands(regions.len(), full);
    let bands = &layout.bands;

    let mut recvs: Vec<(usize, RecvRequest, RecvRequest)> = Vec::new();
    for &owner in regions.owners().iter().filter(|&&o| o != me) {
        recvs.push((
            owner,
            comm.irecv(owner, tags.meta)?,
            comm.irecv(owner, tags.pixels)?,
        ));
    }

    let slice_for = |band_idx: usize| -> (PatchRecord, Vec<f32>) {
        let band = bands[band_idx];
        match patch {
            Some(p) if !p.is_empty() => {
                let (clipped, rows) = p.image.copy_rows(band.start, band.end);
                let record = PatchRecord {
                    patch_id: p.id,
                    extents: clipped,
                    depth: p.depth,
                };
                (record, rows)
            }
            _ => (
                PatchRecord {
                    patch_id: 0,
                    extents: Extents::default(),
                    depth: 0.0,
                },
                Vec::new(),
            ),
        }
    };

    let mut sends = Vec::with_capacity(regions.len().saturating_sub(1) * 2);
    for (idx, &owner) in regions.owners().iter().enumerate() {
        if owner == me {
            continue;
        }
        let (record, pixels) = slice_for(idx);
        let mut meta = Vec::new();
        record.encode_into(&mut meta);
        sends.push(comm.isend(owner, tags.meta, Payload::F64(meta))?);
        sends.push(comm.isend(owner, tags.pixels, Payload::F32(pixels))?);
    }

    let mut result = BandResult::new(my_region, bands[my_region], full);

    let mut contributions: Vec<(usize, PatchRecord, Vec<f32>)> =
        Vec::with_capacity(regions.len());
    let (own_record, own_pixels) = slice_for(my_region);
    contributions.push((me, own_record, own_pixels));
    for (owner, meta_req, pixel_req) in recvs {
        let meta = meta_req.wait()?.into_f64()?;
        let pixels = pixel_req.wait()?.into_f32()?;
        let record = match PatchRecord::decode_all(&meta)?.as_slice() {
            [r] => *r,
            other => {
                return Err(CompositorError::protocol(format!(
                    "rank {owner} sent {} records, expected 1",
                    other.len()
                )));
            }
        };
        if pixels.len() != record.pixel_len() {
            return Err(CompositorError::protocol(format!(
                "rank {owner} sent {} floats for a {}-pixel slice",
                pixels.len(),
                record.extents.area()
            )));
        }
        contributions.push((owner, record, pixels));
    }

    contributions.sort_by(|a, b| {
        depth_order((a.1.depth, a.0, a.1.patch_id), (b.1.depth, b.0, b.1.patch_id))
    });
    let band_ext = result.image.extents();
    for (_, record, pixels) in &contributions {
        if record.extents.is_empty() {
            continue;
        }
        kernel.front_to_back(pixels, record.extents, None, result.image.pixels_mut(), band_ext)?;
        if let Some(hit) = record.extents.intersect(band_ext) {
            result.bbox.grow(hit);
        }
    }
    tracing::debug!(
        contributions = contributions.len(),
        band_height = result.band.height(),
        "band composited"
    );

    wait_all_send(sends)?;
    Ok(Some(result))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/single.rs"]
mod tests;
