//! Direct send with arbitrarily many patches per rank.
//!
//! Per frame, every rank:
//! 1. splits each local patch into per-band slices,
//! 2. tells each band owner, through one all-to-all, exactly how many slices
//!    and pixels it will receive,
//! 3. ships the slices (records + packed pixels) with non-blocking sends,
//! 4. receives its own band's slices, sorts them by depth and blends them
//!    front to back.
//!
//! Blending starts only after every expected message has arrived, so the
//! result is independent of arrival order.

use crate::blend::BlendKernel;
use crate::comm::{Communicator, Payload, RecvRequest, SendRequest, wait_all_send};
use crate::composite::band::{BandResult, layout_bands};
use crate::composite::record::{PatchRecord, RECORD_FIELDS, depth_order};
use crate::foundation::config::MessageTags;
use crate::foundation::core::{Band, Extents};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::raster::buffer::Patch;
use crate::region::partition::{RegionMap, find_regions_for_patch};

/// Integers per rank in the size-exchange summary: `(slices, pixels)`.
const SUMMARY_FIELDS: usize = 2;

/// Slices of local patches destined for one band.
#[derive(Default)]
struct Outgoing<'p> {
    slices: Vec<(PatchRecord, &'p Patch)>,
    pixels: i64,
}

impl Outgoing<'_> {
    fn pack(&self) -> (Vec<f64>, Vec<f32>) {
        let mut meta = Vec::with_capacity(self.slices.len() * RECORD_FIELDS);
        let mut pixels = Vec::with_capacity(self.pixels as usize * 4);
        for (record, patch) in &self.slices {
            record.encode_into(&mut meta);
            pixels.extend_from_slice(slice_pixels(patch, record.extents));
        }
        (meta, pixels)
    }
}

/// Rows `[ext.min_y, ext.max_y)` of a patch; the slice keeps the patch's
/// full width so it is contiguous.
fn slice_pixels(patch: &Patch, ext: Extents) -> &[f32] {
    let pe = patch.extents();
    let row_len = pe.width() as usize * 4;
    let first = (ext.min_y - pe.min_y) as usize * row_len;
    let last = (ext.max_y - pe.min_y) as usize * row_len;
    &patch.image.pixels()[first..last]
}

/// One slice ready to blend.
struct Contribution<'a> {
    rank: usize,
    record: PatchRecord,
    pixels: &'a [f32],
}

/// Run the many-patch exchange. Returns the owned band, or `None` when this
/// rank owns no band.
#[tracing::instrument(skip_all, fields(rank = comm.rank(), patches = patches.len(), regions = regions.len()))]
pub(crate) fn parallel_direct_send_many<C: Communicator + ?Sized>(
    comm: &C,
    kernel: &BlendKernel,
    tags: MessageTags,
    patches: &[Patch],
    regions: &RegionMap,
    full: Extents,
) -> CompositorResult<Option<BandResult>> {
    let me = comm.rank();
    let size = comm.size();
    let my_region = regions.position_of(me);
    let layout = layout_bands(regions.len(), full);
    let bands = &layout.bands;

    let mut outgoing: Vec<Outgoing<'_>> = (0..regions.len()).map(|_| Outgoing::default()).collect();
    for patch in patches {
        let Some(span) = find_regions_for_patch(patch.extents(), full, bands) else {
            continue;
        };
        for idx in span.indices() {
            let clipped = patch.extents().clip_rows(bands[idx].start, bands[idx].end);
            if clipped.is_empty() {
                continue;
            }
            let out = &mut outgoing[idx];
            out.pixels += clipped.area();
            out.slices.push((
                PatchRecord {
                    patch_id: patch.id,
                    extents: clipped,
                    depth: patch.depth,
                },
                patch,
            ));
        }
    }

    let mut summary = vec![0i64; size * SUMMARY_FIELDS];
    for (idx, out) in outgoing.iter().enumerate() {
        if let Some(owner) = regions.owner(idx) {
            summary[owner * SUMMARY_FIELDS] = out.slices.len() as i64;
            summary[owner * SUMMARY_FIELDS + 1] = out.pixels;
        }
    }
    let incoming = comm.all_to_all_i64(&summary, SUMMARY_FIELDS)?;

    let mut sends: Vec<SendRequest> = Vec::new();
    for (idx, out) in outgoing.iter().enumerate() {
        let Some(owner) = regions.owner(idx) else {
            continue;
        };
        if owner == me || out.slices.is_empty() {
            continue;
        }
        let (meta, pixels) = out.pack();
        tracing::trace!(to = owner, slices = out.slices.len(), floats = pixels.len(), "band payload");
        sends.push(comm.isend(owner, tags.meta, Payload::F64(meta))?);
        sends.push(comm.isend(owner, tags.pixels, Payload::F32(pixels))?);
    }

    let result = match my_region {
        Some(region) if !bands[region].is_empty() => Some(composite_band(
            comm,
            kernel,
            tags,
            &incoming,
            &outgoing[region],
            region,
            bands[region],
            full,
        )?),
        Some(region) => Some(BandResult::new(region, bands[region], full)),
        None => None,
    };

    wait_all_send(sends)?;
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn composite_band<C: Communicator + ?Sized>(
    comm: &C,
    kernel: &BlendKernel,
    tags: MessageTags,
    incoming: &[i64],
    own: &Outgoing<'_>,
    region: usize,
    band: Band,
    full: Extents,
) -> CompositorResult<BandResult> {
    let me = comm.rank();

    let mut recvs: Vec<(usize, i64, i64, RecvRequest, RecvRequest)> = Vec::new();
    for (src, counts) in incoming.chunks_exact(SUMMARY_FIELDS).enumerate() {
        let (slices, pixels) = (counts[0], counts[1]);
        if src == me || slices == 0 {
            continue;
        }
        recvs.push((
            src,
            slices,
            pixels,
            comm.irecv(src, tags.meta)?,
            comm.irecv(src, tags.pixels)?,
        ));
    }

    let mut received: Vec<(usize, Vec<PatchRecord>, Vec<f32>)> = Vec::with_capacity(recvs.len());
    for (src, slices, pixels, meta_req, pixel_req) in recvs {
        let records = PatchRecord::decode_all(&meta_req.wait()?.into_f64()?)?;
        let data = pixel_req.wait()?.into_f32()?;
        if records.len() as i64 != slices || data.len() as i64 != pixels * 4 {
            return Err(CompositorError::protocol(format!(
                "rank {src} announced {slices} slices / {pixels} pixels, sent {} / {}",
                records.len(),
                data.len() / 4
            )));
        }
        received.push((src, records, data));
    }

    let mut contributions: Vec<Contribution<'_>> = own
        .slices
        .iter()
        .map(|(record, patch)| Contribution {
            rank: me,
            record: *record,
            pixels: slice_pixels(patch, record.extents),
        })
        .collect();
    for (src, records, data) in &received {
        let mut offset = 0usize;
        for record in records {
            let len = record.pixel_len();
            let pixels = data.get(offset..offset + len).ok_or_else(|| {
                CompositorError::protocol(format!("rank {src} pixel payload is truncated"))
            })?;
            offset += len;
            contributions.push(Contribution {
                rank: *src,
                record: *record,
                pixels,
            });
        }
        if offset != data.len() {
            return Err(CompositorError::protocol(format!(
                "rank {src} sent {} pixel floats but its records describe {offset}",
                data.len()
            )));
        }
    }

    contributions.sort_by(|a, b| {
        depth_order(
            (a.record.depth, a.rank, a.record.patch_id),
            (b.record.depth, b.rank, b.record.patch_id),
        )
    });

    let mut result = BandResult::new(region, band, full);
    let band_ext = result.image.extents();
    for c in &contributions {
        kernel.front_to_back(c.pixels, c.record.extents, None, result.image.pixels_mut(), band_ext)?;
        if let Some(hit) = c.record.extents.intersect(band_ext) {
            result.bbox.grow(hit);
        }
    }
    if contributions.is_empty() {
        result.bbox.reset();
    }
    tracing::debug!(
        region,
        contributions = contributions.len(),
        senders = received.len(),
        "band composited"
    );
    Ok(result)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/many.rs"]
mod tests;
