use crate::blend::kernels;
use crate::comm::{Communicator, Payload, wait_all_recv};
use crate::composite::band::{BandResult, layout_bands};
use crate::foundation::config::CompositorConfig;
use crate::foundation::core::Extents;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::raster::buffer::RgbaImage;
use crate::region::partition::RegionMap;

/// Assemble every non-empty band at the root.
///
/// Non-root band owners send their band exactly once; the root places each
/// band at its vertical offset and blends the background underneath.
/// Returns the full image at the root and `None` elsewhere.
#[tracing::instrument(skip_all, fields(rank = comm.rank(), root = cfg.root))]
pub(crate) fn gather_images<C: Communicator + ?Sized>(
    comm: &C,
    cfg: &CompositorConfig,
    regions: &RegionMap,
    full: Extents,
    band: Option<BandResult>,
) -> CompositorResult<Option<RgbaImage>> {
    let me = comm.rank();
    let root = cfg.root;

    if me != root {
        if let Some(b) = band.filter(|b| !b.band.is_empty()) {
            tracing::debug!(region = b.region, rows = b.band.height(), "sending band to root");
            comm.send(root, cfg.tags.pixels, Payload::F32(b.into_image().into_pixels()))?;
        }
        return Ok(None);
    }

    let mut out = RgbaImage::transparent(full);
    if let Some(b) = band.filter(|b| !b.band.is_empty()) {
        kernels::place(b.image.pixels(), b.image.extents(), out.pixels_mut(), full)?;
    }

    let layout = layout_bands(regions.len(), full);
    let mut expected = Vec::new();
    let mut reqs = Vec::new();
    for (idx, &owner) in regions.owners().iter().enumerate() {
        let band = layout.bands[idx];
        if owner == root || band.is_empty() {
            continue;
        }
        expected.push((owner, band.extents(full.min_x, full.max_x)));
        reqs.push(comm.irecv(owner, cfg.tags.pixels)?);
    }

    for ((owner, ext), payload) in expected.into_iter().zip(wait_all_recv(reqs)?) {
        let pixels = payload.into_f32()?;
        if pixels.len() != ext.rgba_len() {
            return Err(CompositorError::protocol(format!(
                "rank {owner} sent {} floats for a {}-row band",
                pixels.len(),
                ext.height()
            )));
        }
        kernels::place(&pixels, ext, out.pixels_mut(), full)?;
    }

    kernels::blend_background(out.pixels_mut(), cfg.background);
    Ok(Some(out))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/gather.rs"]
mod tests;
