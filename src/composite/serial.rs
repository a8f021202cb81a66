//! Gather-everything-to-root fallback.
//!
//! Robust for irregular or non-convex patch sets where band redistribution
//! is unsafe, at the cost of serializing all blending on the root.

use std::borrow::Cow;

use crate::blend::{BlendKernel, kernels};
use crate::comm::{Communicator, Payload};
use crate::composite::record::depth_order;
use crate::foundation::config::CompositorConfig;
use crate::foundation::core::Extents;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::raster::buffer::{Patch, RgbaImage};

/// Composite every rank's patches on the root. Returns the finished image
/// (background applied) at the root and `None` elsewhere.
#[tracing::instrument(skip_all, fields(rank = comm.rank(), patches = patches.len()))]
pub(crate) fn serial_direct_send<C: Communicator + ?Sized>(
    comm: &C,
    kernel: &BlendKernel,
    cfg: &CompositorConfig,
    patches: &[Patch],
    full: Extents,
) -> CompositorResult<Option<RgbaImage>> {
    let root = cfg.root;
    let me = comm.rank();

    // Local send order; the root reconstructs it from the gathered depths.
    let mut local: Vec<&Patch> = patches
        .iter()
        .filter(|p| !p.is_empty() && p.extents().intersect(full).is_some())
        .collect();
    local.sort_by(|a, b| depth_order((a.depth, me, a.id), (b.depth, me, b.id)));

    let counts = comm.gather_i64(root, local.len() as i64)?;
    let depths = comm.gatherv_f32(root, local.iter().map(|p| p.depth).collect(), counts.as_deref())?;

    let (Some(counts), Some(depths)) = (counts, depths) else {
        for p in &local {
            let e = p.extents();
            comm.send(
                root,
                cfg.tags.meta,
                Payload::I64(vec![
                    i64::from(e.min_x),
                    i64::from(e.max_x),
                    i64::from(e.min_y),
                    i64::from(e.max_y),
                ]),
            )?;
            comm.send(root, cfg.tags.pixels, Payload::F32(p.image.pixels().to_vec()))?;
        }
        tracing::debug!(sent = local.len(), "patches sent to root");
        return Ok(None);
    };

    // (depth, rank, position within that rank's send order)
    let mut order = Vec::with_capacity(depths.len());
    let mut offset = 0usize;
    for (rank, &count) in counts.iter().enumerate() {
        let count = count.max(0) as usize;
        for (pos, &depth) in depths[offset..offset + count].iter().enumerate() {
            order.push((depth, rank, pos as u32));
        }
        offset += count;
    }
    order.sort_by(|a, b| depth_order(*a, *b));

    let mut acc = RgbaImage::transparent(full);
    for (_, rank, pos) in order {
        let (ext, pixels): (Extents, Cow<'_, [f32]>) = if rank == root {
            let p = local[pos as usize];
            (p.extents(), Cow::Borrowed(p.image.pixels()))
        } else {
            receive_patch(comm, cfg, rank)?
        };
        kernel.front_to_back(&pixels, ext, None, acc.pixels_mut(), full)?;
    }
    kernels::blend_background(acc.pixels_mut(), cfg.background);
    tracing::debug!(total = offset, "serial composite finished");
    Ok(Some(acc))
}

fn receive_patch<C: Communicator + ?Sized>(
    comm: &C,
    cfg: &CompositorConfig,
    rank: usize,
) -> CompositorResult<(Extents, Cow<'static, [f32]>)> {
    let meta = comm.recv(rank, cfg.tags.meta)?.into_i64()?;
    let [min_x, max_x, min_y, max_y] = meta[..] else {
        return Err(CompositorError::protocol(format!(
            "patch extents from rank {rank} have {} fields, expected 4",
            meta.len()
        )));
    };
    let ext = Extents::new(min_x as i32, max_x as i32, min_y as i32, max_y as i32);
    let pixels = comm.recv(rank, cfg.tags.pixels)?.into_f32()?;
    if pixels.len() != ext.rgba_len() {
        return Err(CompositorError::protocol(format!(
            "rank {rank} sent {} floats for a patch of {} pixels",
            pixels.len(),
            ext.area()
        )));
    }
    Ok((ext, Cow::Owned(pixels)))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/serial.rs"]
mod tests;
