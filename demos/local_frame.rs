use sortlast::{
    CompositeMode, Communicator, Compositor, CompositorConfig, Extents, LocalCluster, Patch,
    RegionMap, RgbaF32,
};

const RANKS: usize = 4;

/// A translucent disc per rank, staggered in depth.
fn disc(rank: usize, full: Extents) -> anyhow::Result<Patch> {
    let r = 48;
    let cx = 64 + rank as i32 * 40;
    let cy = 64 + rank as i32 * 24;
    let ext = Extents::new(cx - r, cx + r, cy - r, cy + r).intersect(full).unwrap_or_default();
    let hue = [
        [0.9, 0.2, 0.2],
        [0.2, 0.8, 0.3],
        [0.2, 0.4, 0.9],
        [0.9, 0.8, 0.2],
    ][rank % 4];

    let mut pixels = Vec::with_capacity(ext.rgba_len());
    for y in ext.min_y..ext.max_y {
        for x in ext.min_x..ext.max_x {
            let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
            let a = if dx * dx + dy * dy <= (r * r) as f32 { 0.7 } else { 0.0 };
            pixels.extend_from_slice(&[hue[0] * a, hue[1] * a, hue[2] * a, a]);
        }
    }
    Ok(Patch::new(rank as u32, ext, pixels, rank as f32)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let out_path = std::env::args().nth(1).unwrap_or_else(|| "sortlast_frame.png".to_owned());
    let full = Extents::screen(256, 192);
    let regions = RegionMap::identity(RANKS);
    let config = CompositorConfig::from_env()?;

    let frames = LocalCluster::run(RANKS, |comm| -> anyhow::Result<_> {
        let rank = comm.rank();
        let mut compositor = Compositor::new(comm, config.clone())?;
        compositor.set_background(RgbaF32::opaque(0.05, 0.05, 0.08));
        let patch = disc(rank, full)?;
        compositor.composite_frame(
            CompositeMode::ParallelDirectSendMany,
            std::slice::from_ref(&patch),
            &regions,
            full,
        )?;
        if compositor.is_root() {
            return Ok(Some(compositor.get_composited_image()?));
        }
        Ok(None)
    });

    for frame in frames {
        if let Some(img) = frame? {
            img.save(&out_path)?;
            println!("wrote {out_path} ({}x{})", img.width(), img.height());
        }
    }
    Ok(())
}
