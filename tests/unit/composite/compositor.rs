use super::*;
use crate::comm::local::{LocalCluster, LocalComm};
use crate::foundation::config::BlendStrategy;

fn compositor(comm: LocalComm) -> Compositor<LocalComm> {
    Compositor::new(comm, CompositorConfig::default()).unwrap()
}

fn halves(rank: usize) -> Patch {
    let (x0, color) = if rank == 0 {
        (0, RgbaF32::opaque(1.0, 0.0, 0.0))
    } else {
        (2, RgbaF32::opaque(0.0, 1.0, 0.0))
    };
    Patch::solid(0, Extents::new(x0, x0 + 2, 0, 2), color, rank as f32)
}

#[test]
fn side_by_side_patches_cover_the_frame() {
    let full = Extents::screen(4, 2);
    let regions = RegionMap::identity(2);
    let out = LocalCluster::run(2, |comm| {
        let rank = comm.rank();
        let mut c = compositor(comm);
        c.composite_frame(
            CompositeMode::ParallelDirectSendMany,
            &[halves(rank)],
            &regions,
            full,
        )
        .unwrap();
        c.composited_image().cloned()
    });

    let img = out[0].as_ref().unwrap();
    assert!(out[1].is_none());
    for y in 0..2 {
        for x in 0..4 {
            let px = img.pixel(x, y).unwrap();
            let expected = halves(usize::from(x >= 2)).image.pixel(x, y).unwrap();
            assert_eq!(px, expected);
            assert!(px[3] > 0.0);
        }
    }
}

#[test]
fn all_modes_produce_the_same_frame() {
    let full = Extents::screen(4, 2);
    let regions = RegionMap::identity(2);
    let modes = [
        CompositeMode::SerialDirectSend,
        CompositeMode::ParallelDirectSend,
        CompositeMode::ParallelDirectSendMany,
    ];
    let out = LocalCluster::run(2, |comm| {
        let rank = comm.rank();
        let mut c = compositor(comm);
        let mut frames = Vec::new();
        for mode in modes {
            c.composite_frame(mode, &[halves(rank)], &regions, full).unwrap();
            if c.is_root() {
                frames.push(c.get_composited_image().unwrap());
            }
        }
        frames
    });

    let frames = &out[0];
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], frames[1]);
    assert_eq!(frames[1], frames[2]);
    assert_eq!(frames[0].get_pixel(3, 1).0, [0, 255, 0]);
}

#[test]
fn composited_image_is_single_use() {
    let full = Extents::screen(2, 2);
    let out = LocalCluster::run(2, |comm| {
        let mut c = compositor(comm);
        c.serial_direct_send(&[], full).unwrap();
        let first = c.get_composited_image();
        let second = c.get_composited_image();
        (first.is_ok(), second)
    });

    let (first_ok, second) = &out[0];
    assert!(*first_ok);
    assert!(matches!(second, Err(CompositorError::Finalize(_))));
    let (non_root_ok, _) = &out[1];
    assert!(!non_root_ok);
}

#[test]
fn gather_twice_is_a_no_op() {
    let full = Extents::screen(2, 4);
    let regions = RegionMap::identity(2);
    let out = LocalCluster::run(2, |comm| {
        let rank = comm.rank();
        let mut c = compositor(comm);
        let patch = Patch::solid(0, full, RgbaF32::opaque(0.0, 0.0, 1.0), rank as f32);
        let rows = c.parallel_direct_send_many(&[patch], &regions, full).unwrap();
        assert_eq!(rows, 2);
        assert!(c.band_result().is_some());
        c.gather_images().unwrap();
        c.gather_images().unwrap();
        assert!(c.band_result().is_none());
        c.composited_image().map(|img| img.pixel(1, 3))
    });
    assert_eq!(out[0], Some(Some([0.0, 0.0, 1.0, 1.0])));
}

#[test]
fn new_frame_discards_the_previous_image() {
    let full = Extents::screen(1, 1);
    let out = LocalCluster::run(1, |comm| {
        let mut c = compositor(comm);
        c.serial_direct_send(&[], full).unwrap();
        let regions = RegionMap::identity(1);
        c.parallel_direct_send_many(&[], &regions, full).unwrap();
        c.composited_image().is_some()
    });
    assert!(!out[0]);
}

#[test]
fn background_can_change_between_frames() {
    let full = Extents::screen(1, 1);
    let out = LocalCluster::run(1, |comm| {
        let mut c = compositor(comm);
        c.set_background(RgbaF32::opaque(1.0, 1.0, 1.0));
        c.serial_direct_send(&[], full).unwrap();
        c.get_composited_image().unwrap()
    });
    assert_eq!(out[0].get_pixel(0, 0).0, [255, 255, 255]);
}

#[test]
fn single_patch_mode_rejects_patch_lists() {
    let full = Extents::screen(2, 2);
    let regions = RegionMap::identity(1);
    let out = LocalCluster::run(1, |comm| {
        let mut c = compositor(comm);
        let p = Patch::solid(0, full, RgbaF32::opaque(1.0, 0.0, 0.0), 0.0);
        c.composite_frame(CompositeMode::ParallelDirectSend, &[p.clone(), p], &regions, full)
    });
    assert!(matches!(out[0], Err(CompositorError::Validation(_))));
}

#[test]
fn region_map_must_fit_the_communicator() {
    let full = Extents::screen(2, 2);
    let regions = RegionMap::new(vec![0, 3]).unwrap();
    let out = LocalCluster::run(2, |comm| {
        compositor(comm).parallel_direct_send_many(&[], &regions, full)
    });
    assert!(out.iter().all(|r| matches!(r, Err(CompositorError::Validation(_)))));
}

#[test]
fn root_outside_communicator_is_rejected() {
    let comm = LocalCluster::communicators(2).remove(0);
    let cfg = CompositorConfig {
        root: 2,
        ..CompositorConfig::default()
    };
    assert!(matches!(
        Compositor::new(comm, cfg),
        Err(CompositorError::Validation(_))
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn threaded_kernel_matches_scalar() {
    let full = Extents::screen(8, 6);
    let regions = RegionMap::identity(2);
    let scene = |rank: usize| {
        vec![
            Patch::solid(0, Extents::new(0, 6, 0, 5), RgbaF32::new(0.3, 0.1, 0.0, 0.4), rank as f32),
            Patch::solid(1, Extents::new(3, 8, 2, 6), RgbaF32::new(0.0, 0.2, 0.4, 0.6), 5.0 - rank as f32),
        ]
    };
    let run = |blend: BlendStrategy| {
        LocalCluster::run(2, |comm| {
            let rank = comm.rank();
            let cfg = CompositorConfig {
                blend,
                blend_threads: Some(2),
                ..CompositorConfig::default()
            };
            let mut c = Compositor::new(comm, cfg).unwrap();
            c.composite_frame(CompositeMode::ParallelDirectSendMany, &scene(rank), &regions, full)
                .unwrap();
            c.composited_image().cloned()
        })
        .remove(0)
    };
    assert_eq!(run(BlendStrategy::Scalar), run(BlendStrategy::Threaded));
}

#[cfg(not(feature = "parallel"))]
#[test]
fn threaded_kernel_is_unavailable_without_the_feature() {
    let comm = LocalCluster::communicators(1).remove(0);
    let cfg = CompositorConfig {
        blend: BlendStrategy::Threaded,
        ..CompositorConfig::default()
    };
    assert!(matches!(
        Compositor::new(comm, cfg),
        Err(CompositorError::Unavailable(_))
    ));
}
