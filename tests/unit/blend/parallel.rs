use super::*;
use crate::blend::kernels as scalar;

fn gradient(ext: Extents, seed: f32) -> Vec<f32> {
    (0..ext.area())
        .flat_map(|i| {
            let t = ((i as f32 * 0.37 + seed) % 1.0).abs();
            [t, 1.0 - t, t * 0.5, (t * 0.9).min(1.0)]
        })
        .collect()
}

#[test]
fn threaded_front_to_back_matches_scalar() {
    let pool = build_thread_pool(Some(3)).unwrap();
    let dst_ext = Extents::new(0, 17, 0, 13);
    let src_ext = Extents::new(-3, 9, 4, 20);
    let clip = Some(Extents::new(0, 17, 5, 12));
    let src = gradient(src_ext, 0.1);
    let base = gradient(dst_ext, 0.6);

    let mut a = base.clone();
    let mut b = base;
    scalar::blend_front_to_back(&src, src_ext, clip, &mut a, dst_ext).unwrap();
    blend_front_to_back(&pool, &src, src_ext, clip, &mut b, dst_ext).unwrap();
    assert_eq!(a, b);
}

#[test]
fn threaded_back_to_front_matches_scalar() {
    let pool = build_thread_pool(Some(2)).unwrap();
    let dst_ext = Extents::new(5, 30, 5, 9);
    let src_ext = Extents::new(0, 12, 0, 40);
    let src = gradient(src_ext, 0.3);
    let base = gradient(dst_ext, 0.2);

    let mut a = base.clone();
    let mut b = base;
    scalar::blend_back_to_front(&src, src_ext, None, &mut a, dst_ext).unwrap();
    blend_back_to_front(&pool, &src, src_ext, None, &mut b, dst_ext).unwrap();
    assert_eq!(a, b);
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
}

#[test]
fn threaded_kernel_dispatches_back_to_front_to_the_pool() {
    let kernel =
        crate::blend::BlendKernel::new(crate::BlendStrategy::Threaded, Some(2)).unwrap();
    assert_eq!(kernel.strategy(), crate::BlendStrategy::Threaded);
    let dst_ext = Extents::new(0, 9, 0, 7);
    let src_ext = Extents::new(2, 11, -1, 5);
    let clip = Some(Extents::new(0, 9, 1, 6));
    let src = gradient(src_ext, 0.45);
    let base = gradient(dst_ext, 0.8);

    let mut a = base.clone();
    let mut b = base;
    scalar::blend_back_to_front(&src, src_ext, clip, &mut a, dst_ext).unwrap();
    kernel.back_to_front(&src, src_ext, clip, &mut b, dst_ext).unwrap();
    assert_eq!(a, b);
}
