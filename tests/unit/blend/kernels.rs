use super::*;

fn solid(ext: Extents, px: [f32; 4]) -> Vec<f32> {
    px.repeat(ext.area() as usize)
}

#[test]
fn fill_writes_every_pixel() {
    let mut buf = vec![0.0; 12];
    fill(&mut buf, RgbaF32::new(0.1, 0.2, 0.3, 0.4));
    assert!(buf.chunks_exact(4).all(|p| p == [0.1, 0.2, 0.3, 0.4]));
}

#[test]
fn place_copies_only_the_overlap() {
    let dst_ext = Extents::new(0, 4, 0, 2);
    let mut dst = vec![0.0; dst_ext.rgba_len()];
    let src_ext = Extents::new(3, 5, 1, 3);
    let src = solid(src_ext, [1.0, 1.0, 1.0, 1.0]);

    place(&src, src_ext, &mut dst, dst_ext).unwrap();

    for (i, px) in dst.chunks_exact(4).enumerate() {
        let (x, y) = (i % 4, i / 4);
        let inside = x == 3 && y == 1;
        assert_eq!(px[3], if inside { 1.0 } else { 0.0 }, "pixel ({x},{y})");
    }
}

#[test]
fn opaque_patch_front_to_back_is_bit_identical() {
    let ext = Extents::new(2, 5, 7, 9);
    let src: Vec<f32> = (0..ext.area())
        .flat_map(|i| [i as f32 / 10.0, 0.25, 0.75, 1.0])
        .collect();
    let mut dst = vec![0.0; ext.rgba_len()];

    blend_front_to_back(&src, ext, None, &mut dst, ext).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn three_half_transparent_layers_reach_0_875() {
    let ext = Extents::new(0, 2, 0, 2);
    let layer = solid(ext, [0.5, 0.0, 0.0, 0.5]);
    let mut dst = vec![0.0; ext.rgba_len()];
    for _ in 0..3 {
        blend_front_to_back(&layer, ext, None, &mut dst, ext).unwrap();
    }
    for px in dst.chunks_exact(4) {
        assert!((px[3] - 0.875).abs() < 1e-6);
        assert!((px[0] - 0.875).abs() < 1e-6);
    }
}

#[test]
fn front_to_back_skips_opaque_destination() {
    let ext = Extents::new(0, 1, 0, 1);
    let mut dst = vec![0.2, 0.3, 0.4, 1.0];
    blend_front_to_back(&[1.0, 1.0, 1.0, 1.0], ext, None, &mut dst, ext).unwrap();
    assert_eq!(dst, vec![0.2, 0.3, 0.4, 1.0]);
}

#[test]
fn back_to_front_matches_front_to_back_when_ordered() {
    let ext = Extents::new(0, 1, 0, 1);
    let near = [0.3, 0.0, 0.0, 0.6];
    let mid = [0.0, 0.2, 0.0, 0.4];
    let far = [0.0, 0.0, 0.5, 0.5];

    let mut ftb = vec![0.0; 4];
    for layer in [near, mid, far] {
        blend_front_to_back(&layer, ext, None, &mut ftb, ext).unwrap();
    }
    let mut btf = vec![0.0; 4];
    for layer in [far, mid, near] {
        blend_back_to_front(&layer, ext, None, &mut btf, ext).unwrap();
    }
    for (a, b) in ftb.iter().zip(&btf) {
        assert!((a - b).abs() < 1e-6, "{ftb:?} vs {btf:?}");
    }
}

#[test]
fn clip_rectangle_limits_the_blend() {
    let ext = Extents::new(0, 4, 0, 4);
    let src = solid(ext, [1.0, 1.0, 1.0, 1.0]);
    let mut dst = vec![0.0; ext.rgba_len()];
    let clip = Extents::new(1, 3, 2, 3);

    blend_front_to_back(&src, ext, Some(clip), &mut dst, ext).unwrap();

    let touched = dst.chunks_exact(4).filter(|p| p[3] == 1.0).count();
    assert_eq!(touched, 2);
}

#[test]
fn disjoint_source_is_a_noop() {
    let dst_ext = Extents::new(0, 2, 0, 2);
    let src_ext = Extents::new(10, 12, 10, 12);
    let src = solid(src_ext, [1.0; 4]);
    let mut dst = vec![0.0; dst_ext.rgba_len()];
    blend_back_to_front(&src, src_ext, None, &mut dst, dst_ext).unwrap();
    assert!(dst.iter().all(|v| *v == 0.0));
}

#[test]
fn mismatched_buffer_is_rejected() {
    let ext = Extents::new(0, 2, 0, 2);
    let mut dst = vec![0.0; ext.rgba_len()];
    let err = blend_front_to_back(&[0.0; 3], ext, None, &mut dst, ext).unwrap_err();
    assert!(err.to_string().contains("source buffer"));
}

#[test]
fn transparent_image_over_background_becomes_background() {
    let mut buf = vec![0.0; 4 * 6];
    let c = RgbaF32::opaque(0.2, 0.4, 0.6);
    blend_background(&mut buf, c);
    assert!(buf.chunks_exact(4).all(|p| p == c.to_array()));
}

#[test]
fn opaque_image_hides_background() {
    let mut buf = vec![0.9, 0.8, 0.7, 1.0];
    blend_background(&mut buf, RgbaF32::opaque(0.0, 0.0, 1.0));
    assert_eq!(buf, vec![0.9, 0.8, 0.7, 1.0]);
}

#[test]
fn scalar_kernel_back_to_front_uses_the_scalar_operator() {
    let kernel = crate::blend::BlendKernel::new(crate::BlendStrategy::Scalar, None).unwrap();
    let ext = Extents::new(0, 2, 0, 1);
    let src = solid(ext, [0.0, 0.25, 0.0, 0.5]);
    let mut via_kernel = solid(ext, [0.4, 0.0, 0.0, 1.0]);
    let mut direct = via_kernel.clone();
    kernel.back_to_front(&src, ext, None, &mut via_kernel, ext).unwrap();
    blend_back_to_front(&src, ext, None, &mut direct, ext).unwrap();
    assert_eq!(via_kernel, direct);
    assert_eq!(&via_kernel[..4], &[0.2, 0.25, 0.0, 1.0]);
}

#[cfg(not(feature = "parallel"))]
#[test]
fn threaded_kernel_is_unavailable_in_scalar_only_builds() {
    let err = crate::blend::BlendKernel::new(crate::BlendStrategy::Threaded, Some(2)).unwrap_err();
    assert!(matches!(err, CompositorError::Unavailable(_)));
    assert!(err.to_string().contains("'parallel' feature"));
}
