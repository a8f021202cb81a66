use super::*;

#[test]
fn from_pixels_rejects_wrong_length() {
    let err = RgbaImage::from_pixels(Extents::new(0, 2, 0, 2), vec![0.0; 15]).unwrap_err();
    assert!(err.to_string().contains("validation error:"));
    assert!(RgbaImage::from_pixels(Extents::new(0, 2, 0, 2), vec![0.0; 16]).is_ok());
}

#[test]
fn pixel_uses_global_coordinates() {
    let mut img = RgbaImage::transparent(Extents::new(10, 12, 5, 7));
    // (11, 6) is the last pixel
    img.pixels_mut()[12..16].copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
    assert_eq!(img.pixel(11, 6), Some([0.1, 0.2, 0.3, 0.4]));
    assert_eq!(img.pixel(10, 5), Some([0.0; 4]));
    assert_eq!(img.pixel(12, 6), None);
    assert_eq!(img.pixel(0, 0), None);
}

#[test]
fn copy_rows_clips_to_band() {
    let ext = Extents::new(0, 2, 1, 4);
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let img = RgbaImage::from_pixels(ext, data).unwrap();

    let (clipped, rows) = img.copy_rows(2, 10);
    assert_eq!(clipped, Extents::new(0, 2, 2, 4));
    assert_eq!(rows.len(), 16);
    assert_eq!(rows[0], 8.0);

    let (clipped, rows) = img.copy_rows(5, 8);
    assert!(clipped.is_empty());
    assert!(rows.is_empty());
}

#[test]
fn to_rgb8_drops_alpha_and_clamps() {
    let img = RgbaImage::from_pixels(
        Extents::new(0, 2, 0, 1),
        vec![1.0, 0.5, 0.0, 0.25, 2.0, -1.0, 0.2, 1.0],
    )
    .unwrap();
    let rgb = img.to_rgb8();
    assert_eq!(rgb.dimensions(), (2, 1));
    assert_eq!(rgb.get_pixel(0, 0).0, [255, 128, 0]);
    assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 51]);
}

#[test]
fn solid_patch_is_uniform() {
    let p = Patch::solid(3, Extents::new(0, 3, 0, 2), RgbaF32::opaque(0.5, 0.0, 1.0), 2.0);
    assert_eq!(p.extents().area(), 6);
    assert!(
        p.image
            .pixels()
            .chunks_exact(4)
            .all(|px| px == [0.5, 0.0, 1.0, 1.0])
    );
    assert!(!p.is_empty());
}
