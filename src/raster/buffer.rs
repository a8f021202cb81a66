use crate::foundation::core::{Extents, RgbaF32};
use crate::foundation::error::{CompositorError, CompositorResult};

/// Dense RGBA `f32` buffer placed at known screen extents.
///
/// Pixels are stored row-major starting at `(min_x, min_y)`, four floats per
/// pixel, values expected in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    extents: Extents,
    data: Vec<f32>,
}

impl RgbaImage {
    /// A fully transparent image covering `extents`.
    pub fn transparent(extents: Extents) -> Self {
        Self {
            extents,
            data: vec![0.0; extents.rgba_len()],
        }
    }

    /// Wrap an existing pixel buffer; its length must match the extents.
    pub fn from_pixels(extents: Extents, data: Vec<f32>) -> CompositorResult<Self> {
        if data.len() != extents.rgba_len() {
            return Err(CompositorError::validation(format!(
                "rgba buffer of {} floats does not match {}x{} extents",
                data.len(),
                extents.width().max(0),
                extents.height().max(0)
            )));
        }
        Ok(Self { extents, data })
    }

    /// An image of uniform color.
    pub fn filled(extents: Extents, color: RgbaF32) -> Self {
        let mut img = Self::transparent(extents);
        crate::blend::kernels::fill(img.pixels_mut(), color);
        img
    }

    /// Screen placement.
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.extents.width().max(0)
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.extents.height().max(0)
    }

    /// Raw RGBA floats.
    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw RGBA floats.
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Release the buffer.
    pub fn into_pixels(self) -> Vec<f32> {
        self.data
    }

    /// Pixel at global coordinates, `None` outside the extents.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        let e = self.extents;
        if x < e.min_x || x >= e.max_x || y < e.min_y || y >= e.max_y {
            return None;
        }
        let idx = (((y - e.min_y) as usize) * (e.width() as usize) + (x - e.min_x) as usize) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Copy of the rows `[start, end)` intersected with this image, packed
    /// row-major. Returns the clipped extents alongside the pixels.
    pub fn copy_rows(&self, start: i32, end: i32) -> (Extents, Vec<f32>) {
        let clipped = self.extents.clip_rows(start, end);
        if clipped.is_empty() {
            return (clipped, Vec::new());
        }
        let row_len = self.extents.width() as usize * 4;
        let first = (clipped.min_y - self.extents.min_y) as usize * row_len;
        let last = (clipped.max_y - self.extents.min_y) as usize * row_len;
        (clipped, self.data[first..last].to_vec())
    }

    /// Convert to 8-bit RGB for display, dropping alpha.
    pub fn to_rgb8(&self) -> ::image::RgbImage {
        let mut out = ::image::RgbImage::new(self.width() as u32, self.height() as u32);
        for (dst, src) in out.pixels_mut().zip(self.data.chunks_exact(4)) {
            dst.0 = [to_u8(src[0]), to_u8(src[1]), to_u8(src[2])];
        }
        out
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A rendered sub-image with its screen placement and depth key.
///
/// The depth key is the eye-space distance from the camera: smaller values
/// are nearer and are blended first.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    /// Caller-chosen identifier, unique within the owning rank.
    pub id: u32,
    /// Pixels and placement.
    pub image: RgbaImage,
    /// Compositing order key.
    pub depth: f32,
}

impl Patch {
    /// Build a patch from raw pixels.
    pub fn new(id: u32, extents: Extents, pixels: Vec<f32>, depth: f32) -> CompositorResult<Self> {
        Ok(Self {
            id,
            image: RgbaImage::from_pixels(extents, pixels)?,
            depth,
        })
    }

    /// A uniformly colored patch.
    pub fn solid(id: u32, extents: Extents, color: RgbaF32, depth: f32) -> Self {
        Self {
            id,
            image: RgbaImage::filled(extents, color),
            depth,
        }
    }

    /// Screen placement.
    pub fn extents(&self) -> Extents {
        self.image.extents()
    }

    /// True when the patch covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.image.extents().is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
