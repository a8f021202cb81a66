use crate::foundation::core::{Band, BoundingBox, Extents};
use crate::raster::buffer::RgbaImage;
use crate::region::partition::{RegionExtents, compute_region_extents};

/// The composited band a rank owns after a parallel direct-send pass.
#[derive(Clone, Debug)]
pub struct BandResult {
    pub(crate) region: usize,
    pub(crate) band: Band,
    pub(crate) image: RgbaImage,
    pub(crate) bbox: BoundingBox,
}

impl BandResult {
    pub(crate) fn new(region: usize, band: Band, full: Extents) -> Self {
        Self {
            region,
            band,
            image: RgbaImage::transparent(band.extents(full.min_x, full.max_x)),
            bbox: BoundingBox::empty(),
        }
    }

    /// Index of the band in the region list.
    pub fn region(&self) -> usize {
        self.region
    }

    /// Rows covered.
    pub fn band(&self) -> Band {
        self.band
    }

    /// Union of the extents blended into the band; empty when nothing was.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// The composited pixels, full image width.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Bands for `num_regions` regions placed inside `full`.
pub(crate) fn layout_bands(num_regions: usize, full: Extents) -> RegionExtents {
    let mut re = compute_region_extents(num_regions, full.height());
    for b in &mut re.bands {
        b.start += full.min_y;
        b.end += full.min_y;
    }
    re
}
