use std::ops::RangeInclusive;

use crate::foundation::core::{Band, Extents};
use crate::foundation::error::{CompositorError, CompositorResult};

/// Horizontal bands tiling `[0, height)`, one per region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionExtents {
    /// Band `i` belongs to region `i`.
    pub bands: Vec<Band>,
    /// Tallest band, for sizing band buffers.
    pub max_band_height: i32,
}

/// Split `height` rows into `num_regions` contiguous bands.
///
/// Every band is `round(height / num_regions)` rows tall, clamped to the
/// image; the last band absorbs whatever rounding left over. The bands tile
/// `[0, height)` exactly, trailing bands may be empty.
pub fn compute_region_extents(num_regions: usize, height: i32) -> RegionExtents {
    if num_regions == 0 {
        return RegionExtents {
            bands: Vec::new(),
            max_band_height: 0,
        };
    }
    let height = height.max(0);
    let band_height = (f64::from(height) / num_regions as f64).round() as i64;
    let clamp = |v: i64| v.clamp(0, i64::from(height)) as i32;

    let mut bands: Vec<Band> = (0..num_regions as i64)
        .map(|i| Band {
            start: clamp(i * band_height),
            end: clamp((i + 1) * band_height),
        })
        .collect();
    if let Some(last) = bands.last_mut()
        && last.end < height
    {
        last.end = height;
    }

    let max_band_height = bands.iter().map(|b| b.height()).max().unwrap_or(0);
    RegionExtents {
        bands,
        max_band_height,
    }
}

/// Inclusive range of bands a patch overlaps. Always contiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSpan {
    /// First overlapped band.
    pub from: usize,
    /// Last overlapped band (inclusive).
    pub to: usize,
}

impl RegionSpan {
    /// Number of overlapped bands.
    pub fn count(self) -> usize {
        self.to - self.from + 1
    }

    /// Band indices in order.
    pub fn indices(self) -> RangeInclusive<usize> {
        self.from..=self.to
    }
}

/// Bands overlapped by `patch`, or `None` when the patch is empty or lies
/// entirely outside `full`.
pub fn find_regions_for_patch(patch: Extents, full: Extents, bands: &[Band]) -> Option<RegionSpan> {
    if bands.is_empty() || patch.is_empty() {
        return None;
    }
    patch.intersect(full)?;

    let last_at_or_before = |limit: i32, strict: bool| {
        bands
            .iter()
            .rposition(|b| if strict { b.start < limit } else { b.start <= limit })
    };
    let from = last_at_or_before(patch.min_y, false).unwrap_or(0);
    let to = last_at_or_before(patch.max_y, true).unwrap_or(0);
    (to >= from).then_some(RegionSpan { from, to })
}

/// Band index to owning rank; an arbitrary permutation of a subset of ranks.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionMap {
    owners: Vec<usize>,
}

impl RegionMap {
    /// Build from explicit owners. A rank may own at most one band.
    pub fn new(owners: Vec<usize>) -> CompositorResult<Self> {
        let mut seen = owners.clone();
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(CompositorError::validation(format!(
                "rank {} owns more than one region",
                w[0]
            )));
        }
        Ok(Self { owners })
    }

    /// Band `i` owned by rank `i`, for `size` ranks.
    pub fn identity(size: usize) -> Self {
        Self {
            owners: (0..size).collect(),
        }
    }

    /// Number of bands.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// True when no rank owns a band.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Owner of band `region`.
    pub fn owner(&self, region: usize) -> Option<usize> {
        self.owners.get(region).copied()
    }

    /// Band owned by `rank`, if the rank is active.
    pub fn position_of(&self, rank: usize) -> Option<usize> {
        self.owners.iter().position(|&r| r == rank)
    }

    /// Owners in band order.
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Reject owners outside a communicator of `size` ranks.
    pub fn check_ranks(&self, size: usize) -> CompositorResult<()> {
        match self.owners.iter().find(|&&r| r >= size) {
            Some(r) => Err(CompositorError::validation(format!(
                "region owner {r} is outside a communicator of {size} ranks"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/region/partition.rs"]
mod tests;
