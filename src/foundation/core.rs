/// Integer screen rectangle in the shared global coordinate system.
///
/// Extents are half-open: a pixel `(x, y)` is inside when
/// `min_x <= x < max_x` and `min_y <= y < max_y`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Extents {
    /// Left edge (inclusive).
    pub min_x: i32,
    /// Right edge (exclusive).
    pub max_x: i32,
    /// Top edge (inclusive).
    pub min_y: i32,
    /// Bottom edge (exclusive).
    pub max_y: i32,
}

impl Extents {
    /// Build extents from `(min_x, max_x, min_y, max_y)`.
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Full-screen extents `[0,width) x [0,height)`.
    pub const fn screen(width: i32, height: i32) -> Self {
        Self::new(0, width, 0, height)
    }

    /// Width in pixels; negative when the extents are inverted.
    pub fn width(self) -> i32 {
        self.max_x - self.min_x
    }

    /// Height in pixels; negative when the extents are inverted.
    pub fn height(self) -> i32 {
        self.max_y - self.min_y
    }

    /// True when the rectangle covers no pixel.
    pub fn is_empty(self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Pixel count, `0` for empty extents.
    pub fn area(self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    /// Number of `f32` values an RGBA buffer of this size holds.
    pub fn rgba_len(self) -> usize {
        self.area() as usize * 4
    }

    /// Overlap of two rectangles, `None` when they share no pixel.
    pub fn intersect(self, other: Extents) -> Option<Extents> {
        let out = Extents {
            min_x: self.min_x.max(other.min_x),
            max_x: self.max_x.min(other.max_x),
            min_y: self.min_y.max(other.min_y),
            max_y: self.max_y.min(other.max_y),
        };
        (!out.is_empty()).then_some(out)
    }

    /// Smallest rectangle covering both.
    pub fn union(self, other: Extents) -> Extents {
        Extents {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Same horizontal span, rows restricted to `[start, end)`.
    pub fn clip_rows(self, start: i32, end: i32) -> Extents {
        Extents {
            min_y: self.min_y.max(start),
            max_y: self.max_y.min(end),
            ..self
        }
    }
}

/// Straight float RGBA color, channels expected in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RgbaF32 {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl RgbaF32 {
    /// Build a color from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent black.
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Opaque color from RGB.
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Channels in buffer order.
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A contiguous horizontal slice `[start, end)` of the global image height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Band {
    /// First row (inclusive).
    pub start: i32,
    /// Last row (exclusive).
    pub end: i32,
}

impl Band {
    /// Number of rows, never negative.
    pub fn height(self) -> i32 {
        (self.end - self.start).max(0)
    }

    /// True when the band owns no rows.
    pub fn is_empty(self) -> bool {
        self.height() == 0
    }

    /// The band spanning columns `[min_x, max_x)`.
    pub fn extents(self, min_x: i32, max_x: i32) -> Extents {
        Extents::new(min_x, max_x, self.start, self.end)
    }
}

/// Accumulated union of the extents actually blended into a band.
///
/// The empty state is explicit, so a legitimate box anchored at the origin is
/// never mistaken for "nothing blended yet".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox(Option<Extents>);

impl BoundingBox {
    /// An empty box.
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Grow to cover `ext`; the first contribution initializes the box.
    pub fn grow(&mut self, ext: Extents) {
        if ext.is_empty() {
            return;
        }
        self.0 = Some(match self.0 {
            Some(cur) => cur.union(ext),
            None => ext,
        });
    }

    /// Return to the empty state.
    pub fn reset(&mut self) {
        self.0 = None;
    }

    /// True when nothing has been blended.
    pub fn is_empty(self) -> bool {
        self.0.is_none()
    }

    /// The accumulated extents, if any.
    pub fn get(self) -> Option<Extents> {
        self.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
