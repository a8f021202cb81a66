use crate::foundation::core::RgbaF32;
use crate::foundation::error::{CompositorError, CompositorResult};

/// Environment variable selecting the blend kernel (`scalar` / `threaded`).
pub const ENV_BLEND: &str = "SORTLAST_BLEND";
/// Environment variable sizing the threaded kernel's pool.
pub const ENV_BLEND_THREADS: &str = "SORTLAST_BLEND_THREADS";
/// Environment variable naming the root (display) rank.
pub const ENV_ROOT: &str = "SORTLAST_ROOT";

/// Which pixel kernel carries out front-to-back / back-to-front blending.
///
/// Both strategies produce bit-identical output; the choice is purely a
/// performance switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendStrategy {
    /// Single-threaded row loop.
    #[default]
    Scalar,
    /// Rows of the overlap rectangle are split across a rayon pool.
    Threaded,
}

impl BlendStrategy {
    /// Whether this build can run the strategy.
    pub fn available(self) -> bool {
        match self {
            Self::Scalar => true,
            Self::Threaded => cfg!(feature = "parallel"),
        }
    }

    fn parse(s: &str) -> CompositorResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" | "0" | "off" => Ok(Self::Scalar),
            "threaded" | "1" | "on" => Ok(Self::Threaded),
            other => Err(CompositorError::validation(format!(
                "{ENV_BLEND} must be 'scalar' or 'threaded', got '{other}'"
            ))),
        }
    }
}

/// Pair of message tags isolating compositor traffic from other users of the
/// communicator. Negative tags are reserved for collectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageTags {
    /// Tag for metadata (records, extents, summaries).
    pub meta: i32,
    /// Tag for pixel payloads.
    pub pixels: i32,
}

impl Default for MessageTags {
    fn default() -> Self {
        Self {
            meta: 100,
            pixels: 101,
        }
    }
}

impl MessageTags {
    /// Reject reserved or colliding tags.
    pub fn validate(self) -> CompositorResult<()> {
        if self.meta < 0 || self.pixels < 0 {
            return Err(CompositorError::validation(
                "message tags must be non-negative (negative tags are reserved)",
            ));
        }
        if self.meta == self.pixels {
            return Err(CompositorError::validation(
                "metadata and pixel tags must differ",
            ));
        }
        Ok(())
    }
}

/// Construction-time settings of a [`crate::Compositor`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Pixel kernel selection.
    pub blend: BlendStrategy,
    /// Pool size for [`BlendStrategy::Threaded`]; `None` lets rayon decide.
    pub blend_threads: Option<usize>,
    /// Tags used for point-to-point compositor traffic.
    pub tags: MessageTags,
    /// Rank that assembles and displays the final image.
    pub root: usize,
    /// Opaque backdrop blended under the assembled image.
    pub background: RgbaF32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            blend: BlendStrategy::Scalar,
            blend_threads: None,
            tags: MessageTags::default(),
            root: 0,
            background: RgbaF32::opaque(0.0, 0.0, 0.0),
        }
    }
}

impl CompositorConfig {
    /// Defaults overridden by `SORTLAST_*` environment variables.
    ///
    /// Meant to be called once at startup; the result is then passed to
    /// [`crate::Compositor::new`].
    pub fn from_env() -> CompositorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CompositorResult<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_BLEND) {
            cfg.blend = BlendStrategy::parse(&v)?;
        }
        if let Some(v) = lookup(ENV_BLEND_THREADS) {
            let n = v.trim().parse::<usize>().map_err(|e| {
                CompositorError::validation(format!("{ENV_BLEND_THREADS} '{v}': {e}"))
            })?;
            cfg.blend_threads = Some(n);
        }
        if let Some(v) = lookup(ENV_ROOT) {
            cfg.root = v
                .trim()
                .parse::<usize>()
                .map_err(|e| CompositorError::validation(format!("{ENV_ROOT} '{v}': {e}")))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> CompositorResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CompositorError::validation(format!("compositor config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency. Strategy availability is checked when the
    /// compositor is built.
    pub fn validate(&self) -> CompositorResult<()> {
        self.tags.validate()?;
        if self.blend_threads == Some(0) {
            return Err(CompositorError::validation(
                "blend_threads must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
