//! Parallel image-space compositing for sort-last distributed rendering.
//!
//! Each rank renders part of a scene into RGBA float [`Patch`]es with known
//! screen placement and a depth key. A [`Compositor`] running on every rank
//! combines all patches into one final image at the root, spreading the
//! blending work itself across ranks.
//!
//! # Algorithms
//!
//! - **Parallel direct send, many patches** (primary): the image height is
//!   split into one band per active rank; patches are cut into per-band
//!   slices, an all-to-all tells each band owner exactly how much it will
//!   receive, slices are exchanged and every owner blends its band front to
//!   back in depth order.
//! - **Parallel direct send, single patch**: the same band split with a fixed
//!   one-slice-per-rank exchange.
//! - **Serial direct send**: every patch travels to the root, which blends
//!   them all. Slow but safe for irregular patch sets.
//!
//! [`Compositor::gather_images`] assembles the bands at the root and
//! [`Compositor::get_composited_image`] hands out the result as 8-bit RGB,
//! once per frame.
//!
//! # Conventions
//!
//! - Pixels are straight-layout `f32` RGBA in `[0, 1]`, blended as
//!   premultiplied color.
//! - [`Extents`] are half-open integer rectangles in a shared screen space.
//! - The depth key is the eye-space distance to the camera: smaller is nearer.
//! - Ranks talk through a [`Communicator`]; [`LocalCluster`] runs all ranks
//!   as threads of one process.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blend;
mod comm;
mod composite;
mod foundation;
mod raster;
mod region;

pub use blend::{
    BlendKernel, blend_back_to_front, blend_background, blend_front_to_back, fill, place,
};
pub use comm::local::{LocalCluster, LocalComm};
pub use comm::{
    Communicator, Payload, PendingRecv, PendingSend, RecvRequest, SendRequest, Tag, wait_all_recv,
    wait_all_send,
};
pub use composite::band::BandResult;
pub use composite::compositor::{CompositeMode, Compositor};
pub use composite::record::{PatchRecord, RECORD_FIELDS, depth_order};
pub use foundation::config::{
    BlendStrategy, CompositorConfig, ENV_BLEND, ENV_BLEND_THREADS, ENV_ROOT, MessageTags,
};
pub use foundation::core::{Band, BoundingBox, Extents, RgbaF32};
pub use foundation::error::{CompositorError, CompositorResult};
pub use raster::buffer::{Patch, RgbaImage};
pub use region::partition::{
    RegionExtents, RegionMap, RegionSpan, compute_region_extents, find_regions_for_patch,
};
