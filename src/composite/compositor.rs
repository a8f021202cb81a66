use crate::blend::BlendKernel;
use crate::comm::Communicator;
use crate::composite::band::BandResult;
use crate::composite::{gather, many, serial, single};
use crate::foundation::config::CompositorConfig;
use crate::foundation::core::{Extents, RgbaF32};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::raster::buffer::{Patch, RgbaImage};
use crate::region::partition::RegionMap;

/// Which direct-send algorithm composites a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Gather every patch to the root and blend there.
    SerialDirectSend,
    /// Fixed-band exchange, at most one patch per rank.
    ParallelDirectSend,
    /// Sized band exchange, any number of patches per rank.
    #[default]
    ParallelDirectSendMany,
}

enum Frame {
    Idle,
    Banded {
        regions: RegionMap,
        full: Extents,
        band: Option<BandResult>,
    },
    Assembled,
}

/// Per-rank compositor. Every rank of the communicator constructs one and
/// drives it through the same sequence of calls each frame.
///
/// Each compositing call starts a new frame and discards what the previous
/// frame left behind. At the root, the assembled image can be read as float
/// RGBA with [`Self::composited_image`] or taken once as 8-bit RGB with
/// [`Self::get_composited_image`].
pub struct Compositor<C: Communicator> {
    comm: C,
    config: CompositorConfig,
    kernel: BlendKernel,
    frame: Frame,
    final_image: Option<RgbaImage>,
}

impl<C: Communicator> Compositor<C> {
    /// Validate `config` against this build and communicator.
    ///
    /// Fails with [`CompositorError::Unavailable`] when the configured blend
    /// strategy was not compiled in.
    pub fn new(comm: C, config: CompositorConfig) -> CompositorResult<Self> {
        config.validate()?;
        if config.root >= comm.size() {
            return Err(CompositorError::validation(format!(
                "root rank {} is outside a communicator of {} ranks",
                config.root,
                comm.size()
            )));
        }
        let kernel = BlendKernel::new(config.blend, config.blend_threads)?;
        tracing::debug!(rank = comm.rank(), blend = ?kernel.strategy(), "compositor ready");
        Ok(Self {
            comm,
            config,
            kernel,
            frame: Frame::Idle,
            final_image: None,
        })
    }

    /// The underlying communicator.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Active configuration.
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Change the backdrop used from the next assembled frame on.
    pub fn set_background(&mut self, color: RgbaF32) {
        self.config.background = color;
    }

    /// True on the rank that assembles the final image.
    pub fn is_root(&self) -> bool {
        self.comm.rank() == self.config.root
    }

    fn begin_frame(&mut self) {
        self.frame = Frame::Idle;
        self.final_image = None;
    }

    /// Composite all patches of all ranks on the root.
    ///
    /// The root ends up holding the finished image; no gather step is needed.
    pub fn serial_direct_send(&mut self, patches: &[Patch], full: Extents) -> CompositorResult<()> {
        self.begin_frame();
        self.final_image =
            serial::serial_direct_send(&self.comm, &self.kernel, &self.config, patches, full)?;
        self.frame = Frame::Assembled;
        Ok(())
    }

    /// Legacy single-patch direct send. Returns this rank's band height, `0`
    /// when the rank owns no band.
    pub fn parallel_direct_send(
        &mut self,
        patch: Option<&Patch>,
        regions: &RegionMap,
        full: Extents,
    ) -> CompositorResult<i32> {
        self.begin_frame();
        regions.check_ranks(self.comm.size())?;
        let band = single::parallel_direct_send(
            &self.comm,
            &self.kernel,
            self.config.tags,
            patch,
            regions,
            full,
        )?;
        Ok(self.store_band(regions, full, band))
    }

    /// Many-patch direct send. Returns this rank's band height, `0` when the
    /// rank owns no band.
    pub fn parallel_direct_send_many(
        &mut self,
        patches: &[Patch],
        regions: &RegionMap,
        full: Extents,
    ) -> CompositorResult<i32> {
        self.begin_frame();
        regions.check_ranks(self.comm.size())?;
        let band = many::parallel_direct_send_many(
            &self.comm,
            &self.kernel,
            self.config.tags,
            patches,
            regions,
            full,
        )?;
        Ok(self.store_band(regions, full, band))
    }

    fn store_band(&mut self, regions: &RegionMap, full: Extents, band: Option<BandResult>) -> i32 {
        let height = band.as_ref().map_or(0, |b| b.band().height());
        self.frame = Frame::Banded {
            regions: regions.clone(),
            full,
            band,
        };
        height
    }

    /// This rank's composited band from the last parallel pass, if any.
    pub fn band_result(&self) -> Option<&BandResult> {
        match &self.frame {
            Frame::Banded { band, .. } => band.as_ref(),
            _ => None,
        }
    }

    /// Collect the bands of the last parallel pass at the root.
    ///
    /// Calling it again in the same frame, or after a serial pass, is a no-op.
    pub fn gather_images(&mut self) -> CompositorResult<()> {
        let Frame::Banded {
            regions,
            full,
            band,
        } = std::mem::replace(&mut self.frame, Frame::Assembled)
        else {
            return Ok(());
        };
        self.final_image = gather::gather_images(&self.comm, &self.config, &regions, full, band)?;
        Ok(())
    }

    /// Borrow the assembled float image at the root.
    pub fn composited_image(&self) -> Option<&RgbaImage> {
        self.final_image.as_ref()
    }

    /// Take the assembled image as 8-bit RGB, releasing the float buffer.
    ///
    /// Single use per frame: a second call, a call on a non-root rank, or a
    /// call before the image was assembled fails with
    /// [`CompositorError::Finalize`].
    #[tracing::instrument(skip(self), fields(rank = self.comm.rank()))]
    pub fn get_composited_image(&mut self) -> CompositorResult<::image::RgbImage> {
        let img = self.final_image.take().ok_or_else(|| {
            CompositorError::finalize("no composited image is pending on this rank")
        })?;
        Ok(img.to_rgb8())
    }

    /// Run `mode` and gather the result at the root.
    ///
    /// [`CompositeMode::ParallelDirectSend`] accepts at most one patch.
    pub fn composite_frame(
        &mut self,
        mode: CompositeMode,
        patches: &[Patch],
        regions: &RegionMap,
        full: Extents,
    ) -> CompositorResult<()> {
        match mode {
            CompositeMode::SerialDirectSend => self.serial_direct_send(patches, full),
            CompositeMode::ParallelDirectSend => {
                if patches.len() > 1 {
                    return Err(CompositorError::validation(format!(
                        "single-patch direct send got {} patches",
                        patches.len()
                    )));
                }
                self.parallel_direct_send(patches.first(), regions, full)?;
                self.gather_images()
            }
            CompositeMode::ParallelDirectSendMany => {
                self.parallel_direct_send_many(patches, regions, full)?;
                self.gather_images()
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
