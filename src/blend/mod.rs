pub(crate) mod kernels;
#[cfg(feature = "parallel")]
pub(crate) mod parallel;

use crate::foundation::config::BlendStrategy;
use crate::foundation::core::Extents;
#[cfg(not(feature = "parallel"))]
use crate::foundation::error::CompositorError;
use crate::foundation::error::CompositorResult;

/// The blend operator implementation chosen at construction time.
pub enum BlendKernel {
    /// Single-threaded kernels.
    Scalar,
    /// Row-parallel kernels on a dedicated pool.
    #[cfg(feature = "parallel")]
    Threaded(rayon::ThreadPool),
}

impl std::fmt::Debug for BlendKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => f.write_str("BlendKernel::Scalar"),
            #[cfg(feature = "parallel")]
            Self::Threaded(pool) => write!(
                f,
                "BlendKernel::Threaded({} threads)",
                pool.current_num_threads()
            ),
        }
    }
}

impl BlendKernel {
    /// Build the kernel for `strategy`, failing fast when this build lacks it.
    #[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
    pub fn new(strategy: BlendStrategy, threads: Option<usize>) -> CompositorResult<Self> {
        match strategy {
            BlendStrategy::Scalar => Ok(Self::Scalar),
            #[cfg(feature = "parallel")]
            BlendStrategy::Threaded => Ok(Self::Threaded(parallel::build_thread_pool(threads)?)),
            #[cfg(not(feature = "parallel"))]
            BlendStrategy::Threaded => Err(CompositorError::unavailable(format!(
                "blend strategy {strategy:?} was not compiled into this build (enable the 'parallel' feature)"
            ))),
        }
    }

    /// The strategy this kernel implements.
    pub fn strategy(&self) -> BlendStrategy {
        match self {
            Self::Scalar => BlendStrategy::Scalar,
            #[cfg(feature = "parallel")]
            Self::Threaded(_) => BlendStrategy::Threaded,
        }
    }

    /// See [`blend_front_to_back`].
    pub fn front_to_back(
        &self,
        src: &[f32],
        src_ext: Extents,
        clip: Option<Extents>,
        dst: &mut [f32],
        dst_ext: Extents,
    ) -> CompositorResult<()> {
        match self {
            Self::Scalar => kernels::blend_front_to_back(src, src_ext, clip, dst, dst_ext),
            #[cfg(feature = "parallel")]
            Self::Threaded(pool) => {
                parallel::blend_front_to_back(pool, src, src_ext, clip, dst, dst_ext)
            }
        }
    }

    /// See [`blend_back_to_front`].
    pub fn back_to_front(
        &self,
        src: &[f32],
        src_ext: Extents,
        clip: Option<Extents>,
        dst: &mut [f32],
        dst_ext: Extents,
    ) -> CompositorResult<()> {
        match self {
            Self::Scalar => kernels::blend_back_to_front(src, src_ext, clip, dst, dst_ext),
            #[cfg(feature = "parallel")]
            Self::Threaded(pool) => {
                parallel::blend_back_to_front(pool, src, src_ext, clip, dst, dst_ext)
            }
        }
    }
}

pub use kernels::{blend_back_to_front, blend_background, blend_front_to_back, fill, place};
