use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::{debug, info};
use sharpen_image::{Image, ImageError, ImageSize};
use thiserror::Error;

use crate::aggregate::aggregate_partials;
use crate::crop::crop_border;
use crate::filter::{convolve_partial, StencilBounds};
use crate::padding::PaddedRaster;
use crate::parallel::{Communicator, ParallelError, Role, WorkerGroup, COORDINATOR_RANK};
use crate::partition::CyclicPartition;

/// Default half width `d` of the stencil.
pub const DEFAULT_HALF_WIDTH: usize = 8;

/// Default weight of the convolution subtracted from the input.
pub const DEFAULT_SCALE: f64 = 2.0;

/// Default largest input accepted by the file pipeline.
pub const DEFAULT_MAX_SIZE: ImageSize = ImageSize {
    width: 16384,
    height: 16384,
};

/// An error type for the sharpening pipeline.
///
/// Every variant is fatal for the run.
#[derive(Error, Debug)]
pub enum SharpenError {
    /// The probed or the read dimensions have a zero side.
    #[error("Invalid image dimensions: probed {probed}, read {read}")]
    InvalidDimensions {
        /// Size declared by the image header.
        probed: ImageSize,
        /// Size reported by the reader.
        read: ImageSize,
    },

    /// The reader returned a different size than the image header declared.
    #[error("Image dimensions {read} do not match the expected {probed}")]
    DimensionMismatch {
        /// Size declared by the image header.
        probed: ImageSize,
        /// Size reported by the reader.
        read: ImageSize,
    },

    /// The image does not survive cropping a border of `half_width` pixels.
    #[error("Image of size {size} is too small to crop a border of {half_width} pixels")]
    ImageTooSmall {
        /// Size of the input image.
        size: ImageSize,
        /// Width of the border dropped on every side.
        half_width: usize,
    },

    /// The stencil needs a half width of at least one pixel.
    #[error("Invalid filter half width {0}, expected at least 1")]
    InvalidHalfWidth(usize),

    /// The coordinator could not load the input image.
    #[error("Failed to load the input image. {0}")]
    Load(Box<dyn std::error::Error + Send + Sync>),

    /// Loading the input image panicked on the coordinator.
    #[error("Loading the input image panicked: {0}")]
    LoadPanicked(String),

    /// The coordinator failed, so this worker aborted as well.
    #[error("Aborted because the coordinator failed to provide the input image")]
    CoordinatorAborted,

    /// Error to create or combine images.
    #[error("Failed to manipulate the image. {0}")]
    ImageError(#[from] ImageError),

    /// Error in the worker group or its collectives.
    #[error("Parallel execution failed. {0}")]
    ParallelError(#[from] ParallelError),
}

/// Parameters of a sharpening run.
///
/// # Example
///
/// ```rust
/// use sharpen_imgproc::filter::StencilBounds;
/// use sharpen_imgproc::sharpen::SharpenConfig;
///
/// let config = SharpenConfig::new()
///     .with_num_workers(4)
///     .with_bounds(StencilBounds::Closed);
///
/// assert_eq!(config.half_width, 8);
/// assert_eq!(config.norm(), 225.0);
/// assert_eq!(config.filter_size(), 17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpenConfig {
    /// Half width `d` of the stencil, also the border cropped from the output.
    pub half_width: usize,
    /// Weight of the normalised convolution subtracted from the input.
    pub scale: f64,
    /// Kernel offsets visited by the stencil sum.
    pub bounds: StencilBounds,
    /// Number of workers `N`.
    pub num_workers: usize,
    /// Largest input image accepted by the reader.
    pub max_size: ImageSize,
}

impl Default for SharpenConfig {
    fn default() -> Self {
        Self {
            half_width: DEFAULT_HALF_WIDTH,
            scale: DEFAULT_SCALE,
            bounds: StencilBounds::default(),
            num_workers: rayon::current_num_threads(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl SharpenConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the half width of the stencil.
    pub fn with_half_width(mut self, half_width: usize) -> Self {
        self.half_width = half_width;
        self
    }

    /// Set the weight of the subtracted convolution.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the kernel offsets visited by the stencil sum.
    pub fn with_bounds(mut self, bounds: StencilBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the number of workers.
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the largest input image accepted by the reader.
    pub fn with_max_size(mut self, max_size: ImageSize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Check the parameters that do not depend on the input.
    ///
    /// # Errors
    ///
    /// Returns [`SharpenError::InvalidHalfWidth`] for a half width of zero, where the kernel
    /// sigma vanishes.
    pub fn validate(&self) -> Result<(), SharpenError> {
        if self.half_width == 0 {
            return Err(SharpenError::InvalidHalfWidth(self.half_width));
        }
        Ok(())
    }

    /// The normalisation of the convolution, `(2d - 1)²`.
    pub fn norm(&self) -> f64 {
        let side = 2.0 * self.half_width as f64 - 1.0;
        side * side
    }

    /// The side of the full square stencil, `2d + 1`.
    pub fn filter_size(&self) -> usize {
        2 * self.half_width + 1
    }
}

/// Timing and shape of a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    /// Number of workers that shared the convolution.
    pub num_workers: usize,
    /// Side of the full square stencil.
    pub filter_size: usize,
    /// Size of the input image.
    pub input_size: ImageSize,
    /// Wall time of the stencil loop, measured between the two barriers.
    pub convolution_time: Duration,
}

/// The result of a run, produced at the coordinator only.
#[derive(Debug, Clone)]
pub struct SharpenOutput {
    /// The sharpened image without its border, `(nx - 2d) x (ny - 2d)`.
    pub image: Image<f64, 1>,
    /// Timing and shape of the run.
    pub stats: RunStats,
}

/// Check the size reported by the reader against the size declared by the header.
///
/// # Errors
///
/// [`SharpenError::InvalidDimensions`] when either size has a zero side and
/// [`SharpenError::DimensionMismatch`] when they differ.
pub fn validate_dimensions(probed: ImageSize, read: ImageSize) -> Result<(), SharpenError> {
    if probed.is_empty() || read.is_empty() {
        return Err(SharpenError::InvalidDimensions { probed, read });
    }
    if probed != read {
        return Err(SharpenError::DimensionMismatch { probed, read });
    }
    Ok(())
}

/// Check that an image of `size` keeps at least one pixel after cropping `half_width` pixels
/// from every side.
pub fn check_crop(size: ImageSize, half_width: usize) -> Result<(), SharpenError> {
    if size.width <= 2 * half_width || size.height <= 2 * half_width {
        return Err(SharpenError::ImageTooSmall { size, half_width });
    }
    Ok(())
}

/// Subtract the scaled convolution from the raster interior.
///
/// Computes `interior(x, y) - scale / norm * convolution(x, y)` for every source pixel.
pub fn composite_sharp(
    raster: &PaddedRaster,
    convolution: &Image<f64, 1>,
    scale: f64,
    norm: f64,
) -> Result<Image<f64, 1>, SharpenError> {
    let size = raster.interior_size();
    if convolution.size() != size {
        return Err(ImageError::InvalidImageSize(
            convolution.width(),
            convolution.height(),
            size.width,
            size.height,
        )
        .into());
    }

    let factor = scale / norm;
    let mut sharp = Image::from_size_val(size, 0.0)?;
    for (p, (dst, &conv)) in sharp
        .as_slice_mut()
        .iter_mut()
        .zip(convolution.as_slice())
        .enumerate()
    {
        *dst = raster.interior(p % size.width, p / size.width) - factor * conv;
    }

    Ok(sharp)
}

/// Aggregate, composite and crop at the coordinator.
///
/// Returns `None` for [`Role::Worker`]; the coordinator must hold the gathered partials.
pub fn composite(
    role: Role,
    raster: &PaddedRaster,
    partials: Option<Vec<Image<f64, 1>>>,
    config: &SharpenConfig,
) -> Result<Option<Image<f64, 1>>, SharpenError> {
    let Role::Coordinator = role else {
        return Ok(None);
    };
    let partials = partials.ok_or(ParallelError::MissingContribution(COORDINATOR_RANK))?;

    let convolution = aggregate_partials(&partials)?;
    let sharp = composite_sharp(raster, &convolution, config.scale, config.norm())?;

    // only the core of the image is kept to remove edge effects
    Ok(Some(crop_border(&sharp, config.half_width)?))
}

// a panicking `load` becomes an error so the other workers are released from the broadcast
fn load_guarded<F>(load: F) -> Result<Image<u16, 1>, SharpenError>
where
    F: FnOnce() -> Result<Image<u16, 1>, SharpenError>,
{
    panic::catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Err(SharpenError::LoadPanicked(message))
    })
}

/// The program run by every worker of the group.
///
/// The coordinator calls `load` and broadcasts the image size, then the image itself. Every
/// worker pads its own copy, computes its share of the convolution and sends it to the
/// coordinator, which returns the sharpened image. The other workers return `None`.
///
/// When `load` fails or panics every worker stops: the coordinator returns the load error and
/// the others [`SharpenError::CoordinatorAborted`]. An invalid `config` fails on every worker
/// before any collective.
pub fn sharpen_worker<F>(
    comm: &Communicator,
    config: &SharpenConfig,
    load: F,
) -> Result<Option<SharpenOutput>, SharpenError>
where
    F: FnOnce() -> Result<Image<u16, 1>, SharpenError>,
{
    config.validate()?;

    let role = comm.role(COORDINATOR_RANK);
    let half_width = config.half_width;

    let loaded = match role {
        Role::Coordinator => {
            info!("Running on {} worker(s)", comm.size());
            info!(
                "Using a filter of size {} x {}",
                config.filter_size(),
                config.filter_size()
            );
            Some(load_guarded(load))
        }
        Role::Worker => None,
    };

    let header = loaded
        .as_ref()
        .map(|res| res.as_ref().ok().map(|image| image.size()));
    let Some(size) = comm.broadcast(COORDINATOR_RANK, header)? else {
        return match loaded {
            Some(Err(e)) => Err(e),
            _ => Err(SharpenError::CoordinatorAborted),
        };
    };
    check_crop(size, half_width)?;

    let fuzzy = comm.broadcast(COORDINATOR_RANK, loaded.and_then(Result::ok))?;
    let raster = PaddedRaster::new(&fuzzy, half_width)?;
    let partition = CyclicPartition::new(comm.size())?;

    if role == Role::Coordinator {
        info!("Starting calculation ...");
    }
    comm.barrier();

    debug!(
        "Worker {} of {} on thread {}",
        comm.rank(),
        comm.size(),
        std::thread::current().name().unwrap_or("<unnamed>")
    );

    let start = Instant::now();
    let partial = convolve_partial(&raster, &partition, comm.rank(), config.bounds)?;
    comm.barrier();
    let convolution_time = start.elapsed();

    let partials = comm.gather(COORDINATOR_RANK, partial)?;
    let Some(image) = composite(role, &raster, partials, config)? else {
        return Ok(None);
    };

    info!("Calculation time was {:.6} seconds", convolution_time.as_secs_f64());

    Ok(Some(SharpenOutput {
        image,
        stats: RunStats {
            num_workers: comm.size(),
            filter_size: config.filter_size(),
            input_size: size,
            convolution_time,
        },
    }))
}

/// Pick the coordinator's output from the per-rank results of [`sharpen_worker`].
///
/// The coordinator's error wins over the errors of the other workers.
pub fn coordinator_output(
    results: Vec<Result<Option<SharpenOutput>, SharpenError>>,
) -> Result<SharpenOutput, SharpenError> {
    let num_workers = results.len();
    let mut results = results.into_iter();

    let output = results
        .nth(COORDINATOR_RANK)
        .ok_or(ParallelError::InvalidRoot(COORDINATOR_RANK, num_workers))??
        .ok_or(ParallelError::MissingContribution(COORDINATOR_RANK))?;

    for result in results {
        result?;
    }

    Ok(output)
}

/// Sharpen an in-memory image with `config.num_workers` workers.
///
/// # Example
///
/// ```rust
/// use sharpen_image::Image;
/// use sharpen_imgproc::sharpen::{sharpen_image, SharpenConfig};
///
/// let image = Image::<u16, 1>::from_size_val([20, 18].into(), 100).unwrap();
/// let output = sharpen_image(&image, &SharpenConfig::new().with_num_workers(2)).unwrap();
///
/// assert_eq!(output.image.width(), 4);
/// assert_eq!(output.image.height(), 2);
/// ```
pub fn sharpen_image(
    image: &Image<u16, 1>,
    config: &SharpenConfig,
) -> Result<SharpenOutput, SharpenError> {
    let group = WorkerGroup::new(config.num_workers)?;
    let results = group.run(|comm| sharpen_worker(comm, config, || Ok(image.clone())));
    coordinator_output(results)
}
