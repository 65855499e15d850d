use std::path::Path;

use log::info;
use sharpen_image::{Image, ImageSize};
use sharpen_imgproc::parallel::WorkerGroup;
use sharpen_imgproc::sharpen::{
    coordinator_output, sharpen_worker, validate_dimensions, RunStats, SharpenConfig,
    SharpenError,
};
use sharpen_io::pgm::{pgm_size, read_image_pgm_mono16, write_image_pgm};
use sharpen_io::IoError;

/// An error type for the file pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SharpenFileError {
    /// Error while loading or sharpening the image.
    #[error("Failed to sharpen the image. {0}")]
    SharpenError(#[from] SharpenError),

    /// Error to write the output image.
    #[error("Failed to write the output image. {0}")]
    IoError(#[from] IoError),
}

fn load_error(err: IoError) -> SharpenError {
    SharpenError::Load(Box::new(err))
}

/// Load a PGM image after checking its size against the size declared by its header.
///
/// # Errors
///
/// Returns [`SharpenError::InvalidDimensions`] when the header does not declare a usable size,
/// [`SharpenError::DimensionMismatch`] when the reader disagrees with the header and
/// [`SharpenError::Load`] for any failure to read the file, including an image larger than
/// `max_size`.
pub fn load_image_pgm(
    file_path: &Path,
    max_size: ImageSize,
) -> Result<Image<u16, 1>, SharpenError> {
    info!("Reading image file: {}", file_path.display());

    let probed = pgm_size(file_path).map_err(load_error)?;
    info!("Image size is {probed}");

    if probed.is_empty() {
        return Err(SharpenError::InvalidDimensions {
            probed,
            read: ImageSize::default(),
        });
    }

    let image = read_image_pgm_mono16(file_path, max_size).map_err(load_error)?;
    validate_dimensions(probed, image.size())?;

    info!("... done");
    Ok(image)
}

/// Sharpen the PGM image at `input` and write the result to `output`.
///
/// The coordinator of a group of `config.num_workers` workers loads the input; every worker
/// convolves its share of the pixels and the coordinator's result is written once the group
/// has finished. Nothing is written when any step fails.
///
/// # Arguments
///
/// * `input` - The path to the PGM image to sharpen.
/// * `output` - The path of the PGM image to create.
/// * `config` - The parameters of the run.
///
/// # Returns
///
/// The timing and shape of the run.
pub fn sharpen_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &SharpenConfig,
) -> Result<RunStats, SharpenFileError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let group = WorkerGroup::new(config.num_workers).map_err(SharpenError::from)?;
    let results = group.run(|comm| {
        sharpen_worker(comm, config, || load_image_pgm(input, config.max_size))
    });
    let sharpened = coordinator_output(results)?;

    info!("Writing output file: {}", output.display());
    write_image_pgm(output, &sharpened.image)?;
    info!("... done");

    Ok(sharpened.stats)
}
