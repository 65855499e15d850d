use std::path::PathBuf;

use argh::FromArgs;

use sharpen::imgproc::filter::StencilBounds;
use sharpen::image::ImageSize;
use sharpen::imgproc::sharpen::{
    SharpenConfig, DEFAULT_HALF_WIDTH, DEFAULT_MAX_SIZE, DEFAULT_SCALE,
};
use sharpen::pipeline::sharpen_file;

#[derive(FromArgs, Debug)]
/// Sharpen a PGM image with a Mexican-hat filter.
struct Args {
    /// path to the image to sharpen
    #[argh(option, short = 'i', default = "PathBuf::from(\"fuzzy.pgm\")")]
    input: PathBuf,

    /// path of the sharpened image to write
    #[argh(option, short = 'o', default = "PathBuf::from(\"sharpened.pgm\")")]
    output: PathBuf,

    /// number of workers, defaults to the number of cpus
    #[argh(option, short = 'n')]
    workers: Option<usize>,

    /// half width of the filter
    #[argh(option, default = "DEFAULT_HALF_WIDTH")]
    half_width: usize,

    /// weight of the filtered image subtracted from the input
    #[argh(option, default = "DEFAULT_SCALE")]
    scale: f64,

    /// include the last row and column of the filter in the sum
    #[argh(switch)]
    closed_bounds: bool,

    /// largest accepted input width in pixels
    #[argh(option, default = "DEFAULT_MAX_SIZE.width")]
    max_width: usize,

    /// largest accepted input height in pixels
    #[argh(option, default = "DEFAULT_MAX_SIZE.height")]
    max_height: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let bounds = if args.closed_bounds {
        StencilBounds::Closed
    } else {
        StencilBounds::HalfOpen
    };

    let config = SharpenConfig::new()
        .with_half_width(args.half_width)
        .with_scale(args.scale)
        .with_bounds(bounds)
        .with_max_size(ImageSize {
            width: args.max_width,
            height: args.max_height,
        })
        .with_num_workers(args.workers.unwrap_or_else(rayon::current_num_threads));

    match sharpen_file(&args.input, &args.output, &config) {
        Ok(stats) => log::info!(
            "Sharpened a {} image on {} worker(s) in {:.6} seconds",
            stats.input_size,
            stats.num_workers,
            stats.convolution_time.as_secs_f64()
        ),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
