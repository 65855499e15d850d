use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Write},
    path::Path,
};

use sharpen_image::{Image, ImageSize};

use crate::error::IoError;

/// The magic token of the plain-text greyscale format.
pub const PGM_MAGIC: &str = "P2";

/// The max value written in the header; output samples lie in `[0, PGM_MAX_VALUE]`.
pub const PGM_MAX_VALUE: u8 = 255;

/// Number of samples written on each line.
pub const PIXELS_PER_LINE: usize = 16;

const PGM_COMMENT: &str = "# Written by sharpen-io";

// width and height from the dimensions line, ignoring anything after the second token
fn parse_size(line: &str) -> Option<ImageSize> {
    let mut tokens = line.split_whitespace().map(str::parse::<usize>);
    match (tokens.next(), tokens.next()) {
        (Some(Ok(width)), Some(Ok(height))) => Some(ImageSize { width, height }),
        _ => None,
    }
}

fn check_exists(file_path: &Path) -> Result<(), IoError> {
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    Ok(())
}

/// Read the image size from the header of a PGM file.
///
/// Only the first three lines are read. The size is taken from the third line.
///
/// # Arguments
///
/// * `file_path` - The path to the PGM file.
///
/// # Returns
///
/// The declared size, or `0 x 0` when the third line holds fewer than two integers.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be read.
pub fn pgm_size(file_path: impl AsRef<Path>) -> Result<ImageSize, IoError> {
    let file_path = file_path.as_ref();
    check_exists(file_path)?;

    let mut reader = BufReader::new(File::open(file_path)?);
    let mut line = String::new();
    for _ in 0..3 {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(ImageSize::default());
        }
    }

    Ok(parse_size(&line).unwrap_or_default())
}

/// Read a PGM image with a single channel (mono16).
///
/// # Arguments
///
/// * `file_path` - The path to the PGM file.
/// * `max_size` - The largest image the caller accepts.
///
/// # Returns
///
/// A grayscale image whose row `0` is the last row of the file.
pub fn read_image_pgm_mono16(
    file_path: impl AsRef<Path>,
    max_size: ImageSize,
) -> Result<Image<u16, 1>, IoError> {
    let file_path = file_path.as_ref();
    check_exists(file_path)?;

    let bytes = fs::read(file_path)?;
    decode_image_pgm_mono16(&bytes, max_size)
}

/// Decodes a PGM image with a single channel (mono16) from raw bytes.
///
/// The first line must be the `P2` magic and the second line is skipped as a comment. The
/// third line holds the width and height and the fourth the max value, followed by the samples
/// separated by whitespace. Samples beyond the declared size are ignored.
///
/// # Arguments
///
/// * `bytes` - Raw bytes of the pgm file.
/// * `max_size` - The largest image the caller accepts.
///
/// # Errors
///
/// Returns an error on a bad magic or header, when the declared size exceeds `max_size`, when
/// samples are missing or when a sample is not an integer in `[0, max value]`.
///
/// # Example
///
/// ```rust
/// use sharpen_io::pgm::decode_image_pgm_mono16;
///
/// let bytes = b"P2\n# two rows\n2 2\n255\n1 2\n3 4\n";
/// let image = decode_image_pgm_mono16(bytes, [8, 8].into()).unwrap();
///
/// // the first row of the file is the top of the picture
/// assert_eq!(image.as_slice(), &[3, 4, 1, 2]);
/// ```
pub fn decode_image_pgm_mono16(
    bytes: &[u8],
    max_size: ImageSize,
) -> Result<Image<u16, 1>, IoError> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = text.splitn(4, '\n');

    let magic = lines.next().unwrap_or_default().trim();
    if magic != PGM_MAGIC {
        return Err(IoError::InvalidMagic(magic.to_string()));
    }

    // comment line
    let _ = lines.next();

    let size = lines.next().and_then(parse_size).ok_or_else(|| {
        IoError::InvalidHeader("expected the width and height on the third line".to_string())
    })?;

    if size.width > max_size.width || size.height > max_size.height {
        return Err(IoError::ImageTooLarge { size, max_size });
    }

    let mut tokens = lines.next().unwrap_or_default().split_whitespace();
    let max_value = tokens
        .next()
        .ok_or_else(|| IoError::InvalidHeader("missing max value".to_string()))?
        .parse::<u16>()
        .map_err(|e| IoError::InvalidHeader(format!("invalid max value: {e}")))?;

    let expected = size.checked_num_pixels().ok_or_else(|| {
        IoError::InvalidHeader(format!("image size {size} overflows the pixel count"))
    })?;

    // the samples are counted before the pixel buffer is allocated
    let samples = tokens.take(expected).collect::<Vec<_>>();
    if samples.len() < expected {
        return Err(IoError::TruncatedData {
            expected,
            found: samples.len(),
        });
    }

    let mut data = vec![0u16; expected];
    for (n, token) in samples.into_iter().enumerate() {
        let value = token
            .parse::<u16>()
            .ok()
            .filter(|&v| v <= max_value)
            .ok_or_else(|| IoError::InvalidPixel(token.to_string()))?;

        let (x, row) = (n % size.width, n / size.width);
        data[(size.height - 1 - row) * size.width + x] = value;
    }

    Ok(Image::new(size, data)?)
}

/// Quantize an image to 8-bit grey levels.
///
/// When any value is negative or above [`PGM_MAX_VALUE`] and the image is not constant, the
/// values are stretched linearly so that the minimum maps to `0` and the maximum to `255`.
/// Otherwise the absolute values are rounded and saturated at `255`.
///
/// # Example
///
/// ```rust
/// use sharpen_image::Image;
/// use sharpen_io::pgm::quantize_grey;
///
/// let image = Image::<f64, 1>::new([3, 1].into(), vec![-10.0, 0.0, 10.0]).unwrap();
/// assert_eq!(quantize_grey(&image).as_slice(), &[0, 128, 255]);
/// ```
pub fn quantize_grey(image: &Image<f64, 1>) -> Image<u8, 1> {
    let thresh = PGM_MAX_VALUE as f64;
    let (min, max) = image
        .as_slice()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    // a constant image has no range to stretch
    let stretch = (min < 0.0 || max > thresh) && max > min;

    image.map(|&v| {
        let grey = if stretch {
            thresh * (v - min) / (max - min)
        } else {
            v.abs()
        };
        (grey + 0.5).clamp(0.0, thresh) as u8
    })
}

/// Encode an image as plain-text PGM.
///
/// The samples are quantized with [`quantize_grey`] and written top row first,
/// [`PIXELS_PER_LINE`] per line.
pub fn encode_image_pgm(image: &Image<f64, 1>) -> String {
    let grey = quantize_grey(image);
    let width = grey.width();

    let mut out = format!(
        "{PGM_MAGIC}\n{PGM_COMMENT}\n{} {}\n{}\n",
        width,
        grey.height(),
        PGM_MAX_VALUE
    );

    if width == 0 {
        return out;
    }

    let mut count = 0;
    for row in grey.as_slice().chunks_exact(width).rev() {
        for value in row {
            out.push_str(&format!("{value:3} "));
            count += 1;
            if count % PIXELS_PER_LINE == 0 {
                out.push('\n');
            }
        }
    }
    if count % PIXELS_PER_LINE != 0 {
        out.push('\n');
    }

    out
}

/// Writes the given image to a PGM file.
///
/// # Arguments
///
/// - `file_path` - The path to the PGM image.
/// - `image` - The image to quantize and write.
pub fn write_image_pgm(file_path: impl AsRef<Path>, image: &Image<f64, 1>) -> Result<(), IoError> {
    let mut file = File::create(file_path)?;
    file.write_all(encode_image_pgm(image).as_bytes())?;
    Ok(())
}
