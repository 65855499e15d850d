use sharpen_image::ImageSize;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Error to open, read or write the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// The first line is not the `P2` magic.
    #[error("Not a plain-text PGM file, found magic {0:?}")]
    InvalidMagic(String),

    /// The dimensions or the max value could not be parsed.
    #[error("Invalid PGM header. {0}")]
    InvalidHeader(String),

    /// The declared size does not fit the destination buffer.
    #[error("Image of size {size} is larger than the maximum {max_size}")]
    ImageTooLarge {
        /// Size declared in the header.
        size: ImageSize,
        /// Largest size accepted by the caller.
        max_size: ImageSize,
    },

    /// The file holds fewer samples than the header declares.
    #[error("Expected {expected} pixels but found {found}")]
    TruncatedData {
        /// Number of samples declared by the header.
        expected: usize,
        /// Number of samples present.
        found: usize,
    },

    /// A sample is not an integer in `[0, max value]`.
    #[error("Invalid pixel value {0:?}")]
    InvalidPixel(String),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] sharpen_image::ImageError),
}
