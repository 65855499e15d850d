/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images that must share a size do not.
    #[error("Image size mismatch: got {0}x{1}, expected {2}x{3}")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the number of elements of an image does not fit in `usize`.
    #[error("Image of size {0}x{1} is too large to allocate")]
    ImageSizeOverflow(usize, usize),

    /// Error when a pixel coordinate lies outside the image.
    #[error("Pixel index ({0}, {1}) out of bounds for image of size {2}x{3}")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when an operation over several images receives none.
    #[error("No images were provided")]
    EmptyImageList,

    /// Error when a pixel value cannot be represented in the target type.
    #[error("Failed to cast pixel value")]
    CastError,
}
