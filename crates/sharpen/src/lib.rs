#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use sharpen_image as image;

#[doc(inline)]
pub use sharpen_imgproc as imgproc;

#[doc(inline)]
pub use sharpen_io as io;

/// Sharpening of PGM files with a group of workers.
pub mod pipeline;
