#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access and malformed PGM content.
pub mod error;

/// Plain-text PGM (P2) image header size, reader and writer.
///
/// See [`pgm::read_image_pgm_mono16`] and [`pgm::write_image_pgm`].
pub mod pgm;

pub use crate::error::IoError;
