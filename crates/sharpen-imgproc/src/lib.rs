#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// combination of per-worker partial results.
pub mod aggregate;

/// image cropping module.
pub mod crop;

/// image filtering module.
pub mod filter;

/// module containing parallelization utilities and collective operations.
pub mod parallel;

/// zero padding of rasters for stencil access.
pub mod padding;

/// static assignment of pixels to workers.
pub mod partition;

/// edge sharpening pipeline.
pub mod sharpen;
