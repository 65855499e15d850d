//! Filter operations
//!
//! This module provides the Mexican-hat kernel and the stencil convolution run by every worker.

/// Filter kernels
pub mod kernels;

/// Stencil convolution
mod convolution;
pub use convolution::*;
