use std::ops::RangeInclusive;

use sharpen_image::{Image, ImageError};

use super::kernels::MexicanHatKernel;
use crate::padding::PaddedRaster;
use crate::partition::CyclicPartition;

/// Which kernel offsets the stencil sum visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilBounds {
    /// Offsets in `[-d, d - 1]`: the last kernel row and column are skipped.
    #[default]
    HalfOpen,

    /// Offsets in `[-d, d]`: the full `(2d + 1) x (2d + 1)` square.
    Closed,
}

impl StencilBounds {
    /// The offsets visited along each axis for half width `d`.
    pub fn offsets(&self, half_width: usize) -> RangeInclusive<isize> {
        let d = half_width as isize;
        match self {
            StencilBounds::HalfOpen => -d..=d - 1,
            StencilBounds::Closed => -d..=d,
        }
    }

    /// The number of kernel taps per output pixel.
    pub fn taps(&self, half_width: usize) -> usize {
        self.offsets(half_width).count().pow(2)
    }
}

/// Stencil sum for source pixel `(x, y)`.
///
/// The raster border guarantees every visited coordinate `(x + d + k, y + d + l)` is in bounds.
#[inline]
pub fn stencil_sum(
    raster: &PaddedRaster,
    kernel: &MexicanHatKernel,
    bounds: StencilBounds,
    x: usize,
    y: usize,
) -> f64 {
    let d = raster.half_width();
    let cx = (x + d) as isize;
    let cy = (y + d) as isize;

    let mut sum = 0.0;
    for k in bounds.offsets(d) {
        for l in bounds.offsets(d) {
            let value = raster.get((cx + k) as usize, (cy + l) as usize);
            sum += kernel.coefficient(k, l) * value;
        }
    }
    sum
}

/// Compute the convolution for the pixels owned by `worker`.
///
/// Pixels are enumerated in storage order `p = y * nx + x` and assigned by `partition`. The
/// result has the size of the raster interior; pixels owned by other workers stay zero.
///
/// # Arguments
///
/// * `raster` - The zero padded input, identical on every worker.
/// * `partition` - The pixel to worker assignment.
/// * `worker` - The index of the calling worker.
/// * `bounds` - The kernel offsets to visit.
///
/// # Example
///
/// ```rust
/// use sharpen_image::Image;
/// use sharpen_imgproc::filter::{convolve_partial, StencilBounds};
/// use sharpen_imgproc::padding::PaddedRaster;
/// use sharpen_imgproc::partition::CyclicPartition;
///
/// let src = Image::<u16, 1>::from_size_val([4, 4].into(), 10).unwrap();
/// let raster = PaddedRaster::new(&src, 2).unwrap();
/// let partition = CyclicPartition::new(2).unwrap();
///
/// let partial = convolve_partial(&raster, &partition, 1, StencilBounds::HalfOpen).unwrap();
/// assert_eq!(partial.as_slice()[0], 0.0);
/// assert_ne!(partial.as_slice()[1], 0.0);
/// ```
pub fn convolve_partial(
    raster: &PaddedRaster,
    partition: &CyclicPartition,
    worker: usize,
    bounds: StencilBounds,
) -> Result<Image<f64, 1>, ImageError> {
    let size = raster.interior_size();
    let kernel = MexicanHatKernel::new(raster.half_width());
    let mut partial = Image::from_size_val(size, 0.0)?;

    let dst = partial.as_slice_mut();
    for p in partition.indices(worker, size.num_pixels()) {
        dst[p] = stencil_sum(raster, &kernel, bounds, p % size.width, p / size.width);
    }

    Ok(partial)
}

/// Compute the convolution of the whole raster on the calling thread.
pub fn convolve_serial(
    raster: &PaddedRaster,
    bounds: StencilBounds,
) -> Result<Image<f64, 1>, ImageError> {
    convolve_partial(raster, &CyclicPartition::single(), 0, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sharpen_image::ImageSize;

    fn impulse(size: ImageSize, x: usize, y: usize, value: u16) -> Image<u16, 1> {
        let mut data = vec![0u16; size.num_pixels()];
        data[y * size.width + x] = value;
        Image::new(size, data).unwrap()
    }

    #[test]
    fn test_bounds_offsets() {
        assert_eq!(StencilBounds::HalfOpen.offsets(8), -8..=7);
        assert_eq!(StencilBounds::Closed.offsets(8), -8..=8);
        assert_eq!(StencilBounds::HalfOpen.taps(8), 256);
        assert_eq!(StencilBounds::Closed.taps(8), 289);
        assert_eq!(StencilBounds::default(), StencilBounds::HalfOpen);
    }

    #[test]
    fn test_impulse_response_is_the_kernel() -> Result<(), ImageError> {
        let d = 3;
        let size = ImageSize {
            width: 9,
            height: 9,
        };
        let raster = PaddedRaster::new(&impulse(size, 4, 4, 1), d)?;
        let kernel = MexicanHatKernel::new(d);

        let conv = convolve_serial(&raster, StencilBounds::Closed)?;
        for y in 0..9isize {
            for x in 0..9isize {
                let (k, l) = (4 - x, 4 - y);
                let expected = if k.abs() <= 3 && l.abs() <= 3 {
                    kernel.coefficient(k, l)
                } else {
                    0.0
                };
                let got = conv.get_pixel(x as usize, y as usize, 0)?;
                assert_relative_eq!(got, expected, epsilon = 1e-12);
            }
        }

        Ok(())
    }

    #[test]
    fn test_half_open_skips_last_row_and_column() -> Result<(), ImageError> {
        let d = 3;
        let size = ImageSize {
            width: 9,
            height: 9,
        };
        let raster = PaddedRaster::new(&impulse(size, 4, 4, 1), d)?;

        let closed = convolve_serial(&raster, StencilBounds::Closed)?;
        let half_open = convolve_serial(&raster, StencilBounds::HalfOpen)?;

        // the impulse is reached with k = 4 - x, so x = 1 needs k = 3 = d
        assert_ne!(closed.get_pixel(1, 4, 0)?, 0.0);
        assert_eq!(half_open.get_pixel(1, 4, 0)?, 0.0);
        assert_eq!(half_open.get_pixel(4, 1, 0)?, 0.0);
        assert_eq!(half_open.get_pixel(7, 4, 0)?, closed.get_pixel(7, 4, 0)?);
        assert_eq!(half_open.get_pixel(4, 4, 0)?, closed.get_pixel(4, 4, 0)?);

        Ok(())
    }

    #[test]
    fn test_partials_cover_disjoint_pixels() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 5,
        };
        let src = Image::<u16, 1>::new(size, (0..30).collect())?;
        let raster = PaddedRaster::new(&src, 2)?;
        let full = convolve_serial(&raster, StencilBounds::HalfOpen)?;

        let partition = CyclicPartition::new(4).unwrap();
        for worker in 0..4 {
            let partial = convolve_partial(&raster, &partition, worker, StencilBounds::HalfOpen)?;
            for (p, (&got, &reference)) in partial.as_slice().iter().zip(full.as_slice()).enumerate()
            {
                if partition.owns(worker, p) {
                    assert_eq!(got, reference);
                } else {
                    assert_eq!(got, 0.0);
                }
            }
        }

        Ok(())
    }

    #[test]
    fn test_constant_image_interior() -> Result<(), ImageError> {
        // far from the border the response to a constant is the kernel sum
        let d = 2;
        let src = Image::<u16, 1>::from_size_val([9, 9].into(), 1)?;
        let raster = PaddedRaster::new(&src, d)?;
        let kernel = MexicanHatKernel::new(d);

        let conv = convolve_serial(&raster, StencilBounds::Closed)?;
        let mut kernel_sum = 0.0;
        for k in -2..=2 {
            for l in -2..=2 {
                kernel_sum += kernel.coefficient(k, l);
            }
        }
        assert_relative_eq!(conv.get_pixel(4, 4, 0)?, kernel_sum, epsilon = 1e-12);

        Ok(())
    }
}
