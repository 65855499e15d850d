use sharpen_image::{Image, ImageError, ImageSize};

/// Represents 2D padding with top, bottom, left, and right values (in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding2D {
    /// Amount of padding to add on the top side.
    pub top: usize,
    /// Amount of padding to add on the bottom side.
    pub bottom: usize,
    /// Amount of padding to add on the left side.
    pub left: usize,
    /// Amount of padding to add on the right side.
    pub right: usize,
}

impl Padding2D {
    /// The same amount of padding on every side.
    pub fn uniform(width: usize) -> Self {
        Self {
            top: width,
            bottom: width,
            left: width,
            right: width,
        }
    }

    /// The size of an image of `size` once this padding is applied.
    pub fn padded_size(&self, size: ImageSize) -> ImageSize {
        ImageSize {
            width: size.width + self.left + self.right,
            height: size.height + self.top + self.bottom,
        }
    }

    /// Validates that a new image size correctly matches the expected dimensions
    /// after applying this padding to an existing image.
    ///
    /// # Example
    /// ```rust
    /// use sharpen_image::ImageSize;
    /// use sharpen_imgproc::padding::Padding2D;
    /// let padding = Padding2D { top: 1, bottom: 1, left: 2, right: 2 };
    /// let old_size = ImageSize { width: 4, height: 4 };
    /// let new_size = ImageSize { width: 8, height: 6 };
    ///
    /// assert!(padding.validate_size(old_size, new_size));
    /// ```
    pub fn validate_size(&self, old_size: ImageSize, new_size: ImageSize) -> bool {
        self.padded_size(old_size) == new_size
    }
}

/// Copies `src` into the centre of `dst` and fills the border with `constant_value`.
///
/// # Errors
///
/// Returns an error if the size of `dst` does not match the size of `src` plus `padding`.
///
/// # Example
///
/// ```rust
/// use sharpen_image::Image;
/// use sharpen_imgproc::padding::{spatial_padding, Padding2D};
///
/// let src = Image::<f64, 1>::from_size_val([2, 2].into(), 1.0).unwrap();
/// let mut dst = Image::<f64, 1>::from_size_val([4, 4].into(), 7.0).unwrap();
///
/// spatial_padding(&src, &mut dst, Padding2D::uniform(1), 0.0).unwrap();
///
/// assert_eq!(dst.as_slice().iter().sum::<f64>(), 4.0);
/// ```
pub fn spatial_padding<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    padding: Padding2D,
    constant_value: T,
) -> Result<(), ImageError>
where
    T: Copy,
{
    if !padding.validate_size(src.size(), dst.size()) {
        let expected = padding.padded_size(src.size());
        return Err(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            expected.width,
            expected.height,
        ));
    }

    let new_stride = dst.width() * C;
    let old_stride = src.width() * C;
    let row_offset = padding.top * new_stride + padding.left * C;

    let new_data = dst.as_slice_mut();
    new_data.fill(constant_value);

    // an empty source leaves nothing to copy
    if old_stride == 0 {
        return Ok(());
    }

    for (src_row, dst_row) in src
        .as_slice()
        .chunks_exact(old_stride)
        .zip(new_data[row_offset..].chunks_exact_mut(new_stride))
    {
        dst_row[..old_stride].copy_from_slice(src_row);
    }

    Ok(())
}

/// A greyscale raster surrounded by a zero border of width `d`.
///
/// The interior `[d, d + nx) x [d, d + ny)` holds the source image converted to `f64`. The
/// border is zero so that a stencil of half width `d` centred on any interior pixel stays in
/// bounds. The raster is filled once on construction and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedRaster {
    half_width: usize,
    interior: ImageSize,
    data: Image<f64, 1>,
}

impl PaddedRaster {
    /// Pad `src` with a zero border of width `half_width`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sharpen_image::Image;
    /// use sharpen_imgproc::padding::PaddedRaster;
    ///
    /// let src = Image::<u16, 1>::from_size_val([3, 2].into(), 9).unwrap();
    /// let raster = PaddedRaster::new(&src, 2).unwrap();
    ///
    /// assert_eq!(raster.padded_size().width, 7);
    /// assert_eq!(raster.padded_size().height, 6);
    /// assert_eq!(raster.interior(0, 0), 9.0);
    /// assert_eq!(raster.get(0, 0), 0.0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::CastError`] if a pixel value has no `f64` representation.
    pub fn new<T>(src: &Image<T, 1>, half_width: usize) -> Result<Self, ImageError>
    where
        T: Copy + num_traits::NumCast,
    {
        let padding = Padding2D::uniform(half_width);
        let src_f64 = src.cast::<f64>()?;
        let mut data = Image::from_size_val(padding.padded_size(src.size()), 0.0)?;
        spatial_padding(&src_f64, &mut data, padding, 0.0)?;

        Ok(Self {
            half_width,
            interior: src.size(),
            data,
        })
    }

    /// The border width `d`.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// The size of the source image, `nx x ny`.
    pub fn interior_size(&self) -> ImageSize {
        self.interior
    }

    /// The size including the border, `(nx + 2d) x (ny + 2d)`.
    pub fn padded_size(&self) -> ImageSize {
        self.data.size()
    }

    /// The padded raster as an image.
    pub fn as_image(&self) -> &Image<f64, 1> {
        &self.data
    }

    /// Value at padded coordinate `(px, py)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the padded raster.
    #[inline]
    pub fn get(&self, px: usize, py: usize) -> f64 {
        self.data.as_slice()[py * self.data.width() + px]
    }

    /// Value of source pixel `(x, y)`, i.e. padded coordinate `(x + d, y + d)`.
    #[inline]
    pub fn interior(&self, x: usize, y: usize) -> f64 {
        self.get(x + self.half_width, y + self.half_width)
    }
}
