use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};
use sharpen_image::{Image, ImageError, ImageSize};

/// Crop an image to a specified region.
///
/// # Arguments
///
/// * `src` - The source image to crop.
/// * `dst` - The destination image to store the cropped image.
/// * `x` - The x-coordinate of the first column of the region to crop.
/// * `y` - The y-coordinate of the first row of the region to crop.
///
/// # Errors
///
/// Returns an error if the region does not fit inside `src`.
///
/// # Examples
///
/// ```rust
/// use sharpen_image::{Image, ImageSize};
/// use sharpen_imgproc::crop::crop_image;
///
/// let image = Image::<_, 1>::new(ImageSize { width: 4, height: 4 }, vec![
///     0u8, 1, 2, 3,
///     4u8, 5, 6, 7,
///     8u8, 9, 10, 11,
///     12u8, 13, 14, 15
/// ]).unwrap();
///
/// let mut cropped = Image::<_, 1>::from_size_val(ImageSize { width: 2, height: 2 }, 0u8).unwrap();
///
/// crop_image(&image, &mut cropped, 1, 1).unwrap();
///
/// assert_eq!(cropped.as_slice(), &[5u8, 6, 9, 10]);
/// ```
pub fn crop_image<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    x: usize,
    y: usize,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if x + dst.width() > src.width() || y + dst.height() > src.height() {
        return Err(ImageError::InvalidImageSize(
            x + dst.width(),
            y + dst.height(),
            src.width(),
            src.height(),
        ));
    }

    let dst_cols = dst.cols();
    if dst_cols == 0 {
        return Ok(());
    }

    let src_cols = src.cols();
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_cols * C)
        .enumerate()
        .for_each(|(i, dst_row)| {
            // get the slice at the first column of the region
            let offset = (y + i) * src_cols * C + x * C;
            dst_row.copy_from_slice(&src_data[offset..offset + dst_cols * C]);
        });

    Ok(())
}

/// Drop a border of `border` pixels on every side of the image.
///
/// # Errors
///
/// Returns an error if either side of the image is not larger than `2 * border`.
pub fn crop_border<T, const C: usize>(
    src: &Image<T, C>,
    border: usize,
) -> Result<Image<T, C>, ImageError>
where
    T: Copy + Default + Send + Sync,
{
    if src.width() <= 2 * border || src.height() <= 2 * border {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            2 * border + 1,
            2 * border + 1,
        ));
    }

    let size = ImageSize {
        width: src.width() - 2 * border,
        height: src.height() - 2 * border,
    };
    let mut dst = Image::from_size_val(size, T::default())?;
    crop_image(src, &mut dst, border, border)?;

    Ok(dst)
}
