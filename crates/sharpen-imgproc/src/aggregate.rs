use sharpen_image::{Image, ImageError};

/// Combine per-worker partial results into one image by elementwise summation.
///
/// Each pixel is non-zero in at most one partial, so the sum reproduces the full convolution.
/// The partials are left untouched; a new image is returned.
///
/// # Errors
///
/// Returns [`ImageError::InvalidImageSize`] if the partials do not share a size, and
/// [`ImageError::EmptyImageList`] if there is nothing to combine.
///
/// # Example
///
/// ```rust
/// use sharpen_image::Image;
/// use sharpen_imgproc::aggregate::aggregate_partials;
///
/// let a = Image::<f64, 1>::new([3, 1].into(), vec![1.0, 0.0, 3.0]).unwrap();
/// let b = Image::<f64, 1>::new([3, 1].into(), vec![0.0, 2.0, 0.0]).unwrap();
///
/// let sum = aggregate_partials(&[a, b]).unwrap();
/// assert_eq!(sum.as_slice(), &[1.0, 2.0, 3.0]);
/// ```
pub fn aggregate_partials(partials: &[Image<f64, 1>]) -> Result<Image<f64, 1>, ImageError> {
    let Some(first) = partials.first() else {
        return Err(ImageError::EmptyImageList);
    };

    let size = first.size();
    let mut aggregate = Image::from_size_val(size, 0.0)?;

    for partial in partials {
        if partial.size() != size {
            return Err(ImageError::InvalidImageSize(
                partial.width(),
                partial.height(),
                size.width,
                size.height,
            ));
        }

        aggregate
            .as_slice_mut()
            .iter_mut()
            .zip(partial.as_slice())
            .for_each(|(acc, &v)| *acc += v);
    }

    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_single() -> Result<(), ImageError> {
        let a = Image::<f64, 1>::new([2, 2].into(), vec![1.0, -2.0, 3.5, 0.0])?;
        let sum = aggregate_partials(std::slice::from_ref(&a))?;
        assert_eq!(sum, a);
        Ok(())
    }

    #[test]
    fn test_aggregate_does_not_double_count() -> Result<(), ImageError> {
        let n = 3;
        let values = [4.0, -1.0, 2.5, 7.0, 0.5, -3.0, 9.0];
        let partials = (0..n)
            .map(|w| {
                let data = values
                    .iter()
                    .enumerate()
                    .map(|(p, &v)| if p % n == w { v } else { 0.0 })
                    .collect();
                Image::<f64, 1>::new([7, 1].into(), data)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sum = aggregate_partials(&partials)?;
        assert_eq!(sum.as_slice(), &values);
        Ok(())
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(
            aggregate_partials(&[]),
            Err(ImageError::EmptyImageList)
        );
    }

    #[test]
    fn test_aggregate_size_mismatch() -> Result<(), ImageError> {
        let a = Image::<f64, 1>::from_size_val([2, 2].into(), 0.0)?;
        let b = Image::<f64, 1>::from_size_val([2, 3].into(), 0.0)?;
        assert_eq!(
            aggregate_partials(&[a, b]),
            Err(ImageError::InvalidImageSize(2, 3, 2, 2))
        );
        Ok(())
    }
}
