use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use sharpen_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// assert_eq!(image_size.num_pixels(), 200);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Total number of pixels covered by the size.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Total number of pixels, or `None` when `width * height` overflows.
    pub fn checked_num_pixels(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Returns true when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

impl From<ImageSize> for [usize; 2] {
    fn from(size: ImageSize) -> Self {
        [size.width, size.height]
    }
}

/// Represents an image with pixel data.
///
/// The pixels are stored contiguously with shape (H, W, C), where H is the height of the image,
/// W is the width and C the number of channels. Row `0` is the bottom row of the picture.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Returns
    ///
    /// A new image with the given pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharpen_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 1>::new(
    ///    ImageSize {
    ///       width: 10,
    ///       height: 20,
    ///    },
    ///    vec![0u8; 10 * 20],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 1);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        // check if the data length matches the image size
        let len = Self::buffer_len(size)?;
        if data.len() != len {
            return Err(ImageError::InvalidChannelShape(data.len(), len));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `val` - The default value of the pixel data.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharpen_image::{Image, ImageSize};
    ///
    /// let image = Image::<f64, 1>::from_size_val([4, 3].into(), 0.0).unwrap();
    ///
    /// assert_eq!(image.width(), 4);
    /// assert_eq!(image.height(), 3);
    /// assert!(image.as_slice().iter().all(|&v| v == 0.0));
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; Self::buffer_len(size)?];
        Image::new(size, data)
    }

    // number of elements of a buffer holding an image of `size`
    fn buffer_len(size: ImageSize) -> Result<usize, ImageError> {
        size
            .checked_num_pixels()
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(ImageError::ImageSizeOverflow(size.width, size.height))
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.width()
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.height()
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Get the pixel data as a contiguous slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the pixel data as a mutable contiguous slice.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return the underlying buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Get a reference to the element at `[y, x, c]`, or `None` when out of bounds.
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [y, x, c] = index;
        if y >= self.height() || x >= self.width() || c >= CHANNELS {
            return None;
        }
        self.data.get((y * self.width() + x) * CHANNELS + c)
    }

    /// Get a mutable reference to the element at `[y, x, c]`, or `None` when out of bounds.
    pub fn get_mut(&mut self, index: [usize; 3]) -> Option<&mut T> {
        let [y, x, c] = index;
        if y >= self.height() || x >= self.width() || c >= CHANNELS {
            return None;
        }
        let width = self.width();
        self.data.get_mut((y * width + x) * CHANNELS + c)
    }

    /// Get the value of the pixel at `(x, y)` in the given channel.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::PixelIndexOutOfBounds`] if the coordinate lies outside the image.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<T, ImageError>
    where
        T: Copy,
    {
        self.get([y, x, ch]).copied().ok_or(ImageError::PixelIndexOutOfBounds(
            x,
            y,
            self.width(),
            self.height(),
        ))
    }

    /// Cast the pixel data of the image to a different type.
    ///
    /// # Returns
    ///
    /// A new image with the pixel data cast to the given type.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::CastError`] if a value cannot be represented by `U`.
    pub fn cast<U>(&self) -> Result<Image<U, CHANNELS>, ImageError>
    where
        U: num_traits::NumCast,
        T: num_traits::NumCast + Copy,
    {
        let casted_data = self
            .data
            .iter()
            .map(|&x| U::from(x).ok_or(ImageError::CastError))
            .collect::<Result<Vec<U>, ImageError>>()?;

        Image::new(self.size, casted_data)
    }

    /// Apply a function to every element, producing a new image of the same size.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Image<U, CHANNELS> {
        Image {
            size: self.size,
            data: self.data.iter().map(f).collect(),
        }
    }
}
