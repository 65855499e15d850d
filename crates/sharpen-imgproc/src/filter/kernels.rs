/// Radius at which the reference sigma is defined.
pub const REFERENCE_RADIUS: f64 = 4.0;

/// Gaussian sigma of the kernel when the half width equals [`REFERENCE_RADIUS`].
pub const REFERENCE_SIGMA: f64 = 1.4;

/// Peak amplitude of the kernel at the origin.
pub const AMPLITUDE: f64 = -40.0;

/// Compute one coefficient of the Mexican-hat (Laplacian-of-Gaussian) kernel.
///
/// The sigma scales linearly with the half width `d`, so the shape of the hat is the same for
/// every stencil size. The coefficient only depends on `k² + l²`.
///
/// # Arguments
///
/// * `half_width` - The half width `d` of the stencil.
/// * `k` - The horizontal offset in `[-d, d]`.
/// * `l` - The vertical offset in `[-d, d]`.
///
/// # Returns
///
/// `AMPLITUDE * (1 - delta) * exp(-delta)` with `delta = (k² + l²) / (2 sigma²)`.
///
/// # Examples
///
/// ```
/// use sharpen_imgproc::filter::kernels::mexican_hat;
///
/// assert_eq!(mexican_hat(8, 0, 0), -40.0);
/// assert_eq!(mexican_hat(8, 3, -2), mexican_hat(8, -3, 2));
/// ```
pub fn mexican_hat(half_width: usize, k: isize, l: isize) -> f64 {
    MexicanHatKernel::new(half_width).coefficient(k, l)
}

/// Mexican-hat kernel of a given half width.
///
/// Coefficients are evaluated on demand; the `(2d+1) x (2d+1)` table is never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MexicanHatKernel {
    half_width: usize,
    sigma_sq: f64,
}

impl MexicanHatKernel {
    /// Create the kernel for the half width `d`.
    pub fn new(half_width: usize) -> Self {
        let d = half_width as f64;
        let sigma_sq = REFERENCE_SIGMA * REFERENCE_SIGMA * (d * d)
            / (REFERENCE_RADIUS * REFERENCE_RADIUS);
        Self {
            half_width,
            sigma_sq,
        }
    }

    /// The half width `d` of the stencil.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// The side of the full square stencil, `2d + 1`.
    pub fn size(&self) -> usize {
        2 * self.half_width + 1
    }

    /// The squared Gaussian sigma derived from the half width.
    pub fn sigma_sq(&self) -> f64 {
        self.sigma_sq
    }

    /// Evaluate the coefficient at offset `(k, l)`.
    #[inline]
    pub fn coefficient(&self, k: isize, l: isize) -> f64 {
        let x = k as f64;
        let y = l as f64;
        let delta = (x * x + y * y) / (2.0 * self.sigma_sq);
        AMPLITUDE * (1.0 - delta) * (-delta).exp()
    }
}
