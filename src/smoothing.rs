//! Exponential smoothing of noisy heart-rate targets

use crate::error::{GpxHrError, Result};
use crate::models::HeartRate;
use crate::noise::NoiseSource;

/// One exponential smoothing step.
///
/// Returns `previous + alpha * (target - previous)` truncated toward zero.
/// No bounds checks: any alpha is accepted here and negative results pass
/// through unchanged.
pub fn smooth(previous: f64, target: f64, alpha: f64) -> HeartRate {
    (previous + alpha * (target - previous)).trunc() as HeartRate
}

/// Reject smoothing factors outside `(0, 1]`
pub fn validate_alpha(alpha: f64) -> Result<f64> {
    if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
        Ok(alpha)
    } else {
        Err(GpxHrError::invalid(
            "alpha",
            format!("smoothing factor must be in (0, 1], got {}", alpha),
        ))
    }
}

/// Reject noise spreads that are negative or not finite
pub fn validate_std_dev(std_dev: f64) -> Result<f64> {
    if std_dev.is_finite() && std_dev >= 0.0 {
        Ok(std_dev)
    } else {
        Err(GpxHrError::invalid(
            "noise_std_dev",
            format!("must be a non-negative number, got {}", std_dev),
        ))
    }
}

/// Running smoothing state for one generation or annotation pass.
///
/// Starts at the base heart rate and keeps only the previous sample.
#[derive(Debug, Clone)]
pub struct HrSmoother {
    base: HeartRate,
    alpha: f64,
    std_dev: f64,
    previous: HeartRate,
}

impl HrSmoother {
    pub fn new(base: HeartRate, alpha: f64, std_dev: f64) -> Self {
        Self {
            base,
            alpha,
            std_dev,
            previous: base,
        }
    }

    /// Last emitted sample, or the base rate before the first call
    pub fn previous(&self) -> HeartRate {
        self.previous
    }

    /// Smooth toward an explicit target
    pub fn next(&mut self, target: HeartRate) -> HeartRate {
        self.previous = smooth(self.previous as f64, target as f64, self.alpha);
        self.previous
    }

    /// Draw a noised target around the base rate and smooth toward it
    pub fn sample<N: NoiseSource + ?Sized>(&mut self, noise: &mut N) -> HeartRate {
        let offset = noise.gaussian(0.0, self.std_dev).round() as HeartRate;
        self.next(self.base.saturating_add(offset))
    }
}
