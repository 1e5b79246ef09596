//! Stored value to physical value rescaling and window/level mapping.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum WindowError {
    #[error("Invalid window: width {width} must be positive and center {center} finite")]
    InvalidWindow { width: f64, center: f64 },
}

/// Apply the rescale slope and intercept to a stored value.
#[inline]
pub fn to_physical(raw: f64, rescale_slope: f64, rescale_intercept: f64) -> f64 {
    raw.mul_add(rescale_slope, rescale_intercept)
}

/// Inverse of [`to_physical`]. `None` when the slope is zero.
#[inline]
pub fn from_physical(physical: f64, rescale_slope: f64, rescale_intercept: f64) -> Option<f64> {
    if rescale_slope == 0.0 {
        return None;
    }
    Some((physical - rescale_intercept) / rescale_slope)
}

/// Map a physical value into `[0, 1]` with the linear windowing law.
///
/// Values at or below `center - width / 2` map to 0, values at or above
/// `center + width / 2` map to 1 and `center` maps to exactly 0.5.
pub fn apply_window(value: f64, window_width: f64, window_center: f64) -> Result<f64, WindowError> {
    Ok(WindowLevel::new(window_width, window_center)?.apply(value))
}

/// A validated window/level pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowLevel {
    width: f64,
    center: f64,
}

impl WindowLevel {
    pub fn new(width: f64, center: f64) -> Result<Self, WindowError> {
        if !(width > 0.0) || !width.is_finite() || !center.is_finite() {
            return Err(WindowError::InvalidWindow { width, center });
        }
        Ok(Self { width, center })
    }

    /// Window spanning `[min, max]`, used when the header carries no window.
    ///
    /// A flat range gets a width of 1 so that every value lands on 0.5.
    pub fn from_range(min: f64, max: f64) -> Result<Self, WindowError> {
        let width = if max > min { max - min } else { 1.0 };
        Self::new(width, min + (max - min) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn low(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn high(&self) -> f64 {
        self.center + self.width / 2.0
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        if value <= self.low() {
            0.0
        } else if value >= self.high() {
            1.0
        } else {
            ((value - self.center) / self.width + 0.5).clamp(0.0, 1.0)
        }
    }

    #[inline]
    pub fn to_u8(&self, value: f64) -> u8 {
        (self.apply(value) * 255.0).round() as u8
    }
}
