//! Linear range mapping for parameter normalization.
//!
//! Hosts only ever see normalized values in `0.0..=1.0`. Patch parameters
//! declare a native `[min, max]` range and the adapter maps between the two
//! linearly. Step counts are reported to hosts but never used for rounding
//! here.
//!
//! # Example
//!
//! ```ignore
//! use patchhost_core::ParameterRange;
//!
//! let range = ParameterRange::new(20.0, 20000.0);
//! assert_eq!(range.denormalize(0.0), 20.0);
//! assert_eq!(range.normalize(20000.0), 1.0);
//! ```

/// Normalized value reported for a degenerate (`min == max`) range.
pub const DEGENERATE_NORMALIZED: f32 = 0.5;

/// Native value range of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
}

impl ParameterRange {
    /// Create a range from its endpoints.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// The `0..=1` range used by boolean parameters.
    pub const fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Returns true if the range has no extent.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Convert a native value to normalized `0.0..=1.0`.
    ///
    /// Out-of-range values are clamped. A degenerate range never divides and
    /// always yields [`DEGENERATE_NORMALIZED`].
    #[inline]
    pub fn normalize(&self, native: f32) -> f32 {
        if self.is_degenerate() {
            return DEGENERATE_NORMALIZED;
        }
        clamp01((native - self.min) / (self.max - self.min))
    }

    /// Convert a normalized value back to the native range.
    ///
    /// The input is clamped to `0.0..=1.0` first.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.min + clamp01(normalized) * (self.max - self.min)
    }

    /// Clamp a native value into the range.
    #[inline]
    pub fn clamp(&self, native: f32) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if native.is_nan() {
            lo
        } else {
            native.clamp(lo, hi)
        }
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::unit()
    }
}

/// Clamp to `0.0..=1.0`, mapping NaN to 0.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
