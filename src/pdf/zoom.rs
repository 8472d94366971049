//! Zoom state for PDF rendering
//!
//! The factor is the page's scale relative to its native size; 1.0 renders
//! one output pixel per PDF point.

/// Zoom state for PDF viewing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            factor: Self::DEFAULT_SCALE,
        }
    }
}

impl Zoom {
    /// Additive step per zoom action
    pub const STEP: f32 = 0.25;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.5;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 3.0;
    /// Factor a freshly opened document starts at
    pub const DEFAULT_SCALE: f32 = 1.5;

    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    /// Returns the current zoom factor
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Zoom factor as a rounded percentage, for display
    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    /// Zoom in by one step, returning whether the factor changed
    pub fn step_in(&mut self) -> bool {
        self.set(self.factor + Self::STEP)
    }

    /// Zoom out by one step, returning whether the factor changed
    pub fn step_out(&mut self) -> bool {
        self.set(self.factor - Self::STEP)
    }

    pub fn can_zoom_in(&self) -> bool {
        self.factor < Self::MAX_SCALE
    }

    pub fn can_zoom_out(&self) -> bool {
        self.factor > Self::MIN_SCALE
    }

    fn set(&mut self, factor: f32) -> bool {
        let clamped = Self::clamp_factor(factor);
        if (self.factor - clamped).abs() > f32::EPSILON {
            self.factor = clamped;
            true
        } else {
            false
        }
    }

    /// Clamp factor to valid range, handling NaN/Inf
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            Self::DEFAULT_SCALE
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}
