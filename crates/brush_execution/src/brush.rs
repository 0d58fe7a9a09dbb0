use driver::{SmoothingConfig, UniformSpacingConfig};
use model::{BlendMode, Color};

use crate::dab::MAX_DAB_RADIUS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BrushConfigError {
    #[error("brush radius must be within 0..={MAX_DAB_RADIUS} pixels")]
    RadiusOutOfRange,
    #[error("brush hardness must be within 0..=1")]
    HardnessOutOfRange,
    #[error("brush opacity must be within 0..=1")]
    OpacityOutOfRange,
    #[error("brush spacing must be a positive fraction of the diameter")]
    SpacingOutOfRange,
}

/// Round soft-edged brush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassicBrush {
    /// Radius in pixels at full pressure.
    pub radius: f64,
    pub size_pressure: bool,
    pub hardness: f64,
    pub opacity: f64,
    pub opacity_pressure: bool,
    /// Distance between dabs as a fraction of the diameter.
    pub spacing: f64,
    pub color: Color,
    pub blend: BlendMode,
    pub smoothing: SmoothingConfig,
}

impl Default for ClassicBrush {
    fn default() -> Self {
        Self {
            radius: 4.0,
            size_pressure: true,
            hardness: 0.8,
            opacity: 1.0,
            opacity_pressure: false,
            spacing: 0.15,
            color: Color::BLACK,
            blend: BlendMode::Normal,
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl ClassicBrush {
    pub fn validate(&self) -> Result<(), BrushConfigError> {
        let unit = |value: f64| (0.0..=1.0).contains(&value);
        if !(0.0..=MAX_DAB_RADIUS).contains(&self.radius) {
            return Err(BrushConfigError::RadiusOutOfRange);
        }
        if !unit(self.hardness) {
            return Err(BrushConfigError::HardnessOutOfRange);
        }
        if !unit(self.opacity) {
            return Err(BrushConfigError::OpacityOutOfRange);
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(BrushConfigError::SpacingOutOfRange);
        }
        Ok(())
    }

    /// Dab distance at full pressure, never below one pixel.
    pub fn spacing_pixels(&self) -> f64 {
        (2.0 * self.radius * self.spacing).max(1.0)
    }

    pub fn spacing_config(&self) -> UniformSpacingConfig {
        UniformSpacingConfig {
            spacing_pixels: self.spacing_pixels(),
            pressure_scaled: self.size_pressure,
            min_spacing_pixels: 1.0,
        }
    }

    pub fn radius_at(&self, pressure: f64) -> f64 {
        if self.size_pressure {
            self.radius * pressure
        } else {
            self.radius
        }
    }

    pub fn opacity_at(&self, pressure: f64) -> f64 {
        if self.opacity_pressure {
            self.opacity * pressure
        } else {
            self.opacity
        }
    }
}
