//! Pointer input plumbing between the input thread and the brush.

mod queue;
mod smoothing;
mod uniform_spacing;

pub use queue::{
    PointerEventReceiver, PointerEventSender, PointerQueueCreateError, PointerQueuePushError,
    create_pointer_queue,
};
pub use smoothing::{SmoothingConfig, StrokeSmoother};
pub use uniform_spacing::{UniformSpacingConfig, UniformSpacingResampler};

pub type EventTimestampMicros = u64;

/// Pointer coordinates are clamped to `-MAX..=MAX` pixels. The bound keeps
/// the canvas plus a margin as wide again, well inside the quarter-pixel
/// wire range.
pub const MAX_POINTER_COORDINATE: f64 = 2.0 * model::MAX_CANVAS_DIMENSION as f64;

fn clamp_coordinate(value: f64) -> f64 {
    value.clamp(-MAX_POINTER_COORDINATE, MAX_POINTER_COORDINATE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer position in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub timestamp_micros: EventTimestampMicros,
    pub x: f64,
    pub y: f64,
    /// Normalized to `0.0..=1.0`.
    pub pressure: f64,
}

impl PointerSample {
    pub fn new(timestamp_micros: EventTimestampMicros, x: f64, y: f64, pressure: f64) -> Self {
        Self {
            timestamp_micros,
            x,
            y,
            pressure,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.pressure.is_finite()
    }

    /// Position and pressure clamped into range.
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_coordinate(self.x),
            y: clamp_coordinate(self.y),
            pressure: self.pressure.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn distance_to(&self, other: &PointerSample) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx.hypot(dy)
    }

    /// Linear interpolation towards `other`. `t` is in `0.0..=1.0`.
    pub fn lerp(&self, other: &PointerSample, t: f64) -> Self {
        let timestamp_delta = other.timestamp_micros.saturating_sub(self.timestamp_micros);
        Self {
            timestamp_micros: self.timestamp_micros + (timestamp_delta as f64 * t).round() as u64,
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            pressure: self.pressure + (other.pressure - self.pressure) * t,
        }
    }

    /// The position stays clamped like [`clamped`](Self::clamped).
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: clamp_coordinate(self.x + dx),
            y: clamp_coordinate(self.y + dy),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub sample: PointerSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SampleProcessingError {
    #[error("pointer input is not finite or the spacing is not positive")]
    InvalidInput,
    #[error("pointer timestamps went backwards")]
    NonMonotonicTimestamp,
}

pub trait SampleEmitter {
    fn emit_sample(&mut self, sample: PointerSample) -> Result<(), SampleProcessingError>;
}

impl SampleEmitter for Vec<PointerSample> {
    fn emit_sample(&mut self, sample: PointerSample) -> Result<(), SampleProcessingError> {
        self.push(sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_interpolates_every_field() {
        let a = PointerSample::new(100, 0.0, 0.0, 0.0);
        let b = PointerSample::new(200, 10.0, -4.0, 1.0);
        assert_eq!(a.lerp(&b, 0.5), PointerSample::new(150, 5.0, -2.0, 0.5));
        assert_eq!(a.distance_to(&PointerSample::new(0, 3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn clamped_limits_pressure() {
        assert_eq!(PointerSample::new(0, 1.0, 1.0, 1.5).clamped().pressure, 1.0);
        assert_eq!(PointerSample::new(0, 1.0, 1.0, -0.5).clamped().pressure, 0.0);
        assert!(!PointerSample::new(0, f64::NAN, 1.0, 0.5).is_finite());
    }

    #[test]
    fn clamped_limits_position() {
        let far = PointerSample::new(0, 1e200, -1e200, 0.5).clamped();
        assert_eq!(far.x, MAX_POINTER_COORDINATE);
        assert_eq!(far.y, -MAX_POINTER_COORDINATE);
        assert_eq!(far.clamped(), far);
        assert_eq!(
            PointerSample::new(0, 10.0, 10.0, 1.0)
                .translated(f64::MAX, 0.0)
                .x,
            MAX_POINTER_COORDINATE
        );
        let near = PointerSample::new(0, 0.0, 0.0, 1.0);
        assert!(near.distance_to(&far).is_finite());
    }
}
