use crate::{PointerSample, SampleEmitter, SampleProcessingError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSpacingConfig {
    /// Distance between samples at full pressure.
    pub spacing_pixels: f64,
    /// Scale the spacing by the pressure of the previous sample.
    pub pressure_scaled: bool,
    /// Lower bound for pressure-scaled spacing.
    pub min_spacing_pixels: f64,
}

impl Default for UniformSpacingConfig {
    fn default() -> Self {
        Self {
            spacing_pixels: 1.0,
            pressure_scaled: false,
            min_spacing_pixels: 1.0,
        }
    }
}

impl UniformSpacingConfig {
    pub fn validate(&self) -> Result<(), SampleProcessingError> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.spacing_pixels) || !positive(self.min_spacing_pixels) {
            return Err(SampleProcessingError::InvalidInput);
        }
        Ok(())
    }

    fn spacing_at(&self, pressure: f64) -> f64 {
        if self.pressure_scaled {
            (self.spacing_pixels * pressure).max(self.min_spacing_pixels)
        } else {
            self.spacing_pixels
        }
    }
}

/// Walks the pointer path and emits a sample every `spacing` pixels of
/// travel. Distance left over at the end of a segment carries into the next
/// one, so spacing stays uniform across input samples.
#[derive(Debug, Default, Clone)]
pub struct UniformSpacingResampler {
    config: UniformSpacingConfig,
    last_input: Option<PointerSample>,
    distance_since_last_sample: f64,
}

impl UniformSpacingResampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a stroke at `start`. Nothing is emitted for the start point.
    pub fn begin(
        &mut self,
        start: PointerSample,
        config: UniformSpacingConfig,
    ) -> Result<(), SampleProcessingError> {
        config.validate()?;
        if !start.is_finite() {
            return Err(SampleProcessingError::InvalidInput);
        }
        self.config = config;
        self.last_input = Some(start.clamped());
        self.distance_since_last_sample = 0.0;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.last_input.is_some()
    }

    pub fn last_input(&self) -> Option<PointerSample> {
        self.last_input
    }

    pub fn feed<E>(
        &mut self,
        input: PointerSample,
        emitter: &mut E,
    ) -> Result<(), SampleProcessingError>
    where
        E: SampleEmitter,
    {
        let Some(previous_input) = self.last_input else {
            return Err(SampleProcessingError::InvalidInput);
        };
        if !input.is_finite() {
            return Err(SampleProcessingError::InvalidInput);
        }
        if input.timestamp_micros < previous_input.timestamp_micros {
            return Err(SampleProcessingError::NonMonotonicTimestamp);
        }
        let input = input.clamped();

        let mut segment_start = previous_input;
        let segment_end = input;
        let mut segment_length = segment_start.distance_to(&segment_end);
        if !segment_length.is_finite() {
            return Err(SampleProcessingError::InvalidInput);
        }
        let mut spacing = self.config.spacing_at(segment_start.pressure);

        while self.distance_since_last_sample + segment_length >= spacing {
            let distance_to_next_sample = spacing - self.distance_since_last_sample;
            let interpolation_t = if segment_length == 0.0 {
                0.0
            } else {
                distance_to_next_sample / segment_length
            };
            let next_sample = segment_start.lerp(&segment_end, interpolation_t);

            emitter.emit_sample(next_sample)?;
            self.distance_since_last_sample = 0.0;
            segment_start = next_sample;
            segment_length = segment_start.distance_to(&segment_end);
            spacing = self.config.spacing_at(segment_start.pressure);
        }

        self.distance_since_last_sample += segment_length;
        self.last_input = Some(input);
        Ok(())
    }

    /// Shift the stroke, e.g. after the canvas origin moved.
    pub fn add_offset(&mut self, dx: f64, dy: f64) {
        if let Some(last_input) = self.last_input.as_mut() {
            *last_input = last_input.translated(dx, dy);
        }
    }

    pub fn end(&mut self) {
        self.last_input = None;
        self.distance_since_last_sample = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_POINTER_COORDINATE;

    fn sample(timestamp_micros: u64, x: f64, y: f64) -> PointerSample {
        PointerSample::new(timestamp_micros, x, y, 1.0)
    }

    fn spacing(spacing_pixels: f64) -> UniformSpacingConfig {
        UniformSpacingConfig {
            spacing_pixels,
            ..UniformSpacingConfig::default()
        }
    }

    #[test]
    fn resamples_at_uniform_distance() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(sample(0, 0.0, 0.0), spacing(3.0))
            .expect("begin stroke");
        resampler
            .feed(sample(10_000, 10.0, 0.0), &mut output)
            .expect("feed input");

        let xs: Vec<_> = output.iter().map(|sample| sample.x).collect();
        assert_eq!(xs, vec![3.0, 6.0, 9.0]);
    }

    #[test]
    fn spacing_carries_across_segments() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(sample(0, 0.0, 0.0), spacing(3.0))
            .expect("begin stroke");
        resampler
            .feed(sample(10_000, 5.0, 0.0), &mut output)
            .expect("first segment");
        resampler
            .feed(sample(20_000, 10.0, 0.0), &mut output)
            .expect("second segment");

        let xs: Vec<_> = output.iter().map(|sample| sample.x).collect();
        assert_eq!(xs, vec![3.0, 6.0, 9.0]);
    }

    #[test]
    fn path_of_ten_spacings_yields_ten_samples() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(sample(0, 0.0, 0.0), spacing(4.0))
            .expect("begin stroke");
        resampler
            .feed(sample(1_000, 40.0, 0.0), &mut output)
            .expect("feed input");
        assert_eq!(output.len(), 10);
        assert_eq!(output.last().map(|sample| sample.x), Some(40.0));
    }

    #[test]
    fn far_jump_is_clamped_before_resampling() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(sample(0, 0.0, 0.0), spacing(1_000.0))
            .expect("begin stroke");
        resampler
            .feed(sample(10, 1e200, 0.0), &mut output)
            .expect("feed input");
        assert_eq!(output.len(), 65);
        assert!(output.iter().all(|sample| sample.x <= MAX_POINTER_COORDINATE));
        assert_eq!(
            resampler.last_input().map(|sample| sample.x),
            Some(MAX_POINTER_COORDINATE)
        );
    }

    #[test]
    fn pressure_is_interpolated() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(PointerSample::new(0, 0.0, 0.0, 0.0), spacing(2.0))
            .expect("begin stroke");
        resampler
            .feed(PointerSample::new(100, 4.0, 0.0, 1.0), &mut output)
            .expect("feed input");
        let pressures: Vec<_> = output.iter().map(|sample| sample.pressure).collect();
        assert_eq!(pressures, vec![0.5, 1.0]);
    }

    #[test]
    fn pressure_scaled_spacing_respects_minimum() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        let config = UniformSpacingConfig {
            spacing_pixels: 10.0,
            pressure_scaled: true,
            min_spacing_pixels: 2.0,
        };
        resampler
            .begin(PointerSample::new(0, 0.0, 0.0, 0.0), config)
            .expect("begin stroke");
        resampler
            .feed(PointerSample::new(10, 4.0, 0.0, 0.0), &mut output)
            .expect("feed input");
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn rejects_bad_config_and_input() {
        let mut resampler = UniformSpacingResampler::new();
        assert_eq!(
            resampler.begin(sample(0, 0.0, 0.0), spacing(0.0)),
            Err(SampleProcessingError::InvalidInput)
        );
        assert_eq!(
            resampler.feed(sample(0, 1.0, 1.0), &mut Vec::new()),
            Err(SampleProcessingError::InvalidInput)
        );

        resampler
            .begin(sample(10, 0.0, 0.0), spacing(2.0))
            .expect("begin stroke");
        assert_eq!(
            resampler.feed(sample(9, 1.0, 0.0), &mut Vec::new()),
            Err(SampleProcessingError::NonMonotonicTimestamp)
        );
        assert_eq!(
            resampler.feed(sample(11, f64::INFINITY, 0.0), &mut Vec::new()),
            Err(SampleProcessingError::InvalidInput)
        );
    }

    #[test]
    fn offset_moves_the_stroke_origin() {
        let mut resampler = UniformSpacingResampler::new();
        let mut output = Vec::new();
        resampler
            .begin(sample(0, 0.0, 0.0), spacing(5.0))
            .expect("begin stroke");
        resampler.add_offset(10.0, 0.0);
        resampler
            .feed(sample(1, 10.0, 0.0), &mut output)
            .expect("feed input");
        assert!(output.is_empty());
    }
}
