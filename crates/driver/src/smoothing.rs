use std::collections::VecDeque;

use crate::PointerSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmoothingConfig {
    /// Number of recent samples averaged. 0 and 1 disable smoothing.
    pub window: usize,
}

/// Moving average over the last `window` pointer samples.
#[derive(Debug, Clone, Default)]
pub struct StrokeSmoother {
    config: SmoothingConfig,
    recent: VecDeque<PointerSample>,
}

impl StrokeSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            recent: VecDeque::with_capacity(config.window),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.window > 1
    }

    pub fn set_config(&mut self, config: SmoothingConfig) {
        self.config = config;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }

    /// Add a raw sample and return the smoothed one. The timestamp is
    /// always the newest sample's.
    pub fn push(&mut self, sample: PointerSample) -> PointerSample {
        if !self.is_enabled() {
            return sample;
        }
        if self.recent.len() == self.config.window {
            self.recent.pop_front();
        }
        self.recent.push_back(sample);

        let count = self.recent.len() as f64;
        let (mut x, mut y, mut pressure) = (0.0, 0.0, 0.0);
        for recent in &self.recent {
            x += recent.x;
            y += recent.y;
            pressure += recent.pressure;
        }
        PointerSample {
            timestamp_micros: sample.timestamp_micros,
            x: x / count,
            y: y / count,
            pressure: pressure / count,
        }
    }

    pub fn add_offset(&mut self, dx: f64, dy: f64) {
        for recent in self.recent.iter_mut() {
            *recent = recent.translated(dx, dy);
        }
    }
}
