use engine::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_UNDO_POINTS};
use model::{Color, ImageLayout, MAX_CANVAS_DIMENSION, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_undo_points must be positive")]
    MaxUndoPointsZero,
    #[error("max_history_entries must be positive")]
    MaxHistoryEntriesZero,
    #[error("canvas {width}x{height} exceeds the maximum canvas dimension")]
    CanvasTooLarge { width: u32, height: u32 },
    #[error("{0} must be positive")]
    QueueCapacityZero(&'static str),
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session settings for a [`PaintEngine`](crate::PaintEngine) and its runtime.
///
/// Missing JSON fields take their default. The canvas stays 0x0 until a
/// resize message arrives unless a size is given here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_undo_points: usize,
    pub max_history_entries: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background_argb: u32,
    pub local_user_id: UserId,
    pub command_queue_capacity: usize,
    pub pointer_queue_capacity: usize,
    pub notification_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_points: DEFAULT_MAX_UNDO_POINTS,
            max_history_entries: DEFAULT_MAX_ENTRIES,
            canvas_width: 0,
            canvas_height: 0,
            background_argb: Color::WHITE.to_argb32(),
            local_user_id: 1,
            command_queue_capacity: 64,
            pointer_queue_capacity: 256,
            notification_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_undo_points == 0 {
            return Err(ConfigError::MaxUndoPointsZero);
        }
        if self.max_history_entries == 0 {
            return Err(ConfigError::MaxHistoryEntriesZero);
        }
        if self.canvas_width > MAX_CANVAS_DIMENSION || self.canvas_height > MAX_CANVAS_DIMENSION {
            return Err(ConfigError::CanvasTooLarge {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero("command_queue_capacity"));
        }
        if self.pointer_queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero("pointer_queue_capacity"));
        }
        if self.notification_queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero("notification_queue_capacity"));
        }
        Ok(())
    }

    pub fn layout(&self) -> ImageLayout {
        ImageLayout::new(self.canvas_width, self.canvas_height)
    }

    pub fn background(&self) -> Color {
        Color::from_argb32(self.background_argb)
    }
}
