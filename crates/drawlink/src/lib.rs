//! Paint engine façade: one canvas session behind a small API.
//!
//! [`PaintEngine`] is the single-threaded core. [`EngineRuntime`] moves it
//! onto its own thread so network buffers, render requests and pointer
//! input from other threads are applied one at a time.

mod config;
mod observer;
mod paint_engine;
mod runtime;

pub use config::{ConfigError, EngineConfig};
pub use observer::{CanvasObserver, Notification};
pub use paint_engine::{EngineError, PaintEngine};
pub use runtime::{CanvasInfo, EngineHandle, EngineRuntime, HandleError, RuntimeStartError};

pub use brush_execution::ClassicBrush;
pub use document::LayerInfo;
pub use driver::{PointerEvent, PointerPhase, PointerSample};
pub use engine::{Anomaly, BatchOutcome, Origin};
pub use renderer::{PixelBuffer, ViewId};
