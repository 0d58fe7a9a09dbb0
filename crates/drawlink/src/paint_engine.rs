use brush_execution::{BrushEngine, BrushError, ClassicBrush};
use document::{LayerInfo, LayerStack};
use driver::PointerSample;
use engine::{AppliedEffect, ApplyError, BatchOutcome, CanvasPipeline, Origin};
use model::{Color, LayerId, Rectangle, Size, UserId};
use protocol::{Message, MessageWriter, ProtocolError};
use renderer::{PixelBuffer, ViewCaches, ViewId, compose_region};
use tiles::TileAllocError;

use crate::config::{ConfigError, EngineConfig};
use crate::observer::{CanvasObserver, notify_effect};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Canvas state was lost. The engine refuses further changes until
    /// [`PaintEngine::reset`].
    #[error("paint engine stopped after a fatal error: {0}")]
    Fatal(TileAllocError),
    #[error(transparent)]
    Brush(#[from] BrushError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<TileAllocError> for EngineError {
    fn from(error: TileAllocError) -> Self {
        EngineError::Fatal(error)
    }
}

/// One canvas session: the layer stack with its message pipeline, the local
/// brush, and the per-view render caches.
///
/// Local strokes are applied ahead of the server and their messages are
/// collected for sending. Every change is reported to the observer passed
/// to the call that caused it.
#[derive(Debug)]
pub struct PaintEngine {
    pipeline: CanvasPipeline,
    brush: BrushEngine,
    views: ViewCaches,
    outbound: MessageWriter,
}

impl PaintEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.layout();
        Ok(Self {
            pipeline: CanvasPipeline::new(
                layout,
                config.background(),
                config.local_user_id,
                config.max_undo_points,
            )
            .with_max_history_entries(config.max_history_entries),
            brush: BrushEngine::new(ClassicBrush::default())
                .expect("the default brush is valid"),
            views: ViewCaches::new(layout),
            outbound: MessageWriter::new(),
        })
    }

    pub fn local_user(&self) -> UserId {
        self.pipeline.local_user()
    }

    /// Takes effect for messages produced after the call.
    pub fn set_local_user(&mut self, user: UserId) {
        self.pipeline.set_local_user(user);
    }

    pub fn brush(&self) -> &ClassicBrush {
        self.brush.brush()
    }

    pub fn set_brush(&mut self, brush: ClassicBrush) -> Result<(), EngineError> {
        Ok(self.brush.set_brush(brush)?)
    }

    pub fn stack(&self) -> &LayerStack {
        self.pipeline.stack()
    }

    pub fn canvas_size(&self) -> Size {
        self.pipeline.stack().size()
    }

    pub fn background_color(&self) -> Color {
        self.pipeline.stack().background()
    }

    pub fn layers(&self) -> Vec<LayerInfo> {
        self.pipeline.stack().layer_infos()
    }

    pub fn history_len(&self) -> usize {
        self.pipeline.history_len()
    }

    /// Local messages still waiting for their server echo.
    pub fn pending_local(&self) -> usize {
        self.pipeline.fork().len()
    }

    pub fn fatal_error(&self) -> Option<TileAllocError> {
        self.pipeline.fatal_error()
    }

    /// Apply a buffer of encoded messages. Malformed and rejected messages
    /// are skipped and listed in the outcome.
    pub fn receive_messages(
        &mut self,
        origin: Origin,
        bytes: &[u8],
        observer: &mut impl CanvasObserver,
    ) -> Result<BatchOutcome, EngineError> {
        let outcome = self
            .pipeline
            .apply_bytes(bytes, origin)
            .map_err(fatal_only)?;
        if !outcome.anomalies.is_empty() {
            tracing::debug!(
                applied = outcome.applied,
                skipped = outcome.anomalies.len(),
                "received batch with anomalies"
            );
        }
        self.publish(&outcome.effect, observer);
        Ok(outcome)
    }

    pub fn register_view(&mut self) -> ViewId {
        self.views.register()
    }

    pub fn unregister_view(&mut self, view: ViewId) -> bool {
        self.views.unregister(view)
    }

    /// Rendered pixels of `rect` for `view`, recomposing only tiles changed
    /// since the view last saw them. `None` for an unknown view.
    pub fn get_region(&mut self, view: ViewId, rect: Rectangle) -> Option<PixelBuffer> {
        self.views.refresh(view, self.pipeline.stack(), rect)
    }

    /// Rendered pixels of `rect` without any caching.
    pub fn render_region(&self, rect: Rectangle) -> PixelBuffer {
        compose_region(self.pipeline.stack(), rect)
    }

    pub fn begin_stroke(
        &mut self,
        layer: LayerId,
        sample: PointerSample,
        observer: &mut impl CanvasObserver,
    ) -> Result<(), EngineError> {
        self.check_alive()?;
        self.brush.begin(layer, sample)?;
        self.flush_brush(observer)
    }

    pub fn stroke_to(
        &mut self,
        sample: PointerSample,
        observer: &mut impl CanvasObserver,
    ) -> Result<(), EngineError> {
        self.check_alive()?;
        self.brush.move_to(sample)?;
        self.flush_brush(observer)
    }

    pub fn end_stroke(&mut self, observer: &mut impl CanvasObserver) -> Result<(), EngineError> {
        self.check_alive()?;
        self.brush.end()?;
        self.flush_brush(observer)
    }

    /// Abandon the stroke in progress. Dabs already drawn stay.
    pub fn cancel_stroke(&mut self, observer: &mut impl CanvasObserver) -> Result<(), EngineError> {
        self.check_alive()?;
        self.brush.cancel();
        self.flush_brush(observer)
    }

    pub fn offset_stroke(&mut self, dx: f64, dy: f64) {
        self.brush.add_offset(dx, dy);
    }

    pub fn is_stroking(&self) -> bool {
        self.brush.is_stroking()
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Encoded local messages to send, oldest first.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        self.outbound.take()
    }

    /// Forget unsent and unconfirmed local work, e.g. after a disconnect.
    /// Nothing already drawn is rolled back.
    pub fn cleanup(&mut self) {
        self.brush.cancel();
        self.brush.take_dabs();
        let unsent = self.outbound.message_count();
        self.outbound.take();
        self.pipeline.cleanup();
        tracing::debug!(unsent, "paint engine cleaned up");
    }

    /// Back to an empty canvas with no history and no local work.
    pub fn reset(&mut self, observer: &mut impl CanvasObserver) {
        let old_size = self.canvas_size();
        let had_layers = !self.pipeline.stack().is_empty();
        self.cleanup();
        self.pipeline.reset();
        let layout = self.pipeline.stack().layout();
        self.views.reset(layout);

        let mut effect = AppliedEffect {
            area: (!layout.bounds().is_empty()).then(|| layout.bounds()),
            resized: Vec::new(),
            layers_changed: had_layers,
        };
        if old_size != layout.size() {
            effect.resized.push(document::ResizeOutcome {
                x_offset: 0,
                y_offset: 0,
                old_size,
            });
        }
        tracing::info!(
            width = layout.width(),
            height = layout.height(),
            "paint engine reset"
        );
        self.publish(&effect, observer);
    }

    fn check_alive(&self) -> Result<(), EngineError> {
        match self.pipeline.fatal_error() {
            Some(error) => Err(EngineError::Fatal(error)),
            None => Ok(()),
        }
    }

    /// Apply pending brush output locally and queue what was accepted.
    fn flush_brush(&mut self, observer: &mut impl CanvasObserver) -> Result<(), EngineError> {
        let messages = self.brush.take_messages(self.pipeline.local_user());
        let mut effect = AppliedEffect::default();
        let mut result = Ok(());
        for message in messages {
            match self.apply_local(message) {
                Ok(Some(applied)) => effect.merge(applied),
                Ok(None) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
        self.publish(&effect, observer);
        result
    }

    fn apply_local(&mut self, message: Message) -> Result<Option<AppliedEffect>, EngineError> {
        match self.pipeline.apply(message.clone(), Origin::Local) {
            Ok(effect) => {
                self.outbound.push(&message)?;
                Ok(Some(effect))
            }
            // Already logged by the pipeline; a rejected message is not sent.
            Err(ApplyError::Rejected(_)) => Ok(None),
            Err(ApplyError::Fatal(error)) => Err(EngineError::Fatal(error)),
        }
    }

    fn publish(&mut self, effect: &AppliedEffect, observer: &mut impl CanvasObserver) {
        if !effect.resized.is_empty() {
            self.views.reset(self.pipeline.stack().layout());
        }
        if let Some(area) = effect.area {
            self.views.mark_dirty(area);
        }
        let stack = self.pipeline.stack();
        notify_effect(observer, effect, || stack.layer_infos());
    }
}

fn fatal_only(error: ApplyError) -> EngineError {
    match error {
        ApplyError::Fatal(error) => EngineError::Fatal(error),
        ApplyError::Rejected(anomaly) => {
            unreachable!("batches report rejected messages as anomalies: {anomaly}")
        }
    }
}
