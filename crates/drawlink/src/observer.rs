use document::LayerInfo;
use engine::AppliedEffect;
use model::{Rectangle, Size};
use tiles::TileAllocError;

/// Receives change notifications from a [`PaintEngine`](crate::PaintEngine).
///
/// Within one batch `on_resized` comes first, then `on_area_changed`, then
/// `on_layers_changed`.
pub trait CanvasObserver {
    fn on_area_changed(&mut self, area: Rectangle);

    /// The canvas was resized. Content moved by the offsets.
    fn on_resized(&mut self, x_offset: i32, y_offset: i32, old_size: Size);

    /// `layers` is the new list, bottom first.
    fn on_layers_changed(&mut self, layers: &[LayerInfo]);
}

impl CanvasObserver for () {
    fn on_area_changed(&mut self, _area: Rectangle) {}

    fn on_resized(&mut self, _x_offset: i32, _y_offset: i32, _old_size: Size) {}

    fn on_layers_changed(&mut self, _layers: &[LayerInfo]) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    AreaChanged(Rectangle),
    Resized {
        x_offset: i32,
        y_offset: i32,
        old_size: Size,
    },
    LayersChanged(Vec<LayerInfo>),
    /// Local messages are waiting in the outbound buffer.
    OutboundReady,
    /// The engine lost canvas state and stopped applying messages.
    Fatal(TileAllocError),
}

impl CanvasObserver for Vec<Notification> {
    fn on_area_changed(&mut self, area: Rectangle) {
        self.push(Notification::AreaChanged(area));
    }

    fn on_resized(&mut self, x_offset: i32, y_offset: i32, old_size: Size) {
        self.push(Notification::Resized {
            x_offset,
            y_offset,
            old_size,
        });
    }

    fn on_layers_changed(&mut self, layers: &[LayerInfo]) {
        self.push(Notification::LayersChanged(layers.to_vec()));
    }
}

pub(crate) fn notify_effect(
    observer: &mut impl CanvasObserver,
    effect: &AppliedEffect,
    layers: impl FnOnce() -> Vec<LayerInfo>,
) {
    for outcome in &effect.resized {
        observer.on_resized(outcome.x_offset, outcome.y_offset, outcome.old_size);
    }
    if let Some(area) = effect.area {
        observer.on_area_changed(area);
    }
    if effect.layers_changed {
        observer.on_layers_changed(&layers());
    }
}
