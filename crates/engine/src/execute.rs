use brush_execution::draw_dabs;
use document::{AreaAccumulator, LayerStack, LayerStackError};
use model::{Color, Rectangle};
use protocol::{Message, MessageBody};

use crate::{AppliedEffect, ApplyError};

/// Apply one message to `stack`. Undo and redo act on history and are not
/// handled here. A rejected message leaves the stack unchanged.
pub(crate) fn execute(stack: &mut LayerStack, message: &Message) -> Result<AppliedEffect, ApplyError> {
    let mut effect = AppliedEffect::default();
    match &message.body {
        MessageBody::UndoPoint | MessageBody::PenUp => {}
        MessageBody::Undo(_) | MessageBody::Redo(_) => {}
        MessageBody::DrawDabs(draw) => {
            let layer = stack
                .layer_mut(draw.layer)
                .ok_or(LayerStackError::UnknownLayer(draw.layer))?;
            draw_dabs(layer.tiles_mut(), draw)?;
        }
        MessageBody::CreateLayer(create) => {
            let source = (create.source != 0).then_some(create.source);
            let fill = Color::from_argb32(create.fill);
            stack.create_layer(create.id, source, fill, create.title.clone())?;
            if source.is_some() || fill.a != 0 {
                effect.area = canvas_area(stack);
            }
            effect.layers_changed = true;
        }
        MessageBody::LayerAttributes(attributes) => {
            let layer = stack
                .layer(attributes.id)
                .ok_or(LayerStackError::UnknownLayer(attributes.id))?;
            let repaint = layer.opacity() != attributes.opacity
                || layer.blend() != attributes.blend
                || layer.is_hidden() != attributes.is_hidden();
            stack.set_attributes(
                attributes.id,
                attributes.opacity,
                attributes.blend,
                attributes.is_hidden(),
            )?;
            if repaint {
                effect.area = canvas_area(stack);
            }
            effect.layers_changed = true;
        }
        MessageBody::LayerRetitle(retitle) => {
            stack.retitle(retitle.id, retitle.title.clone())?;
            effect.layers_changed = true;
        }
        MessageBody::ReorderLayers(reorder) => {
            stack.reorder_layers(&reorder.order)?;
            effect.area = canvas_area(stack);
            effect.layers_changed = true;
        }
        MessageBody::DeleteLayer(delete) => {
            stack.delete_layer(delete.id, delete.merge)?;
            effect.area = canvas_area(stack);
            effect.layers_changed = true;
        }
        MessageBody::ResizeCanvas(resize) => {
            if let Some(outcome) =
                stack.resize(resize.top, resize.right, resize.bottom, resize.left)?
            {
                effect.area = canvas_area(stack);
                effect.resized.push(outcome);
            }
        }
    }
    collect_changed_tiles(stack, &mut effect);
    Ok(effect)
}

/// Fold the tiles written since the last call into the effect's area.
fn collect_changed_tiles(stack: &mut LayerStack, effect: &mut AppliedEffect) {
    let layout = stack.layout();
    let mut accumulator = AreaAccumulator::new();
    for (layer, pos) in stack.take_changed_tiles() {
        accumulator.push_tile(layer, pos, layout);
    }
    if let Some(area) = accumulator.take() {
        effect.merge(AppliedEffect {
            area: Some(area),
            ..AppliedEffect::default()
        });
    }
}

pub(crate) fn canvas_area(stack: &LayerStack) -> Option<Rectangle> {
    let bounds = stack.layout().bounds();
    (!bounds.is_empty()).then_some(bounds)
}

/// Effect of replacing `old` with `new` wholesale.
pub(crate) fn effect_between(old: &LayerStack, new: &LayerStack) -> AppliedEffect {
    let mut effect = AppliedEffect {
        area: LayerStack::changed_area_between(old, new),
        resized: Vec::new(),
        layers_changed: old.layer_infos() != new.layer_infos(),
    };
    if old.size() != new.size() {
        effect.resized.push(document::ResizeOutcome {
            x_offset: 0,
            y_offset: 0,
            old_size: old.size(),
        });
    }
    effect
}
