use driver::{
    PointerSample, SampleProcessingError, StrokeSmoother, UniformSpacingResampler,
};
use model::{BlendMode, Color, LayerId, UserId};
use protocol::{
    DabRecord, DrawDabs, MAX_DABS_PER_MESSAGE, Message, MessageBody, MessageWriter, ProtocolError,
};
use smallvec::SmallVec;

use crate::brush::{BrushConfigError, ClassicBrush};
use crate::dab::Dab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BrushError {
    #[error("no stroke is in progress")]
    NotStroking,
    #[error(transparent)]
    Sample(#[from] SampleProcessingError),
    #[error(transparent)]
    Config(#[from] BrushConfigError),
}

/// Pending output, in the order it must reach the pipeline.
#[derive(Debug, Clone, PartialEq)]
enum BrushOutput {
    UndoPoint,
    Dabs {
        layer: LayerId,
        color: Color,
        blend: BlendMode,
        dabs: Vec<Dab>,
    },
    PenUp,
}

#[derive(Debug, Clone, Copy)]
enum StrokeState {
    Idle,
    Stroking {
        layer: LayerId,
        start: PointerSample,
        moved: bool,
    },
}

/// Turns pointer samples into quantized dabs.
///
/// `begin` only records the start point. The first `move_to` emits a dab at
/// the start, using the lower of the two pressures, and then dabs every
/// spacing interval along the path. A stroke that never moves gets a single
/// dab at `end`.
#[derive(Debug)]
pub struct BrushEngine {
    brush: ClassicBrush,
    state: StrokeState,
    smoother: StrokeSmoother,
    resampler: UniformSpacingResampler,
    outputs: Vec<BrushOutput>,
}

impl BrushEngine {
    pub fn new(brush: ClassicBrush) -> Result<Self, BrushError> {
        brush.validate()?;
        Ok(Self {
            brush,
            state: StrokeState::Idle,
            smoother: StrokeSmoother::new(brush.smoothing),
            resampler: UniformSpacingResampler::new(),
            outputs: Vec::new(),
        })
    }

    pub fn brush(&self) -> &ClassicBrush {
        &self.brush
    }

    /// Takes effect from the next stroke.
    pub fn set_brush(&mut self, brush: ClassicBrush) -> Result<(), BrushError> {
        brush.validate()?;
        self.brush = brush;
        if !self.is_stroking() {
            self.smoother.set_config(brush.smoothing);
        }
        Ok(())
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking { .. })
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Start a stroke on `layer`. A stroke still in progress is ended first.
    pub fn begin(&mut self, layer: LayerId, sample: PointerSample) -> Result<(), BrushError> {
        if !sample.is_finite() {
            return Err(SampleProcessingError::InvalidInput.into());
        }
        if self.is_stroking() {
            self.end()?;
        }
        self.smoother.set_config(self.brush.smoothing);
        let start = self.smoother.push(sample.clamped());
        self.resampler.begin(start, self.brush.spacing_config())?;
        self.state = StrokeState::Stroking {
            layer,
            start,
            moved: false,
        };
        Ok(())
    }

    pub fn move_to(&mut self, sample: PointerSample) -> Result<(), BrushError> {
        let StrokeState::Stroking {
            layer,
            start,
            moved,
        } = self.state
        else {
            return Err(BrushError::NotStroking);
        };
        if !sample.is_finite() {
            return Err(SampleProcessingError::InvalidInput.into());
        }
        let sample = self.smoother.push(sample.clamped());

        if !moved {
            let start = PointerSample {
                pressure: start.pressure.min(sample.pressure),
                ..start
            };
            self.resampler.begin(start, self.brush.spacing_config())?;
            self.outputs.push(BrushOutput::UndoPoint);
            self.emit_dab(layer, &start);
            self.state = StrokeState::Stroking {
                layer,
                start,
                moved: true,
            };
        }

        let mut resampled = Vec::new();
        self.resampler.feed(sample, &mut resampled)?;
        for dab_sample in &resampled {
            self.emit_dab(layer, dab_sample);
        }
        Ok(())
    }

    /// Finish the stroke. Does nothing when idle.
    pub fn end(&mut self) -> Result<(), BrushError> {
        let StrokeState::Stroking {
            layer,
            start,
            moved,
        } = self.state
        else {
            return Ok(());
        };
        if !moved {
            self.outputs.push(BrushOutput::UndoPoint);
            self.emit_dab(layer, &start);
        }
        self.outputs.push(BrushOutput::PenUp);
        self.finish();
        Ok(())
    }

    /// Abandon the stroke and drop dabs not yet taken. Dabs already taken
    /// stay applied; a pen-up closes them.
    pub fn cancel(&mut self) {
        let StrokeState::Stroking { moved, .. } = self.state else {
            return;
        };
        self.outputs.clear();
        if moved {
            self.outputs.push(BrushOutput::PenUp);
        }
        self.finish();
    }

    /// Shift the stroke in progress, e.g. after the canvas was resized.
    pub fn add_offset(&mut self, dx: f64, dy: f64) {
        if let StrokeState::Stroking { start, .. } = &mut self.state {
            *start = start.translated(dx, dy);
        }
        self.resampler.add_offset(dx, dy);
        self.smoother.add_offset(dx, dy);
    }

    /// Drain pending output keeping only the dabs.
    pub fn take_dabs(&mut self) -> Vec<Dab> {
        self.outputs
            .drain(..)
            .flat_map(|output| match output {
                BrushOutput::Dabs { dabs, .. } => dabs,
                BrushOutput::UndoPoint | BrushOutput::PenUp => Vec::new(),
            })
            .collect()
    }

    /// Drain pending output as messages from `user`.
    pub fn take_messages(&mut self, user: UserId) -> Vec<Message> {
        let mut messages = Vec::new();
        for output in self.outputs.drain(..) {
            match output {
                BrushOutput::UndoPoint => {
                    messages.push(Message::new(user, MessageBody::UndoPoint));
                }
                BrushOutput::PenUp => messages.push(Message::new(user, MessageBody::PenUp)),
                BrushOutput::Dabs {
                    layer,
                    color,
                    blend,
                    dabs,
                } => {
                    messages.extend(
                        group_dabs(layer, color, blend, &dabs)
                            .into_iter()
                            .map(|body| Message::new(user, MessageBody::DrawDabs(body))),
                    );
                }
            }
        }
        messages
    }

    /// Drain pending output into `writer`. Returns the number of messages.
    pub fn write_dabs(
        &mut self,
        user: UserId,
        writer: &mut MessageWriter,
    ) -> Result<usize, ProtocolError> {
        let messages = self.take_messages(user);
        for message in &messages {
            writer.push(message)?;
        }
        Ok(messages.len())
    }

    fn emit_dab(&mut self, layer: LayerId, sample: &PointerSample) {
        let brush = &self.brush;
        let dab = Dab::quantize(
            sample.x,
            sample.y,
            brush.radius_at(sample.pressure),
            brush.hardness,
            brush.opacity_at(sample.pressure),
        );
        let (color, blend) = (brush.color, brush.blend);
        if let Some(BrushOutput::Dabs {
            layer: last_layer,
            color: last_color,
            blend: last_blend,
            dabs,
        }) = self.outputs.last_mut()
        {
            if *last_layer == layer && *last_color == color && *last_blend == blend {
                dabs.push(dab);
                return;
            }
        }
        self.outputs.push(BrushOutput::Dabs {
            layer,
            color,
            blend,
            dabs: vec![dab],
        });
    }

    fn finish(&mut self) {
        self.state = StrokeState::Idle;
        self.resampler.end();
        self.smoother.reset();
    }
}

/// Pack dabs into as few messages as the delta encoding allows. A new
/// message starts when a delta does not fit in `i8` or the count limit is
/// reached.
fn group_dabs(layer: LayerId, color: Color, blend: BlendMode, dabs: &[Dab]) -> Vec<DrawDabs> {
    let mut messages: Vec<DrawDabs> = Vec::new();
    let mut previous: Option<(i32, i32)> = None;
    for dab in dabs {
        let delta = previous.and_then(|(px, py)| {
            let dx = i8::try_from(dab.x - px).ok()?;
            let dy = i8::try_from(dab.y - py).ok()?;
            Some((dx, dy))
        });
        let record = |dx: i8, dy: i8| DabRecord {
            dx,
            dy,
            radius: dab.radius,
            hardness: dab.hardness,
            opacity: dab.opacity,
        };
        match (delta, messages.last_mut()) {
            (Some((dx, dy)), Some(current)) if current.dabs.len() < MAX_DABS_PER_MESSAGE => {
                current.dabs.push(record(dx, dy));
            }
            _ => {
                let mut records = SmallVec::new();
                records.push(record(0, 0));
                messages.push(DrawDabs {
                    layer,
                    x: dab.x,
                    y: dab.y,
                    color: color.with_alpha(255).to_argb32(),
                    blend,
                    dabs: records,
                });
            }
        }
        previous = Some((dab.x, dab.y));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, pressure: f64) -> PointerSample {
        PointerSample::new(0, x, y, pressure)
    }

    fn brush(radius: f64, spacing: f64) -> ClassicBrush {
        ClassicBrush {
            radius,
            spacing,
            ..ClassicBrush::default()
        }
    }

    #[test]
    fn begin_alone_emits_nothing() {
        let mut engine = BrushEngine::new(ClassicBrush::default()).expect("valid brush");
        engine.begin(1, sample(5.0, 5.0, 1.0)).expect("begin");
        assert!(!engine.has_pending_output());
        assert!(engine.is_stroking());
    }

    #[test]
    fn straight_line_emits_dabs_at_spacing() {
        let mut engine = BrushEngine::new(brush(5.0, 0.5)).expect("valid brush");
        assert_eq!(engine.brush().spacing_pixels(), 5.0);
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.move_to(sample(50.0, 0.0, 1.0)).expect("move");
        engine.end().expect("end");

        let dabs = engine.take_dabs();
        assert_eq!(dabs.len(), 11);
        for (index, dab) in dabs.iter().enumerate() {
            assert_eq!(dab.x, index as i32 * 20);
            assert_eq!(dab.y, 0);
            assert_eq!(dab.radius, 5 * 256);
        }
    }

    #[test]
    fn first_dab_uses_lower_pressure() {
        let mut engine = BrushEngine::new(brush(8.0, 0.5)).expect("valid brush");
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.move_to(sample(1.0, 0.0, 0.5)).expect("move");
        let dabs = engine.take_dabs();
        assert_eq!(dabs.len(), 1);
        assert_eq!(dabs[0].radius, 4 * 256);
    }

    #[test]
    fn tap_emits_one_dab_with_markers() {
        let mut engine = BrushEngine::new(ClassicBrush::default()).expect("valid brush");
        engine.begin(3, sample(10.0, 12.0, 1.0)).expect("begin");
        engine.end().expect("end");
        assert!(!engine.is_stroking());

        let messages = engine.take_messages(7);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body, MessageBody::UndoPoint);
        let MessageBody::DrawDabs(draw) = &messages[1].body else {
            panic!("expected dabs, got {:?}", messages[1].body);
        };
        assert_eq!(draw.layer, 3);
        assert_eq!((draw.x, draw.y), (40, 48));
        assert_eq!(draw.dabs.len(), 1);
        assert_eq!(messages[2].body, MessageBody::PenUp);
        assert!(messages.iter().all(|message| message.user_id == 7));
    }

    #[test]
    fn move_without_begin_is_rejected() {
        let mut engine = BrushEngine::new(ClassicBrush::default()).expect("valid brush");
        assert_eq!(
            engine.move_to(sample(1.0, 1.0, 1.0)),
            Err(BrushError::NotStroking)
        );
        assert_eq!(
            engine.begin(1, sample(f64::NAN, 0.0, 1.0)),
            Err(BrushError::Sample(SampleProcessingError::InvalidInput))
        );
    }

    #[test]
    fn cancel_drops_pending_dabs() {
        let mut engine = BrushEngine::new(ClassicBrush::default()).expect("valid brush");
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.move_to(sample(30.0, 0.0, 1.0)).expect("move");
        engine.cancel();
        let messages = engine.take_messages(1);
        assert_eq!(messages, vec![Message::new(1, MessageBody::PenUp)]);
        assert!(!engine.is_stroking());
    }

    #[test]
    fn offset_shifts_following_dabs() {
        let mut engine = BrushEngine::new(brush(5.0, 0.5)).expect("valid brush");
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.add_offset(100.0, 0.0);
        engine.move_to(sample(105.0, 0.0, 1.0)).expect("move");
        let dabs = engine.take_dabs();
        assert_eq!(dabs.len(), 2);
        assert_eq!(dabs[0].x, 400);
        assert_eq!(dabs[1].x, 420);
    }

    #[test]
    fn far_pointer_jump_stays_bounded() {
        let mut engine = BrushEngine::new(brush(5.0, 0.5)).expect("valid brush");
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.move_to(sample(1e200, 0.0, 1.0)).expect("move");
        engine.end().expect("end");

        let dabs = engine.take_dabs();
        let limit = (driver::MAX_POINTER_COORDINATE * 4.0) as i32;
        assert_eq!(dabs.len(), 13_107);
        assert!(dabs.iter().all(|dab| dab.x <= limit));
        assert_eq!(dabs.last().map(|dab| dab.x), Some(65_530 * 4));
    }

    #[test]
    fn long_jumps_split_messages() {
        let dabs = [
            Dab::quantize(0.0, 0.0, 1.0, 1.0, 1.0),
            Dab::quantize(10.0, 0.0, 1.0, 1.0, 1.0),
            Dab::quantize(200.0, 0.0, 1.0, 1.0, 1.0),
        ];
        let messages = group_dabs(1, Color::BLACK, BlendMode::Normal, &dabs);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].dabs.len(), 2);
        assert_eq!(messages[0].dabs[1].dx, 40);
        assert_eq!(messages[1].x, 800);
    }

    #[test]
    fn full_messages_split_at_count_limit() {
        let dabs: Vec<Dab> = (0..300)
            .map(|index| Dab::quantize(index as f64, 0.0, 1.0, 1.0, 1.0))
            .collect();
        let messages = group_dabs(1, Color::BLACK, BlendMode::Normal, &dabs);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].dabs.len(), MAX_DABS_PER_MESSAGE);
        assert_eq!(messages[1].dabs.len(), 300 - MAX_DABS_PER_MESSAGE);
    }

    #[test]
    fn written_messages_decode_back() {
        let mut engine = BrushEngine::new(ClassicBrush::default()).expect("valid brush");
        engine.begin(1, sample(0.0, 0.0, 1.0)).expect("begin");
        engine.move_to(sample(20.0, 20.0, 1.0)).expect("move");
        engine.end().expect("end");

        let mut writer = MessageWriter::new();
        let count = engine.write_dabs(9, &mut writer).expect("write");
        assert_eq!(writer.message_count(), count);
        assert!(!engine.has_pending_output());
        let decoded = protocol::MessageReader::new(writer.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("decode");
        assert_eq!(decoded.len(), count);
        assert_eq!(decoded.last().map(|m| &m.body), Some(&MessageBody::PenUp));
    }
}
