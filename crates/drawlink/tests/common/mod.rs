#![allow(dead_code)]

use drawlink::{EngineConfig, PaintEngine, PixelBuffer, PointerSample};
use model::{LayerId, Rectangle, UserId};
use protocol::{CreateLayer, DrawDabs, Message, MessageBody, MessageReader, MessageWriter, UndoRequest};

pub const SIDE: u32 = 96;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn config(user: UserId) -> EngineConfig {
    EngineConfig {
        canvas_width: SIDE,
        canvas_height: SIDE,
        local_user_id: user,
        ..EngineConfig::default()
    }
}

pub fn session(user: UserId) -> PaintEngine {
    PaintEngine::new(&config(user)).expect("valid config")
}

pub fn encode(messages: &[Message]) -> Vec<u8> {
    let mut writer = MessageWriter::new();
    for message in messages {
        writer.push(message).expect("encode message");
    }
    writer.take()
}

pub fn decode(bytes: &[u8]) -> Vec<Message> {
    MessageReader::new(bytes)
        .map(|message| message.expect("decode message"))
        .collect()
}

pub fn create_layer(user: UserId, id: LayerId) -> Message {
    Message::new(
        user,
        MessageBody::CreateLayer(CreateLayer {
            id,
            source: 0,
            fill: 0,
            title: format!("layer {id}"),
        }),
    )
}

pub fn undo(user: UserId) -> Message {
    Message::new(user, MessageBody::Undo(UndoRequest::default()))
}

pub fn redo(user: UserId) -> Message {
    Message::new(user, MessageBody::Redo(UndoRequest::default()))
}

pub fn sample(x: f64, y: f64) -> PointerSample {
    PointerSample::new(0, x, y, 1.0)
}

/// Draw a straight stroke locally and return the encoded messages to send.
pub fn draw_line(engine: &mut PaintEngine, layer: LayerId, from: (f64, f64), to: (f64, f64)) -> Vec<u8> {
    engine
        .begin_stroke(layer, sample(from.0, from.1), &mut ())
        .expect("begin stroke");
    engine
        .stroke_to(sample(to.0, to.1), &mut ())
        .expect("continue stroke");
    engine.end_stroke(&mut ()).expect("end stroke");
    engine.take_outbound()
}

pub fn dab_bodies(bytes: &[u8]) -> Vec<DrawDabs> {
    decode(bytes)
        .into_iter()
        .filter_map(|message| match message.body {
            MessageBody::DrawDabs(draw) => Some(draw),
            _ => None,
        })
        .collect()
}

pub fn canvas(engine: &PaintEngine) -> PixelBuffer {
    let size = engine.canvas_size();
    engine.render_region(Rectangle::new(0, 0, size.width, size.height))
}
