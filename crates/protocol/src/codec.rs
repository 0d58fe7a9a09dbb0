use model::BlendMode;
use smallvec::SmallVec;

use crate::{
    CreateLayer, DabRecord, DeleteLayer, DrawDabs, HEADER_LEN, LayerAttributes, LayerRetitle,
    MAX_DABS_PER_MESSAGE, MAX_PAYLOAD_LEN, Message, MessageBody, MessageType, ProtocolError,
    ReorderLayers, ResizeCanvas, UndoRequest,
};

const DRAW_DABS_HEADER_LEN: usize = 15;
const DAB_RECORD_LEN: usize = 6;

/// Header fields of the frame at the front of `bytes`.
pub(crate) struct Frame<'a> {
    pub(crate) tag: u8,
    pub(crate) user_id: u8,
    pub(crate) payload: &'a [u8],
}

impl Frame<'_> {
    pub(crate) fn total_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

pub(crate) fn split_frame(bytes: &[u8]) -> Result<Frame<'_>, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    let payload_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let total = HEADER_LEN + payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }
    Ok(Frame {
        tag: bytes[2],
        user_id: bytes[3],
        payload: &bytes[HEADER_LEN..total],
    })
}

struct PayloadCursor<'a> {
    message_type: MessageType,
    bytes: &'a [u8],
}

impl<'a> PayloadCursor<'a> {
    fn new(message_type: MessageType, bytes: &'a [u8]) -> Self {
        Self {
            message_type,
            bytes,
        }
    }

    fn invalid(&self, reason: &'static str) -> ProtocolError {
        ProtocolError::InvalidPayload {
            message_type: self.message_type,
            reason,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.invalid("payload too short"));
        };
        self.bytes = tail;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take::<1>()?[0])
    }

    fn i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(i8::from_be_bytes(self.take()?))
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    fn blend(&mut self) -> Result<BlendMode, ProtocolError> {
        let value = self.u8()?;
        BlendMode::from_wire(value).ok_or_else(|| self.invalid("unknown blend mode"))
    }

    fn title(&mut self) -> Result<String, ProtocolError> {
        let rest = std::mem::take(&mut self.bytes);
        String::from_utf8(rest.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn finish(self) -> Result<(), ProtocolError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(self.invalid("trailing bytes"))
        }
    }
}

pub(crate) fn decode_frame(frame: &Frame<'_>) -> Result<Message, ProtocolError> {
    let message_type =
        MessageType::from_tag(frame.tag).ok_or(ProtocolError::UnknownType(frame.tag))?;
    let mut cursor = PayloadCursor::new(message_type, frame.payload);
    let body = match message_type {
        MessageType::UndoPoint => MessageBody::UndoPoint,
        MessageType::PenUp => MessageBody::PenUp,
        MessageType::ResizeCanvas => MessageBody::ResizeCanvas(ResizeCanvas {
            top: cursor.i32()?,
            right: cursor.i32()?,
            bottom: cursor.i32()?,
            left: cursor.i32()?,
        }),
        MessageType::CreateLayer => MessageBody::CreateLayer(CreateLayer {
            id: cursor.u16()?,
            source: cursor.u16()?,
            fill: cursor.u32()?,
            title: cursor.title()?,
        }),
        MessageType::LayerAttributes => MessageBody::LayerAttributes(LayerAttributes {
            id: cursor.u16()?,
            opacity: cursor.u8()?,
            blend: cursor.blend()?,
            flags: cursor.u8()?,
        }),
        MessageType::LayerRetitle => MessageBody::LayerRetitle(LayerRetitle {
            id: cursor.u16()?,
            title: cursor.title()?,
        }),
        MessageType::ReorderLayers => {
            if cursor.remaining() % 2 != 0 {
                return Err(cursor.invalid("odd layer list length"));
            }
            let mut order = SmallVec::with_capacity(cursor.remaining() / 2);
            while cursor.remaining() > 0 {
                order.push(cursor.u16()?);
            }
            MessageBody::ReorderLayers(ReorderLayers { order })
        }
        MessageType::DeleteLayer => MessageBody::DeleteLayer(DeleteLayer {
            id: cursor.u16()?,
            merge: match cursor.u8()? {
                0 => false,
                1 => true,
                _ => return Err(cursor.invalid("merge flag is not 0 or 1")),
            },
        }),
        MessageType::DrawDabs => MessageBody::DrawDabs(decode_draw_dabs(&mut cursor)?),
        MessageType::Undo => MessageBody::Undo(UndoRequest {
            override_user: cursor.u8()?,
        }),
        MessageType::Redo => MessageBody::Redo(UndoRequest {
            override_user: cursor.u8()?,
        }),
    };
    cursor.finish()?;
    Ok(Message {
        user_id: frame.user_id,
        body,
    })
}

fn decode_draw_dabs(cursor: &mut PayloadCursor<'_>) -> Result<DrawDabs, ProtocolError> {
    let layer = cursor.u16()?;
    let x = cursor.i32()?;
    let y = cursor.i32()?;
    let color = cursor.u32()?;
    let blend = cursor.blend()?;
    if cursor.remaining() % DAB_RECORD_LEN != 0 {
        return Err(cursor.invalid("partial dab record"));
    }
    let count = cursor.remaining() / DAB_RECORD_LEN;
    if count == 0 || count > MAX_DABS_PER_MESSAGE {
        return Err(cursor.invalid("dab count out of range"));
    }
    let mut dabs = SmallVec::with_capacity(count);
    for _ in 0..count {
        dabs.push(DabRecord {
            dx: cursor.i8()?,
            dy: cursor.i8()?,
            radius: cursor.u16()?,
            hardness: cursor.u8()?,
            opacity: cursor.u8()?,
        });
    }
    Ok(DrawDabs {
        layer,
        x,
        y,
        color,
        blend,
        dabs,
    })
}

fn encode_payload(message: &Message, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match &message.body {
        MessageBody::UndoPoint | MessageBody::PenUp => {}
        MessageBody::ResizeCanvas(resize) => {
            for edge in [resize.top, resize.right, resize.bottom, resize.left] {
                out.extend_from_slice(&edge.to_be_bytes());
            }
        }
        MessageBody::CreateLayer(create) => {
            out.extend_from_slice(&create.id.to_be_bytes());
            out.extend_from_slice(&create.source.to_be_bytes());
            out.extend_from_slice(&create.fill.to_be_bytes());
            out.extend_from_slice(create.title.as_bytes());
        }
        MessageBody::LayerAttributes(attributes) => {
            out.extend_from_slice(&attributes.id.to_be_bytes());
            out.push(attributes.opacity);
            out.push(attributes.blend.to_wire());
            out.push(attributes.flags);
        }
        MessageBody::LayerRetitle(retitle) => {
            out.extend_from_slice(&retitle.id.to_be_bytes());
            out.extend_from_slice(retitle.title.as_bytes());
        }
        MessageBody::ReorderLayers(reorder) => {
            for id in &reorder.order {
                out.extend_from_slice(&id.to_be_bytes());
            }
        }
        MessageBody::DeleteLayer(delete) => {
            out.extend_from_slice(&delete.id.to_be_bytes());
            out.push(delete.merge as u8);
        }
        MessageBody::DrawDabs(draw) => {
            if draw.dabs.is_empty() || draw.dabs.len() > MAX_DABS_PER_MESSAGE {
                return Err(ProtocolError::InvalidPayload {
                    message_type: MessageType::DrawDabs,
                    reason: "dab count out of range",
                });
            }
            out.reserve(DRAW_DABS_HEADER_LEN + draw.dabs.len() * DAB_RECORD_LEN);
            out.extend_from_slice(&draw.layer.to_be_bytes());
            out.extend_from_slice(&draw.x.to_be_bytes());
            out.extend_from_slice(&draw.y.to_be_bytes());
            out.extend_from_slice(&draw.color.to_be_bytes());
            out.push(draw.blend.to_wire());
            for dab in &draw.dabs {
                out.extend_from_slice(&dab.dx.to_be_bytes());
                out.extend_from_slice(&dab.dy.to_be_bytes());
                out.extend_from_slice(&dab.radius.to_be_bytes());
                out.push(dab.hardness);
                out.push(dab.opacity);
            }
        }
        MessageBody::Undo(request) | MessageBody::Redo(request) => out.push(request.override_user),
    }
    Ok(())
}

impl Message {
    /// Decode the message at the front of `bytes`. Returns the message and
    /// the number of bytes it occupied.
    pub fn decode(bytes: &[u8]) -> Result<(Message, usize), ProtocolError> {
        let frame = split_frame(bytes)?;
        Ok((decode_frame(&frame)?, frame.total_len()))
    }

    /// Append the framed message to `out`. On error `out` is left unchanged.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let start = out.len();
        out.extend_from_slice(&[0, 0, self.message_type().tag(), self.user_id]);
        if let Err(error) = encode_payload(self, out) {
            out.truncate(start);
            return Err(error);
        }
        let payload_len = out.len() - start - HEADER_LEN;
        if payload_len > MAX_PAYLOAD_LEN {
            out.truncate(start);
            return Err(ProtocolError::PayloadTooLong(payload_len));
        }
        out[start..start + 2].copy_from_slice(&(payload_len as u16).to_be_bytes());
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }
}
