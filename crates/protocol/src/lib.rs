//! Wire messages exchanged between canvas peers.
//!
//! Every message is framed as `u16 payload length | u8 type | u8 user | payload`,
//! big-endian throughout. Decoding a valid message and encoding it again
//! reproduces the original bytes.

mod codec;
mod stream;

use model::{BlendMode, LayerId, UserId};
use smallvec::SmallVec;

pub use stream::{MessageReader, MessageWriter};

pub const HEADER_LEN: usize = 4;
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;
/// Upper bound on dabs carried by one `DrawDabs` message.
pub const MAX_DABS_PER_MESSAGE: usize = 255;
pub const LAYER_FLAG_HIDDEN: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    UndoPoint,
    ResizeCanvas,
    CreateLayer,
    LayerAttributes,
    LayerRetitle,
    ReorderLayers,
    DeleteLayer,
    PenUp,
    DrawDabs,
    Undo,
    Redo,
}

impl MessageType {
    pub const fn tag(self) -> u8 {
        match self {
            MessageType::UndoPoint => 0x02,
            MessageType::ResizeCanvas => 0x80,
            MessageType::CreateLayer => 0x81,
            MessageType::LayerAttributes => 0x82,
            MessageType::LayerRetitle => 0x83,
            MessageType::ReorderLayers => 0x84,
            MessageType::DeleteLayer => 0x85,
            MessageType::PenUp => 0x86,
            MessageType::DrawDabs => 0x87,
            MessageType::Undo => 0x88,
            MessageType::Redo => 0x89,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x02 => Some(MessageType::UndoPoint),
            0x80 => Some(MessageType::ResizeCanvas),
            0x81 => Some(MessageType::CreateLayer),
            0x82 => Some(MessageType::LayerAttributes),
            0x83 => Some(MessageType::LayerRetitle),
            0x84 => Some(MessageType::ReorderLayers),
            0x85 => Some(MessageType::DeleteLayer),
            0x86 => Some(MessageType::PenUp),
            0x87 => Some(MessageType::DrawDabs),
            0x88 => Some(MessageType::Undo),
            0x89 => Some(MessageType::Redo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("buffer ends inside a message ({needed} bytes needed, {available} available)")]
    Truncated { needed: usize, available: usize },
    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),
    #[error("invalid {message_type:?} payload: {reason}")]
    InvalidPayload {
        message_type: MessageType,
        reason: &'static str,
    },
    #[error("layer title is not valid utf-8")]
    InvalidUtf8,
    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLong(usize),
}

/// Canvas growth per edge. Negative values crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeCanvas {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLayer {
    pub id: LayerId,
    /// Layer to duplicate, or 0 for a solid fill.
    pub source: LayerId,
    /// ARGB fill used when `source` is 0.
    pub fill: u32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerAttributes {
    pub id: LayerId,
    pub opacity: u8,
    pub blend: BlendMode,
    pub flags: u8,
}

impl LayerAttributes {
    pub fn is_hidden(&self) -> bool {
        self.flags & LAYER_FLAG_HIDDEN != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRetitle {
    pub id: LayerId,
    pub title: String,
}

/// New paint order, bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReorderLayers {
    pub order: SmallVec<[LayerId; 8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteLayer {
    pub id: LayerId,
    /// Composite the layer onto the one below before removing it.
    pub merge: bool,
}

/// One classic dab relative to the previous dab of the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DabRecord {
    /// Offset in quarter pixels.
    pub dx: i8,
    pub dy: i8,
    /// Radius in 1/256 pixels.
    pub radius: u16,
    pub hardness: u8,
    pub opacity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawDabs {
    pub layer: LayerId,
    /// Base position in quarter pixels.
    pub x: i32,
    pub y: i32,
    /// ARGB; the alpha byte is not used for painting.
    pub color: u32,
    pub blend: BlendMode,
    pub dabs: SmallVec<[DabRecord; 16]>,
}

impl DrawDabs {
    /// Dabs with their absolute positions in quarter pixels.
    pub fn positioned(&self) -> impl Iterator<Item = (i32, i32, &DabRecord)> + '_ {
        self.dabs.iter().scan((self.x, self.y), |last, dab| {
            last.0 = last.0.saturating_add(dab.dx as i32);
            last.1 = last.1.saturating_add(dab.dy as i32);
            Some((last.0, last.1, dab))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UndoRequest {
    /// User whose history is affected, or 0 for the sender.
    pub override_user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    UndoPoint,
    ResizeCanvas(ResizeCanvas),
    CreateLayer(CreateLayer),
    LayerAttributes(LayerAttributes),
    LayerRetitle(LayerRetitle),
    ReorderLayers(ReorderLayers),
    DeleteLayer(DeleteLayer),
    PenUp,
    DrawDabs(DrawDabs),
    Undo(UndoRequest),
    Redo(UndoRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub user_id: UserId,
    pub body: MessageBody,
}

impl Message {
    pub fn new(user_id: UserId, body: MessageBody) -> Self {
        Self { user_id, body }
    }

    pub fn message_type(&self) -> MessageType {
        match &self.body {
            MessageBody::UndoPoint => MessageType::UndoPoint,
            MessageBody::ResizeCanvas(_) => MessageType::ResizeCanvas,
            MessageBody::CreateLayer(_) => MessageType::CreateLayer,
            MessageBody::LayerAttributes(_) => MessageType::LayerAttributes,
            MessageBody::LayerRetitle(_) => MessageType::LayerRetitle,
            MessageBody::ReorderLayers(_) => MessageType::ReorderLayers,
            MessageBody::DeleteLayer(_) => MessageType::DeleteLayer,
            MessageBody::PenUp => MessageType::PenUp,
            MessageBody::DrawDabs(_) => MessageType::DrawDabs,
            MessageBody::Undo(_) => MessageType::Undo,
            MessageBody::Redo(_) => MessageType::Redo,
        }
    }

    /// Messages a client may apply before the server echoes them back.
    pub fn is_locally_predictable(&self) -> bool {
        matches!(
            self.body,
            MessageBody::DrawDabs(_) | MessageBody::PenUp | MessageBody::UndoPoint
        )
    }

    /// Messages that change layer pixels, layer metadata or the canvas size.
    pub fn mutates_canvas(&self) -> bool {
        !matches!(self.body, MessageBody::PenUp | MessageBody::UndoPoint)
    }

    /// Messages kept in undo history. Undo and redo act on history instead.
    pub fn is_recorded(&self) -> bool {
        !matches!(self.body, MessageBody::Undo(_) | MessageBody::Redo(_))
    }

    /// User an undo or redo applies to.
    pub fn undo_target(&self) -> Option<UserId> {
        match &self.body {
            MessageBody::Undo(request) | MessageBody::Redo(request) => {
                Some(match request.override_user {
                    0 => self.user_id,
                    user => user,
                })
            }
            _ => None,
        }
    }

    /// Layer a message addresses, if any.
    pub fn layer_id(&self) -> Option<LayerId> {
        match &self.body {
            MessageBody::CreateLayer(create) => Some(create.id),
            MessageBody::LayerAttributes(attributes) => Some(attributes.id),
            MessageBody::LayerRetitle(retitle) => Some(retitle.id),
            MessageBody::DeleteLayer(delete) => Some(delete.id),
            MessageBody::DrawDabs(dabs) => Some(dabs.layer),
            _ => None,
        }
    }
}
