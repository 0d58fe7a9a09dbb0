use crate::codec::{decode_frame, split_frame};
use crate::{Message, ProtocolError};

/// Iterates the messages of one received buffer.
///
/// A message with a bad payload yields an error and reading continues with
/// the next frame. A frame cut off by the end of the buffer yields
/// [`ProtocolError::Truncated`] once and ends iteration, since nothing after
/// it can be located.
#[derive(Debug, Clone)]
pub struct MessageReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> MessageReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            finished: false,
        }
    }

    /// Bytes consumed so far, including skipped frames.
    pub fn consumed(&self) -> usize {
        self.offset
    }
}

impl Iterator for MessageReader<'_> {
    type Item = Result<Message, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.offset >= self.bytes.len() {
            return None;
        }
        let frame = match split_frame(&self.bytes[self.offset..]) {
            Ok(frame) => frame,
            Err(error) => {
                self.finished = true;
                return Some(Err(error));
            }
        };
        self.offset += frame.total_len();
        Some(decode_frame(&frame))
    }
}

/// Accumulates encoded messages for sending.
#[derive(Debug, Default, Clone)]
pub struct MessageWriter {
    buffer: Vec<u8>,
    message_count: usize,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: &Message) -> Result<(), ProtocolError> {
        message.encode_into(&mut self.buffer)?;
        self.message_count += 1;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Hand out the buffered bytes and start over.
    pub fn take(&mut self) -> Vec<u8> {
        self.message_count = 0;
        std::mem::take(&mut self.buffer)
    }
}
