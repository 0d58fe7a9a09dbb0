use crate::PointerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PointerQueueCreateError {
    #[error("pointer queue capacity must be positive")]
    ZeroCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PointerQueuePushError {
    #[error("pointer queue is full")]
    Full,
}

/// Producer half, owned by the input thread.
#[derive(Debug)]
pub struct PointerEventSender {
    producer: rtrb::Producer<PointerEvent>,
}

/// Consumer half, owned by the engine thread.
#[derive(Debug)]
pub struct PointerEventReceiver {
    consumer: rtrb::Consumer<PointerEvent>,
}

pub fn create_pointer_queue(
    capacity: usize,
) -> Result<(PointerEventSender, PointerEventReceiver), PointerQueueCreateError> {
    if capacity == 0 {
        return Err(PointerQueueCreateError::ZeroCapacity);
    }
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    Ok((
        PointerEventSender { producer },
        PointerEventReceiver { consumer },
    ))
}

impl PointerEventSender {
    pub fn push(&mut self, event: PointerEvent) -> Result<(), PointerQueuePushError> {
        self.producer
            .push(event)
            .map_err(|_| PointerQueuePushError::Full)
    }

    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

impl PointerEventReceiver {
    pub fn pop(&mut self) -> Option<PointerEvent> {
        self.consumer.pop().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
