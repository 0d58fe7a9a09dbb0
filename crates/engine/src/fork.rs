use std::collections::VecDeque;

use document::LayerStack;
use protocol::Message;

/// Local messages already shown on the canvas but not yet sequenced by the
/// server, plus the committed state they were applied on top of.
///
/// `committed` is present exactly when `pending` is not empty.
#[derive(Debug, Clone, Default)]
pub struct LocalFork {
    pending: VecDeque<Message>,
    committed: Option<LayerStack>,
}

impl LocalFork {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.pending.iter()
    }

    /// Queue a message that was applied locally. `committed` must be the
    /// state before it when the fork was empty.
    pub(crate) fn push(&mut self, message: Message, committed: Option<LayerStack>) {
        if self.pending.is_empty() {
            self.committed = Some(committed.expect("a new fork starts from the committed state"));
        }
        self.pending.push_back(message);
    }

    pub(crate) fn is_next(&self, message: &Message) -> bool {
        self.pending.front() == Some(message)
    }

    /// Drop the front message once its echo was applied to the committed
    /// state. Returns true when the fork became empty.
    pub(crate) fn confirm_next(&mut self) -> bool {
        self.pending.pop_front();
        if self.pending.is_empty() {
            self.committed = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn committed_mut(&mut self) -> Option<&mut LayerStack> {
        self.committed.as_mut()
    }

    /// Empty the fork, handing back the committed state.
    pub(crate) fn discard(&mut self) -> Option<LayerStack> {
        self.pending.clear();
        self.committed.take()
    }
}
