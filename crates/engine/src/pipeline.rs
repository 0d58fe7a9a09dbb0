use document::LayerStack;
use model::{Color, ImageLayout, UserId};
use protocol::{Message, MessageBody, MessageReader};
use tiles::TileAllocError;

use crate::execute::{effect_between, execute};
use crate::{
    Anomaly, AppliedEffect, ApplyError, BatchOutcome, History, LocalFork, Origin, UndoState,
};

const FORK_STATE: &str = "a non-empty fork keeps the committed state";

/// Applies messages in sequence order to one layer stack.
///
/// Remote messages go through history. Local predictable messages are shown
/// immediately and parked in the local fork until the server echoes them.
/// A remote change that arrives while the fork is not empty is applied to
/// the committed state, and the fork is replayed on top of it.
#[derive(Debug)]
pub struct CanvasPipeline {
    stack: LayerStack,
    history: History,
    fork: LocalFork,
    local_user: UserId,
    initial_layout: ImageLayout,
    background: Color,
    fatal: Option<TileAllocError>,
    /// Visible change from a fork rollback whose triggering message was
    /// rejected.
    rolled_back: AppliedEffect,
}

impl CanvasPipeline {
    pub fn new(
        layout: ImageLayout,
        background: Color,
        local_user: UserId,
        max_undo_points: usize,
    ) -> Self {
        Self {
            stack: LayerStack::new(layout, background),
            history: History::new(max_undo_points),
            fork: LocalFork::default(),
            local_user,
            initial_layout: layout,
            background,
            fatal: None,
            rolled_back: AppliedEffect::default(),
        }
    }

    /// Cap on retained history entries, for peers that rarely send undo
    /// points.
    pub fn with_max_history_entries(mut self, max_entries: usize) -> Self {
        self.history = self.history.with_max_entries(max_entries);
        self
    }

    /// The stack as currently shown, local predictions included.
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn fork(&self) -> &LocalFork {
        &self.fork
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    pub fn set_local_user(&mut self, user: UserId) {
        self.local_user = user;
    }

    /// Set once a fatal error was hit. Every later `apply` fails with it.
    pub fn fatal_error(&self) -> Option<TileAllocError> {
        self.fatal
    }

    pub fn apply(&mut self, message: Message, origin: Origin) -> Result<AppliedEffect, ApplyError> {
        if let Some(error) = self.fatal {
            return Err(ApplyError::Fatal(error));
        }
        let user = message.user_id;
        let message_type = message.message_type();
        let result = match origin {
            Origin::Local => self.apply_local(message),
            Origin::Remote => self.apply_remote(message),
        };
        match &result {
            Ok(_) => {}
            Err(ApplyError::Rejected(anomaly)) => {
                tracing::warn!(user, ?message_type, ?origin, %anomaly, "message rejected");
            }
            Err(ApplyError::Fatal(error)) => {
                self.fatal = Some(*error);
                tracing::error!(user, ?message_type, %error, "canvas state lost");
            }
        }
        result
    }

    /// Decode and apply a buffer of messages. Malformed and rejected
    /// messages are skipped; only a fatal error stops the batch.
    pub fn apply_bytes(&mut self, bytes: &[u8], origin: Origin) -> Result<BatchOutcome, ApplyError> {
        let mut outcome = BatchOutcome::default();
        for decoded in MessageReader::new(bytes) {
            let message = match decoded {
                Ok(message) => message,
                Err(error) => {
                    tracing::warn!(%error, "dropping malformed message");
                    outcome.anomalies.push(Anomaly::Malformed(error));
                    continue;
                }
            };
            match self.apply(message, origin) {
                Ok(effect) => {
                    outcome.applied += 1;
                    outcome.effect.merge(effect);
                }
                Err(ApplyError::Rejected(anomaly)) => {
                    outcome.effect.merge(self.take_rolled_back());
                    outcome.anomalies.push(anomaly);
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(outcome)
    }

    /// Area changed by a rejected `apply` that still rolled back the local
    /// fork. Empty otherwise.
    pub fn take_rolled_back(&mut self) -> AppliedEffect {
        std::mem::take(&mut self.rolled_back)
    }

    /// Forget the local fork without rolling it back, e.g. after the
    /// connection dropped. Local marks stay visible.
    pub fn cleanup(&mut self) {
        if !self.fork.is_empty() {
            tracing::debug!(pending = self.fork.len(), "discarding local fork");
        }
        self.fork.discard();
    }

    /// Back to an empty canvas with no history.
    pub fn reset(&mut self) {
        self.stack = LayerStack::new(self.initial_layout, self.background);
        self.history.clear();
        self.fork.discard();
        self.fatal = None;
        self.rolled_back = AppliedEffect::default();
    }

    /// Whether `user` has something to undo in retained history.
    pub fn can_undo(&self, user: UserId) -> bool {
        self.history.iter().any(|(message, state)| {
            message.user_id == user
                && matches!(message.body, MessageBody::UndoPoint)
                && state == UndoState::Done
        })
    }

    fn apply_local(&mut self, message: Message) -> Result<AppliedEffect, ApplyError> {
        if !message.is_locally_predictable() {
            return Err(Anomaly::NotPredictable(message.message_type()).into());
        }
        let committed = self.fork.is_empty().then(|| self.stack.clone());
        let effect = execute(&mut self.stack, &message)?;
        self.fork.push(message, committed);
        Ok(effect)
    }

    fn apply_remote(&mut self, message: Message) -> Result<AppliedEffect, ApplyError> {
        if self.fork.is_empty() {
            return apply_committed(&mut self.history, &mut self.stack, message);
        }

        if self.fork.is_next(&message) {
            // Echo of a local message: already shown, only history changes.
            let committed = self.fork.committed_mut().expect(FORK_STATE);
            let result = apply_committed(&mut self.history, committed, message);
            self.fork.confirm_next();
            return result.map(|_| AppliedEffect::default());
        }

        if message.user_id == self.local_user && message.is_locally_predictable() {
            tracing::warn!(
                anomaly = %Anomaly::ForkMismatch,
                pending = self.fork.len(),
                "rolling back local fork"
            );
            let committed = self.fork.discard().expect(FORK_STATE);
            let old = std::mem::replace(&mut self.stack, committed);
            self.stack.adopt_used_ids(&old);
            let result = apply_committed(&mut self.history, &mut self.stack, message);
            let effect = effect_between(&old, &self.stack);
            return match result {
                Ok(_) => Ok(effect),
                Err(ApplyError::Rejected(anomaly)) => {
                    // The rollback stands even though the message does not.
                    self.rolled_back = effect;
                    Err(ApplyError::Rejected(anomaly))
                }
                Err(fatal) => Err(fatal),
            };
        }

        let mutates_canvas = message.mutates_canvas();
        let committed = self.fork.committed_mut().expect(FORK_STATE);
        apply_committed(&mut self.history, committed, message)?;
        if !mutates_canvas {
            return Ok(AppliedEffect::default());
        }

        let mut visible = committed.clone();
        for pending in self.fork.messages() {
            match execute(&mut visible, pending) {
                Ok(_) => {}
                Err(ApplyError::Rejected(anomaly)) => {
                    tracing::debug!(%anomaly, "local message no longer applies");
                }
                Err(fatal) => return Err(fatal),
            }
        }
        visible.clear_dirty();
        let old = std::mem::replace(&mut self.stack, visible);
        Ok(effect_between(&old, &self.stack))
    }
}

/// Apply a sequenced message to the committed state and record it.
fn apply_committed(
    history: &mut History,
    stack: &mut LayerStack,
    message: Message,
) -> Result<AppliedEffect, ApplyError> {
    match message.body {
        MessageBody::Undo(_) | MessageBody::Redo(_) => {
            let user = message
                .undo_target()
                .expect("undo and redo always name a user");
            let before = stack.clone();
            if matches!(message.body, MessageBody::Undo(_)) {
                history.undo(user, stack)?;
            } else {
                history.redo(user, stack)?;
            }
            Ok(effect_between(&before, stack))
        }
        _ => {
            let effect = execute(stack, &message)?;
            history.record(message, stack);
            Ok(effect)
        }
    }
}
