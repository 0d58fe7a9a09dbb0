use std::collections::VecDeque;

use document::LayerStack;
use model::UserId;
use protocol::{Message, MessageBody};

use crate::execute::execute;
use crate::{Anomaly, ApplyError};

pub const DEFAULT_MAX_UNDO_POINTS: usize = 30;
pub const DEFAULT_MAX_ENTRIES: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Done,
    Undone,
    /// Undone and then superseded by a newer undo point. Cannot be redone.
    Gone,
}

#[derive(Debug, Clone)]
struct Entry {
    message: Message,
    state: UndoState,
    /// Stack as it was just before this entry. Only undo points carry one.
    savepoint: Option<LayerStack>,
}

impl Entry {
    fn is_undo_point_of(&self, user: UserId) -> bool {
        self.message.user_id == user && matches!(self.message.body, MessageBody::UndoPoint)
    }
}

/// Applied messages since the oldest retained undo point.
///
/// Every undo point stores a copy-on-write snapshot of the stack. Undo and
/// redo flip entry states, restore the nearest snapshot and replay the
/// entries still done. Only the newest `max_undo_points` undo points and at
/// most `max_entries` entries are kept; older units are dropped whole and
/// can no longer be undone.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Entry>,
    undo_points: usize,
    max_undo_points: usize,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_POINTS)
    }
}

impl History {
    pub fn new(max_undo_points: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            undo_points: 0,
            max_undo_points: max_undo_points.max(1),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn undo_point_count(&self) -> usize {
        self.undo_points
    }

    pub fn max_undo_points(&self) -> usize {
        self.max_undo_points
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.undo_points = 0;
    }

    /// Recorded messages with their undo state, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&Message, UndoState)> + '_ {
        self.entries.iter().map(|entry| (&entry.message, entry.state))
    }

    /// Record a message that was just applied to `stack`.
    pub(crate) fn record(&mut self, message: Message, stack: &LayerStack) {
        if matches!(message.body, MessageBody::UndoPoint) {
            let user = message.user_id;
            for entry in self.entries.iter_mut() {
                if entry.message.user_id == user && entry.state == UndoState::Undone {
                    entry.state = UndoState::Gone;
                }
            }
            self.entries.push_back(Entry {
                message,
                state: UndoState::Done,
                savepoint: Some(stack.clone()),
            });
            self.undo_points += 1;
            self.prune();
        } else if !self.entries.is_empty() {
            // Without an undo point before it a message can never be replayed.
            self.entries.push_back(Entry {
                message,
                state: UndoState::Done,
                savepoint: None,
            });
            self.prune();
        }
    }

    /// Undo the newest done unit of `user` and rebuild `stack`.
    pub(crate) fn undo(&mut self, user: UserId, stack: &mut LayerStack) -> Result<(), ApplyError> {
        let start = self
            .entries
            .iter()
            .rposition(|entry| entry.is_undo_point_of(user) && entry.state == UndoState::Done)
            .ok_or(Anomaly::NothingToUndo(user))?;
        for entry in self.entries.range_mut(start..) {
            if entry.message.user_id == user && entry.state == UndoState::Done {
                entry.state = UndoState::Undone;
            }
        }
        tracing::debug!(user, replayed = self.entries.len() - start, "undo");
        self.replay_from(start, stack)
    }

    /// Redo the oldest undone unit of `user` that follows its newest done one.
    pub(crate) fn redo(&mut self, user: UserId, stack: &mut LayerStack) -> Result<(), ApplyError> {
        let mut candidate = None;
        for (index, entry) in self.entries.iter().enumerate().rev() {
            if !entry.is_undo_point_of(user) {
                continue;
            }
            match entry.state {
                UndoState::Undone => candidate = Some(index),
                UndoState::Done | UndoState::Gone => break,
            }
        }
        let start = candidate.ok_or(Anomaly::NothingToRedo(user))?;
        let end = self
            .entries
            .iter()
            .skip(start + 1)
            .position(|entry| entry.is_undo_point_of(user))
            .map_or(self.entries.len(), |offset| start + 1 + offset);
        for entry in self.entries.range_mut(start..end) {
            if entry.message.user_id == user && entry.state == UndoState::Undone {
                entry.state = UndoState::Done;
            }
        }
        tracing::debug!(user, replayed = self.entries.len() - start, "redo");
        self.replay_from(start, stack)
    }

    /// Restore the savepoint at `start` and replay every done entry after it.
    /// Later savepoints are refreshed along the way.
    fn replay_from(&mut self, start: usize, stack: &mut LayerStack) -> Result<(), ApplyError> {
        let mut replayed = self.entries[start]
            .savepoint
            .clone()
            .expect("undo points carry a savepoint");
        for entry in self.entries.range_mut(start..) {
            if matches!(entry.message.body, MessageBody::UndoPoint) {
                entry.savepoint = Some(replayed.clone());
                continue;
            }
            if entry.state != UndoState::Done {
                continue;
            }
            match execute(&mut replayed, &entry.message) {
                Ok(_) => {}
                Err(ApplyError::Rejected(anomaly)) => {
                    tracing::debug!(%anomaly, "replayed message no longer applies");
                }
                Err(fatal) => return Err(fatal),
            }
        }
        replayed.clear_dirty();
        replayed.adopt_used_ids(stack);
        *stack = replayed;
        Ok(())
    }

    fn prune(&mut self) {
        let mut dropped = 0;
        while !self.entries.is_empty()
            && (self.undo_points > self.max_undo_points || self.entries.len() > self.max_entries)
        {
            // The front entry is always an undo point.
            self.entries.pop_front();
            self.undo_points -= 1;
            dropped += 1;
            while self
                .entries
                .front()
                .is_some_and(|entry| !matches!(entry.message.body, MessageBody::UndoPoint))
            {
                self.entries.pop_front();
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, retained = self.entries.len(), "pruned history");
        }
    }
}
