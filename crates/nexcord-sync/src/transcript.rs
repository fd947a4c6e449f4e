use std::collections::HashSet;

use nexcord_types::models::Reactions;
use nexcord_types::Message;
use uuid::Uuid;

/// Result of merging one record into the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Inserted,
    /// Known id whose reaction set was replaced by the incoming one.
    Refreshed,
    Unchanged,
}

impl Merge {
    pub fn changed(self) -> bool {
        self != Merge::Unchanged
    }
}

/// Messages of one channel, unique by id and ordered by `created_at`.
///
/// Messages with equal timestamps keep arrival order.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    ids: HashSet<Uuid>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }

    /// Insert a message unless its id is already present. Duplicates are
    /// ignored entirely.
    pub fn insert(&mut self, msg: Message) -> Merge {
        if !self.ids.insert(msg.id) {
            return Merge::Unchanged;
        }
        let pos = self
            .messages
            .partition_point(|m| m.created_at <= msg.created_at);
        self.messages.insert(pos, msg);
        Merge::Inserted
    }

    /// Merge a server-authoritative record: new ids are inserted, known ids
    /// take the incoming reaction set.
    pub fn upsert(&mut self, msg: Message) -> Merge {
        if !self.ids.contains(&msg.id) {
            return self.insert(msg);
        }
        match self.messages.iter_mut().find(|m| m.id == msg.id) {
            Some(existing) if existing.reactions != msg.reactions => {
                existing.reactions = msg.reactions;
                Merge::Refreshed
            }
            _ => Merge::Unchanged,
        }
    }

    /// Apply `f` to the reaction set of a known message.
    pub fn update_reactions<F>(&mut self, id: &Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Reactions) -> bool,
    {
        if !self.ids.contains(id) {
            return false;
        }
        self.messages
            .iter_mut()
            .find(|m| m.id == *id)
            .map(|m| f(&mut m.reactions))
            .unwrap_or(false)
    }
}
