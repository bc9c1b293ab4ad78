//! Local mirror of the server's channel set and the active channel.

use std::collections::HashSet;

use chat_common::{ChannelType, SnapshotEntry};

/// A change the store made, drained by the renderer after each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Added { name: String, channel_type: ChannelType },
    /// A provisional entry was confirmed with its real type.
    Updated { name: String, channel_type: ChannelType },
    Removed { name: String },
    /// The whole set was replaced by a snapshot.
    Replaced,
    ActiveChanged { name: String },
}

/// Known channels (in insertion order) and the active channel.
///
/// The active channel is always a member of the known set after any
/// mutator returns. Switching to a channel the store has not heard of yet
/// inserts a provisional ephemeral entry that the matching `channel_created`
/// later confirms.
#[derive(Debug)]
pub struct ChannelStore {
    default_channel: String,
    known: Vec<(String, ChannelType)>,
    provisional: HashSet<String>,
    active: String,
    changes: Vec<StoreChange>,
}

impl ChannelStore {
    /// A store knowing only `default_channel`, which is also active.
    pub fn new(default_channel: impl Into<String>) -> Self {
        let default_channel = default_channel.into();
        Self {
            known: vec![(default_channel.clone(), ChannelType::Persistent)],
            provisional: HashSet::new(),
            active: default_channel.clone(),
            default_channel,
            changes: Vec::new(),
        }
    }

    pub fn known_channels(&self) -> &[(String, ChannelType)] {
        &self.known
    }

    pub fn active_channel(&self) -> &str {
        &self.active
    }

    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn channel_type(&self, name: &str) -> Option<ChannelType> {
        self.position(name).map(|i| self.known[i].1)
    }

    /// Replace the known set with `entries`. Duplicate names keep their
    /// first occurrence. An active channel the snapshot does not list is kept
    /// as a provisional entry at the end.
    pub fn apply_snapshot<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = SnapshotEntry>,
    {
        let mut seen = HashSet::new();
        self.known = entries
            .into_iter()
            .map(SnapshotEntry::normalize)
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect();
        self.provisional.clear();
        if !self.contains(&self.active) {
            self.known.push((self.active.clone(), ChannelType::Ephemeral));
            self.provisional.insert(self.active.clone());
        }
        self.changes.push(StoreChange::Replaced);
    }

    /// Insert a channel. No-op when the name is already known, except that a
    /// provisional entry takes the supplied type. Returns whether anything
    /// changed.
    pub fn add_channel(&mut self, name: &str, channel_type: ChannelType) -> bool {
        match self.position(name) {
            Some(i) => {
                if !self.provisional.remove(name) {
                    return false;
                }
                self.known[i].1 = channel_type;
                self.changes.push(StoreChange::Updated {
                    name: name.to_string(),
                    channel_type,
                });
                true
            }
            None => {
                self.insert(name, channel_type);
                true
            }
        }
    }

    /// Remove a channel. Removing the active channel falls back to the
    /// default channel before returning. No-op for unknown names.
    pub fn remove_channel(&mut self, name: &str) -> bool {
        let Some(i) = self.position(name) else {
            return false;
        };
        self.known.remove(i);
        self.provisional.remove(name);
        self.changes.push(StoreChange::Removed {
            name: name.to_string(),
        });

        if self.active == name {
            let fallback = self.default_channel.clone();
            self.activate(&fallback);
        }
        true
    }

    /// Make `name` the active channel. Returns whether the active channel
    /// changed.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.active == name && self.contains(name) {
            return false;
        }
        self.activate(name);
        true
    }

    /// Take the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<StoreChange> {
        std::mem::take(&mut self.changes)
    }

    fn activate(&mut self, name: &str) {
        if !self.contains(name) {
            self.insert(name, ChannelType::Ephemeral);
            self.provisional.insert(name.to_string());
        }
        if self.active != name {
            self.active = name.to_string();
            self.changes.push(StoreChange::ActiveChanged {
                name: name.to_string(),
            });
        }
    }

    fn insert(&mut self, name: &str, channel_type: ChannelType) {
        self.known.push((name.to_string(), channel_type));
        self.changes.push(StoreChange::Added {
            name: name.to_string(),
            channel_type,
        });
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.known.iter().position(|(n, _)| n == name)
    }
}
