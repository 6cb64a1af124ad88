//! Bounded feed of user-facing event messages
use super::types::TimeStamp;
use super::utils::{NOTIFICATION_HRP, new_uuid_to_bech32};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_FEED_CAPACITY: usize = 15;

pub const WELCOME_TEXT: &str = "Welcome to ZeroCrumbs. Trust is our ingredient.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Success,
    Info,
    Impact,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    /// A verified handover and the meals it credited.
    Impact {
        listing_id: String,
        meals_saved: u64,
    },
    /// A claim whose pickup code has to reach the collecting party.
    Alert { listing_id: String, otp: String },
}

impl NotificationKind {
    pub fn category(&self) -> Category {
        match self {
            NotificationKind::Success => Category::Success,
            NotificationKind::Info => Category::Info,
            NotificationKind::Impact { .. } => Category::Impact,
            NotificationKind::Alert { .. } => Category::Alert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub text: String,
    pub kind: NotificationKind,
    pub timestamp: TimeStamp,
}

impl Notification {
    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

#[derive(Debug)]
pub struct NotificationFeed {
    capacity: usize,
    // newest at the front
    entries: Mutex<VecDeque<Notification>>,
    sequence: Mutex<u64>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            sequence: Mutex::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, text: impl Into<String>, kind: NotificationKind) -> Notification {
        let notification = Notification {
            id: self.next_id(),
            text: text.into(),
            kind,
            timestamp: TimeStamp::new(),
        };

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_front(notification.clone());
        entries.truncate(self.capacity);

        notification
    }

    /// Newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self) -> String {
        let mut sequence = self
            .sequence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *sequence += 1;

        // falls back to a sequence number if the prefix is ever rejected
        new_uuid_to_bech32(NOTIFICATION_HRP).unwrap_or_else(|_| format!("note-{}", *sequence))
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}
