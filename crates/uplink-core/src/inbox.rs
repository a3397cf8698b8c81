//! Client-side notification inbox: a bounded ring buffer for display.

use std::collections::VecDeque;

use crate::notification::NotificationEvent;

pub const DEFAULT_INBOX_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
struct Entry {
  event: NotificationEvent,
  read:  bool,
}

/// Retains the last `capacity` notifications; the oldest is dropped first.
#[derive(Debug, Clone)]
pub struct NotificationInbox {
  capacity: usize,
  entries:  VecDeque<Entry>,
}

impl Default for NotificationInbox {
  fn default() -> Self { Self::with_capacity(DEFAULT_INBOX_CAPACITY) }
}

impl NotificationInbox {
  /// A zero capacity is bumped to one.
  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self { capacity, entries: VecDeque::with_capacity(capacity) }
  }

  pub fn push(&mut self, event: NotificationEvent) {
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(Entry { event, read: false });
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn unread(&self) -> usize { self.entries.iter().filter(|e| !e.read).count() }

  pub fn mark_all_read(&mut self) {
    for e in &mut self.entries {
      e.read = true;
    }
  }

  pub fn clear(&mut self) { self.entries.clear(); }

  /// Newest first.
  pub fn recent(&self) -> impl Iterator<Item = &NotificationEvent> {
    self.entries.iter().rev().map(|e| &e.event)
  }
}
