//! Filter predicates for notification views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Notification, NotificationKind};
use super::priority::Priority;

/// Order of a filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Criteria for [`NotificationStore::get_filtered`](super::NotificationStore::get_filtered).
///
/// Every set field must match. The default view excludes archived records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationFilter {
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
    pub priority: Option<Priority>,
    pub read: Option<bool>,
    pub archived: Option<bool>,
    /// Inclusive lower bound.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring of title or message.
    pub search_text: Option<String>,
    pub order: SortOrder,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            kind: None,
            priority: None,
            read: None,
            archived: Some(false),
            start_date: None,
            end_date: None,
            search_text: None,
            order: SortOrder::NewestFirst,
        }
    }
}

impl NotificationFilter {
    pub fn kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Match archived and non-archived records alike.
    pub fn include_archived(mut self) -> Self {
        self.archived = None;
        self
    }

    /// Restrict to the closed range `[start, end]`.
    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = SortOrder::OldestFirst;
        self
    }

    /// Whether `n` satisfies every criterion.
    pub fn matches(&self, n: &Notification) -> bool {
        if self.kind.is_some_and(|k| k != n.kind) {
            return false;
        }
        if self.priority.is_some_and(|p| p != n.priority) {
            return false;
        }
        if self.read.is_some_and(|r| r != n.read) {
            return false;
        }
        if self.archived.is_some_and(|a| a != n.archived) {
            return false;
        }
        if self.start_date.is_some_and(|s| n.timestamp < s) {
            return false;
        }
        if self.end_date.is_some_and(|e| n.timestamp > e) {
            return false;
        }
        match self.search_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                n.title.to_lowercase().contains(&needle)
                    || n.message.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}
