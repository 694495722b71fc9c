//! Local append-only record of alerts and messages
//!
//! Used in demo mode and whenever a remote write fails. Entries are never
//! removed or rewritten; status changes are appended as their own entries
//! and folded in on read.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Alert, AlertStatus, Message, NewAlert, NewMessage};

#[derive(Debug, Clone, PartialEq)]
enum LogEntry {
    Alert(Alert),
    AlertStatus {
        id: String,
        status: AlertStatus,
        at: DateTime<Utc>,
    },
    Message(Message),
    MessageRead {
        id: String,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    /// Furthest status recorded per alert id
    alert_status: HashMap<String, AlertStatus>,
    /// Message ids marked read
    read: HashSet<String>,
}

/// Locally generated id, distinguishable from backend ids
pub fn local_id(prefix: &str) -> String {
    format!("local-{}-{}", prefix, Uuid::new_v4())
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a new alert under a local id
    pub fn append_alert(&mut self, alert: NewAlert, now: DateTime<Utc>) -> Alert {
        let alert = alert.into_alert(local_id("alert"), now);
        self.record_alert(alert.clone());
        alert
    }

    /// Record an alert that already carries an id
    pub fn record_alert(&mut self, alert: Alert) {
        debug!("Event log: alert {}", alert.id);
        self.push(LogEntry::Alert(alert));
    }

    /// Record a new message under a local id
    pub fn append_message(&mut self, message: NewMessage, now: DateTime<Utc>) -> Message {
        let message = message.into_message(local_id("msg"), now);
        self.record_message(message.clone());
        message
    }

    pub fn record_message(&mut self, message: Message) {
        debug!("Event log: message {}", message.id);
        self.push(LogEntry::Message(message));
    }

    pub fn record_alert_status(&mut self, id: &str, status: AlertStatus, now: DateTime<Utc>) {
        self.push(LogEntry::AlertStatus {
            id: id.to_string(),
            status,
            at: now,
        });
    }

    pub fn record_message_read(&mut self, id: &str, now: DateTime<Utc>) {
        self.push(LogEntry::MessageRead {
            id: id.to_string(),
            at: now,
        });
    }

    fn push(&mut self, entry: LogEntry) {
        match &entry {
            LogEntry::AlertStatus { id, status, .. } => {
                let status = *status;
                self.alert_status
                    .entry(id.clone())
                    .and_modify(|current| {
                        // regressions in the log are ignored
                        if let Ok(next) = current.advance_to(status) {
                            *current = next;
                        }
                    })
                    .or_insert(status);
            }
            LogEntry::MessageRead { id, .. } => {
                self.read.insert(id.clone());
            }
            LogEntry::Alert(_) | LogEntry::Message(_) => {}
        }
        self.entries.push(entry);
    }

    /// Apply recorded status changes to alerts from any source
    ///
    /// Statuses only move forward: an alert already further along keeps its
    /// own status.
    pub fn apply_alert_statuses(&self, alerts: &mut [Alert]) {
        for alert in alerts {
            if let Some(status) = self.alert_status.get(&alert.id) {
                if let Ok(next) = alert.status.advance_to(*status) {
                    alert.status = next;
                }
            }
        }
    }

    /// Apply recorded read marks to messages from any source
    pub fn apply_read_marks(&self, messages: &mut [Message]) {
        for message in messages {
            if self.read.contains(&message.id) {
                message.is_read = true;
            }
        }
    }

    /// All alerts with status changes applied, most recent first
    pub fn alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Alert(alert) => Some(alert.clone()),
                _ => None,
            })
            .collect();
        self.apply_alert_statuses(&mut alerts);
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// All messages with read marks applied, most recent first
    pub fn messages(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Message(message) => Some(message.clone()),
                _ => None,
            })
            .collect();
        self.apply_read_marks(&mut messages);
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages
    }

    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let mut alerts = self.alerts();
        alerts.truncate(limit);
        alerts
    }

    pub fn recent_messages(&self, limit: usize) -> Vec<Message> {
        let mut messages = self.messages();
        messages.truncate(limit);
        messages
    }

    /// Time of the most recent entry of any kind
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .map(|entry| match entry {
                LogEntry::Alert(alert) => alert.created_at,
                LogEntry::AlertStatus { at, .. } => *at,
                LogEntry::Message(message) => message.timestamp,
                LogEntry::MessageRead { at, .. } => *at,
            })
            .max()
    }
}
