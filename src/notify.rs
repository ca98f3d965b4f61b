//! Notification sink
//!
//! Notifications are fire-and-forget relative to the transaction: the engine
//! calls the sink after the state change has committed, and a delivery
//! failure is logged and never escalates to the caller.
//!
//! The default sink records notifications into `notifications.jsonl` with a
//! timestamp so daily maintenance has something to purge; push delivery is
//! an external collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::Storage;

/// Notification categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskApproved,
    TaskReopened,
    CheckInApproved,
    CheckInRejected,
    PointsGranted,
}

/// A recorded notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget notification sink
pub trait Notifier {
    fn notify(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Result<()>;
}

/// Default sink: appends to `notifications.jsonl`
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    storage: Storage,
}

impl RecordingNotifier {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let record = NotificationRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            created_at: now,
        };
        self.storage
            .append_jsonl(&self.storage.notifications_file(), &record)
    }
}

/// Sink that drops everything; used in tests
#[derive(Debug, Clone, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(
        &self,
        _user_id: &str,
        _title: &str,
        _message: &str,
        _kind: NotificationKind,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Read all recorded notifications, oldest first
pub fn read_all(storage: &Storage) -> Result<Vec<NotificationRecord>> {
    storage.read_jsonl(&storage.notifications_file())
}

/// Drop recorded notifications older than the cutoff; returns how many went
pub fn purge_older_than(storage: &Storage, cutoff: DateTime<Utc>) -> Result<usize> {
    let records = read_all(storage)?;
    let kept: Vec<NotificationRecord> = records
        .iter()
        .filter(|r| r.created_at >= cutoff)
        .cloned()
        .collect();
    let purged = records.len() - kept.len();
    if purged > 0 {
        storage.rewrite_jsonl(&storage.notifications_file(), &kept)?;
    }
    Ok(purged)
}
