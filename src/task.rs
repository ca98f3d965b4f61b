//! Task records and the task state machine
//!
//! A task moves `pending -> in_progress -> pending_review -> completed`, with
//! a `pending_review -> in_progress` back-edge for reopens and an `archived`
//! tombstone reachable only from `completed` via daily maintenance.
//!
//! The transition methods here mutate a single `Task` in memory and enforce
//! the per-entity preconditions; the lifecycle engine runs them inside a
//! locked read-modify-write over the task registry and owns ledger posting.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::points;

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    PendingReview,
    Completed,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::PendingReview => "pending_review",
            TaskStatus::Completed => "completed",
            TaskStatus::Archived => "archived",
        }
    }
}

/// Recurrence rule for template tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    Weekdays,
    /// Weekly on a fixed weekday, 0 = Monday .. 6 = Sunday
    Weekly {
        weekday: u8,
    },
}

impl Recurrence {
    /// Whether a template with this rule is due on the given date
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_monday() as u8;
        match self {
            Recurrence::Daily => true,
            Recurrence::Weekdays => weekday < 5,
            Recurrence::Weekly { weekday: target } => weekday == *target,
        }
    }
}

/// A sub-checklist entry within a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_completed: false,
            completed_by: None,
            completed_by_id: None,
            completed_at: None,
        }
    }

    fn reset(&mut self) {
        self.is_completed = false;
        self.completed_by = None;
        self.completed_by_id = None;
        self.completed_at = None;
    }
}

/// A unit of assignable work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub category: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<TaskItem>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Current effective point value; halved once if a helper is credited
    pub points_value: i64,
    /// Immutable snapshot of the value at creation
    pub initial_points_value: i64,
    /// Set once when the helper split is applied
    #[serde(default)]
    pub points_split: bool,
    #[serde(default)]
    pub reopened_count: u32,
    #[serde(default)]
    pub deadline_bonus_awarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_photo_urls: Vec<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Set on instances materialized from a template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Fields supplied when creating a task
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub points_value: i64,
    pub is_template: bool,
    pub recurrence: Option<Recurrence>,
    pub created_by: Option<String>,
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>) -> Result<Self> {
        if draft.title.trim().is_empty() {
            return Err(Error::ValidationFailed("task title cannot be empty".to_string()));
        }
        if draft.points_value < 0 {
            return Err(Error::ValidationFailed(
                "points_value cannot be negative".to_string(),
            ));
        }
        if draft.is_template && draft.recurrence.is_none() {
            return Err(Error::ValidationFailed(
                "template tasks require a recurrence rule".to_string(),
            ));
        }
        if let Some(Recurrence::Weekly { weekday }) = draft.recurrence {
            if weekday > 6 {
                return Err(Error::ValidationFailed(
                    "weekly recurrence weekday must be 0..=6".to_string(),
                ));
            }
        }

        let status = if draft.assigned_to.is_some() {
            TaskStatus::InProgress
        } else {
            TaskStatus::Pending
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            category: draft.category,
            title: draft.title,
            description: draft.description,
            items: draft.items.into_iter().map(TaskItem::new).collect(),
            status,
            assigned_to: draft.assigned_to,
            secondary_assigned_to: None,
            due_date: draft.due_date,
            duration_minutes: draft.duration_minutes,
            points_value: draft.points_value,
            initial_points_value: draft.points_value,
            points_split: false,
            reopened_count: 0,
            deadline_bonus_awarded: false,
            completed_at: None,
            completion_notes: None,
            photo_urls: Vec::new(),
            admin_notes: None,
            admin_photo_urls: Vec::new(),
            is_template: draft.is_template,
            recurrence: draft.recurrence,
            template_id: None,
            created_at: now,
            updated_at: now,
            created_by: draft.created_by,
        })
    }

    /// Materialize a concrete instance from this template for a given date.
    ///
    /// The instance carries the template's due time-of-day onto `date` when
    /// the template has one, and links back via `template_id`.
    pub fn materialize(&self, date: NaiveDate, now: DateTime<Utc>) -> Task {
        let due_date = self
            .due_date
            .map(|d| date.and_time(d.time()).and_utc())
            .or_else(|| date.and_hms_opt(23, 59, 0).map(|dt| dt.and_utc()));

        Task {
            id: Uuid::new_v4().to_string(),
            category: self.category.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            items: self
                .items
                .iter()
                .map(|item| TaskItem::new(item.text.clone()))
                .collect(),
            status: TaskStatus::Pending,
            assigned_to: None,
            secondary_assigned_to: None,
            due_date,
            duration_minutes: self.duration_minutes,
            points_value: self.initial_points_value,
            initial_points_value: self.initial_points_value,
            points_split: false,
            reopened_count: 0,
            deadline_bonus_awarded: false,
            completed_at: None,
            completion_notes: None,
            photo_urls: Vec::new(),
            admin_notes: None,
            admin_photo_urls: Vec::new(),
            is_template: false,
            recurrence: None,
            template_id: Some(self.id.clone()),
            created_at: now,
            updated_at: now,
            created_by: self.created_by.clone(),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Staff claims an unassigned task (`pending -> in_progress`)
    pub fn accept(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, not pending",
                self.id,
                self.status.as_str()
            )));
        }
        if self.assigned_to.is_some() {
            return Err(Error::PreconditionFailed(format!(
                "task {} is already assigned",
                self.id
            )));
        }
        self.assigned_to = Some(user_id.to_string());
        self.status = TaskStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    /// Second staff member joins an in-progress task
    pub fn join_helper(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        if !matches!(self.status, TaskStatus::InProgress | TaskStatus::PendingReview) {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, helpers can only join while in progress or in review",
                self.id,
                self.status.as_str()
            )));
        }
        if self.secondary_assigned_to.is_some() {
            return Err(Error::PreconditionFailed(format!(
                "task {} already has a helper",
                self.id
            )));
        }
        if self.assigned_to.as_deref() == Some(user_id) {
            return Err(Error::ValidationFailed(
                "the primary assignee cannot join as helper".to_string(),
            ));
        }
        self.secondary_assigned_to = Some(user_id.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Mark a checklist item as completed
    pub fn complete_item(
        &mut self,
        item_id: &str,
        user_id: &str,
        user_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != TaskStatus::InProgress {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, items can only be ticked while in progress",
                self.id,
                self.status.as_str()
            )));
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| Error::NotFound(format!("item {} on task {}", item_id, self.id)))?;
        item.is_completed = true;
        item.completed_by = user_name.map(|n| n.to_string()).or(Some(user_id.to_string()));
        item.completed_by_id = Some(user_id.to_string());
        item.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Submit for admin review (`in_progress -> pending_review`).
    ///
    /// Crediting a helper here applies the one-time split: the effective value
    /// is halved (floor) for both assignees. Repeat submissions after a reopen
    /// never re-halve.
    pub fn submit_for_review(
        &mut self,
        now: DateTime<Utc>,
        notes: Option<String>,
        photo_urls: Vec<String>,
        credit_helper: Option<&str>,
    ) -> Result<()> {
        if self.status != TaskStatus::InProgress {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, not in_progress",
                self.id,
                self.status.as_str()
            )));
        }
        if !self.items.is_empty() && self.items.iter().any(|item| !item.is_completed) {
            return Err(Error::ValidationFailed(format!(
                "task {} has incomplete items",
                self.id
            )));
        }

        if let Some(helper) = credit_helper {
            if self.assigned_to.as_deref() == Some(helper) {
                return Err(Error::ValidationFailed(
                    "the primary assignee cannot be credited as helper".to_string(),
                ));
            }
            match self.secondary_assigned_to.as_deref() {
                None => self.secondary_assigned_to = Some(helper.to_string()),
                Some(existing) if existing == helper => {}
                Some(_) => {
                    return Err(Error::ValidationFailed(format!(
                        "task {} already has a different helper",
                        self.id
                    )))
                }
            }
            if !self.points_split {
                self.points_value = points::helper_split(self.points_value);
                self.points_split = true;
            }
        }

        self.status = TaskStatus::PendingReview;
        self.completed_at = Some(now);
        if notes.is_some() {
            self.completion_notes = notes;
        }
        self.photo_urls.extend(photo_urls);
        self.updated_at = now;
        Ok(())
    }

    /// Record an approval (`pending_review -> completed`).
    ///
    /// The caller computes the breakdown; this only applies the entity
    /// mutation. `not_ready` must go through [`Task::reopen_whole`].
    pub fn apply_approval(
        &mut self,
        breakdown: &points::ApprovalBreakdown,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_pending_review()?;
        self.status = TaskStatus::Completed;
        if breakdown.deadline_bonus > 0 {
            self.deadline_bonus_awarded = true;
        }
        self.points_value = breakdown.total;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Send the whole task back for rework (`pending_review -> in_progress`)
    pub fn reopen_whole(&mut self, admin_notes: &str, now: DateTime<Utc>) -> Result<()> {
        self.require_pending_review()?;
        self.status = TaskStatus::InProgress;
        self.reopened_count += 1;
        self.completed_at = None;
        self.admin_notes = Some(admin_notes.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Send a subset of items back for rework (`pending_review -> in_progress`).
    ///
    /// An empty selection is rejected; callers must use [`Task::reopen_whole`]
    /// instead of a silent no-op.
    pub fn reopen_items(
        &mut self,
        item_ids: &[String],
        admin_notes: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_pending_review()?;
        if item_ids.is_empty() {
            return Err(Error::ValidationFailed(
                "no items selected for reopen; use a whole-task reopen instead".to_string(),
            ));
        }
        for id in item_ids {
            if !self.items.iter().any(|item| &item.id == id) {
                return Err(Error::NotFound(format!("item {} on task {}", id, self.id)));
            }
        }
        for item in &mut self.items {
            if item_ids.contains(&item.id) {
                item.reset();
            }
        }
        self.status = TaskStatus::InProgress;
        self.reopened_count += 1;
        self.completed_at = None;
        self.admin_notes = Some(admin_notes.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Archive a completed task (maintenance only)
    pub fn archive(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != TaskStatus::Completed {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, only completed tasks can be archived",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = TaskStatus::Archived;
        self.updated_at = now;
        Ok(())
    }

    fn require_pending_review(&self) -> Result<()> {
        if self.status != TaskStatus::PendingReview {
            return Err(Error::PreconditionFailed(format!(
                "task {} is {}, not pending_review",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Snapshot for the points calculator
    pub fn approval_input(&self) -> points::ApprovalInput {
        points::ApprovalInput {
            points_value: self.points_value,
            due_date: self.due_date,
            completed_at: self.completed_at,
            deadline_bonus_awarded: self.deadline_bonus_awarded,
            reopened_count: self.reopened_count,
        }
    }
}

/// The persisted task registry (`tasks.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRegistry {
    pub tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.find_mut(id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }

    pub fn remove(&mut self, id: &str) -> Option<Task> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .map(|idx| self.tasks.remove(idx))
    }

    /// Instances already materialized from a template for a date
    pub fn has_instance_for(&self, template_id: &str, date: NaiveDate) -> bool {
        self.tasks.iter().any(|t| {
            t.template_id.as_deref() == Some(template_id)
                && t.due_date.map(|d| d.date_naive()) == Some(date)
        })
    }
}
