//! Lifecycle engine
//!
//! The single entry point request handlers use. Every transition runs as one
//! locked read-modify-write over the affected registry: validate, compute,
//! append any ledger entry, rewrite. A ledger-posting failure aborts the
//! whole transition with the entity untouched; two racing admins serialize on
//! the registry lock, and the loser fails its precondition check.
//!
//! Notifications and domain events are dispatched after the commit and never
//! roll it back; their failures are logged and swallowed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;

use crate::checkin::{CheckIn, CheckInRegistry, CheckInStatus, ShiftType};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind};
use crate::goals::GoalAggregator;
use crate::ledger::{LedgerStore, PointsCategory, PointsHistoryEntry};
use crate::notify::{NotificationKind, Notifier, RecordingNotifier};
use crate::points::{self, ApprovalBreakdown, QualityRating};
use crate::schedule::Schedule;
use crate::storage::Storage;
use crate::task::{Task, TaskDraft, TaskRegistry, TaskStatus};

/// Caller roles, supplied by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Staff,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

/// The acting user for an operation
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    fn require_admin(&self, operation: &str) -> Result<()> {
        if self.role != Role::Admin {
            return Err(Error::Unauthorized(format!(
                "{operation} requires the admin role"
            )));
        }
        Ok(())
    }
}

/// Result of resolving a review decision
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// `very_good` or `ready`: the task completed and points were posted
    Completed {
        #[serde(flatten)]
        breakdown: ApprovalBreakdown,
    },
    /// `not_ready`: resolved as a whole-task reopen, nothing posted
    Reopened { reopened_count: u32 },
}

/// Orchestrates transitions over the stored registries
pub struct LifecycleEngine {
    storage: Storage,
    config: Config,
    ledger: LedgerStore,
    notifier: Box<dyn Notifier>,
    events: Option<EventDestination>,
}

impl LifecycleEngine {
    pub fn new(storage: Storage, config: Config) -> Self {
        let ledger = LedgerStore::new(storage.clone());
        let notifier = Box::new(RecordingNotifier::new(storage.clone()));
        Self {
            storage,
            config,
            ledger,
            notifier,
            events: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_events(mut self, events: Option<EventDestination>) -> Self {
        self.events = events;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn goals(&self) -> GoalAggregator {
        GoalAggregator::new(self.storage.clone(), self.config.clone())
    }

    // =========================================================================
    // Task operations
    // =========================================================================

    /// Create a task or a recurring template (admin only)
    pub fn create_task(&self, actor: &Actor, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
        actor.require_admin("creating tasks")?;
        let mut draft = draft;
        draft.created_by = Some(actor.id.clone());
        let task = Task::new(draft, now)?;

        let stored = task.clone();
        self.storage
            .update_registry::<TaskRegistry, _, _>(&self.storage.tasks_file(), move |registry| {
                registry.tasks.push(stored);
                Ok(())
            })?;

        self.emit(
            EventKind::TaskCreated,
            actor,
            json!({ "task_id": task.id, "title": task.title }),
        );
        Ok(task)
    }

    /// List tasks, optionally filtered by status; templates and archived
    /// tasks are excluded unless asked for.
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        include_templates: bool,
        include_archived: bool,
    ) -> Result<Vec<Task>> {
        let registry: TaskRegistry = self
            .storage
            .read_json_or_default(&self.storage.tasks_file())?;
        Ok(registry
            .tasks
            .into_iter()
            .filter(|t| include_templates || !t.is_template)
            .filter(|t| include_archived || t.status != TaskStatus::Archived)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect())
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        let registry: TaskRegistry = self
            .storage
            .read_json_or_default(&self.storage.tasks_file())?;
        registry
            .find(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }

    /// Staff claims an unassigned task
    pub fn accept_task(&self, actor: &Actor, id: &str, now: DateTime<Utc>) -> Result<Task> {
        let actor_id = actor.id.clone();
        let task = self.mutate_task(id, move |task| task.accept(&actor_id, now))?;
        self.emit(
            EventKind::TaskAccepted,
            actor,
            json!({ "task_id": task.id, "status": task.status.as_str() }),
        );
        Ok(task)
    }

    /// Second staff member joins an in-progress task as helper
    pub fn join_helper(&self, actor: &Actor, id: &str, now: DateTime<Utc>) -> Result<Task> {
        let actor_id = actor.id.clone();
        let task = self.mutate_task(id, move |task| task.join_helper(&actor_id, now))?;
        self.emit(
            EventKind::TaskHelperJoined,
            actor,
            json!({ "task_id": task.id, "helper": actor.id }),
        );
        Ok(task)
    }

    /// Tick one checklist item
    pub fn complete_item(
        &self,
        actor: &Actor,
        task_id: &str,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let actor_id = actor.id.clone();
        let item_id = item_id.to_string();
        self.mutate_task(task_id, move |task| {
            task.complete_item(&item_id, &actor_id, None, now)
        })
    }

    /// Submit for admin review, optionally crediting a helper
    pub fn submit_task(
        &self,
        actor: &Actor,
        id: &str,
        notes: Option<String>,
        photo_urls: Vec<String>,
        credit_helper: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let task = self.mutate_task(id, move |task| {
            task.submit_for_review(now, notes, photo_urls, credit_helper.as_deref())
        })?;
        self.emit(
            EventKind::TaskSubmitted,
            actor,
            json!({ "task_id": task.id, "points_value": task.points_value }),
        );
        Ok(task)
    }

    /// Resolve a review decision (admin only).
    ///
    /// `very_good`/`ready` complete the task and post points for the primary
    /// assignee and, when credited, the helper. `not_ready` is a whole-task
    /// reopen: nothing is posted and the reopen penalty applies lazily at the
    /// next approval.
    pub fn approve_task(
        &self,
        actor: &Actor,
        id: &str,
        rating: QualityRating,
        admin_notes: Option<String>,
        admin_photo_urls: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<(Task, ApprovalOutcome)> {
        actor.require_admin("reviewing tasks")?;

        let rules = self.config.points.clone();
        let ledger = self.ledger.clone();
        let actor_id = actor.id.clone();

        let (task, outcome) = self.storage.update_registry::<TaskRegistry, _, _>(
            &self.storage.tasks_file(),
            move |registry| {
                let task = registry.get_mut(id)?;
                if !admin_photo_urls.is_empty() {
                    task.admin_photo_urls.extend(admin_photo_urls.clone());
                }

                if rating == QualityRating::NotReady {
                    let notes = admin_notes.as_deref().unwrap_or("not ready");
                    task.reopen_whole(notes, now)?;
                    let outcome = ApprovalOutcome::Reopened {
                        reopened_count: task.reopened_count,
                    };
                    return Ok((task.clone(), outcome));
                }

                let breakdown = points::approval_breakdown(&task.approval_input(), rating, &rules);
                task.apply_approval(&breakdown, now)?;
                if let Some(notes) = &admin_notes {
                    task.admin_notes = Some(notes.clone());
                }

                // Ledger append inside the critical section: a failure here
                // aborts the whole transition.
                if breakdown.total > 0 {
                    let reason = format!("Task completed: {}", task.title);
                    let mut recipients = Vec::new();
                    if let Some(primary) = &task.assigned_to {
                        recipients.push(primary.clone());
                    }
                    if let Some(helper) = &task.secondary_assigned_to {
                        recipients.push(helper.clone());
                    }
                    for user in recipients {
                        ledger.append(&PointsHistoryEntry::new(
                            &user,
                            breakdown.total,
                            reason.clone(),
                            PointsCategory::TaskCompleted,
                            Some(&actor_id),
                            now,
                        ))?;
                    }
                }

                Ok((task.clone(), ApprovalOutcome::Completed { breakdown }))
            },
        )?;

        match &outcome {
            ApprovalOutcome::Completed { breakdown } => {
                for user in task
                    .assigned_to
                    .iter()
                    .chain(task.secondary_assigned_to.iter())
                {
                    self.notify_quietly(
                        user,
                        "Task approved",
                        &format!("{} (+{} points)", task.title, breakdown.total),
                        NotificationKind::TaskApproved,
                        now,
                    );
                }
                self.emit(
                    EventKind::TaskApproved,
                    actor,
                    json!({
                        "task_id": task.id,
                        "rating": rating.as_str(),
                        "points": breakdown.total,
                    }),
                );
            }
            ApprovalOutcome::Reopened { reopened_count } => {
                if let Some(user) = &task.assigned_to {
                    self.notify_quietly(
                        user,
                        "Task sent back",
                        &format!("{} needs rework", task.title),
                        NotificationKind::TaskReopened,
                        now,
                    );
                }
                self.emit(
                    EventKind::TaskReopened,
                    actor,
                    json!({ "task_id": task.id, "reopened_count": reopened_count }),
                );
            }
        }

        Ok((task, outcome))
    }

    /// Send a task back for rework, whole or for selected items (admin only)
    pub fn reopen_task(
        &self,
        actor: &Actor,
        id: &str,
        item_ids: Option<Vec<String>>,
        admin_notes: String,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        actor.require_admin("reopening tasks")?;

        let task = self.mutate_task(id, move |task| match &item_ids {
            Some(ids) => task.reopen_items(ids, &admin_notes, now),
            None => task.reopen_whole(&admin_notes, now),
        })?;

        if let Some(user) = &task.assigned_to {
            self.notify_quietly(
                user,
                "Task sent back",
                &format!("{} needs rework", task.title),
                NotificationKind::TaskReopened,
                now,
            );
        }
        self.emit(
            EventKind::TaskReopened,
            actor,
            json!({ "task_id": task.id, "reopened_count": task.reopened_count }),
        );
        Ok(task)
    }

    /// Hard-remove a task (admin only, never after completion).
    ///
    /// No compensating ledger entry is needed: nothing was posted before
    /// completion, and completed tasks cannot be deleted.
    pub fn delete_task(&self, actor: &Actor, id: &str) -> Result<Task> {
        actor.require_admin("deleting tasks")?;

        let task = self.storage.update_registry::<TaskRegistry, _, _>(
            &self.storage.tasks_file(),
            move |registry| {
                let task = registry.get_mut(id)?;
                if matches!(task.status, TaskStatus::Completed | TaskStatus::Archived) {
                    return Err(Error::PreconditionFailed(format!(
                        "task {} is {}, completed tasks cannot be deleted",
                        task.id,
                        task.status.as_str()
                    )));
                }
                registry
                    .remove(id)
                    .ok_or_else(|| Error::NotFound(format!("task {id}")))
            },
        )?;

        self.emit(EventKind::TaskDeleted, actor, json!({ "task_id": task.id }));
        Ok(task)
    }

    fn mutate_task<F>(&self, id: &str, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        self.storage.update_registry::<TaskRegistry, _, _>(
            &self.storage.tasks_file(),
            move |registry| {
                let task = registry.get_mut(id)?;
                f(task)?;
                Ok(task.clone())
            },
        )
    }

    // =========================================================================
    // Check-in operations
    // =========================================================================

    /// Record a check-in for the acting user.
    ///
    /// Lateness is measured against the roster's expected start for the shift;
    /// without a roster row the check-in counts as on time. The provisional
    /// points do not reach the ledger until approval.
    pub fn record_check_in(
        &self,
        actor: &Actor,
        shift_type: ShiftType,
        late_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CheckIn> {
        let schedule = Schedule::load(&self.storage)?;
        let minutes_late = schedule
            .find(&actor.id, now.date_naive(), shift_type)
            .map(|shift| shift.minutes_late(now))
            .unwrap_or(0);
        let provisional = points::checkin_points(minutes_late, &self.config.points);

        let check_in = CheckIn::new(&actor.id, now, shift_type, minutes_late, late_reason, provisional);
        let stored = check_in.clone();
        self.storage.update_registry::<CheckInRegistry, _, _>(
            &self.storage.check_ins_file(),
            move |registry| {
                registry.check_ins.push(stored);
                Ok(())
            },
        )?;

        self.emit(
            EventKind::CheckInRecorded,
            actor,
            json!({
                "check_in_id": check_in.id,
                "minutes_late": check_in.minutes_late,
                "provisional_points": check_in.points_awarded,
            }),
        );
        Ok(check_in)
    }

    /// Approve a pending check-in, posting its points (admin only)
    pub fn approve_check_in(
        &self,
        actor: &Actor,
        id: &str,
        points_override: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<CheckIn> {
        actor.require_admin("reviewing check-ins")?;

        let ledger = self.ledger.clone();
        let actor_id = actor.id.clone();
        let check_in = self.storage.update_registry::<CheckInRegistry, _, _>(
            &self.storage.check_ins_file(),
            move |registry| {
                let check_in = registry.get_mut(id)?;
                let awarded = check_in.approve(&actor_id, points_override, now)?;
                if awarded > 0 {
                    let reason = format!(
                        "Check-in approved ({} shift)",
                        check_in.shift_type.as_str()
                    );
                    ledger.append(&PointsHistoryEntry::new(
                        &check_in.user_id,
                        awarded,
                        reason,
                        PointsCategory::CheckIn,
                        Some(&actor_id),
                        now,
                    ))?;
                }
                Ok(check_in.clone())
            },
        )?;

        self.notify_quietly(
            &check_in.user_id,
            "Check-in approved",
            &format!("+{} points", check_in.points_awarded),
            NotificationKind::CheckInApproved,
            now,
        );
        self.emit(
            EventKind::CheckInApproved,
            actor,
            json!({ "check_in_id": check_in.id, "points": check_in.points_awarded }),
        );
        Ok(check_in)
    }

    /// Reject a pending check-in; nothing reaches the ledger (admin only)
    pub fn reject_check_in(
        &self,
        actor: &Actor,
        id: &str,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<CheckIn> {
        actor.require_admin("reviewing check-ins")?;

        let actor_id = actor.id.clone();
        let reject_reason = reason.clone();
        let check_in = self.storage.update_registry::<CheckInRegistry, _, _>(
            &self.storage.check_ins_file(),
            move |registry| {
                let check_in = registry.get_mut(id)?;
                check_in.reject(&actor_id, &reject_reason, now)?;
                Ok(check_in.clone())
            },
        )?;

        self.notify_quietly(
            &check_in.user_id,
            "Check-in rejected",
            &reason,
            NotificationKind::CheckInRejected,
            now,
        );
        self.emit(
            EventKind::CheckInRejected,
            actor,
            json!({ "check_in_id": check_in.id }),
        );
        Ok(check_in)
    }

    pub fn list_check_ins(
        &self,
        status: Option<CheckInStatus>,
        include_archived: bool,
    ) -> Result<Vec<CheckIn>> {
        let registry: CheckInRegistry = self
            .storage
            .read_json_or_default(&self.storage.check_ins_file())?;
        Ok(registry
            .check_ins
            .into_iter()
            .filter(|c| include_archived || !c.archived)
            .filter(|c| status.map_or(true, |s| c.status == s))
            .collect())
    }

    // =========================================================================
    // Points operations
    // =========================================================================

    /// Append a manual bonus or deduction for a user (admin only)
    pub fn grant_points(
        &self,
        actor: &Actor,
        user_id: &str,
        points: i64,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<PointsHistoryEntry> {
        actor.require_admin("granting points")?;
        if points == 0 {
            return Err(Error::ValidationFailed(
                "points change cannot be zero".to_string(),
            ));
        }

        let category = if points > 0 {
            PointsCategory::Bonus
        } else {
            PointsCategory::Deduction
        };
        let entry =
            PointsHistoryEntry::new(user_id, points, reason.clone(), category, Some(&actor.id), now);
        self.ledger.append(&entry)?;

        self.notify_quietly(
            user_id,
            if points > 0 { "Bonus points" } else { "Points deducted" },
            &format!("{points:+} points: {reason}"),
            NotificationKind::PointsGranted,
            now,
        );
        self.emit(
            EventKind::PointsGranted,
            actor,
            json!({ "user_id": user_id, "points": points }),
        );
        Ok(entry)
    }

    /// Wipe the ledger and all goal rows for a fresh period (admin only).
    ///
    /// Destructive and non-reversible; the caller layer owns confirmation.
    pub fn reset_all_points(&self, actor: &Actor) -> Result<()> {
        actor.require_admin("resetting points")?;
        self.ledger.reset_all()?;
        self.storage.update_registry::<crate::goals::GoalsFile, _, _>(
            &self.storage.goals_file(),
            |goals| {
                goals.daily.clear();
                goals.team_daily.clear();
                goals.monthly_unlocks.clear();
                Ok(())
            },
        )?;
        self.emit(EventKind::PointsReset, actor, json!({}));
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Run the daily maintenance pass for an operational date (admin only)
    pub fn run_daily_maintenance(
        &self,
        actor: &Actor,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<crate::maintenance::MaintenanceReport> {
        actor.require_admin("running maintenance")?;
        let report =
            crate::maintenance::run_daily_maintenance(&self.storage, &self.config, date, now)?;
        self.emit(
            EventKind::MaintenanceCompleted,
            actor,
            json!({
                "date": date,
                "materialized": report.materialized_tasks,
                "archived_tasks": report.archived_tasks,
            }),
        );
        Ok(report)
    }

    // =========================================================================
    // Side channels
    // =========================================================================

    fn notify_quietly(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) {
        if let Err(err) = self.notifier.notify(user_id, title, message, kind, now) {
            tracing::warn!(user_id, %err, "notification delivery failed");
        }
    }

    fn emit(&self, kind: EventKind, actor: &Actor, data: serde_json::Value) {
        let Some(destination) = &self.events else {
            return;
        };
        let result = destination.open().and_then(|mut sink| {
            let event = Event::new(kind, Some(actor.id.clone())).with_data(data)?;
            sink.emit(&event)
        });
        if let Err(err) = result {
            tracing::warn!(%err, "event emission failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NullNotifier;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn engine() -> (TempDir, LifecycleEngine) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join(".shiftpoints"));
        storage.init().unwrap();
        let engine = LifecycleEngine::new(storage, Config::default())
            .with_notifier(Box::new(NullNotifier));
        (temp, engine)
    }

    fn admin() -> Actor {
        Actor::new("chef", Role::Admin)
    }

    fn staff(id: &str) -> Actor {
        Actor::new(id, Role::Staff)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn draft(points: i64) -> TaskDraft {
        TaskDraft {
            category: "housekeeping".to_string(),
            title: "Clean lobby".to_string(),
            points_value: points,
            due_date: Some(Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap()),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn staff_cannot_create_tasks() {
        let (_temp, engine) = engine();
        let err = engine
            .create_task(&staff("anna"), draft(10), now())
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn full_lifecycle_posts_points_once() {
        let (_temp, engine) = engine();
        let task = engine.create_task(&admin(), draft(10), now()).unwrap();

        engine.accept_task(&staff("anna"), &task.id, now()).unwrap();
        engine
            .submit_task(&staff("anna"), &task.id, None, Vec::new(), None, now())
            .unwrap();
        let (task, outcome) = engine
            .approve_task(&admin(), &task.id, QualityRating::VeryGood, None, Vec::new(), now())
            .unwrap();

        match outcome {
            ApprovalOutcome::Completed { breakdown } => {
                // 10 base + 2 deadline + 2 quality
                assert_eq!(breakdown.total, 14);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.deadline_bonus_awarded);

        assert_eq!(engine.ledger().total_for_user("anna").unwrap(), 14);
        assert_eq!(engine.ledger().all().unwrap().len(), 1);

        // A second approve fails and posts nothing
        let err = engine
            .approve_task(&admin(), &task.id, QualityRating::Ready, None, Vec::new(), now())
            .unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
        assert_eq!(engine.ledger().all().unwrap().len(), 1);
    }

    #[test]
    fn not_ready_reopens_and_posts_nothing() {
        let (_temp, engine) = engine();
        let task = engine.create_task(&admin(), draft(10), now()).unwrap();
        engine.accept_task(&staff("anna"), &task.id, now()).unwrap();
        engine
            .submit_task(&staff("anna"), &task.id, None, Vec::new(), None, now())
            .unwrap();

        let (task, outcome) = engine
            .approve_task(
                &admin(),
                &task.id,
                QualityRating::NotReady,
                Some("redo".to_string()),
                Vec::new(),
                now(),
            )
            .unwrap();

        assert!(matches!(outcome, ApprovalOutcome::Reopened { reopened_count: 1 }));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(engine.ledger().all().unwrap().is_empty());

        // Resubmit and approve ready: base 10 + deadline 2 - reopen 1 = 11
        engine
            .submit_task(&staff("anna"), &task.id, None, Vec::new(), None, now())
            .unwrap();
        let (_, outcome) = engine
            .approve_task(&admin(), &task.id, QualityRating::Ready, None, Vec::new(), now())
            .unwrap();
        match outcome {
            ApprovalOutcome::Completed { breakdown } => {
                assert_eq!(breakdown.reopen_penalty, -1);
                assert_eq!(breakdown.total, 11);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn helper_and_primary_both_get_split_points() {
        let (_temp, engine) = engine();
        let task = engine.create_task(&admin(), draft(10), now()).unwrap();
        engine.accept_task(&staff("anna"), &task.id, now()).unwrap();
        engine
            .submit_task(
                &staff("anna"),
                &task.id,
                None,
                Vec::new(),
                Some("ben".to_string()),
                now(),
            )
            .unwrap();

        let (task, _) = engine
            .approve_task(&admin(), &task.id, QualityRating::Ready, None, Vec::new(), now())
            .unwrap();
        assert_eq!(task.secondary_assigned_to.as_deref(), Some("ben"));

        // Split base 5 + deadline 2 = 7 each
        assert_eq!(engine.ledger().total_for_user("anna").unwrap(), 7);
        assert_eq!(engine.ledger().total_for_user("ben").unwrap(), 7);
    }

    #[test]
    fn staff_cannot_approve() {
        let (_temp, engine) = engine();
        let task = engine.create_task(&admin(), draft(10), now()).unwrap();
        let err = engine
            .approve_task(&staff("anna"), &task.id, QualityRating::Ready, None, Vec::new(), now())
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn delete_blocked_after_completion() {
        let (_temp, engine) = engine();
        let task = engine.create_task(&admin(), draft(10), now()).unwrap();
        engine.accept_task(&staff("anna"), &task.id, now()).unwrap();
        engine
            .submit_task(&staff("anna"), &task.id, None, Vec::new(), None, now())
            .unwrap();
        engine
            .approve_task(&admin(), &task.id, QualityRating::Ready, None, Vec::new(), now())
            .unwrap();

        let err = engine.delete_task(&admin(), &task.id).unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
    }

    #[test]
    fn check_in_points_only_posted_on_approval() {
        let (_temp, engine) = engine();
        let check_in = engine
            .record_check_in(&staff("anna"), ShiftType::Early, None, now())
            .unwrap();
        // No roster row: on time, full provisional bonus
        assert_eq!(check_in.minutes_late, 0);
        assert_eq!(check_in.points_awarded, 5);
        assert!(engine.ledger().all().unwrap().is_empty());

        engine
            .approve_check_in(&admin(), &check_in.id, None, now())
            .unwrap();
        assert_eq!(engine.ledger().total_for_user("anna").unwrap(), 5);
    }

    #[test]
    fn rejected_check_in_posts_nothing() {
        let (_temp, engine) = engine();
        let check_in = engine
            .record_check_in(&staff("anna"), ShiftType::Early, None, now())
            .unwrap();
        let rejected = engine
            .reject_check_in(&admin(), &check_in.id, "wrong shift".to_string(), now())
            .unwrap();
        assert_eq!(rejected.points_awarded, 0);
        assert!(engine.ledger().all().unwrap().is_empty());

        // Terminal: a later approve is a precondition failure
        let err = engine
            .approve_check_in(&admin(), &check_in.id, None, now())
            .unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
    }

    #[test]
    fn grant_points_categorizes_by_sign() {
        let (_temp, engine) = engine();
        engine
            .grant_points(&admin(), "anna", 3, "great week".to_string(), now())
            .unwrap();
        engine
            .grant_points(&admin(), "anna", -2, "broken glass".to_string(), now())
            .unwrap();

        let entries = engine.ledger().for_user("anna").unwrap();
        assert_eq!(entries[0].category, PointsCategory::Bonus);
        assert_eq!(entries[1].category, PointsCategory::Deduction);
        assert_eq!(engine.ledger().total_for_user("anna").unwrap(), 1);

        let err = engine
            .grant_points(&admin(), "anna", 0, "nothing".to_string(), now())
            .unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
    }

    #[test]
    fn reset_wipes_ledger_and_goals() {
        let (_temp, engine) = engine();
        engine
            .grant_points(&admin(), "anna", 3, "seed".to_string(), now())
            .unwrap();
        engine.goals().refresh(now().date_naive()).unwrap();

        engine.reset_all_points(&admin()).unwrap();
        assert!(engine.ledger().all().unwrap().is_empty());
        let goals: crate::goals::GoalsFile = engine
            .storage()
            .read_json(&engine.storage().goals_file())
            .unwrap();
        assert!(goals.daily.is_empty());
        assert!(goals.monthly_unlocks.is_empty());
    }
}
