//! Daily maintenance
//!
//! Invoked once per operational day by an external scheduler, and safe to
//! re-run: template materialization is keyed by `(template_id, due date)`,
//! archiving and purging only move records that are still in range, and the
//! goal refresh is a rebuild.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::checkin::{CheckInRegistry, CheckInStatus};
use crate::config::Config;
use crate::error::Result;
use crate::goals::GoalAggregator;
use crate::notify;
use crate::storage::Storage;
use crate::task::{Task, TaskRegistry, TaskStatus};

/// What one maintenance pass did
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub date: NaiveDate,
    pub materialized_tasks: usize,
    pub archived_tasks: usize,
    pub archived_check_ins: usize,
    pub purged_notifications: usize,
    pub goal_rows: usize,
}

/// Per-date run markers (`maintenance.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub runs: Vec<MaintenanceRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRun {
    pub date: NaiveDate,
    pub last_run_at: DateTime<Utc>,
    pub run_count: u32,
}

/// Run the daily maintenance pass for an operational date.
pub fn run_daily_maintenance(
    storage: &Storage,
    config: &Config,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport> {
    let archive_cutoff = date
        .checked_sub_days(Days::new(u64::from(config.maintenance.archive_after_days)))
        .unwrap_or(date);
    let notification_cutoff = date
        .checked_sub_days(Days::new(u64::from(
            config.maintenance.notification_retention_days,
        )))
        .unwrap_or(date)
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);

    // Materialize due templates and archive stale completed tasks in one
    // locked pass over the task registry.
    let (materialized_tasks, archived_tasks) = storage.update_registry::<TaskRegistry, _, _>(
        &storage.tasks_file(),
        move |registry| {
            let instances: Vec<Task> = registry
                .tasks
                .iter()
                .filter(|task| task.is_template)
                .filter(|task| {
                    task.recurrence
                        .map(|rule| rule.is_due_on(date))
                        .unwrap_or(false)
                })
                .filter(|task| !registry.has_instance_for(&task.id, date))
                .map(|template| template.materialize(date, now))
                .collect();
            let materialized = instances.len();
            registry.tasks.extend(instances);

            let mut archived = 0;
            for task in &mut registry.tasks {
                if task.status != TaskStatus::Completed {
                    continue;
                }
                let completed_on = match task.completed_at {
                    Some(at) => at.date_naive(),
                    None => continue,
                };
                if completed_on <= archive_cutoff {
                    task.archive(now)?;
                    archived += 1;
                }
            }

            Ok((materialized, archived))
        },
    )?;

    let archived_check_ins = storage.update_registry::<CheckInRegistry, _, _>(
        &storage.check_ins_file(),
        move |registry| {
            let mut archived = 0;
            for check_in in &mut registry.check_ins {
                if check_in.archived || check_in.status == CheckInStatus::Pending {
                    continue;
                }
                if check_in.created_at.date_naive() <= archive_cutoff {
                    check_in.archived = true;
                    archived += 1;
                }
            }
            Ok(archived)
        },
    )?;

    let purged_notifications = notify::purge_older_than(storage, notification_cutoff)?;

    // Initialize (rebuild) today's goal rows last so freshly materialized
    // instances count toward achievable totals.
    let aggregator = GoalAggregator::new(storage.clone(), config.clone());
    let (rows, _team) = aggregator.refresh(date)?;

    storage.update_registry::<MaintenanceLog, _, _>(&storage.maintenance_file(), move |log| {
        match log.runs.iter_mut().find(|run| run.date == date) {
            Some(run) => {
                run.last_run_at = now;
                run.run_count += 1;
            }
            None => log.runs.push(MaintenanceRun {
                date,
                last_run_at: now,
                run_count: 1,
            }),
        }
        Ok(())
    })?;

    let report = MaintenanceReport {
        date,
        materialized_tasks,
        archived_tasks,
        archived_check_ins,
        purged_notifications,
        goal_rows: rows.len(),
    };
    tracing::info!(
        date = %report.date,
        materialized = report.materialized_tasks,
        archived_tasks = report.archived_tasks,
        archived_check_ins = report.archived_check_ins,
        purged = report.purged_notifications,
        "daily maintenance completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Recurrence, TaskDraft};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, Config) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join(".shiftpoints"));
        storage.init().unwrap();
        (temp, storage, Config::default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn seed_template(storage: &Storage, rule: Recurrence) -> String {
        let draft = TaskDraft {
            category: "housekeeping".to_string(),
            title: "Morning sweep".to_string(),
            points_value: 6,
            is_template: true,
            recurrence: Some(rule),
            ..TaskDraft::default()
        };
        let template = Task::new(draft, now()).unwrap();
        let id = template.id.clone();
        let mut registry = TaskRegistry::default();
        registry.tasks.push(template);
        storage.write_json(&storage.tasks_file(), &registry).unwrap();
        id
    }

    #[test]
    fn materialization_is_idempotent() {
        let (_temp, storage, config) = setup();
        let template_id = seed_template(&storage, Recurrence::Daily);

        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.materialized_tasks, 1);

        // Re-running the same day must not duplicate the instance
        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.materialized_tasks, 0);

        let registry: TaskRegistry = storage.read_json(&storage.tasks_file()).unwrap();
        let instances: Vec<_> = registry
            .tasks
            .iter()
            .filter(|t| t.template_id.as_deref() == Some(template_id.as_str()))
            .collect();
        assert_eq!(instances.len(), 1);

        let log: MaintenanceLog = storage.read_json(&storage.maintenance_file()).unwrap();
        assert_eq!(log.runs.len(), 1);
        assert_eq!(log.runs[0].run_count, 2);
    }

    #[test]
    fn weekly_template_skips_other_days() {
        let (_temp, storage, config) = setup();
        // 2026-03-10 is a Tuesday; weekday 0 is Monday
        seed_template(&storage, Recurrence::Weekly { weekday: 0 });

        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.materialized_tasks, 0);
    }

    #[test]
    fn old_completed_tasks_get_archived() {
        let (_temp, storage, config) = setup();

        let draft = TaskDraft {
            category: "housekeeping".to_string(),
            title: "Old task".to_string(),
            points_value: 5,
            assigned_to: Some("anna".to_string()),
            ..TaskDraft::default()
        };
        let old_now = Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap();
        let mut task = Task::new(draft, old_now).unwrap();
        task.submit_for_review(old_now, None, Vec::new(), None).unwrap();
        let breakdown = crate::points::approval_breakdown(
            &task.approval_input(),
            crate::points::QualityRating::Ready,
            &config.points,
        );
        task.apply_approval(&breakdown, old_now).unwrap();

        let mut registry = TaskRegistry::default();
        registry.tasks.push(task);
        storage.write_json(&storage.tasks_file(), &registry).unwrap();

        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.archived_tasks, 1);

        let registry: TaskRegistry = storage.read_json(&storage.tasks_file()).unwrap();
        assert_eq!(registry.tasks[0].status, TaskStatus::Archived);

        // Archived stays archived on re-run
        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.archived_tasks, 0);
    }

    #[test]
    fn recently_completed_tasks_are_kept() {
        let (_temp, storage, config) = setup();

        let draft = TaskDraft {
            category: "housekeeping".to_string(),
            title: "Fresh task".to_string(),
            points_value: 5,
            assigned_to: Some("anna".to_string()),
            ..TaskDraft::default()
        };
        let recent = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let mut task = Task::new(draft, recent).unwrap();
        task.submit_for_review(recent, None, Vec::new(), None).unwrap();
        let breakdown = crate::points::approval_breakdown(
            &task.approval_input(),
            crate::points::QualityRating::Ready,
            &config.points,
        );
        task.apply_approval(&breakdown, recent).unwrap();

        let mut registry = TaskRegistry::default();
        registry.tasks.push(task);
        storage.write_json(&storage.tasks_file(), &registry).unwrap();

        let report = run_daily_maintenance(&storage, &config, date(), now()).unwrap();
        assert_eq!(report.archived_tasks, 0);
    }
}
