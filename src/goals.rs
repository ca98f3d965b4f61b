//! Goal aggregation
//!
//! Turns the ledger plus the entity registries into daily and monthly
//! achieved/achievable ratios per user and for the team, classified into a
//! discrete color scale. Daily rows are rebuilt, never patched; monthly views
//! re-sum the elapsed days on demand so retroactive ledger corrections (a
//! days-old task reopened and re-approved) are picked up automatically.
//!
//! The 90% unlock flags are the one piece of persisted derived state: once a
//! user or the team first crosses the threshold within a month, the flag
//! stays set for the rest of that month even if later corrections drop the
//! live percentage back down.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::Config;
use crate::error::Result;
use crate::ledger::{LedgerStore, PointsHistoryEntry};
use crate::schedule::Schedule;
use crate::storage::Storage;
use crate::task::{TaskRegistry, TaskStatus};

/// Discrete progress signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStatus {
    Gray,
    Red,
    Yellow,
    Orange,
    Green,
    DarkGreen,
}

impl ColorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorStatus::Gray => "gray",
            ColorStatus::Red => "red",
            ColorStatus::Yellow => "yellow",
            ColorStatus::Orange => "orange",
            ColorStatus::Green => "green",
            ColorStatus::DarkGreen => "dark_green",
        }
    }
}

/// Percentage and color for an achieved/achievable pair.
///
/// Zero achievable renders neutral gray, never red.
pub fn classify(achieved: i64, achievable: i64) -> (u32, ColorStatus) {
    if achievable <= 0 {
        return (0, ColorStatus::Gray);
    }
    let percentage = if achieved <= 0 {
        0
    } else {
        (achieved * 100 / achievable) as u32
    };
    let color = match percentage {
        0..=49 => ColorStatus::Red,
        50..=69 => ColorStatus::Yellow,
        70..=89 => ColorStatus::Orange,
        90..=99 => ColorStatus::Green,
        _ => ColorStatus::DarkGreen,
    };
    (percentage, color)
}

/// One user's row for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPointGoal {
    pub user_id: String,
    pub goal_date: NaiveDate,
    pub theoretically_achievable_points: i64,
    pub achieved_points: i64,
    pub percentage: u32,
    pub color_status: ColorStatus,
}

/// The team row for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDailyGoal {
    pub goal_date: NaiveDate,
    pub team_achievable_points: i64,
    pub team_points_earned: i64,
    pub percentage: u32,
    pub color_status: ColorStatus,
}

/// Sticky unlock flag for one user (or the team, `user_id: None`) in a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUnlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub year: i32,
    pub month: u32,
    pub unlocked: bool,
}

/// The persisted goal state (`goals.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalsFile {
    #[serde(default)]
    pub daily: Vec<DailyPointGoal>,
    #[serde(default)]
    pub team_daily: Vec<TeamDailyGoal>,
    #[serde(default)]
    pub monthly_unlocks: Vec<MonthlyUnlock>,
}

impl GoalsFile {
    pub fn is_unlocked(&self, user_id: Option<&str>, year: i32, month: u32) -> bool {
        self.monthly_unlocks.iter().any(|u| {
            u.user_id.as_deref() == user_id && u.year == year && u.month == month && u.unlocked
        })
    }

    fn set_unlocked(&mut self, user_id: Option<&str>, year: i32, month: u32) {
        if self.is_unlocked(user_id, year, month) {
            return;
        }
        self.monthly_unlocks.push(MonthlyUnlock {
            user_id: user_id.map(|s| s.to_string()),
            year,
            month,
            unlocked: true,
        });
    }
}

/// Monthly view, summed across the elapsed days of the month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyProgress {
    pub total_achieved: i64,
    pub total_achievable: i64,
    pub percentage: u32,
    pub color_status: ColorStatus,
    /// Sticky: stays true for the rest of the month once crossed
    pub unlocked: bool,
}

/// Effective value a task contributes to achievable totals.
///
/// Completed tasks contribute their creation-time snapshot rather than the
/// post-approval value (which already folds bonuses and penalties in).
fn task_goal_value(status: TaskStatus, points_value: i64, initial_points_value: i64) -> i64 {
    match status {
        TaskStatus::Completed | TaskStatus::Archived => initial_points_value,
        _ => points_value,
    }
}

/// Achievable points for one user on one date.
///
/// Assigned (primary or helper) tasks due that date count in full; unassigned
/// claimable tasks are split evenly across the scheduled headcount; scheduled
/// users also get the on-time check-in bonus as attainable.
pub fn user_achievable(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    config: &Config,
    user_id: &str,
    date: NaiveDate,
) -> i64 {
    let headcount = schedule.users_on(date).len() as i64;
    let scheduled = schedule.is_scheduled(user_id, date);
    let mut total = 0;

    for task in &tasks.tasks {
        if task.is_template || task.due_date.map(|d| d.date_naive()) != Some(date) {
            continue;
        }
        let value = task_goal_value(task.status, task.points_value, task.initial_points_value);
        let assigned = task.assigned_to.as_deref() == Some(user_id)
            || task.secondary_assigned_to.as_deref() == Some(user_id);
        if assigned {
            total += value;
        } else if task.assigned_to.is_none() && scheduled && headcount > 0 {
            total += value / headcount;
        }
    }

    if scheduled {
        total += config.points.checkin_on_time_bonus;
    }

    total
}

/// Achievable points for the whole team on one date (each task counted once)
pub fn team_achievable(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    config: &Config,
    date: NaiveDate,
) -> i64 {
    let headcount = schedule.users_on(date).len() as i64;
    let mut total = headcount * config.points.checkin_on_time_bonus;

    for task in &tasks.tasks {
        if task.is_template || task.due_date.map(|d| d.date_naive()) != Some(date) {
            continue;
        }
        total += task_goal_value(task.status, task.points_value, task.initial_points_value);
    }

    total
}

fn achieved_on(entries: &[PointsHistoryEntry], user_id: Option<&str>, date: NaiveDate) -> i64 {
    entries
        .iter()
        .filter(|e| e.created_at.date_naive() == date)
        .filter(|e| user_id.map_or(true, |u| e.user_id == u))
        .map(|e| e.points_change)
        .sum()
}

/// Users a daily rebuild must produce rows for: everyone scheduled, everyone
/// holding a task due that date, and everyone with ledger entries that date.
fn users_for_date(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    entries: &[PointsHistoryEntry],
    date: NaiveDate,
) -> BTreeSet<String> {
    let mut users = schedule.users_on(date);
    for task in &tasks.tasks {
        if task.is_template || task.due_date.map(|d| d.date_naive()) != Some(date) {
            continue;
        }
        if let Some(user) = &task.assigned_to {
            users.insert(user.clone());
        }
        if let Some(user) = &task.secondary_assigned_to {
            users.insert(user.clone());
        }
    }
    for entry in entries {
        if entry.created_at.date_naive() == date {
            users.insert(entry.user_id.clone());
        }
    }
    users
}

/// Goal aggregator over the stored registries
#[derive(Debug, Clone)]
pub struct GoalAggregator {
    storage: Storage,
    config: Config,
}

impl GoalAggregator {
    pub fn new(storage: Storage, config: Config) -> Self {
        Self { storage, config }
    }

    fn load_inputs(&self) -> Result<(TaskRegistry, Schedule, Vec<PointsHistoryEntry>)> {
        let tasks: TaskRegistry = self
            .storage
            .read_json_or_default(&self.storage.tasks_file())?;
        let schedule = Schedule::load(&self.storage)?;
        let entries = LedgerStore::new(self.storage.clone()).all()?;
        Ok((tasks, schedule, entries))
    }

    /// Compute one user's daily row without persisting it
    pub fn daily_for(&self, user_id: &str, date: NaiveDate) -> Result<DailyPointGoal> {
        let (tasks, schedule, entries) = self.load_inputs()?;
        Ok(build_daily_row(
            &tasks,
            &schedule,
            &entries,
            &self.config,
            user_id,
            date,
        ))
    }

    /// Compute the team's daily row without persisting it
    pub fn team_daily_for(&self, date: NaiveDate) -> Result<TeamDailyGoal> {
        let (tasks, schedule, entries) = self.load_inputs()?;
        Ok(build_team_row(&tasks, &schedule, &entries, &self.config, date))
    }

    /// Rebuild and persist all daily rows for a date, then fold the result
    /// into the monthly sticky flags.
    pub fn refresh(&self, date: NaiveDate) -> Result<(Vec<DailyPointGoal>, TeamDailyGoal)> {
        let (tasks, schedule, entries) = self.load_inputs()?;

        let users = users_for_date(&tasks, &schedule, &entries, date);
        let rows: Vec<DailyPointGoal> = users
            .iter()
            .map(|user| build_daily_row(&tasks, &schedule, &entries, &self.config, user, date))
            .collect();
        let team_row = build_team_row(&tasks, &schedule, &entries, &self.config, date);

        let unlock = self.config.goals.unlock_percent;
        let (year, month) = (date.year(), date.month());

        let mut monthly: Vec<(Option<String>, u32)> = Vec::new();
        for user in &users {
            let progress =
                monthly_progress_live(&tasks, &schedule, &entries, &self.config, Some(user), date);
            monthly.push((Some(user.clone()), progress.percentage));
        }
        let team_progress =
            monthly_progress_live(&tasks, &schedule, &entries, &self.config, None, date);
        monthly.push((None, team_progress.percentage));

        let rows_clone = rows.clone();
        let team_clone = team_row.clone();
        self.storage
            .update_registry::<GoalsFile, _, _>(&self.storage.goals_file(), move |goals| {
                goals.daily.retain(|row| row.goal_date != date);
                goals.daily.extend(rows_clone);
                goals.team_daily.retain(|row| row.goal_date != date);
                goals.team_daily.push(team_clone);
                for (user, percentage) in &monthly {
                    if *percentage >= unlock {
                        goals.set_unlocked(user.as_deref(), year, month);
                    }
                }
                Ok(())
            })?;

        Ok((rows, team_row))
    }

    /// Monthly progress for a user through `as_of`, combining the live re-sum
    /// with the persisted sticky flag.
    pub fn monthly_for(&self, user_id: &str, as_of: NaiveDate) -> Result<MonthlyProgress> {
        let (tasks, schedule, entries) = self.load_inputs()?;
        let mut progress =
            monthly_progress_live(&tasks, &schedule, &entries, &self.config, Some(user_id), as_of);
        let goals: GoalsFile = self
            .storage
            .read_json_or_default(&self.storage.goals_file())?;
        progress.unlocked = progress.unlocked
            || goals.is_unlocked(Some(user_id), as_of.year(), as_of.month());
        Ok(progress)
    }

    /// Team monthly progress through `as_of`
    pub fn team_monthly_for(&self, as_of: NaiveDate) -> Result<MonthlyProgress> {
        let (tasks, schedule, entries) = self.load_inputs()?;
        let mut progress =
            monthly_progress_live(&tasks, &schedule, &entries, &self.config, None, as_of);
        let goals: GoalsFile = self
            .storage
            .read_json_or_default(&self.storage.goals_file())?;
        progress.unlocked = progress.unlocked || goals.is_unlocked(None, as_of.year(), as_of.month());
        Ok(progress)
    }
}

fn build_daily_row(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    entries: &[PointsHistoryEntry],
    config: &Config,
    user_id: &str,
    date: NaiveDate,
) -> DailyPointGoal {
    let achievable = user_achievable(tasks, schedule, config, user_id, date);
    let achieved = achieved_on(entries, Some(user_id), date);
    let (percentage, color_status) = classify(achieved, achievable);
    DailyPointGoal {
        user_id: user_id.to_string(),
        goal_date: date,
        theoretically_achievable_points: achievable,
        achieved_points: achieved,
        percentage,
        color_status,
    }
}

fn build_team_row(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    entries: &[PointsHistoryEntry],
    config: &Config,
    date: NaiveDate,
) -> TeamDailyGoal {
    let achievable = team_achievable(tasks, schedule, config, date);
    let earned = achieved_on(entries, None, date);
    let (percentage, color_status) = classify(earned, achievable);
    TeamDailyGoal {
        goal_date: date,
        team_achievable_points: achievable,
        team_points_earned: earned,
        percentage,
        color_status,
    }
}

/// Sum daily achieved/achievable across the elapsed days of `as_of`'s month.
///
/// `unlocked` here reflects only the live percentage; callers merge in the
/// persisted sticky flag.
fn monthly_progress_live(
    tasks: &TaskRegistry,
    schedule: &Schedule,
    entries: &[PointsHistoryEntry],
    config: &Config,
    user_id: Option<&str>,
    as_of: NaiveDate,
) -> MonthlyProgress {
    let mut total_achieved = 0;
    let mut total_achievable = 0;

    let mut day = NaiveDate::from_ymd_opt(as_of.year(), as_of.month(), 1)
        .unwrap_or(as_of);
    while day <= as_of {
        total_achievable += match user_id {
            Some(user) => user_achievable(tasks, schedule, config, user, day),
            None => team_achievable(tasks, schedule, config, day),
        };
        total_achieved += achieved_on(entries, user_id, day);
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    let (percentage, color_status) = classify(total_achieved, total_achievable);
    MonthlyProgress {
        total_achieved,
        total_achievable,
        percentage,
        color_status,
        unlocked: percentage >= config.goals.unlock_percent,
    }
}
