//! Points calculator
//!
//! Pure functions that turn an entity snapshot plus an admin decision into a
//! point delta. No I/O here; the lifecycle engine owns persistence.
//!
//! Approval arithmetic:
//!   final = base + deadline_bonus + quality_bonus - reopen_penalty, floored at 0
//! where base is the task's current `points_value`, the deadline bonus is
//! granted at most once per task, and the reopen penalty is recomputed from
//! the current `reopened_count` at each approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PointsConfig;

/// Quality rating assigned by the reviewing admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    /// Exceptional work, grants the quality bonus
    VeryGood,
    /// Acceptable work, no bonus
    Ready,
    /// Not acceptable; resolves as a whole-task reopen, never an approval
    NotReady,
}

impl QualityRating {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "very_good" => Some(QualityRating::VeryGood),
            "ready" => Some(QualityRating::Ready),
            "not_ready" => Some(QualityRating::NotReady),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRating::VeryGood => "very_good",
            QualityRating::Ready => "ready",
            QualityRating::NotReady => "not_ready",
        }
    }
}

/// Itemized result of an approval computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalBreakdown {
    /// The task's effective point value at approval time
    pub base: i64,
    /// Early-completion bonus (0 or the configured bonus)
    pub deadline_bonus: i64,
    /// Quality bonus (0 or the configured bonus)
    pub quality_bonus: i64,
    /// Deduction from prior reopens, always <= 0
    pub reopen_penalty: i64,
    /// Final points, floored at 0
    pub total: i64,
}

/// Snapshot of the task fields the approval computation reads
#[derive(Debug, Clone, Copy)]
pub struct ApprovalInput {
    pub points_value: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline_bonus_awarded: bool,
    pub reopened_count: u32,
}

/// Compute the approval breakdown for a `very_good` or `ready` rating.
///
/// Callers must route `not_ready` through the reopen path instead; this
/// function treats it as rating with no bonus.
pub fn approval_breakdown(
    input: &ApprovalInput,
    rating: QualityRating,
    rules: &PointsConfig,
) -> ApprovalBreakdown {
    let base = input.points_value;

    let deadline_bonus = match (input.due_date, input.completed_at) {
        (Some(due), Some(done)) if !input.deadline_bonus_awarded && done <= due => {
            rules.deadline_bonus
        }
        _ => 0,
    };

    let quality_bonus = match rating {
        QualityRating::VeryGood => rules.very_good_bonus,
        QualityRating::Ready | QualityRating::NotReady => 0,
    };

    let reopen_penalty = -(rules.reopen_penalty_step * i64::from(input.reopened_count));

    let total = (base + deadline_bonus + quality_bonus + reopen_penalty).max(0);

    ApprovalBreakdown {
        base,
        deadline_bonus,
        quality_bonus,
        reopen_penalty,
        total,
    }
}

/// One-time helper split: the effective value both assignees earn.
pub fn helper_split(points_value: i64) -> i64 {
    points_value / 2
}

/// Provisional check-in points from minutes of lateness.
///
/// On time earns the full bonus; each started lateness step costs one point,
/// floored at 0.
pub fn checkin_points(minutes_late: u32, rules: &PointsConfig) -> i64 {
    if minutes_late == 0 {
        return rules.checkin_on_time_bonus;
    }
    let step = rules.late_step_minutes;
    let started_blocks = i64::from((minutes_late + step - 1) / step);
    (rules.checkin_on_time_bonus - started_blocks).max(0)
}
