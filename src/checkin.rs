//! Check-in records and their reduced state machine
//!
//! `pending -> {approved | rejected}`, terminal either way. Lateness and the
//! provisional points are computed at recording time against the roster's
//! expected start; the points only reach the ledger on approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Shift slots staff check in for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    Early,
    Late,
}

impl ShiftType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "early" => Some(ShiftType::Early),
            "late" => Some(ShiftType::Late),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Early => "early",
            ShiftType::Late => "late",
        }
    }
}

/// Check-in review states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Pending,
    Approved,
    Rejected,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "pending",
            CheckInStatus::Approved => "approved",
            CheckInStatus::Rejected => "rejected",
        }
    }
}

/// A shift-attendance record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub check_in_time: DateTime<Utc>,
    pub shift_type: ShiftType,
    #[serde(default)]
    pub is_late: bool,
    #[serde(default)]
    pub minutes_late: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_reason: Option<String>,
    pub status: CheckInStatus,
    /// Provisional until approved; zeroed on rejection
    pub points_awarded: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn new(
        user_id: &str,
        check_in_time: DateTime<Utc>,
        shift_type: ShiftType,
        minutes_late: u32,
        late_reason: Option<String>,
        provisional_points: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            check_in_time,
            shift_type,
            is_late: minutes_late > 0,
            minutes_late,
            late_reason,
            status: CheckInStatus::Pending,
            points_awarded: provisional_points,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            archived: false,
            created_at: check_in_time,
        }
    }

    /// Approve the check-in, optionally overriding the provisional points
    pub fn approve(
        &mut self,
        reviewer: &str,
        points_override: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.require_pending()?;
        if let Some(points) = points_override {
            if points < 0 {
                return Err(Error::ValidationFailed(
                    "points override cannot be negative".to_string(),
                ));
            }
            self.points_awarded = points;
        }
        self.status = CheckInStatus::Approved;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(now);
        Ok(self.points_awarded)
    }

    /// Reject the check-in; no points reach the ledger
    pub fn reject(&mut self, reviewer: &str, reason: &str, now: DateTime<Utc>) -> Result<()> {
        self.require_pending()?;
        self.status = CheckInStatus::Rejected;
        self.points_awarded = 0;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(now);
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    fn require_pending(&self) -> Result<()> {
        if self.status != CheckInStatus::Pending {
            return Err(Error::PreconditionFailed(format!(
                "check-in {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

/// The persisted check-in registry (`check_ins.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckInRegistry {
    pub check_ins: Vec<CheckIn>,
}

impl CheckInRegistry {
    pub fn find(&self, id: &str) -> Option<&CheckIn> {
        self.check_ins.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut CheckIn> {
        self.check_ins
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("check-in {id}")))
    }
}
