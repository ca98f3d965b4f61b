//! Roster input
//!
//! `schedule.json` is produced by the external roster editor and only read
//! here. It drives check-in lateness (expected shift start) and the goal
//! aggregator's headcount splits.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::checkin::ShiftType;
use crate::error::Result;
use crate::storage::Storage;

/// One roster row: a user working a shift on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub user_id: String,
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    /// Local expected start, interpreted in UTC like all other timestamps
    pub expected_start: NaiveTime,
}

impl ShiftAssignment {
    /// Expected start as a full timestamp on the shift's date
    pub fn expected_start_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.expected_start).and_utc()
    }

    /// Whole minutes of lateness for a check-in time, 0 when early or on time
    pub fn minutes_late(&self, check_in_time: DateTime<Utc>) -> u32 {
        let delta = check_in_time - self.expected_start_at();
        delta.num_minutes().max(0) as u32
    }
}

/// The full roster file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub shifts: Vec<ShiftAssignment>,
}

impl Schedule {
    /// Load the roster, empty when the file does not exist
    pub fn load(storage: &Storage) -> Result<Self> {
        storage.read_json_or_default(&storage.schedule_file())
    }

    pub fn find(&self, user_id: &str, date: NaiveDate, shift_type: ShiftType) -> Option<&ShiftAssignment> {
        self.shifts
            .iter()
            .find(|s| s.user_id == user_id && s.date == date && s.shift_type == shift_type)
    }

    /// Distinct users scheduled on a date
    pub fn users_on(&self, date: NaiveDate) -> BTreeSet<String> {
        self.shifts
            .iter()
            .filter(|s| s.date == date)
            .map(|s| s.user_id.clone())
            .collect()
    }

    /// Whether a user works any shift on a date
    pub fn is_scheduled(&self, user_id: &str, date: NaiveDate) -> bool {
        self.shifts
            .iter()
            .any(|s| s.user_id == user_id && s.date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roster() -> Schedule {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        Schedule {
            shifts: vec![
                ShiftAssignment {
                    user_id: "anna".to_string(),
                    date,
                    shift_type: ShiftType::Early,
                    expected_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                },
                ShiftAssignment {
                    user_id: "ben".to_string(),
                    date,
                    shift_type: ShiftType::Late,
                    expected_start: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                },
            ],
        }
    }

    #[test]
    fn lateness_is_zero_when_early() {
        let roster = roster();
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let shift = roster.find("anna", date, ShiftType::Early).unwrap();

        let early = Utc.with_ymd_and_hms(2026, 3, 10, 5, 50, 0).unwrap();
        assert_eq!(shift.minutes_late(early), 0);

        let late = Utc.with_ymd_and_hms(2026, 3, 10, 6, 7, 0).unwrap();
        assert_eq!(shift.minutes_late(late), 7);
    }

    #[test]
    fn users_on_date() {
        let roster = roster();
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let users = roster.users_on(date);
        assert_eq!(users.len(), 2);
        assert!(roster.is_scheduled("anna", date));
        assert!(!roster.is_scheduled("carl", date));

        let other = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        assert!(roster.users_on(other).is_empty());
    }

    #[test]
    fn missing_row_is_none() {
        let roster = roster();
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(roster.find("anna", date, ShiftType::Late).is_none());
    }
}
