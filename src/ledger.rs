//! Append-only points ledger
//!
//! `ledger.jsonl` is the sole source of truth for point totals: a user's
//! total is the sum of their entries, recomputed by replay, never a field
//! mutated in place. Entries are only ever written by the lifecycle engine,
//! and only ever removed wholesale by the administrative reset.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::storage::Storage;

/// Why points were granted or deducted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsCategory {
    TaskCompleted,
    CheckIn,
    Bonus,
    Deduction,
}

impl PointsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsCategory::TaskCompleted => "task_completed",
            PointsCategory::CheckIn => "check_in",
            PointsCategory::Bonus => "bonus",
            PointsCategory::Deduction => "deduction",
        }
    }
}

/// One signed point delta for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsHistoryEntry {
    /// Sortable ulid
    pub id: String,
    pub user_id: String,
    pub points_change: i64,
    pub reason: String,
    pub category: PointsCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PointsHistoryEntry {
    pub fn new(
        user_id: &str,
        points_change: i64,
        reason: impl Into<String>,
        category: PointsCategory,
        created_by: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            user_id: user_id.to_string(),
            points_change,
            reason: reason.into(),
            category,
            created_by: created_by.map(|s| s.to_string()),
            created_at,
        }
    }
}

/// Read/append access to the ledger file
#[derive(Debug, Clone)]
pub struct LedgerStore {
    storage: Storage,
}

impl LedgerStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Append one entry. Callers pairing this with an entity mutation must
    /// hold that entity registry's lock.
    pub fn append(&self, entry: &PointsHistoryEntry) -> Result<()> {
        self.storage
            .append_jsonl(&self.storage.ledger_file(), entry)
    }

    /// All entries, oldest first
    pub fn all(&self) -> Result<Vec<PointsHistoryEntry>> {
        self.storage.read_jsonl(&self.storage.ledger_file())
    }

    /// All entries for one user, oldest first
    pub fn for_user(&self, user_id: &str) -> Result<Vec<PointsHistoryEntry>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }

    /// Running total for one user (ledger replay)
    pub fn total_for_user(&self, user_id: &str) -> Result<i64> {
        Ok(self
            .all()?
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.points_change)
            .sum())
    }

    /// Sum of a user's entries dated on the given day
    pub fn sum_for_user_on(&self, user_id: &str, date: NaiveDate) -> Result<i64> {
        Ok(self
            .all()?
            .iter()
            .filter(|e| e.user_id == user_id && e.created_at.date_naive() == date)
            .map(|e| e.points_change)
            .sum())
    }

    /// Per-user totals, optionally restricted to one calendar month
    pub fn totals(&self, month: Option<(i32, u32)>) -> Result<BTreeMap<String, i64>> {
        let mut totals = BTreeMap::new();
        for entry in self.all()? {
            if let Some((year, month)) = month {
                let date = entry.created_at.date_naive();
                if date.year() != year || date.month() != month {
                    continue;
                }
            }
            *totals.entry(entry.user_id).or_insert(0) += entry.points_change;
        }
        Ok(totals)
    }

    /// Ranked leaderboard (highest total first, ties by user id)
    pub fn leaderboard(&self, month: Option<(i32, u32)>) -> Result<Vec<(String, i64)>> {
        let mut rows: Vec<(String, i64)> = self.totals(month)?.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(rows)
    }

    /// Wipe the whole ledger. Destructive; the caller layer owns confirmation.
    pub fn reset_all(&self) -> Result<()> {
        self.storage
            .rewrite_jsonl::<PointsHistoryEntry>(&self.storage.ledger_file(), &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store() -> (TempDir, LedgerStore) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join(".shiftpoints"));
        storage.init().unwrap();
        (temp, LedgerStore::new(storage))
    }

    fn entry(user: &str, points: i64, day: u32) -> PointsHistoryEntry {
        PointsHistoryEntry::new(
            user,
            points,
            "test",
            PointsCategory::TaskCompleted,
            Some("chef"),
            Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn totals_replay_the_ledger() {
        let (_temp, ledger) = store();
        ledger.append(&entry("anna", 10, 1)).unwrap();
        ledger.append(&entry("anna", -3, 2)).unwrap();
        ledger.append(&entry("ben", 5, 2)).unwrap();

        assert_eq!(ledger.total_for_user("anna").unwrap(), 7);
        assert_eq!(ledger.total_for_user("ben").unwrap(), 5);
        assert_eq!(ledger.total_for_user("carl").unwrap(), 0);
    }

    #[test]
    fn daily_sum_filters_by_date() {
        let (_temp, ledger) = store();
        ledger.append(&entry("anna", 10, 1)).unwrap();
        ledger.append(&entry("anna", 4, 2)).unwrap();

        let day1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(ledger.sum_for_user_on("anna", day1).unwrap(), 10);
        assert_eq!(ledger.sum_for_user_on("anna", day2).unwrap(), 4);
    }

    #[test]
    fn leaderboard_ranks_by_total() {
        let (_temp, ledger) = store();
        ledger.append(&entry("anna", 10, 1)).unwrap();
        ledger.append(&entry("ben", 12, 1)).unwrap();
        ledger.append(&entry("carl", 12, 1)).unwrap();

        let board = ledger.leaderboard(None).unwrap();
        assert_eq!(board[0], ("ben".to_string(), 12));
        assert_eq!(board[1], ("carl".to_string(), 12));
        assert_eq!(board[2], ("anna".to_string(), 10));
    }

    #[test]
    fn monthly_filter_excludes_other_months() {
        let (_temp, ledger) = store();
        ledger.append(&entry("anna", 10, 1)).unwrap();
        let mut feb = entry("anna", 99, 1);
        feb.created_at = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        ledger.append(&feb).unwrap();

        let totals = ledger.totals(Some((2026, 3))).unwrap();
        assert_eq!(totals.get("anna"), Some(&10));
    }

    #[test]
    fn reset_wipes_everything() {
        let (_temp, ledger) = store();
        ledger.append(&entry("anna", 10, 1)).unwrap();
        ledger.reset_all().unwrap();
        assert!(ledger.all().unwrap().is_empty());
    }
}
