//! shiftpoints - Task & Points Lifecycle Library
//!
//! This library provides the core functionality for the shiftpoints CLI tool:
//! a task and gamified-points engine for hospitality staff.
//!
//! # Core Concepts
//!
//! - **Tasks**: Checklist-backed work items with a review-gated lifecycle
//! - **Check-ins**: Shift attendance records graded against the roster
//! - **Ledger**: Append-only points history, the sole source of truth for totals
//! - **Goals**: Daily and monthly achieved/achievable ratios with a color scale
//! - **Maintenance**: Idempotent daily pass for recurrence and retention
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `shiftpoints.toml`
//! - `error`: Error types and result aliases
//! - `task`: Task records, checklists, and lifecycle transitions
//! - `checkin`: Check-in records and review transitions
//! - `points`: Pure point calculations (approval breakdowns, lateness)
//! - `ledger`: Append-only points history store
//! - `goals`: Goal aggregation and the color scale
//! - `schedule`: Roster input (who works which shift)
//! - `engine`: Orchestration of transitions over the stored registries
//! - `maintenance`: The daily maintenance pass
//! - `notify`: Notification recording
//! - `events`: Domain event emission
//! - `storage`: File storage and directory management
//! - `lock`: File locking and atomic operations for concurrency safety

pub mod checkin;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod goals;
pub mod ledger;
pub mod lock;
pub mod maintenance;
pub mod notify;
pub mod output;
pub mod points;
pub mod schedule;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
