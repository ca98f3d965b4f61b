//! Command-line interface for shiftpoints
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::engine::{Actor, LifecycleEngine, Role};
use crate::error::{Error, Result};
use crate::events::EventDestination;
use crate::output::OutputOptions;
use crate::storage::Storage;

mod checkin;
mod goal;
mod init;
mod maintenance;
mod points;
mod task;

/// shiftpoints - task and points lifecycle engine
///
/// Tracks tasks and shift check-ins for hospitality staff, converts
/// completion quality and timeliness into a points ledger, and rolls the
/// ledger up into daily and monthly goals.
#[derive(Parser, Debug)]
#[command(name = "shiftpoints")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data directory (defaults to ./.shiftpoints)
    #[arg(long, global = true, env = "SHIFTPOINTS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true, env = "SHIFTPOINTS_ACTOR")]
    pub actor: Option<String>,

    /// Acting role: staff or admin
    #[arg(long, global = true, env = "SHIFTPOINTS_ROLE", default_value = "staff")]
    pub role: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit domain events as JSONL to a file, or "-" for stdout
    #[arg(long, global = true, env = "SHIFTPOINTS_EVENTS")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// Task lifecycle commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Shift check-in commands
    #[command(subcommand)]
    Checkin(CheckinCommands),

    /// Goal views and refresh
    #[command(subcommand)]
    Goal(GoalCommands),

    /// Points ledger commands
    #[command(subcommand)]
    Points(PointsCommands),

    /// Daily maintenance
    #[command(subcommand)]
    Maintenance(MaintenanceCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task or a recurring template (admin)
    New {
        /// Task title
        title: String,

        /// Category tag
        #[arg(long, default_value = "general")]
        category: String,

        /// Longer description
        #[arg(long)]
        description: Option<String>,

        /// Checklist item text (repeatable, in order)
        #[arg(long = "item")]
        items: Vec<String>,

        /// Assign directly to a user
        #[arg(long)]
        assign: Option<String>,

        /// Due date and time (RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Estimated duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Point value
        #[arg(long, default_value = "5")]
        points: i64,

        /// Create as a recurring template
        #[arg(long)]
        template: bool,

        /// Recurrence rule: daily, weekdays, or weekly:<0-6> (0 = Monday)
        #[arg(long)]
        recur: Option<String>,
    },

    /// List tasks
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Include recurring templates
        #[arg(long)]
        templates: bool,

        /// Include archived tasks
        #[arg(long)]
        archived: bool,
    },

    /// Show one task
    Show {
        /// Task id
        id: String,
    },

    /// Claim an unassigned task
    Accept {
        /// Task id
        id: String,
    },

    /// Join an in-progress task as helper
    Join {
        /// Task id
        id: String,
    },

    /// Mark a checklist item as done
    Tick {
        /// Task id
        id: String,

        /// Item id
        item: String,
    },

    /// Submit a task for admin review
    Submit {
        /// Task id
        id: String,

        /// Completion notes
        #[arg(long)]
        notes: Option<String>,

        /// Photo URL (repeatable)
        #[arg(long = "photo")]
        photos: Vec<String>,

        /// Credit a helper (one-time point split)
        #[arg(long)]
        helper: Option<String>,
    },

    /// Resolve a review decision (admin)
    Approve {
        /// Task id
        id: String,

        /// Quality rating: very_good, ready, or not_ready
        #[arg(long, default_value = "ready")]
        rating: String,

        /// Admin notes (required when the rating is not_ready)
        #[arg(long)]
        notes: Option<String>,

        /// Admin photo URL (repeatable)
        #[arg(long = "photo")]
        photos: Vec<String>,
    },

    /// Send a task back for rework (admin)
    Reopen {
        /// Task id
        id: String,

        /// Item id to reset (repeatable; omit for a whole-task reopen)
        #[arg(long = "item")]
        items: Vec<String>,

        /// Admin notes explaining the rework
        #[arg(long, required = true)]
        notes: String,
    },

    /// Hard-remove a non-completed task (admin)
    Delete {
        /// Task id
        id: String,
    },
}

/// Check-in subcommands
#[derive(Subcommand, Debug)]
pub enum CheckinCommands {
    /// Record a check-in for the acting user
    Record {
        /// Shift slot: early or late
        #[arg(long, default_value = "early")]
        shift: String,

        /// Reason when checking in late
        #[arg(long)]
        late_reason: Option<String>,
    },

    /// Approve a pending check-in (admin)
    Approve {
        /// Check-in id
        id: String,

        /// Override the provisional points
        #[arg(long)]
        points: Option<i64>,
    },

    /// Reject a pending check-in (admin)
    Reject {
        /// Check-in id
        id: String,

        /// Reason shown to the user
        #[arg(long, required = true)]
        reason: String,
    },

    /// List check-ins
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Include archived check-ins
        #[arg(long)]
        archived: bool,
    },
}

/// Goal subcommands
#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Daily goal for a user
    Daily {
        /// User id (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,

        /// Goal date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Monthly progress for a user
    Monthly {
        /// User id (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,

        /// As-of date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Team goal for a date
    Team {
        /// Goal date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Show the monthly roll-up instead of the daily row
        #[arg(long)]
        monthly: bool,
    },

    /// Rebuild and persist a date's goal rows
    Refresh {
        /// Goal date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

/// Points subcommands
#[derive(Subcommand, Debug)]
pub enum PointsCommands {
    /// Ledger history for a user
    History {
        /// User id (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Running total for a user
    Total {
        /// User id (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Ranked totals, monthly or all-time
    Leaderboard {
        /// Restrict to a month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },

    /// Grant a manual bonus or deduction (admin)
    Grant {
        /// User id
        user: String,

        /// Signed point change
        #[arg(allow_negative_numbers = true)]
        points: i64,

        /// Reason recorded in the ledger
        #[arg(long, required = true)]
        reason: String,
    },

    /// Wipe the ledger and goal rows (admin, destructive)
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

/// Maintenance subcommands
#[derive(Subcommand, Debug)]
pub enum MaintenanceCommands {
    /// Run the daily maintenance pass (admin)
    Run {
        /// Operational date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

/// Resolved global options shared by all command handlers
pub struct Context {
    pub engine: LifecycleEngine,
    pub actor: Actor,
    pub output: OutputOptions,
}

impl Cli {
    fn storage(&self) -> Storage {
        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DATA_DIR));
        Storage::new(data_dir)
    }

    fn context(&self) -> Result<Context> {
        let storage = self.storage();
        if !storage.is_initialized() {
            return Err(Error::NotFound(format!(
                "data directory {} (run `shiftpoints init` first)",
                storage.data_dir().display()
            )));
        }
        let config = Config::load_or_default(&storage.config_file())?;

        let actor_id = self
            .actor
            .clone()
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "an actor is required (--actor or SHIFTPOINTS_ACTOR)".to_string(),
                )
            })?;
        let role = Role::parse(&self.role).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid role '{}': must be staff or admin",
                self.role
            ))
        })?;

        let events = EventDestination::parse(self.events.as_deref());
        let engine = LifecycleEngine::new(storage, config).with_events(events);

        Ok(Context {
            engine,
            actor: Actor::new(actor_id, role),
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        })
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                let output = OutputOptions {
                    json: self.json,
                    quiet: self.quiet,
                };
                init::run(self.storage(), output)
            }
            Commands::Task(cmd) => task::run(self.context()?, cmd),
            Commands::Checkin(cmd) => checkin::run(self.context()?, cmd),
            Commands::Goal(cmd) => goal::run(self.context()?, cmd),
            Commands::Points(cmd) => points::run(self.context()?, cmd),
            Commands::Maintenance(cmd) => maintenance::run(self.context()?, cmd),
        }
    }
}

/// Parse an RFC 3339 timestamp argument
pub(crate) fn parse_datetime(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            Error::InvalidArgument(format!("invalid {field} '{raw}': {err} (expected RFC 3339)"))
        })
}

/// Parse an optional YYYY-MM-DD date argument, defaulting to today (UTC)
pub(crate) fn parse_date_or_today(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(Utc::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
            Error::InvalidArgument(format!("invalid date '{raw}': {err} (expected YYYY-MM-DD)"))
        }),
    }
}
