//! `shiftpoints maintenance` subcommands

use chrono::Utc;

use super::{parse_date_or_today, Context, MaintenanceCommands};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub fn run(ctx: Context, cmd: &MaintenanceCommands) -> Result<()> {
    match cmd {
        MaintenanceCommands::Run { date } => {
            let date = parse_date_or_today(date.as_deref())?;
            let report = ctx
                .engine
                .run_daily_maintenance(&ctx.actor, date, Utc::now())?;

            let mut human = HumanOutput::new(format!("Maintenance complete for {date}"));
            human.push_summary("materialized tasks", report.materialized_tasks.to_string());
            human.push_summary("archived tasks", report.archived_tasks.to_string());
            human.push_summary(
                "archived check-ins",
                report.archived_check_ins.to_string(),
            );
            human.push_summary(
                "purged notifications",
                report.purged_notifications.to_string(),
            );
            human.push_summary("goal rows", report.goal_rows.to_string());
            emit_success(ctx.output, "maintenance run", &report, Some(&human))
        }
    }
}
