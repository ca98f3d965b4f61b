//! `shiftpoints points` subcommands

use chrono::{NaiveDate, Utc};
use serde_json::json;

use super::{Context, PointsCommands};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

pub fn run(ctx: Context, cmd: &PointsCommands) -> Result<()> {
    match cmd {
        PointsCommands::History { user } => {
            let user = user.clone().unwrap_or_else(|| ctx.actor.id.clone());
            let entries = ctx.engine.ledger().for_user(&user)?;

            let mut human = HumanOutput::new(format!("{} ledger entries for {user}", entries.len()));
            for entry in &entries {
                human.push_detail(format!(
                    "{} {:+} [{}] {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.points_change,
                    entry.category.as_str(),
                    entry.reason,
                ));
            }
            emit_success(ctx.output, "points history", &entries, Some(&human))
        }

        PointsCommands::Total { user } => {
            let user = user.clone().unwrap_or_else(|| ctx.actor.id.clone());
            let total = ctx.engine.ledger().total_for_user(&user)?;

            let mut human = HumanOutput::new(format!("{user}: {total} points"));
            human.push_summary("total", total.to_string());
            emit_success(
                ctx.output,
                "points total",
                &json!({ "user_id": user, "total": total }),
                Some(&human),
            )
        }

        PointsCommands::Leaderboard { month } => {
            let month = month.as_deref().map(parse_month).transpose()?;
            let ranked = ctx.engine.ledger().leaderboard(month)?;

            let mut human = HumanOutput::new(match month {
                Some((year, month)) => format!("Leaderboard for {year}-{month:02}"),
                None => "All-time leaderboard".to_string(),
            });
            for (rank, (user, total)) in ranked.iter().enumerate() {
                human.push_detail(format!("{}. {user}: {total}", rank + 1));
            }
            emit_success(ctx.output, "points leaderboard", &ranked, Some(&human))
        }

        PointsCommands::Grant {
            user,
            points,
            reason,
        } => {
            let entry = ctx
                .engine
                .grant_points(&ctx.actor, user, *points, reason.clone(), Utc::now())?;

            let mut human = HumanOutput::new(format!("Granted {points:+} points to {user}"));
            human.push_summary("category", entry.category.as_str());
            human.push_summary("reason", reason.clone());
            emit_success(ctx.output, "points grant", &entry, Some(&human))
        }

        PointsCommands::Reset { yes } => {
            if !*yes {
                return Err(Error::PreconditionFailed(
                    "resetting wipes the ledger and goal rows; pass --yes to confirm".to_string(),
                ));
            }
            ctx.engine.reset_all_points(&ctx.actor)?;

            let human = HumanOutput::new("Reset all points and goal rows");
            emit_success(ctx.output, "points reset", &json!({ "reset": true }), Some(&human))
        }
    }
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map(|date| {
            use chrono::Datelike;
            (date.year(), date.month())
        })
        .map_err(|_| {
            Error::InvalidArgument(format!("invalid month '{s}': expected YYYY-MM"))
        })
}
