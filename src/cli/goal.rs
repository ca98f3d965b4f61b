//! `shiftpoints goal` subcommands

use serde_json::json;

use super::{parse_date_or_today, Context, GoalCommands};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub fn run(ctx: Context, cmd: &GoalCommands) -> Result<()> {
    let goals = ctx.engine.goals();
    match cmd {
        GoalCommands::Daily { user, date } => {
            let user = user.clone().unwrap_or_else(|| ctx.actor.id.clone());
            let date = parse_date_or_today(date.as_deref())?;
            let row = goals.daily_for(&user, date)?;

            let mut human = HumanOutput::new(format!("Daily goal for {user} on {date}"));
            human.push_summary("achieved", row.achieved_points.to_string());
            human.push_summary(
                "achievable",
                row.theoretically_achievable_points.to_string(),
            );
            human.push_summary("percentage", format!("{}%", row.percentage));
            human.push_summary("color", row.color_status.as_str());
            emit_success(ctx.output, "goal daily", &row, Some(&human))
        }

        GoalCommands::Monthly { user, date } => {
            let user = user.clone().unwrap_or_else(|| ctx.actor.id.clone());
            let as_of = parse_date_or_today(date.as_deref())?;
            let progress = goals.monthly_for(&user, as_of)?;

            let mut human = HumanOutput::new(format!(
                "Monthly progress for {user} through {as_of}"
            ));
            human.push_summary("achieved", progress.total_achieved.to_string());
            human.push_summary("achievable", progress.total_achievable.to_string());
            human.push_summary("percentage", format!("{}%", progress.percentage));
            human.push_summary("color", progress.color_status.as_str());
            human.push_summary("unlocked", progress.unlocked.to_string());
            emit_success(ctx.output, "goal monthly", &progress, Some(&human))
        }

        GoalCommands::Team { date, monthly } => {
            let date = parse_date_or_today(date.as_deref())?;
            if *monthly {
                let progress = goals.team_monthly_for(date)?;
                let mut human =
                    HumanOutput::new(format!("Team monthly progress through {date}"));
                human.push_summary("achieved", progress.total_achieved.to_string());
                human.push_summary("achievable", progress.total_achievable.to_string());
                human.push_summary("percentage", format!("{}%", progress.percentage));
                human.push_summary("color", progress.color_status.as_str());
                human.push_summary("unlocked", progress.unlocked.to_string());
                return emit_success(ctx.output, "goal team", &progress, Some(&human));
            }

            let row = goals.team_daily_for(date)?;
            let mut human = HumanOutput::new(format!("Team goal for {date}"));
            human.push_summary("earned", row.team_points_earned.to_string());
            human.push_summary("achievable", row.team_achievable_points.to_string());
            human.push_summary("percentage", format!("{}%", row.percentage));
            human.push_summary("color", row.color_status.as_str());
            emit_success(ctx.output, "goal team", &row, Some(&human))
        }

        GoalCommands::Refresh { date } => {
            let date = parse_date_or_today(date.as_deref())?;
            let (rows, team) = goals.refresh(date)?;

            let mut human = HumanOutput::new(format!("Rebuilt goal rows for {date}"));
            human.push_summary("user rows", rows.len().to_string());
            human.push_summary("team color", team.color_status.as_str());
            for row in &rows {
                human.push_detail(format!(
                    "{}: {}/{} ({}%, {})",
                    row.user_id,
                    row.achieved_points,
                    row.theoretically_achievable_points,
                    row.percentage,
                    row.color_status.as_str(),
                ));
            }
            emit_success(
                ctx.output,
                "goal refresh",
                &json!({ "daily": rows, "team": team }),
                Some(&human),
            )
        }
    }
}
