//! `shiftpoints checkin` subcommands

use chrono::Utc;

use super::{CheckinCommands, Context};
use crate::checkin::{CheckIn, CheckInStatus, ShiftType};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

pub fn run(ctx: Context, cmd: &CheckinCommands) -> Result<()> {
    match cmd {
        CheckinCommands::Record { shift, late_reason } => {
            let shift_type = ShiftType::parse(shift).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid shift '{shift}': must be early or late"
                ))
            })?;
            let check_in =
                ctx.engine
                    .record_check_in(&ctx.actor, shift_type, late_reason.clone(), Utc::now())?;

            let mut human = HumanOutput::new(if check_in.is_late {
                format!("Checked in {} minutes late", check_in.minutes_late)
            } else {
                "Checked in on time".to_string()
            });
            push_check_in_summary(&mut human, &check_in);
            human.push_summary(
                "provisional points",
                check_in.points_awarded.to_string(),
            );
            emit_success(ctx.output, "checkin record", &check_in, Some(&human))
        }

        CheckinCommands::Approve { id, points } => {
            let check_in = ctx
                .engine
                .approve_check_in(&ctx.actor, id, *points, Utc::now())?;
            let mut human = HumanOutput::new(format!(
                "Approved check-in (+{} points)",
                check_in.points_awarded
            ));
            push_check_in_summary(&mut human, &check_in);
            emit_success(ctx.output, "checkin approve", &check_in, Some(&human))
        }

        CheckinCommands::Reject { id, reason } => {
            let check_in = ctx
                .engine
                .reject_check_in(&ctx.actor, id, reason.clone(), Utc::now())?;
            let mut human = HumanOutput::new("Rejected check-in");
            push_check_in_summary(&mut human, &check_in);
            human.push_summary("reason", reason.clone());
            emit_success(ctx.output, "checkin reject", &check_in, Some(&human))
        }

        CheckinCommands::List { status, archived } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let check_ins = ctx.engine.list_check_ins(status, *archived)?;

            let mut human = HumanOutput::new(format!("{} check-in(s)", check_ins.len()));
            for check_in in &check_ins {
                human.push_detail(format!(
                    "{} [{}] {} {} shift, {} min late, {} pts",
                    check_in.id,
                    check_in.status.as_str(),
                    check_in.user_id,
                    check_in.shift_type.as_str(),
                    check_in.minutes_late,
                    check_in.points_awarded,
                ));
            }
            emit_success(ctx.output, "checkin list", &check_ins, Some(&human))
        }
    }
}

fn push_check_in_summary(human: &mut HumanOutput, check_in: &CheckIn) {
    human.push_summary("id", check_in.id.clone());
    human.push_summary("user", check_in.user_id.clone());
    human.push_summary("shift", check_in.shift_type.as_str());
    human.push_summary("status", check_in.status.as_str());
}

fn parse_status(s: &str) -> Result<CheckInStatus> {
    match s {
        "pending" => Ok(CheckInStatus::Pending),
        "approved" => Ok(CheckInStatus::Approved),
        "rejected" => Ok(CheckInStatus::Rejected),
        other => Err(Error::InvalidArgument(format!(
            "invalid status '{other}': must be pending, approved, or rejected"
        ))),
    }
}
