//! `shiftpoints task` subcommands

use chrono::Utc;
use serde_json::json;

use super::{parse_datetime, Context, TaskCommands};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::points::QualityRating;
use crate::task::{Recurrence, Task, TaskDraft, TaskStatus};

pub fn run(ctx: Context, cmd: &TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::New {
            title,
            category,
            description,
            items,
            assign,
            due,
            duration,
            points,
            template,
            recur,
        } => {
            let due_date = due.as_deref().map(|raw| parse_datetime(raw, "due date")).transpose()?;
            let recurrence = recur.as_deref().map(parse_recurrence).transpose()?;
            let draft = TaskDraft {
                category: category.clone(),
                title: title.clone(),
                description: description.clone(),
                items: items.clone(),
                assigned_to: assign.clone(),
                due_date,
                duration_minutes: *duration,
                points_value: *points,
                is_template: *template,
                recurrence,
                created_by: None,
            };
            let task = ctx.engine.create_task(&ctx.actor, draft, Utc::now())?;

            let mut human = HumanOutput::new(format!("Created task '{}'", task.title));
            push_task_summary(&mut human, &task);
            emit_success(ctx.output, "task new", &task, Some(&human))
        }

        TaskCommands::List {
            status,
            templates,
            archived,
        } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let tasks = ctx.engine.list_tasks(status, *templates, *archived)?;

            let mut human = HumanOutput::new(format!("{} task(s)", tasks.len()));
            for task in &tasks {
                let assignee = task.assigned_to.as_deref().unwrap_or("unassigned");
                human.push_detail(format!(
                    "{} [{}] {} ({} pts, {})",
                    task.id,
                    task.status.as_str(),
                    task.title,
                    task.points_value,
                    assignee,
                ));
            }
            emit_success(ctx.output, "task list", &tasks, Some(&human))
        }

        TaskCommands::Show { id } => {
            let task = ctx.engine.get_task(id)?;
            let mut human = HumanOutput::new(format!("Task '{}'", task.title));
            push_task_summary(&mut human, &task);
            for item in &task.items {
                let mark = if item.is_completed { "x" } else { " " };
                human.push_detail(format!("[{}] {} ({})", mark, item.text, item.id));
            }
            emit_success(ctx.output, "task show", &task, Some(&human))
        }

        TaskCommands::Accept { id } => {
            let task = ctx.engine.accept_task(&ctx.actor, id, Utc::now())?;
            let mut human = HumanOutput::new(format!("Accepted task '{}'", task.title));
            push_task_summary(&mut human, &task);
            emit_success(ctx.output, "task accept", &task, Some(&human))
        }

        TaskCommands::Join { id } => {
            let task = ctx.engine.join_helper(&ctx.actor, id, Utc::now())?;
            let mut human = HumanOutput::new(format!("Joined task '{}' as helper", task.title));
            push_task_summary(&mut human, &task);
            emit_success(ctx.output, "task join", &task, Some(&human))
        }

        TaskCommands::Tick { id, item } => {
            let task = ctx.engine.complete_item(&ctx.actor, id, item, Utc::now())?;
            let done = task.items.iter().filter(|i| i.is_completed).count();
            let mut human = HumanOutput::new("Item marked done");
            human.push_summary("progress", format!("{done}/{} items", task.items.len()));
            emit_success(ctx.output, "task tick", &task, Some(&human))
        }

        TaskCommands::Submit {
            id,
            notes,
            photos,
            helper,
        } => {
            let task = ctx.engine.submit_task(
                &ctx.actor,
                id,
                notes.clone(),
                photos.clone(),
                helper.clone(),
                Utc::now(),
            )?;
            let mut human = HumanOutput::new(format!("Submitted '{}' for review", task.title));
            push_task_summary(&mut human, &task);
            if let Some(helper) = &task.secondary_assigned_to {
                human.push_detail(format!("helper credited: {helper}"));
            }
            emit_success(ctx.output, "task submit", &task, Some(&human))
        }

        TaskCommands::Approve {
            id,
            rating,
            notes,
            photos,
        } => {
            let rating = QualityRating::parse(rating).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid rating '{rating}': must be very_good, ready, or not_ready"
                ))
            })?;
            let (task, outcome) = ctx.engine.approve_task(
                &ctx.actor,
                id,
                rating,
                notes.clone(),
                photos.clone(),
                Utc::now(),
            )?;

            let mut human = match &outcome {
                crate::engine::ApprovalOutcome::Completed { breakdown } => {
                    let mut human =
                        HumanOutput::new(format!("Approved '{}' (+{} points)", task.title, breakdown.total));
                    human.push_summary("base", breakdown.base.to_string());
                    human.push_summary("deadline bonus", breakdown.deadline_bonus.to_string());
                    human.push_summary("quality bonus", breakdown.quality_bonus.to_string());
                    human.push_summary("reopen penalty", breakdown.reopen_penalty.to_string());
                    human.push_summary("total", breakdown.total.to_string());
                    human
                }
                crate::engine::ApprovalOutcome::Reopened { reopened_count } => {
                    let mut human =
                        HumanOutput::new(format!("Sent '{}' back for rework", task.title));
                    human.push_summary("reopened count", reopened_count.to_string());
                    human
                }
            };
            push_task_summary(&mut human, &task);
            emit_success(
                ctx.output,
                "task approve",
                &json!({ "task": task, "result": outcome }),
                Some(&human),
            )
        }

        TaskCommands::Reopen { id, items, notes } => {
            let item_ids = if items.is_empty() {
                None
            } else {
                Some(items.clone())
            };
            let task = ctx
                .engine
                .reopen_task(&ctx.actor, id, item_ids, notes.clone(), Utc::now())?;
            let mut human = HumanOutput::new(format!("Reopened task '{}'", task.title));
            human.push_summary("reopened count", task.reopened_count.to_string());
            push_task_summary(&mut human, &task);
            emit_success(ctx.output, "task reopen", &task, Some(&human))
        }

        TaskCommands::Delete { id } => {
            let task = ctx.engine.delete_task(&ctx.actor, id)?;
            let human = HumanOutput::new(format!("Deleted task '{}'", task.title));
            emit_success(ctx.output, "task delete", &task, Some(&human))
        }
    }
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.as_str());
    human.push_summary("points", task.points_value.to_string());
    if let Some(assignee) = &task.assigned_to {
        human.push_summary("assigned to", assignee.clone());
    }
    if let Some(due) = &task.due_date {
        human.push_summary("due", due.to_rfc3339());
    }
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" => Ok(TaskStatus::InProgress),
        "pending_review" => Ok(TaskStatus::PendingReview),
        "completed" => Ok(TaskStatus::Completed),
        "archived" => Ok(TaskStatus::Archived),
        other => Err(Error::InvalidArgument(format!(
            "invalid status '{other}': must be pending, in_progress, pending_review, completed, or archived"
        ))),
    }
}

fn parse_recurrence(s: &str) -> Result<Recurrence> {
    match s {
        "daily" => Ok(Recurrence::Daily),
        "weekdays" => Ok(Recurrence::Weekdays),
        other => {
            let weekday = other
                .strip_prefix("weekly:")
                .and_then(|day| day.parse::<u8>().ok())
                .filter(|day| *day <= 6);
            match weekday {
                Some(weekday) => Ok(Recurrence::Weekly { weekday }),
                None => Err(Error::InvalidArgument(format!(
                    "invalid recurrence '{other}': must be daily, weekdays, or weekly:<0-6>"
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_arg_parsing() {
        assert_eq!(parse_recurrence("daily").unwrap(), Recurrence::Daily);
        assert_eq!(parse_recurrence("weekdays").unwrap(), Recurrence::Weekdays);
        assert_eq!(
            parse_recurrence("weekly:4").unwrap(),
            Recurrence::Weekly { weekday: 4 }
        );
        assert!(parse_recurrence("weekly:7").is_err());
        assert!(parse_recurrence("monthly").is_err());
    }

    #[test]
    fn status_arg_parsing() {
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert!(parse_status("done").is_err());
    }
}
