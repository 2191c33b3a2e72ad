//! Task CLI commands.
//!
//! Adding, updating or rescheduling a task runs candidate selection right
//! away. Tasks that lose their dates to an earlier-registered task are
//! rescheduled in the same invocation and reported alongside.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::commands::location::resolve_location;
use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, action_warning, colorize_priority, colorize_reason, colorize_state, format_precipitation,
    format_temperature, list_table, output, render_list, short_id, truncate, CommandOutput,
};
use crate::cli::id_resolver::resolve_task_id;
use crate::cli::types::parse_date;
use crate::domain::errors::DomainError;
use crate::domain::models::{CandidateAssignment, Config, Task, TaskFilter, TaskPriority};
use crate::services::{NewTask, TaskUpdate};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task; with a location and deadline it gets a candidate date
    Add {
        /// What needs doing
        title: String,
        /// Location name or ID prefix
        #[arg(short, long)]
        location: Option<String>,
        /// Last acceptable date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date)]
        deadline: Option<NaiveDate>,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: TaskPriority,
    },
    /// List tasks
    List {
        /// Only tasks at this location (name or ID prefix)
        #[arg(short, long)]
        location: Option<String>,
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
        /// Maximum number of tasks to display
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Show a task and its candidate dates
    Show {
        /// Task ID prefix
        id: String,
    },
    /// Change a task; a new location or deadline reschedules it
    Update {
        /// Task ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New location name or ID prefix
        #[arg(short, long, conflicts_with = "clear_location")]
        location: Option<String>,
        /// Unbind the task from its location
        #[arg(long)]
        clear_location: bool,
        /// New deadline (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,
        /// Remove the deadline
        #[arg(long)]
        clear_deadline: bool,
        /// Priority (low, medium, high)
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
    },
    /// Delete a task and release its dates
    Delete {
        /// Task ID prefix
        id: String,
    },
    /// Mark a task done and release its unconfirmed dates
    Complete {
        /// Task ID prefix
        id: String,
    },
    /// Lock a candidate date so no other task can take it
    Confirm {
        /// Task ID prefix
        id: String,
        /// Candidate to confirm when the task has several
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Select candidate dates again with fresh forecasts
    Reschedule {
        /// Task ID prefix
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,
        /// Reschedule every open, unconfirmed task, oldest first
        #[arg(long)]
        all: bool,
    },
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    TaskPriority::from_str(s).ok_or_else(|| format!("invalid priority '{s}': expected low, medium or high"))
}

/// A task with the context needed to render it.
#[derive(Debug, serde::Serialize)]
pub struct TaskDetailOutput {
    pub task: Task,
    pub location: Option<String>,
    pub candidates: Vec<CandidateAssignment>,
    /// Why the task has no candidate date, when scheduling was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rescheduled: Vec<RescheduledOutput>,
}

/// Result of rescheduling a task displaced by an eviction.
#[derive(Debug, serde::Serialize)]
pub struct RescheduledOutput {
    pub task_id: Uuid,
    pub dates: Vec<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn format_candidate(candidate: &CandidateAssignment) -> String {
    let mut line = format!(
        "{}  rain {}  max {}  {}",
        console::style(candidate.date).bold(),
        format_precipitation(candidate.precipitation_probability),
        format_temperature(candidate.temperature),
        colorize_reason(candidate.reason),
    );
    if candidate.confirmed {
        line.push_str(&format!("  {}", console::style("confirmed").green().bold()));
    }
    if candidate.reserve {
        line.push_str(&format!("  {}", console::style("after deadline").yellow()));
    }
    line
}

impl CommandOutput for TaskDetailOutput {
    fn to_human(&self) -> String {
        let task = &self.task;
        let mut lines = vec![
            format!("Task: {}", console::style(&task.title).bold()),
            format!("  ID:        {}", task.id),
            format!("  State:     {}", colorize_state(task.completed)),
            format!("  Priority:  {}", colorize_priority(task.priority)),
            format!("  Location:  {}", self.location.as_deref().unwrap_or("-")),
            format!(
                "  Deadline:  {}",
                task.deadline.map_or_else(|| "-".to_string(), |d| d.to_string())
            ),
            format!("  Created:   {}", task.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];

        if self.candidates.is_empty() {
            lines.push("  Candidate: none".to_string());
        } else {
            for candidate in &self.candidates {
                lines.push(format!("  Candidate: {}", format_candidate(candidate)));
                lines.push(format!("             {}", console::style(candidate.reason.description()).dim()));
            }
        }
        if let Some(note) = &self.note {
            lines.push(action_warning(note));
        }

        if !self.rescheduled.is_empty() {
            lines.push(String::new());
            lines.push("Displaced tasks:".to_string());
            for moved in &self.rescheduled {
                let result = match (&moved.error, moved.dates.first()) {
                    (Some(error), _) => format!("no new date ({error})"),
                    (None, Some(date)) => format!("moved to {date}"),
                    (None, None) => "no new date".to_string(),
                };
                lines.push(format!("  {}  {}", short_id(&moved.task_id), result));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListRow {
    pub id: Uuid,
    pub title: String,
    pub location: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub completed: bool,
    pub candidate: Option<CandidateAssignment>,
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskListRow>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "title", "location", "deadline", "candidate", "rain", "reason", "state"]);
        for row in &self.tasks {
            let (date, rain, reason) = match &row.candidate {
                Some(c) => (
                    if c.confirmed {
                        format!("{} *", c.date)
                    } else {
                        c.date.to_string()
                    },
                    format_precipitation(c.precipitation_probability),
                    colorize_reason(c.reason).to_string(),
                ),
                None => ("-".to_string(), "-".to_string(), "-".to_string()),
            };
            table.add_row(vec![
                short_id(&row.id),
                truncate(&row.title, 32),
                row.location.as_deref().map_or_else(|| "-".to_string(), |l| truncate(l, 16)),
                row.deadline.map_or_else(|| "-".to_string(), |d| d.to_string()),
                date,
                rain,
                reason,
                colorize_state(row.completed).to_string(),
            ]);
        }
        render_list("task", table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskActionOutput {
    pub success: bool,
    pub task_id: Uuid,
    pub message: String,
}

impl CommandOutput for TaskActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RescheduleAllOutput {
    pub results: Vec<RescheduledOutput>,
    pub skipped: usize,
}

impl CommandOutput for RescheduleAllOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "candidate", "result"]);
        for result in &self.results {
            table.add_row(vec![
                short_id(&result.task_id),
                result.dates.first().map_or_else(|| "-".to_string(), ToString::to_string),
                result.error.clone().unwrap_or_else(|| "scheduled".to_string()),
            ]);
        }
        let mut rendered = render_list("rescheduled task", table, self.results.len());
        if self.skipped > 0 {
            rendered.push_str(&format!("\n{} task(s) skipped (confirmed or missing location/deadline)", self.skipped));
        }
        rendered
    }
}

pub async fn execute(args: TaskArgs, config: &Config, today: Option<NaiveDate>, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;

    match args.command {
        TaskCommands::Add {
            title,
            location,
            deadline,
            priority,
        } => {
            let location_id = match location {
                Some(l) => Some(resolve_location(&ctx, &l).await?.id),
                None => None,
            };
            let task = ctx
                .service
                .create_task(NewTask {
                    title,
                    location_id,
                    deadline,
                    priority,
                })
                .await
                .context("Failed to add task")?;

            let detail = if task.is_schedulable() {
                schedule_with_cascade(&ctx, task.id, today).await?
            } else {
                let mut detail = detail_for(&ctx, task.id).await?;
                detail.note = Some("No location or deadline; the task has no candidate date".to_string());
                detail
            };
            output(&detail, json_mode);
        }

        TaskCommands::List { location, all, limit } => {
            let location_id = match location {
                Some(l) => Some(resolve_location(&ctx, &l).await?.id),
                None => None,
            };
            let filter = TaskFilter {
                location_id,
                completed: if all { None } else { Some(false) },
                limit: Some(limit),
            };
            let tasks = ctx.service.list_tasks(filter).await.context("Failed to list tasks")?;
            let names = location_names(&ctx).await?;

            let mut rows = Vec::with_capacity(tasks.len());
            for task in tasks {
                let candidate = ctx.service.assignments(task.id).await?.into_iter().next();
                rows.push(TaskListRow {
                    id: task.id,
                    location: task.location_id.and_then(|id| names.get(&id).cloned()),
                    title: task.title,
                    deadline: task.deadline,
                    priority: task.priority,
                    completed: task.completed,
                    candidate,
                });
            }
            output(
                &TaskListOutput {
                    total: rows.len(),
                    tasks: rows,
                },
                json_mode,
            );
        }

        TaskCommands::Show { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            output(&detail_for(&ctx, task_id).await?, json_mode);
        }

        TaskCommands::Update {
            id,
            title,
            location,
            clear_location,
            deadline,
            clear_deadline,
            priority,
        } => {
            if title.is_none()
                && location.is_none()
                && !clear_location
                && deadline.is_none()
                && !clear_deadline
                && priority.is_none()
            {
                bail!("At least one change must be specified (--title, --location, --clear-location, --deadline, --clear-deadline, or --priority)");
            }
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let location_id = match (location, clear_location) {
                (Some(l), _) => Some(Some(resolve_location(&ctx, &l).await?.id)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let update = TaskUpdate {
                title,
                location_id,
                deadline: if clear_deadline { Some(None) } else { deadline.map(Some) },
                priority,
            };

            let outcome = ctx
                .service
                .update_task(task_id, update, today)
                .await
                .context("Failed to update task")?;
            let mut detail = detail_for(&ctx, task_id).await?;
            if let Some(schedule) = outcome.schedule {
                detail.rescheduled = cascade(&ctx, &schedule.evicted, today).await;
            }
            output(&detail, json_mode);
        }

        TaskCommands::Delete { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            ctx.service.delete_task(task_id).await.context("Failed to delete task")?;
            output(
                &TaskActionOutput {
                    success: true,
                    task_id,
                    message: format!("Task {} deleted", short_id(&task_id)),
                },
                json_mode,
            );
        }

        TaskCommands::Complete { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.service.complete_task(task_id).await.context("Failed to complete task")?;
            output(
                &TaskActionOutput {
                    success: true,
                    task_id,
                    message: format!("Task '{}' completed", task.title),
                },
                json_mode,
            );
        }

        TaskCommands::Confirm { id, date } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let confirmed = ctx
                .service
                .confirm_candidate(task_id, date)
                .await
                .context("Failed to confirm candidate date")?;
            output(
                &TaskActionOutput {
                    success: true,
                    task_id,
                    message: format!("Task {} confirmed for {}", short_id(&task_id), confirmed.date),
                },
                json_mode,
            );
        }

        TaskCommands::Reschedule { id: Some(id), .. } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            output(&schedule_with_cascade(&ctx, task_id, today).await?, json_mode);
        }

        TaskCommands::Reschedule { id: None, .. } => {
            output(&reschedule_all(&ctx, today).await?, json_mode);
        }
    }

    Ok(())
}

/// Schedule one task, then reschedule whatever it displaced.
///
/// Running out of dates is not a command failure: the task is kept and the
/// reason is reported as a note.
async fn schedule_with_cascade(ctx: &AppContext, task_id: Uuid, today: Option<NaiveDate>) -> Result<TaskDetailOutput> {
    let (note, rescheduled) = match ctx.service.schedule_task(task_id, today).await {
        Ok(outcome) => (None, cascade(ctx, &outcome.evicted, today).await),
        Err(err @ (DomainError::NoCandidateFound { .. } | DomainError::EmptyForecastWindow { .. })) => {
            (Some(err.to_string()), Vec::new())
        }
        Err(err) => return Err(err).context("Failed to schedule task"),
    };

    let mut detail = detail_for(ctx, task_id).await?;
    detail.note = note;
    detail.rescheduled = rescheduled;
    Ok(detail)
}

async fn cascade(ctx: &AppContext, evicted: &[Uuid], today: Option<NaiveDate>) -> Vec<RescheduledOutput> {
    if evicted.is_empty() {
        return Vec::new();
    }
    ctx.service
        .reschedule_evicted(evicted, today)
        .await
        .into_iter()
        .map(|(task_id, result)| match result {
            Ok(outcome) => RescheduledOutput {
                task_id,
                dates: outcome.assignments.iter().map(|a| a.date).collect(),
                error: None,
            },
            Err(err) => RescheduledOutput {
                task_id,
                dates: Vec::new(),
                error: Some(err.to_string()),
            },
        })
        .collect()
}

async fn reschedule_all(ctx: &AppContext, today: Option<NaiveDate>) -> Result<RescheduleAllOutput> {
    let tasks = ctx
        .service
        .list_tasks(TaskFilter {
            completed: Some(false),
            ..Default::default()
        })
        .await
        .context("Failed to list tasks")?;

    let mut results = Vec::new();
    let mut skipped = 0;
    for task in tasks.iter().filter(|t| t.is_schedulable()) {
        match ctx.service.schedule_task(task.id, today).await {
            Ok(outcome) => {
                results.push(RescheduledOutput {
                    task_id: task.id,
                    dates: outcome.assignments.iter().map(|a| a.date).collect(),
                    error: None,
                });
                results.extend(cascade(ctx, &outcome.evicted, today).await);
            }
            Err(DomainError::AssignmentConfirmed(_)) => skipped += 1,
            Err(err @ (DomainError::NoCandidateFound { .. } | DomainError::EmptyForecastWindow { .. })) => {
                results.push(RescheduledOutput {
                    task_id: task.id,
                    dates: Vec::new(),
                    error: Some(err.to_string()),
                });
            }
            Err(err) => return Err(err).context("Failed to reschedule tasks"),
        }
    }
    skipped += tasks.iter().filter(|t| !t.is_schedulable()).count();
    Ok(RescheduleAllOutput { results, skipped })
}

async fn detail_for(ctx: &AppContext, task_id: Uuid) -> Result<TaskDetailOutput> {
    let task = ctx
        .service
        .get_task(task_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Task {task_id} not found. Use 'fairday task list' to see available tasks."))?;
    let location = match task.location_id {
        Some(id) => Some(ctx.service.resolve_location(&id.to_string()).await?.name),
        None => None,
    };
    let candidates = ctx.service.assignments(task_id).await?;
    Ok(TaskDetailOutput {
        task,
        location,
        candidates,
        note: None,
        rescheduled: Vec::new(),
    })
}

async fn location_names(ctx: &AppContext) -> Result<HashMap<Uuid, String>> {
    Ok(ctx
        .service
        .list_locations()
        .await?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect())
}
