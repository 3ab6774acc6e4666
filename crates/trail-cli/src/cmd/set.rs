//! `trail set` — update tracked scalar fields, recording one entry per
//! changed field.

use crate::cmd::{describe, open_store};
use crate::output::{render, OutputMode};
use anyhow::bail;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use trail_core::entry::FieldName;
use trail_core::store::CurrentState;
use trail_core::{clock, HistoryEntry, Priority};

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Task identifier.
    pub id: String,

    /// New task name.
    #[arg(long)]
    pub name: Option<String>,

    /// New description text.
    #[arg(long)]
    pub description: Option<String>,

    /// New priority: low, medium, high, or urgent.
    #[arg(long)]
    pub priority: Option<String>,

    /// Completion flag.
    #[arg(long)]
    pub completed: Option<bool>,

    /// New estimation points.
    #[arg(long)]
    pub points: Option<i64>,

    /// New list/column.
    #[arg(long)]
    pub list: Option<String>,

    /// New start date, microseconds since the Unix epoch.
    #[arg(long)]
    pub start_us: Option<i64>,

    /// New end date, microseconds since the Unix epoch.
    #[arg(long)]
    pub end_us: Option<i64>,

    /// Clear an optional field (repeatable): description, priority,
    /// start_date, end_date, estimation_points, or list_id.
    #[arg(long)]
    pub clear: Vec<String>,
}

#[derive(Serialize)]
struct Updated<'a> {
    id: &'a str,
    recorded: &'a [HistoryEntry],
}

pub fn run_set(
    args: &SetArgs,
    actor: Option<&str>,
    output: OutputMode,
    db: &Path,
) -> anyhow::Result<()> {
    let mut store = open_store(db)?;
    let Some(task) = store.task(&args.id)? else {
        bail!("task '{}' not found", args.id);
    };

    let mut post = task.fields;
    if let Some(name) = &args.name {
        post.name.clone_from(name);
    }
    if let Some(description) = &args.description {
        post.description = Some(description.clone());
    }
    if let Some(priority) = &args.priority {
        post.priority = Some(priority.parse::<Priority>()?);
    }
    if let Some(completed) = args.completed {
        post.completed = completed;
    }
    if let Some(points) = args.points {
        post.estimation_points = Some(points);
    }
    if let Some(list) = &args.list {
        post.list_id = Some(list.clone());
    }
    if let Some(start_us) = args.start_us {
        post.start_date_us = Some(start_us);
    }
    if let Some(end_us) = args.end_us {
        post.end_date_us = Some(end_us);
    }
    for raw in &args.clear {
        match raw.parse::<FieldName>()? {
            FieldName::Description => post.description = None,
            FieldName::Priority => post.priority = None,
            FieldName::StartDate => post.start_date_us = None,
            FieldName::EndDate => post.end_date_us = None,
            FieldName::EstimationPoints => post.estimation_points = None,
            FieldName::ListId => post.list_id = None,
            FieldName::Name | FieldName::Completed => {
                bail!("field '{raw}' is required and cannot be cleared");
            }
        }
    }

    let recorded = store.update_task(&args.id, post, actor, clock::now_us())?;

    render(
        output,
        &Updated {
            id: &args.id,
            recorded: &recorded,
        },
        |v, w| {
            if v.recorded.is_empty() {
                writeln!(w, "{}: no changes", v.id)
            } else {
                for entry in v.recorded {
                    writeln!(w, "{}  {}", v.id, describe(entry))?;
                }
                Ok(())
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_args_accept_clear_list() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SetArgs,
        }
        let w = Wrapper::parse_from([
            "test",
            "task-1",
            "--priority",
            "high",
            "--clear",
            "end_date",
            "--clear",
            "list_id",
        ]);
        assert_eq!(w.args.priority.as_deref(), Some("high"));
        assert_eq!(w.args.clear, vec!["end_date", "list_id"]);
    }
}
