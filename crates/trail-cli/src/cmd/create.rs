//! `trail create` — create a task and record its creation entry.

use crate::cmd::open_store;
use crate::output::{render, OutputMode};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use trail_core::{clock, Priority, TaskFields};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Identifier for the new task.
    pub id: String,

    /// Task name.
    #[arg(short, long)]
    pub name: String,

    /// Description text.
    #[arg(short, long)]
    pub description: Option<String>,

    /// Priority: low, medium, high, or urgent.
    #[arg(short, long)]
    pub priority: Option<String>,

    /// List/column the task starts in.
    #[arg(long)]
    pub list: Option<String>,

    /// Estimation points.
    #[arg(long)]
    pub points: Option<i64>,

    /// Start date, microseconds since the Unix epoch.
    #[arg(long)]
    pub start_us: Option<i64>,

    /// End date, microseconds since the Unix epoch.
    #[arg(long)]
    pub end_us: Option<i64>,
}

#[derive(Serialize)]
struct Created<'a> {
    id: &'a str,
    entry_id: &'a str,
    changed_at_us: i64,
}

pub fn run_create(
    args: &CreateArgs,
    actor: Option<&str>,
    output: OutputMode,
    db: &Path,
) -> anyhow::Result<()> {
    let priority = args
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;

    let mut store = open_store(db)?;
    let entry = store.create_task(
        &args.id,
        TaskFields {
            name: args.name.clone(),
            description: args.description.clone(),
            priority,
            completed: false,
            start_date_us: args.start_us,
            end_date_us: args.end_us,
            estimation_points: args.points,
            list_id: args.list.clone(),
        },
        actor,
        clock::now_us(),
    )?;

    render(
        output,
        &Created {
            id: &args.id,
            entry_id: &entry.id,
            changed_at_us: entry.changed_at_us,
        },
        |c, w| writeln!(w, "Created {} ({})", c.id, c.entry_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: CreateArgs,
        }
        let w = Wrapper::parse_from(["test", "task-1", "--name", "Hello"]);
        assert_eq!(w.args.id, "task-1");
        assert_eq!(w.args.name, "Hello");
        assert!(w.args.priority.is_none());
        assert!(w.args.points.is_none());
    }
}
