//! `trail log` — list a task's history, most recent first.

use crate::cmd::{describe, open_store};
use crate::output::{human_kv, render, OutputMode};
use clap::Args;
use std::path::Path;
use trail_core::clock;
use trail_core::entry::{ChangeType, FieldName};
use trail_core::query::{list_history, HistoryQuery, DEFAULT_PAGE_LIMIT};

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Task identifier.
    pub id: String,

    /// Restrict to one change type: entity.created, field.updated,
    /// relation.added, or relation.removed.
    #[arg(long = "type")]
    pub change_type: Option<String>,

    /// Restrict to field.updated entries for one tracked field.
    #[arg(long)]
    pub field: Option<String>,

    /// Page size.
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    pub limit: u32,

    /// Offset into the filtered history.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

pub fn run_log(args: &LogArgs, output: OutputMode, db: &Path) -> anyhow::Result<()> {
    let query = HistoryQuery {
        change_type: args
            .change_type
            .as_deref()
            .map(str::parse::<ChangeType>)
            .transpose()?,
        field_name: args
            .field
            .as_deref()
            .map(str::parse::<FieldName>)
            .transpose()?,
        limit: args.limit,
        offset: args.offset,
        ..HistoryQuery::new(args.id.clone())
    };

    let store = open_store(db)?;
    let page = list_history(&store, &query)?;

    render(output, &page, |page, w| {
        human_kv(w, "task", format!("{} ({})", page.entity_summary.id, page.entity_summary.name))?;
        human_kv(w, "entries", format!("{} of {}", page.entries.len(), page.total_count))?;
        for entry in &page.entries {
            writeln!(
                w,
                "{}  {:<16} {}  {}",
                clock::format_us(entry.changed_at_us),
                entry.change_type,
                entry.actor_id.as_deref().unwrap_or("-"),
                describe(entry),
            )?;
        }
        Ok(())
    })
}
