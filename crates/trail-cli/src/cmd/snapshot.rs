//! `trail snapshot` — reconstruct a task's state as of one history entry.

use crate::cmd::open_store;
use crate::output::{human_kv, render, OutputMode};
use anyhow::Context;
use clap::Args;
use std::path::Path;
use trail_core::clock;
use trail_core::entry::FieldName;
use trail_core::replay::snapshot_at;
use trail_core::resolve::IdentityResolver;
use trail_core::{HistoryStore, DEFAULT_REPLAY_CAP};

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Task identifier.
    pub id: String,

    /// Target entry id; defaults to the task's latest entry.
    #[arg(long)]
    pub at: Option<String>,

    /// Maximum ledger entries to replay.
    #[arg(long, default_value_t = DEFAULT_REPLAY_CAP)]
    pub cap: usize,
}

pub fn run_snapshot(args: &SnapshotArgs, output: OutputMode, db: &Path) -> anyhow::Result<()> {
    let store = open_store(db)?;
    let target = match &args.at {
        Some(entry_id) => entry_id.clone(),
        None => {
            store
                .latest(&args.id)?
                .with_context(|| format!("task '{}' has no history", args.id))?
                .id
        }
    };

    let snap = snapshot_at(
        &store,
        &IdentityResolver,
        &IdentityResolver,
        &args.id,
        &target,
        args.cap,
    )?;

    render(output, &snap, |snap, w| {
        human_kv(w, "task", &snap.entity_id)?;
        human_kv(w, "as of", clock::format_us(snap.entry_meta.changed_at_us))?;
        human_kv(w, "entry", &snap.entry_meta.entry_id)?;
        if let Some(actor) = &snap.entry_meta.actor_id {
            let label = snap
                .entry_meta
                .actor_name
                .as_deref()
                .map_or_else(|| actor.clone(), |name| format!("{name} ({actor})"));
            human_kv(w, "by", label)?;
        }
        for field in FieldName::ALL {
            human_kv(w, field.as_str(), snap.fields[field.as_str()].to_string())?;
        }
        human_kv(w, "assignees", snap.assignees.join(", "))?;
        human_kv(w, "labels", snap.labels.join(", "))?;
        human_kv(w, "projects", snap.projects.join(", "))?;
        if snap.degraded {
            writeln!(w, "warning: reconstruction diverged; showing live state")?;
        }
        Ok(())
    })
}
