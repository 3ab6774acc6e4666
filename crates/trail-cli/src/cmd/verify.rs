//! `trail verify` — replay a task's full ledger and compare the result with
//! its live state.

use crate::cmd::open_store;
use crate::output::{render, OutputMode};
use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use trail_core::query::{list_history, HistoryQuery};
use trail_core::replay::snapshot_at;
use trail_core::resolve::IdentityResolver;
use trail_core::{HistoryStore, DEFAULT_REPLAY_CAP};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Task identifier.
    pub id: String,

    /// Maximum ledger entries to replay.
    #[arg(long, default_value_t = DEFAULT_REPLAY_CAP)]
    pub cap: usize,
}

#[derive(Serialize)]
struct Verdict<'a> {
    id: &'a str,
    latest_entry_id: &'a str,
    entry_count: u64,
    consistent: bool,
}

pub fn run_verify(args: &VerifyArgs, output: OutputMode, db: &Path) -> anyhow::Result<()> {
    let store = open_store(db)?;
    let latest = store
        .latest(&args.id)?
        .with_context(|| format!("task '{}' has no history", args.id))?;

    let snap = snapshot_at(
        &store,
        &IdentityResolver,
        &IdentityResolver,
        &args.id,
        &latest.id,
        args.cap,
    )?;
    let page = list_history(&store, &HistoryQuery::new(args.id.clone()))?;

    let verdict = Verdict {
        id: &args.id,
        latest_entry_id: &latest.id,
        entry_count: page.total_count,
        consistent: !snap.degraded,
    };
    render(output, &verdict, |v, w| {
        if v.consistent {
            writeln!(w, "ok: {} entries replay to live state for {}", v.entry_count, v.id)
        } else {
            writeln!(w, "DEGRADED: ledger replay diverges from live state for {}", v.id)
        }
    })?;

    if snap.degraded {
        bail!("live state diverges from ledger replay for '{}'", args.id);
    }
    Ok(())
}
