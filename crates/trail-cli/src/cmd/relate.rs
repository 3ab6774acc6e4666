//! `trail assign`/`unassign`, `label`/`unlabel`, `link`/`unlink` — apply
//! relation membership deltas, recording one entry per member.

use crate::cmd::{describe, open_store};
use crate::output::{render, OutputMode};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use trail_core::record::RelationDelta;
use trail_core::{clock, HistoryEntry, RelationKind};

#[derive(Args, Debug)]
pub struct RelateArgs {
    /// Task identifier.
    pub id: String,

    /// Related ids to add or remove.
    #[arg(required = true)]
    pub members: Vec<String>,
}

#[derive(Serialize)]
struct Applied<'a> {
    id: &'a str,
    kind: &'static str,
    recorded: &'a [HistoryEntry],
}

pub fn run_relate(
    args: &RelateArgs,
    kind: RelationKind,
    add: bool,
    actor: Option<&str>,
    output: OutputMode,
    db: &Path,
) -> anyhow::Result<()> {
    let delta = if add {
        RelationDelta {
            added: args.members.clone(),
            removed: vec![],
        }
    } else {
        RelationDelta {
            added: vec![],
            removed: args.members.clone(),
        }
    };

    let mut store = open_store(db)?;
    let recorded = store.apply_relations(&args.id, kind, &delta, actor, clock::now_us())?;

    render(
        output,
        &Applied {
            id: &args.id,
            kind: kind.as_str(),
            recorded: &recorded,
        },
        |v, w| {
            for entry in v.recorded {
                writeln!(w, "{}  {}", v.id, describe(entry))?;
            }
            Ok(())
        },
    )
}
