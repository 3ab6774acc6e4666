#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trail_core::RelationKind;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "trail: append-only task change history with point-in-time snapshots",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the trail database (default: ./trail.sqlite3, or TRAIL_DB).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Actor id to attribute changes to (default: TRAIL_ACTOR).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Write",
        about = "Create a task",
        long_about = "Create a task and record its entity.created entry.",
        after_help = "EXAMPLES:\n    # Create a task\n    trail create task-42 --name \"Fix login timeout\" --priority high\n\n    # Emit machine-readable output\n    trail create task-42 --name \"Fix login timeout\" --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Write",
        about = "Update tracked fields",
        long_about = "Update one or more tracked scalar fields, recording one entry per field that actually changed.",
        after_help = "EXAMPLES:\n    # Raise priority and mark complete\n    trail set task-42 --priority urgent --completed true\n\n    # Clear the due date\n    trail set task-42 --clear end_date"
    )]
    Set(cmd::set::SetArgs),

    #[command(
        next_help_heading = "Write",
        about = "Add assignees",
        after_help = "EXAMPLES:\n    trail assign task-42 user-amara user-bennett"
    )]
    Assign(cmd::relate::RelateArgs),

    #[command(next_help_heading = "Write", about = "Remove assignees")]
    Unassign(cmd::relate::RelateArgs),

    #[command(
        next_help_heading = "Write",
        about = "Add labels",
        after_help = "EXAMPLES:\n    trail label task-42 backend auth"
    )]
    Label(cmd::relate::RelateArgs),

    #[command(next_help_heading = "Write", about = "Remove labels")]
    Unlabel(cmd::relate::RelateArgs),

    #[command(next_help_heading = "Write", about = "Link to projects")]
    Link(cmd::relate::RelateArgs),

    #[command(next_help_heading = "Write", about = "Unlink from projects")]
    Unlink(cmd::relate::RelateArgs),

    #[command(
        next_help_heading = "Read",
        about = "List a task's history",
        long_about = "List a task's history, most recent first, with optional change-type and field filters.",
        after_help = "EXAMPLES:\n    # Full history\n    trail log task-42\n\n    # Only assignee additions\n    trail log task-42 --type relation.added\n\n    # Priority changes as JSON\n    trail log task-42 --field priority --json"
    )]
    Log(cmd::log::LogArgs),

    #[command(
        next_help_heading = "Read",
        about = "Reconstruct state at an entry",
        long_about = "Replay the ledger up to a target entry and print the task's state as of that moment.",
        after_help = "EXAMPLES:\n    # State at the latest entry\n    trail snapshot task-42\n\n    # State as of an earlier entry\n    trail snapshot task-42 --at blake3:0f3a... --json"
    )]
    Snapshot(cmd::snapshot::SnapshotArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Verify ledger/live-state consistency",
        long_about = "Replay the full ledger and fail if the reconstruction disagrees with the live row.",
        after_help = "EXAMPLES:\n    trail verify task-42"
    )]
    Verify(cmd::verify::VerifyArgs),
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.json)
    }

    /// Database path: `--db`, then `TRAIL_DB`, then `./trail.sqlite3`.
    fn db_path(&self) -> PathBuf {
        self.db.clone().map_or_else(
            || {
                env::var_os("TRAIL_DB")
                    .map_or_else(|| PathBuf::from("trail.sqlite3"), PathBuf::from)
            },
            |path| path,
        )
    }

    /// Actor id: `--actor`, then `TRAIL_ACTOR`, else unattributed.
    fn actor_id(&self) -> Option<String> {
        self.actor
            .clone()
            .or_else(|| env::var("TRAIL_ACTOR").ok())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TRAIL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "trail=debug,info"
        } else {
            "trail=info,warn"
        })
    });

    let format = env::var("TRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Diagnostics go to stderr so JSON output on stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    let db = cli.db_path();
    let actor = cli.actor_id();
    let actor = actor.as_deref();

    match &cli.command {
        Commands::Create(args) => cmd::create::run_create(args, actor, output, &db),
        Commands::Set(args) => cmd::set::run_set(args, actor, output, &db),
        Commands::Assign(args) => {
            cmd::relate::run_relate(args, RelationKind::Assignee, true, actor, output, &db)
        }
        Commands::Unassign(args) => {
            cmd::relate::run_relate(args, RelationKind::Assignee, false, actor, output, &db)
        }
        Commands::Label(args) => {
            cmd::relate::run_relate(args, RelationKind::Label, true, actor, output, &db)
        }
        Commands::Unlabel(args) => {
            cmd::relate::run_relate(args, RelationKind::Label, false, actor, output, &db)
        }
        Commands::Link(args) => {
            cmd::relate::run_relate(args, RelationKind::Project, true, actor, output, &db)
        }
        Commands::Unlink(args) => {
            cmd::relate::run_relate(args, RelationKind::Project, false, actor, output, &db)
        }
        Commands::Log(args) => cmd::log::run_log(args, output, &db),
        Commands::Snapshot(args) => cmd::snapshot::run_snapshot(args, output, &db),
        Commands::Verify(args) => cmd::verify::run_verify(args, output, &db),
    }
}
