//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its result
//! accordingly: labeled text for humans, or schema-stable JSON for scripts.
//!
//! Mode resolution precedence (highest wins):
//! 1. the `--json` flag
//! 2. `TRAIL_FORMAT` env var → `"human"` | `"json"`
//! 3. default: human

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Labeled text for people.
    Human,
    /// Machine-readable JSON, one object per result.
    Json,
}

impl OutputMode {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Core resolution logic, separated from the environment for testability.
fn resolve_inner(json_flag: bool, format_env: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match format_env.map(str::to_lowercase).as_deref() {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}

/// Resolve the output mode from the `--json` flag and `TRAIL_FORMAT`.
#[must_use]
pub fn resolve_output_mode(json_flag: bool) -> OutputMode {
    let env_val = std::env::var("TRAIL_FORMAT").ok();
    resolve_inner(json_flag, env_val.as_deref())
}

/// Render a serializable value: JSON in JSON mode, `human_fn` otherwise.
///
/// # Errors
///
/// Fails if serialization or writing to stdout fails.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render a left-aligned key/value line in human output.
///
/// # Errors
///
/// Fails if writing fails.
pub fn human_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins_over_env() {
        assert_eq!(resolve_inner(true, Some("human")), OutputMode::Json);
    }

    #[test]
    fn env_selects_json_when_no_flag() {
        assert_eq!(resolve_inner(false, Some("json")), OutputMode::Json);
        assert_eq!(resolve_inner(false, Some("JSON")), OutputMode::Json);
    }

    #[test]
    fn default_is_human() {
        assert_eq!(resolve_inner(false, None), OutputMode::Human);
        assert_eq!(resolve_inner(false, Some("confetti")), OutputMode::Human);
    }
}
