// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use folio_engine::config::{ConfigError, TOKEN_ENV};
use folio_engine::gateway::GatewayError;
use folio_engine::sidebar::SidebarError;

use crate::client::LookupError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (tables, colors, etc.).
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
///
/// - `Human`: calls `human_fn` to produce a human-readable string.
/// - `Json`: serializes `value` as JSON.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Human => {
            writeln!(out, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut out, value).map_err(io::Error::other)?;
            writeln!(out)
        }
    }
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(config) = cause.downcast_ref::<ConfigError>() {
            return match config {
                ConfigError::Missing(key) => (
                    "SERVER_NOT_CONFIGURED",
                    format!("`{key}` is not set. Add it to ~/.folio/config.toml"),
                ),
                ConfigError::Invalid(_) => ("CONFIG_INVALID", message),
                _ => ("CONFIG_ERROR", message),
            };
        }
        if let Some(lookup) = cause.downcast_ref::<LookupError>() {
            return match lookup {
                LookupError::NotFound(needle) => (
                    "PAGE_NOT_FOUND",
                    format!("Page {needle} not found. Run: folio tree to see available pages"),
                ),
                LookupError::Ambiguous { .. } => ("PAGE_AMBIGUOUS", lookup.to_string()),
            };
        }
        if let Some(SidebarError::NotVisible(page)) = cause.downcast_ref::<SidebarError>() {
            return (
                "PAGE_NOT_VISIBLE",
                format!("Page {page} is trashed or sits under a trashed page. Run: folio restore <id>"),
            );
        }
        if let Some(SidebarError::Drop(rejection)) = cause.downcast_ref::<SidebarError>() {
            if rejection.is_cycle() {
                return (
                    "CYCLE_REJECTED",
                    "A page cannot be moved under itself or one of its descendants.".to_string(),
                );
            }
            return ("MOVE_REJECTED", message);
        }
        if let Some(gateway) = cause.downcast_ref::<GatewayError>() {
            return gateway_error(gateway, message);
        }
    }

    ("ERROR", message)
}

fn gateway_error(error: &GatewayError, message: String) -> (&'static str, String) {
    match error {
        GatewayError::Transient(_) => (
            "NETWORK_ERROR",
            format!("Could not reach the page server ({message}). Check server_url and retry."),
        ),
        GatewayError::Rejected { status: 401 | 403, .. } => (
            "AUTH_FAILURE",
            format!("Authentication failed. Set {TOKEN_ENV} to a valid API token."),
        ),
        GatewayError::Rejected { status: 404, .. } => ("PAGE_NOT_FOUND", message),
        GatewayError::Rejected { .. } => ("SERVER_REJECTED", message),
        GatewayError::Decode(_) => ("BAD_RESPONSE", message),
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
