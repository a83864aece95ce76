// `folio watch` — follow a document and print each server version applied.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use folio_engine::sync::{DocumentSession, DocumentView, PollDecision};
use tracing::info;

use crate::client::{self, resolve_page, ServerContext};
use crate::commands::tree::display_title;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Page id or title.
    pub page: String,

    /// Force JSON output (one object per line).
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WatchEvent {
    pub page_id: String,
    pub title: String,
    pub server_version: DateTime<Utc>,
    pub poll: Option<PollDecision>,
    pub content: serde_json::Value,
}

impl WatchEvent {
    fn from_view(view: &DocumentView) -> Self {
        Self {
            page_id: view.page_id.to_string(),
            title: view.draft.title.clone(),
            server_version: view.server_version,
            poll: view.last_poll,
            content: view.draft.content.clone(),
        }
    }
}

pub fn run(args: WatchArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| watch(ctx, args.page, format));

    if let Err(e) = &result {
        output::print_anyhow_error(format, e);
    }
    result
}

async fn watch(ctx: ServerContext, page: String, format: OutputFormat) -> anyhow::Result<()> {
    let sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let page_id = resolve_page(sidebar.tree(), &page)?;
    let timing = ctx.config.sync.timing();

    let session = DocumentSession::open(ctx.gateway, page_id.clone(), timing)
        .await
        .with_context(|| format!("failed to open page {page_id}"))?;
    info!(page_id = %page_id, poll_ms = timing.poll_interval.as_millis() as u64, "watching page");

    let mut updates = session.subscribe();
    let mut last = WatchEvent::from_view(&updates.borrow_and_update());
    output::print_output(format, &last, format_human)?;

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = WatchEvent::from_view(&updates.borrow_and_update());
                if is_new_version(&last, &event) {
                    output::print_output(format, &event, format_human)?;
                    last = event;
                }
            }
            signal = &mut shutdown => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}

/// Only versions that reached the visible draft are reported.
fn is_new_version(last: &WatchEvent, event: &WatchEvent) -> bool {
    event.server_version > last.server_version && event.poll == Some(PollDecision::Applied)
}

fn format_human(event: &WatchEvent) -> String {
    let stamp = event.server_version.format("%Y-%m-%d %H:%M:%S%.3f");
    let content = match &event.content {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let preview: String = content.chars().take(60).collect();
    let ellipsis = if content.chars().count() > 60 { "…" } else { "" };
    format!("[{stamp}] {} [{}] {preview}{ellipsis}", display_title(&event.title), event.page_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event(seconds: i64, poll: Option<PollDecision>, content: serde_json::Value) -> WatchEvent {
        WatchEvent {
            page_id: "doc".into(),
            title: "Plan".into(),
            server_version: Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap(),
            poll,
            content,
        }
    }

    #[test]
    fn only_applied_newer_versions_are_reported() {
        let last = event(0, None, json!("a"));
        assert!(is_new_version(&last, &event(5, Some(PollDecision::Applied), json!("b"))));
        assert!(!is_new_version(&last, &event(5, Some(PollDecision::Deferred), json!("b"))));
        assert!(!is_new_version(&last, &event(0, Some(PollDecision::Applied), json!("a"))));
    }

    #[test]
    fn human_format_previews_text() {
        let line = format_human(&event(0, None, json!("hello world")));
        assert_eq!(line, "[2023-11-14 22:13:20.000] Plan [doc] hello world");
    }

    #[test]
    fn human_format_truncates_long_content() {
        let long = "x".repeat(100);
        let line = format_human(&event(0, None, json!(long)));
        assert!(line.ends_with(&format!("{}…", "x".repeat(60))));
    }

    #[test]
    fn human_format_serializes_structured_content() {
        let line = format_human(&event(0, None, json!({"blocks": []})));
        assert!(line.ends_with(r#"{"blocks":[]}"#));
    }
}
