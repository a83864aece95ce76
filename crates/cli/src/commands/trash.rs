// `folio trash` / `folio restore` — move pages in and out of the trash.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use folio_common::types::PageId;

use crate::client::{self, resolve_page, LookupError, ServerContext};
use crate::commands::tree::display_title;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct TrashArgs {
    /// Page id or title.
    pub page: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Page id. Trashed pages are not listed, so titles only match pages
    /// that are still visible.
    pub page: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrashAction {
    Trashed,
    Restored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashResult {
    pub action: TrashAction,
    pub page_id: String,
    pub title: String,
    /// Visible descendants hidden by (or revealed with) this page.
    pub descendants: usize,
}

pub fn run(args: TrashArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| trash(ctx, args.page));
    report(format, result)
}

pub fn run_restore(args: RestoreArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| restore(ctx, args.page));
    report(format, result)
}

fn report(format: OutputFormat, result: anyhow::Result<TrashResult>) -> anyhow::Result<()> {
    match result {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn trash(ctx: ServerContext, page: String) -> anyhow::Result<TrashResult> {
    let mut sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let page = resolve_page(sidebar.tree(), &page)?;
    let descendants = count_descendants(sidebar.tree(), &page);
    let title = sidebar.tree().get(&page).map(|node| node.title.clone()).unwrap_or_default();
    sidebar.trash_page(&page).await?;
    Ok(TrashResult { action: TrashAction::Trashed, page_id: page.to_string(), title, descendants })
}

async fn restore(ctx: ServerContext, page: String) -> anyhow::Result<TrashResult> {
    let mut sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let page = match resolve_page(sidebar.tree(), &page) {
        Ok(id) => id,
        Err(LookupError::NotFound(_)) => PageId::from(page),
        Err(err) => return Err(err.into()),
    };
    sidebar.restore_page(&page).await?;
    sidebar.refresh().await.context("failed to reload page tree")?;
    let descendants = count_descendants(sidebar.tree(), &page);
    let title = sidebar.tree().get(&page).map(|node| node.title.clone()).unwrap_or_default();
    Ok(TrashResult { action: TrashAction::Restored, page_id: page.to_string(), title, descendants })
}

fn count_descendants(tree: &folio_engine::tree::PageTree, page: &PageId) -> usize {
    let mut stack = tree.child_ids(Some(page));
    let mut count = 0;
    while let Some(next) = stack.pop() {
        count += 1;
        stack.extend(tree.child_ids(Some(&next)));
    }
    count
}

fn format_human(result: &TrashResult) -> String {
    let verb = match result.action {
        TrashAction::Trashed => "Moved to trash",
        TrashAction::Restored => "Restored",
    };
    let mut line = format!("{verb}: {} [{}]", display_title(&result.title), result.page_id);
    if result.descendants > 0 {
        line.push_str(&format!(" with {} nested page(s)", result.descendants));
    }
    line
}
