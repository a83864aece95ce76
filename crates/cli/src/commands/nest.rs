// `folio nest` — reparent a page under another page or at the root.

use std::path::Path;

use anyhow::Context;
use clap::Args;

use crate::client::{self, resolve_page, ServerContext};
use crate::commands::mv::{format_human, PlacementResult};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NestArgs {
    /// Page id or title.
    pub page: String,

    /// New parent page id or title; the page becomes its last child.
    #[arg(long, conflicts_with = "root", required_unless_present = "root")]
    pub under: Option<String>,

    /// Move the page to the workspace root.
    #[arg(long)]
    pub root: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: NestArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| nest(ctx, args.page, args.under));

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

async fn nest(ctx: ServerContext, page: String, under: Option<String>) -> anyhow::Result<PlacementResult> {
    let mut sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let page = resolve_page(sidebar.tree(), &page)?;
    let parent = under.map(|needle| resolve_page(sidebar.tree(), &needle)).transpose()?;
    sidebar.move_page(&page, parent.as_ref()).await?;
    PlacementResult::from_tree(sidebar.tree(), &page)
}
