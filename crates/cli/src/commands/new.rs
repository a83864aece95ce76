// `folio new` — create a page at the end of a sibling group.

use std::path::Path;

use anyhow::Context;
use clap::Args;

use crate::client::{self, resolve_page, ServerContext};
use crate::commands::mv::PlacementResult;
use crate::commands::tree::display_title;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Title for the new page.
    #[arg(long)]
    pub title: Option<String>,

    /// Parent page id or title (defaults to the workspace root).
    #[arg(long)]
    pub under: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: NewArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| create(ctx, args.title, args.under));

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

async fn create(
    ctx: ServerContext,
    title: Option<String>,
    under: Option<String>,
) -> anyhow::Result<PlacementResult> {
    let mut sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let parent = under.map(|needle| resolve_page(sidebar.tree(), &needle)).transpose()?;
    let created = sidebar.create_page(parent, title).await?;
    PlacementResult::from_tree(sidebar.tree(), &created.id)
}

fn format_human(result: &PlacementResult) -> String {
    let parent = result.parent_id.as_deref().unwrap_or("workspace root");
    format!(
        "Created {} [{}] at position {} under {parent}",
        display_title(&result.title),
        result.page_id,
        result.position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_format_names_parent() {
        let result = PlacementResult {
            page_id: "p-9".into(),
            title: String::new(),
            parent_id: Some("a".into()),
            depth: 1,
            position: 3,
            siblings: vec![],
        };
        assert_eq!(format_human(&result), "Created Untitled [p-9] at position 3 under a");
    }
}
