// `folio mv` — move a page to a new index among its siblings.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use folio_common::types::PageId;
use folio_engine::tree::PageTree;

use crate::client::{self, resolve_page, ServerContext};
use crate::commands::tree::display_title;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct MvArgs {
    /// Page id or title.
    pub page: String,

    /// Target index among the page's current siblings (0 = first).
    #[arg(long)]
    pub index: usize,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

/// Where a page ended up after a structural change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementResult {
    pub page_id: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub depth: u32,
    pub position: u32,
    /// Sibling titles in their new order.
    #[serde(default)]
    pub siblings: Vec<String>,
}

impl PlacementResult {
    pub fn from_tree(tree: &PageTree, page: &PageId) -> anyhow::Result<Self> {
        let node = tree.get(page).with_context(|| format!("page {page} missing after move"))?;
        let siblings = tree
            .children_of(node.parent_id.as_ref())
            .into_iter()
            .map(|sibling| display_title(&sibling.title).to_string())
            .collect();
        Ok(Self {
            page_id: node.id.to_string(),
            title: node.title.clone(),
            parent_id: node.parent_id.as_ref().map(ToString::to_string),
            depth: node.depth,
            position: node.position,
            siblings,
        })
    }
}

pub fn run(args: MvArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, |ctx| reorder(ctx, args.page, args.index));

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

async fn reorder(ctx: ServerContext, page: String, index: usize) -> anyhow::Result<PlacementResult> {
    let mut sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    let page = resolve_page(sidebar.tree(), &page)?;
    sidebar.reorder_page(&page, index).await?;
    PlacementResult::from_tree(sidebar.tree(), &page)
}

pub(crate) fn format_human(result: &PlacementResult) -> String {
    let parent = result.parent_id.as_deref().unwrap_or("workspace root");
    let mut lines = vec![format!(
        "Moved {} [{}] to position {} under {parent}",
        display_title(&result.title),
        result.page_id,
        result.position,
    )];
    for (index, title) in result.siblings.iter().enumerate() {
        let marker = if index as u32 == result.position { "→" } else { " " };
        lines.push(format!("  {marker} {index}. {title}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use folio_common::types::PageNode;

    fn tree() -> PageTree {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        PageTree::from_pages(vec![
            PageNode::new("a", at).with_title("Alpha"),
            PageNode::new("b", at).with_title("Beta").with_position(1),
            PageNode::new("c", at).with_position(2),
        ])
        .unwrap()
    }

    #[test]
    fn placement_lists_siblings_in_order() {
        let result = PlacementResult::from_tree(&tree(), &PageId::from("b")).unwrap();
        assert_eq!(result.position, 1);
        assert_eq!(result.parent_id, None);
        assert_eq!(result.siblings, vec!["Alpha", "Beta", "Untitled"]);
    }

    #[test]
    fn placement_for_unknown_page_errors() {
        assert!(PlacementResult::from_tree(&tree(), &PageId::from("zzz")).is_err());
    }

    #[test]
    fn human_format_marks_moved_page() {
        let result = PlacementResult::from_tree(&tree(), &PageId::from("b")).unwrap();
        let output = format_human(&result);
        assert!(output.starts_with("Moved Beta [b] to position 1 under workspace root"));
        assert!(output.contains("→ 1. Beta"));
        assert!(output.contains("  0. Alpha"));
    }
}
