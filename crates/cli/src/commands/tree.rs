// `folio tree` — print the workspace page outline.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use folio_engine::tree::PageTree;

use crate::client::{self, ServerContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeResult {
    pub workspace_id: String,
    #[serde(default)]
    pub pages: Vec<TreeRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRow {
    pub id: String,
    pub title: String,
    pub depth: u32,
    pub position: u32,
    pub parent_id: Option<String>,
}

impl TreeResult {
    pub fn from_tree(workspace_id: &str, tree: &PageTree) -> Self {
        let pages = tree
            .visible_outline()
            .into_iter()
            .map(|row| TreeRow {
                id: row.page.id.to_string(),
                title: row.page.title.clone(),
                depth: row.depth,
                position: row.page.position,
                parent_id: row.page.parent_id.as_ref().map(ToString::to_string),
            })
            .collect();
        Self { workspace_id: workspace_id.to_string(), pages }
    }
}

pub fn run(args: TreeArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(config, load_tree);

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

async fn load_tree(ctx: ServerContext) -> anyhow::Result<TreeResult> {
    let sidebar = ctx.sidebar().await.context("failed to load page tree")?;
    Ok(TreeResult::from_tree(ctx.workspace_id.as_str(), sidebar.tree()))
}

fn format_human(result: &TreeResult) -> String {
    if result.pages.is_empty() {
        return format!("No pages in workspace {}.", result.workspace_id);
    }

    let mut lines = Vec::new();
    lines.push(format!("{} ({} page(s))", result.workspace_id, result.pages.len()));
    for row in &result.pages {
        let indent = "  ".repeat(row.depth as usize);
        let prefix = if row.depth == 0 { "" } else { "├─ " };
        lines.push(format!("{indent}{prefix}{} [{}]", display_title(&row.title), row.id));
    }
    lines.join("\n")
}

pub(crate) fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        "Untitled"
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use folio_common::types::{PageId, PageNode};

    fn sample_tree() -> PageTree {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let mut trashed = PageNode::new("old", at).with_title("Archive").with_position(2);
        trashed.deleted_at = Some(at);
        PageTree::from_pages(vec![
            PageNode::new("a", at).with_title("Roadmap"),
            PageNode::new("b", at).with_position(1),
            PageNode::new("a1", at).with_title("Q3").with_parent(Some(PageId::from("a")), 1),
            trashed,
        ])
        .unwrap()
    }

    #[test]
    fn outline_is_depth_first() {
        let result = TreeResult::from_tree("ws", &sample_tree());
        let ids: Vec<&str> = result.pages.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a1", "b"]);
        assert_eq!(result.pages[1].parent_id.as_deref(), Some("a"));
        assert!(result.pages.iter().all(|row| row.id != "old"));
    }

    #[test]
    fn human_format_renders_tree() {
        let output = format_human(&TreeResult::from_tree("ws", &sample_tree()));
        assert!(output.starts_with("ws (3 page(s))"));
        assert!(output.contains("Roadmap [a]"));
        assert!(output.contains("  ├─ Q3 [a1]"));
        assert!(output.contains("Untitled [b]"));
        assert!(!output.contains("Archive"));
    }

    #[test]
    fn human_format_empty_tree() {
        let output = format_human(&TreeResult::from_tree("ws", &PageTree::new()));
        assert_eq!(output, "No pages in workspace ws.");
    }

    #[test]
    fn json_format_roundtrips() {
        let result = TreeResult::from_tree("ws", &sample_tree());
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &result, format_human).unwrap();
        let parsed: TreeResult = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed.pages.len(), 3);
        assert_eq!(parsed.pages[0].title, "Roadmap");
    }
}
