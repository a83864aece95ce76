// Server context shared by CLI commands: config, HTTP gateway, page lookup.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use folio_common::types::{PageId, WorkspaceId};
use folio_engine::config::{token_from_env, GlobalConfig};
use folio_engine::gateway::HttpGateway;
use folio_engine::sidebar::SidebarController;
use folio_engine::tree::PageTree;
use tracing::debug;

pub struct ServerContext {
    pub config: GlobalConfig,
    pub gateway: Arc<HttpGateway>,
    pub workspace_id: WorkspaceId,
}

impl ServerContext {
    /// Load config from `path`, or `~/.folio/config.toml` when `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => GlobalConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => GlobalConfig::load(),
        };
        Self::from_config(config)
    }

    pub fn from_config(config: GlobalConfig) -> anyhow::Result<Self> {
        let base_url = config.server_url()?;
        let workspace_id = config.workspace_id()?;
        let gateway = HttpGateway::new(base_url, token_from_env(), config.http.timeout())
            .context("failed to build HTTP client")?;
        debug!(server = %gateway.base_url(), workspace_id = %workspace_id, "server context ready");
        Ok(Self { config, gateway: Arc::new(gateway), workspace_id })
    }

    /// A sidebar loaded with the current server tree.
    pub async fn sidebar(&self) -> anyhow::Result<SidebarController<HttpGateway>> {
        let mut sidebar = SidebarController::new(Arc::clone(&self.gateway), self.workspace_id.clone());
        sidebar.refresh().await?;
        Ok(sidebar)
    }
}

/// Load the server context and drive `task` with it on a fresh runtime.
pub fn run<T, F, Fut>(config: Option<&Path>, task: F) -> anyhow::Result<T>
where
    F: FnOnce(ServerContext) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let ctx = ServerContext::load(config)?;
    block_on(task(ctx))?
}

/// Run `future` to completion on a fresh current-thread runtime.
fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

// ── Page lookup ────────────────────────────────────────────────────

/// A page argument that matched nothing, or more than one title.
#[derive(Debug)]
pub enum LookupError {
    NotFound(String),
    Ambiguous { needle: String, matches: Vec<PageId> },
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(needle) => write!(f, "page `{needle}` not found"),
            Self::Ambiguous { needle, matches } => {
                let ids: Vec<&str> = matches.iter().map(PageId::as_str).collect();
                write!(f, "page title `{needle}` is ambiguous; use an id: {}", ids.join(", "))
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Resolve a page by exact id, then by case-insensitive title.
pub fn resolve_page(tree: &PageTree, needle: &str) -> Result<PageId, LookupError> {
    let id = PageId::from(needle);
    if tree.contains(&id) {
        return Ok(id);
    }

    let mut matches: Vec<PageId> = tree
        .pages()
        .filter(|page| page.title.eq_ignore_ascii_case(needle.trim()))
        .map(|page| page.id.clone())
        .collect();
    matches.sort();
    match matches.len() {
        0 => Err(LookupError::NotFound(needle.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(LookupError::Ambiguous { needle: needle.to_string(), matches }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use folio_common::types::PageNode;

    fn tree() -> PageTree {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        PageTree::from_pages(vec![
            PageNode::new("a", at).with_title("Roadmap"),
            PageNode::new("b", at).with_title("Notes").with_position(1),
            PageNode::new("c", at).with_title("notes").with_position(2),
        ])
        .unwrap()
    }

    #[test]
    fn resolves_by_id_first() {
        assert_eq!(resolve_page(&tree(), "b").unwrap(), PageId::from("b"));
    }

    #[test]
    fn resolves_unique_title_case_insensitively() {
        assert_eq!(resolve_page(&tree(), "roadmap").unwrap(), PageId::from("a"));
    }

    #[test]
    fn duplicate_titles_are_ambiguous() {
        let err = resolve_page(&tree(), "Notes").unwrap_err();
        assert!(matches!(err, LookupError::Ambiguous { ref matches, .. } if matches.len() == 2));
        assert!(err.to_string().contains("b, c"));
    }

    #[test]
    fn unknown_page_is_not_found() {
        let err = resolve_page(&tree(), "ghost").unwrap_err();
        assert_eq!(err.to_string(), "page `ghost` not found");
    }

    #[test]
    fn context_requires_server_url() {
        let err = ServerContext::from_config(GlobalConfig::default()).err().unwrap();
        assert!(err.to_string().contains("server_url"));
    }
}
