// REST implementation of `PageGateway` over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use folio_common::protocol::pages::{
    ApiErrorBody, CreatePageRequest, ListPagesResponse, MovePageRequest, PatchPageRequest,
    ReorderPagesRequest,
};
use folio_common::protocol::routes;
use folio_common::types::{PageDocument, PageId, PageNode, WorkspaceId};

use super::{GatewayError, GatewayResult, PageGateway};

/// Gateway bound to one server.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transient(format!("failed to build http client: {e}")))?;
        Ok(Self { client, base_url, token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> GatewayResult<RequestBuilder> {
        let url = join_route(&self.base_url, path)?;
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> GatewayResult<T> {
        debug!(%method, path, "gateway request");
        let mut builder = self.request(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PageGateway for HttpGateway {
    async fn list_pages(&self, workspace_id: &WorkspaceId) -> GatewayResult<Vec<PageNode>> {
        let path = routes::workspace_pages(workspace_id);
        let response: ListPagesResponse = self.call(Method::GET, &path, None::<&()>).await?;
        Ok(response.pages)
    }

    async fn create_page(&self, request: CreatePageRequest) -> GatewayResult<PageNode> {
        self.call(Method::POST, routes::CREATE_PAGE, Some(&request)).await
    }

    async fn move_page(&self, page_id: &PageId, new_parent: Option<&PageId>) -> GatewayResult<PageNode> {
        let body = MovePageRequest { new_parent_id: new_parent.cloned() };
        self.call(Method::POST, &routes::move_page(page_id), Some(&body)).await
    }

    async fn reorder_pages(&self, parent: Option<&PageId>, ordered: &[PageId]) -> GatewayResult<()> {
        let body =
            ReorderPagesRequest { parent_id: parent.cloned(), ordered_page_ids: ordered.to_vec() };
        debug!(count = ordered.len(), "gateway reorder");
        let builder = self.request(Method::POST, routes::REORDER_PAGES)?.json(&body);
        self.send(builder).await?;
        Ok(())
    }

    async fn soft_delete_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        self.call(Method::DELETE, &routes::page(page_id), None::<&()>).await
    }

    async fn restore_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        self.call(Method::POST, &routes::restore_page(page_id), None::<&()>).await
    }

    async fn get_page(&self, page_id: &PageId) -> GatewayResult<PageDocument> {
        self.call(Method::GET, &routes::page(page_id), None::<&()>).await
    }

    async fn patch_page(&self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode> {
        self.call(Method::PATCH, &routes::page(page_id), Some(&patch)).await
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Append an absolute route to the base URL, keeping any base path prefix.
fn join_route(base: &Url, route: &str) -> GatewayResult<Url> {
    let mut joined = base.clone();
    let prefix = base.path().trim_end_matches('/');
    joined.set_path(&format!("{prefix}{route}"));
    if joined.cannot_be_a_base() {
        return Err(GatewayError::Decode(format!("invalid base url: {base}")));
    }
    Ok(joined)
}

fn network_error(error: reqwest::Error) -> GatewayError {
    if error.is_decode() {
        GatewayError::Decode(error.to_string())
    } else {
        GatewayError::Transient(error.to_string())
    }
}

/// 5xx and 429 are worth retrying; every other failure is a rejection.
fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|err| err.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::Transient(format!("{status}: {message}"))
    } else {
        GatewayError::Rejected { status: status.as_u16(), message }
    }
}
