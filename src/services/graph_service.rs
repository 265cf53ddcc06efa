//! src/services/graph_service.rs
//!
//! GraphService wraps the narrow slice of Microsoft Graph this service needs:
//! a client-credentials token exchange, a drive file upload and a list item
//! create, plus the site/list/drive id lookups used to fill in configuration.
//! Every operation fetches a fresh token; nothing is cached.

use crate::config::GraphSettings;
use bytes::Bytes;
use reqwest::{Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not configured: {}", .0.join(", "))]
    NotConfigured(Vec<&'static str>),
    #[error("Token error: {status} {body}")]
    Auth { status: u16, body: String },
    #[error("Upload error: {status} {body}")]
    Upload { status: u16, body: String },
    #[error("List create error: {status} {body}")]
    RecordCreate { status: u16, body: String },
    #[error("Lookup error: {status} {body}")]
    Lookup { status: u16, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Descriptor Graph returns for an uploaded file.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub web_url: String,
}

/// Descriptor Graph returns for a created list item.
#[derive(Deserialize, Debug, Clone)]
pub struct ListItem {
    pub id: String,
}

/// Site, list or drive as returned by Graph collection and item reads.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct NamedResource {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Serialize)]
struct CreateListItem<'a, F: Serialize> {
    fields: &'a F,
}

#[derive(Clone, Debug)]
pub struct GraphService {
    http: reqwest::Client,
    settings: GraphSettings,
}

impl GraphService {
    pub fn new(http: reqwest::Client, settings: GraphSettings) -> Self {
        Self { http, settings }
    }

    /// Exchange the client credentials for a bearer token.
    pub async fn access_token(&self) -> GraphResult<String> {
        let s = &self.settings;
        let (tenant, client_id, secret) =
            match (&s.tenant_id, &s.client_id, &s.client_secret) {
                (Some(t), Some(c), Some(k)) => (t, c, k),
                _ => return Err(GraphError::NotConfigured(s.missing_identity())),
            };

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            s.login_base_url.trim_end_matches('/'),
            tenant
        );
        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let res = self.http.post(&url).form(&params).send().await?;
        let res = ensure_success(res, |status, body| GraphError::Auth { status, body }).await?;
        let token: TokenResponse = res.json().await?;
        debug!("Acquired Graph access token");
        Ok(token.access_token)
    }

    /// Upload bytes as `{image_folder}/{file_name}` in the configured drive.
    pub async fn upload_file(
        &self,
        data: Bytes,
        file_name: &str,
        content_type: &str,
    ) -> GraphResult<DriveItem> {
        let s = &self.settings;
        let (site, drive) = match (&s.site_id, &s.drive_id) {
            (Some(site), Some(drive)) => (site, drive),
            _ => return Err(GraphError::NotConfigured(s.missing_storage())),
        };

        let token = self.access_token().await?;
        let url = format!(
            "{}/sites/{}/drives/{}/root:/{}/{}:/content",
            s.graph_base_url.trim_end_matches('/'),
            site,
            drive,
            urlencoding::encode(&s.image_folder),
            urlencoding::encode(file_name)
        );
        debug!(%url, bytes = data.len(), "Uploading file to drive");

        let res = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        let res = ensure_success(res, |status, body| GraphError::Upload { status, body }).await?;
        Ok(res.json().await?)
    }

    /// Create one item in the configured list with the given column values.
    pub async fn create_list_item<F: Serialize>(&self, fields: &F) -> GraphResult<ListItem> {
        let s = &self.settings;
        let (site, list) = match (&s.site_id, &s.list_id) {
            (Some(site), Some(list)) => (site, list),
            _ => return Err(GraphError::NotConfigured(s.missing_storage())),
        };

        let token = self.access_token().await?;
        let url = format!(
            "{}/sites/{}/lists/{}/items",
            s.graph_base_url.trim_end_matches('/'),
            site,
            list
        );

        let res = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&CreateListItem { fields })
            .send()
            .await?;
        let res = ensure_success(res, |status, body| GraphError::RecordCreate { status, body })
            .await?;
        Ok(res.json().await?)
    }

    /// Id of the site at `{host}:{site_path}`, `None` when Graph reports 404.
    pub async fn site_id(&self, host: &str, site_path: &str) -> GraphResult<Option<String>> {
        let path = if site_path.starts_with('/') {
            site_path.to_string()
        } else {
            format!("/{}", site_path)
        };
        let url = format!("{}/sites/{}:{}", self.graph_base(), host, path);

        let res = self.authorized_get(&url).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = ensure_success(res, |status, body| GraphError::Lookup { status, body }).await?;
        let site: NamedResource = res.json().await?;
        Ok(Some(site.id))
    }

    /// Id of the list in `site_id` whose name or display name is `name`.
    pub async fn list_id_by_name(&self, site_id: &str, name: &str) -> GraphResult<Option<String>> {
        let url = format!("{}/sites/{}/lists", self.graph_base(), site_id);
        let lists = self.collection(&url).await?;
        Ok(lists
            .into_iter()
            .find(|list| {
                list.name.as_deref() == Some(name) || list.display_name.as_deref() == Some(name)
            })
            .map(|list| list.id))
    }

    /// Id of the document library in `site_id` named `name`.
    pub async fn drive_id_by_name(&self, site_id: &str, name: &str) -> GraphResult<Option<String>> {
        let url = format!("{}/sites/{}/drives", self.graph_base(), site_id);
        let drives = self.collection(&url).await?;
        Ok(drives
            .into_iter()
            .find(|drive| drive.name.as_deref() == Some(name))
            .map(|drive| drive.id))
    }

    fn graph_base(&self) -> &str {
        self.settings.graph_base_url.trim_end_matches('/')
    }

    async fn authorized_get(&self, url: &str) -> GraphResult<Response> {
        let token = self.access_token().await?;
        debug!(%url, "Graph lookup");
        Ok(self.http.get(url).bearer_auth(token).send().await?)
    }

    async fn collection(&self, url: &str) -> GraphResult<Vec<NamedResource>> {
        let res = self.authorized_get(url).await?;
        let res = ensure_success(res, |status, body| GraphError::Lookup { status, body }).await?;
        let page: Collection<NamedResource> = res.json().await?;
        Ok(page.value)
    }
}

/// Turn a non-2xx response into the given error, keeping status and body text.
async fn ensure_success(
    res: Response,
    to_error: impl FnOnce(u16, String) -> GraphError,
) -> GraphResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(to_error(status.as_u16(), body))
}
