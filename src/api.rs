use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};

use crate::{
    error::{ClientError, Result},
    types::{FolderEntry, FontFamilySummary, FontStyleEntry, ValidationOutcome},
};

/// Core abstraction over the Specimen backend HTTP API
///
/// One method per endpoint. Implementors are the real HTTP client and
/// in-memory fakes for tests.
#[async_trait]
pub trait SpecimenApi: Send + Sync {
    /// `GET /api/folders/` - list watched folders
    async fn list_folders(&self) -> Result<Vec<FolderEntry>>;

    /// `POST /api/folders/?path=<p>` - register a folder, returns the
    /// server-assigned entry
    async fn add_folder(&self, path: &str) -> Result<FolderEntry>;

    /// `DELETE /api/folders/{id}` - unregister a folder
    async fn remove_folder(&self, id: &str) -> Result<()>;

    /// `GET /api/folders/validate?path=<p>` - check path validity
    async fn validate_path(&self, path: &str) -> Result<ValidationOutcome>;

    /// `GET /fonts/representative` - list font family summaries
    async fn list_representatives(&self) -> Result<Vec<FontFamilySummary>>;

    /// `GET /fonts/family/{id}` - list styles in a family
    async fn list_family(&self, id: &str) -> Result<Vec<FontStyleEntry>>;

    /// `GET /api/fonts/{name}.woff2` - binary font data for preview
    async fn fetch_font(&self, name: &str) -> Result<Bytes>;

    /// `GET /scan/path?path=<p>` - trigger an on-demand scan
    async fn scan_path(&self, path: &str) -> Result<()>;
}

/// HTTP client for the Specimen backend
///
/// All endpoints are same-origin or reverse-proxied behind `base_url`;
/// no authentication layer is involved.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Create a new client against `base_url` (no trailing slash required)
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent("specimen-client/0.2")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build the preview URL path for a family's subset file
    ///
    /// The backend serves subsets under the family name with spaces
    /// replaced by dashes.
    fn font_path(name: &str) -> String {
        format!("/api/fonts/{}.woff2", name.replace(' ', "-"))
    }

    /// Map a non-success response to the error taxonomy
    async fn fail(what: &str, response: reqwest::Response) -> ClientError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return ClientError::NotFound {
                what: what.to_string(),
            };
        }
        ClientError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SpecimenApi for HttpApi {
    async fn list_folders(&self) -> Result<Vec<FolderEntry>> {
        let response = self.client.get(self.url("/api/folders/")).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(Self::fail("folder list", response).await),
        }
    }

    async fn add_folder(&self, path: &str) -> Result<FolderEntry> {
        let response = self
            .client
            .post(self.url("/api/folders/"))
            .query(&[("path", path)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
            _ => Err(Self::fail(path, response).await),
        }
    }

    async fn remove_folder(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/folders/{}", id)))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::fail(id, response).await)
        }
    }

    async fn validate_path(&self, path: &str) -> Result<ValidationOutcome> {
        let response = self
            .client
            .get(self.url("/api/folders/validate"))
            .query(&[("path", path)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(Self::fail(path, response).await),
        }
    }

    async fn list_representatives(&self) -> Result<Vec<FontFamilySummary>> {
        let response = self
            .client
            .get(self.url("/fonts/representative"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(Self::fail("representatives", response).await),
        }
    }

    async fn list_family(&self, id: &str) -> Result<Vec<FontStyleEntry>> {
        let response = self
            .client
            .get(self.url(&format!("/fonts/family/{}", id)))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(Self::fail(id, response).await),
        }
    }

    async fn fetch_font(&self, name: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.url(&Self::font_path(name)))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.bytes().await?),
            _ => Err(Self::fail(name, response).await),
        }
    }

    async fn scan_path(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .get(self.url("/scan/path"))
            .query(&[("path", path)])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::fail(path, response).await)
        }
    }
}
