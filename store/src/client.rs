//! REST gateway to the hosted table-store.
//!
//! All persistence goes through this client: catalog reads, session row
//! writes, attachment uploads, and signed-path file fetches. Authentication
//! is a single `xc-token` header; listing endpoints answer with a
//! `{"list": [...]}` envelope.

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};

/// Rows fetched per listing call. The upstream tables are small; one page
/// is the whole table.
pub const LIST_LIMIT: u32 = 100;

/// Typed client for the table-store REST API.
#[derive(Clone)]
pub struct TableStore {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, serde::Deserialize)]
struct ListResponse<T> {
    list: Vec<T>,
}

/// One uploaded attachment as returned by the storage endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UploadedFile {
    /// Storage path to reference from an `img` column.
    pub path: String,
    /// Pre-signed fetch path.
    #[serde(rename = "signedPath")]
    pub signed_path: Option<String>,
}

impl TableStore {
    /// Create a client for the table-store at `base_url`, authenticating
    /// with the given API token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/api/v2/tables/{table}/records", self.base_url)
    }

    fn upload_url(&self) -> String {
        format!("{}/api/v2/storage/upload", self.base_url)
    }

    /// List up to [`LIST_LIMIT`] rows of `table`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] on transport failure, [`StoreError::Api`]
    /// on a non-success status, [`StoreError::Decode`] if the rows do not
    /// match `T`.
    pub async fn list_rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.records_url(table))
            .header("xc-token", &self.token)
            .query(&[("limit", LIST_LIMIT)])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let response = check(response).await?;
        let body: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(body.list)
    }

    /// Create one row and return its assigned `Id`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::list_rows`].
    pub async fn create_row<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<i64> {
        let response = self
            .client
            .post(self.records_url(table))
            .header("xc-token", &self.token)
            .json(row)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let response = check(response).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        body.get("Id")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| StoreError::Decode("create response missing Id".to_string()))
    }

    /// Patch one row. The body must carry the row's `Id`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::list_rows`].
    pub async fn update_row<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .client
            .patch(self.records_url(table))
            .header("xc-token", &self.token)
            .json(row)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        check(response).await?;
        Ok(())
    }

    /// Delete one row by id.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::list_rows`].
    pub async fn delete_row(&self, table: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.records_url(table))
            .header("xc-token", &self.token)
            .json(&serde_json::json!({ "Id": id }))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        check(response).await?;
        Ok(())
    }

    /// Upload one file to attachment storage.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::list_rows`]; also [`StoreError::Decode`]
    /// when the upload response is empty.
    pub async fn upload_attachment(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<UploadedFile> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .header("xc-token", &self.token)
            .query(&[("path", file_name)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let response = check(response).await?;
        let uploaded: Vec<UploadedFile> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        uploaded
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("upload response was empty".to_string()))
    }

    /// Fetch the raw bytes behind a storage path (typically a `signedPath`).
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] on 404; otherwise the usual taxonomy.
    pub async fn fetch_file(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("file {path}")));
        }
        let response = check(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}
