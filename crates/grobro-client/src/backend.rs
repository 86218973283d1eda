use std::future::Future;

use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use grobro_types::api::{UpdateProfileRequest, UpdateProfileResponse, UploadResponse};
use grobro_types::models::Profile;

/// Must match the server's upload header.
const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("server did not accept the update")]
    Rejected,
}

/// An image picked by the user, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The API calls the settings page depends on.
pub trait ProfileBackend {
    fn update_profile(
        &self,
        req: &UpdateProfileRequest,
    ) -> impl Future<Output = Result<UpdateProfileResponse, ClientError>> + Send;

    fn fetch_profile(&self, id: Uuid) -> impl Future<Output = Result<Profile, ClientError>> + Send;

    /// Store the file and return its public link.
    fn upload_avatar(&self, file: &PhotoFile) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// [`ProfileBackend`] over the GroBro REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ProfileBackend for HttpBackend {
    async fn update_profile(&self, req: &UpdateProfileRequest) -> Result<UpdateProfileResponse, ClientError> {
        let response = self
            .client
            .put(self.url("/users/settings"))
            .bearer_auth(&self.token)
            .json(req)
            .send()
            .await?;
        decode(response).await
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Profile, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/users/{}", id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    async fn upload_avatar(&self, file: &PhotoFile) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("/users/avatar"))
            .bearer_auth(&self.token)
            .header(FILE_NAME_HEADER, &file.name)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(file.bytes.clone())
            .send()
            .await?;
        let uploaded: UploadResponse = decode(response).await?;
        Ok(uploaded.link)
    }
}

/// Decode a JSON body, turning non-2xx answers into [`ClientError::Status`]
/// with the server's error message when it sent one.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(text);

    Err(ClientError::Status { status, message })
}
