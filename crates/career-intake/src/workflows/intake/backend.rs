//! HTTP adapters for the persistence REST API and its upload endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BackendConfig;

use super::documents::{DocumentStore, StoredDocument, UploadError, UploadFile};
use super::gateway::{ApplicationId, SubmissionError, SubmissionGateway, SubmissionReceipt};
use super::record::ApplicationRecord;

/// Talks to `POST /users` for submissions and `POST /upload` for documents.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

async fn error_body(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

/// Accepts both string and numeric identifiers.
fn parse_id(payload: &Value) -> Option<ApplicationId> {
    match payload.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(ApplicationId(id.clone())),
        Value::Number(id) => Some(ApplicationId(id.to_string())),
        _ => None,
    }
}

#[async_trait]
impl SubmissionGateway for HttpBackend {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let url = self.config.endpoint("/users");
        debug!(%url, "submitting application record");

        let response = self
            .http
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            warn!(status, "backend rejected application submission");
            return Err(SubmissionError::Rejected { status, message });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| SubmissionError::InvalidResponse(err.to_string()))?;

        parse_id(&payload)
            .map(|id| SubmissionReceipt { id })
            .ok_or_else(|| SubmissionError::InvalidResponse(format!("missing id in {payload}")))
    }
}

#[async_trait]
impl DocumentStore for HttpBackend {
    async fn upload(&self, file: UploadFile) -> Result<StoredDocument, UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        let url = self.config.endpoint("/upload");
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|err| UploadError::Rejected(err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            warn!(status, "upload service rejected document");
            return Err(UploadError::Rejected(format!("{status}: {message}")));
        }

        response
            .json::<StoredDocument>()
            .await
            .map_err(|err| UploadError::Rejected(format!("unexpected upload response: {err}")))
    }
}
