use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::model::DownloadFormat;

/// Prepares a download and answers with the location of the finished file.
#[async_trait]
pub trait PrepareService: Send + Sync {
    async fn prepare(&self, url: &str, format: DownloadFormat) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct PrepareRequest<'a> {
    url: &'a str,
    format: DownloadFormat,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrepareResponse {
    download_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// `POST`s `{url, format}` as JSON to the preparation endpoint.
pub struct HttpPrepareService {
    client: Client,
    endpoint: Url,
}

impl HttpPrepareService {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl PrepareService for HttpPrepareService {
    async fn prepare(&self, url: &str, format: DownloadFormat) -> Result<String, ServiceError> {
        debug!(endpoint = %self.endpoint, url, ?format, "requesting download");
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&PrepareRequest { url, format })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message_from_body(&body),
            });
        }

        let parsed: PrepareResponse =
            serde_json::from_str(&body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        if parsed.download_url.trim().is_empty() {
            return Err(ServiceError::Malformed("empty downloadUrl".to_string()));
        }
        Ok(parsed.download_url)
    }
}

/// Pulls a readable message out of an error response: a non-blank JSON
/// `error` or `message` field, else the raw text.
fn error_message_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let field = parsed
            .error
            .and_then(non_blank)
            .or_else(|| parsed.message.and_then(non_blank));
        if field.is_some() {
            return field;
        }
    }
    Some(body.to_string())
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
