use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use noted_types::{LogEntry, VersionId};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::endpoint::{RemoteEndpoint, RemoteError, RemoteResult};

const GET_LOGS: &str = "/api/store/getLogs";
const APPEND_LOG: &str = "/api/store/appendLog";
const GET_CONTENT: &str = "/api/store/getContent";
const SET_CONTENT: &str = "/api/store/setContent";

/// [`RemoteEndpoint`] over the store's JSON/HTTP API.
#[derive(Clone, Debug)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct AppendResponse {
    #[serde(default)]
    ok: bool,
}

impl HttpEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::Config(format!(
                "base url must be http(s): {base_url:?}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(
        method: &'static str,
        path: &'static str,
        response: reqwest::Response,
    ) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            method,
            path,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteEndpoint for HttpEndpoint {
    async fn get_logs(&self, start: usize) -> RemoteResult<Vec<LogEntry>> {
        let response = self
            .client
            .get(self.url(GET_LOGS))
            .query(&[("start", start)])
            .send()
            .await?;
        let response = Self::check("GET", GET_LOGS, response).await?;
        let bytes = response.bytes().await?;
        let entries: Vec<LogEntry> =
            serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))?;
        debug!(start, fetched = entries.len(), "getLogs");
        Ok(entries)
    }

    async fn append_log(&self, entry: &LogEntry) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.url(APPEND_LOG))
            .json(entry)
            .send()
            .await?;
        let response = Self::check("POST", APPEND_LOG, response).await?;
        let ack: AppendResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if !ack.ok {
            return Err(RemoteError::Rejected);
        }
        Ok(())
    }

    async fn get_content(&self, version: &VersionId) -> RemoteResult<Option<Bytes>> {
        let response = self
            .client
            .get(self.url(GET_CONTENT))
            .query(&[("id", version.as_str())])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check("GET", GET_CONTENT, response).await?;
        Ok(Some(response.bytes().await?))
    }

    async fn set_content(&self, version: &VersionId, content: Bytes) -> RemoteResult<()> {
        let size = content.len();
        let response = self
            .client
            .post(self.url(SET_CONTENT))
            .query(&[("id", version.as_str())])
            .body(content)
            .send()
            .await?;
        Self::check("POST", SET_CONTENT, response).await?;
        debug!(version = %version, size, "setContent");
        Ok(())
    }
}
