//! Spreadsheet values API client.
//!
//! Talks to `GET/PUT {api_base}/v4/spreadsheets/{id}/values/{range}` with a
//! bearer token. One method call is one HTTP request; failures are mapped
//! to classified [`RemoteError`]s and never retried here.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell_ref::CellRef;
use crate::config::SheetsConfig;
use crate::error::{NetworkCode, RemoteError};
use crate::transport::CellTransport;

/// Body of a values read/write.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// REST client for one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    api_base: Url,
    spreadsheet_id: String,
    access_token: Option<String>,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, RemoteError> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(RemoteError::Other(
                "spreadsheet id is not configured".to_owned(),
            ));
        }
        let api_base = Url::parse(&config.api_base).map_err(|e| {
            RemoteError::Other(format!("invalid api base {:?}: {e}", config.api_base))
        })?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// URL of the values resource for `cell`.
    pub fn values_url(&self, cell: &CellRef) -> Result<Url, RemoteError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RemoteError::Other(format!("api base {} cannot hold a path", self.api_base))
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                &cell.to_string(),
            ]);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl CellTransport for SheetsClient {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn get_cell(&self, cell: &CellRef) -> Result<String, RemoteError> {
        let url = self.values_url(cell)?;
        debug!(%url, "GET cell");

        let response = self
            .authorize(self.http.get(url))
            .query(&[("valueRenderOption", "FORMATTED_VALUE")])
            .send()
            .await
            .map_err(classify_request_error)?;
        let response = check_status(response).await?;

        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| RemoteError::Other(format!("failed to parse values response: {e}")))?;

        Ok(first_value(&body))
    }

    async fn set_cell(&self, cell: &CellRef, value: &str) -> Result<(), RemoteError> {
        let url = self.values_url(cell)?;
        debug!(%url, bytes = value.len(), "PUT cell");

        let body = ValueRange {
            range: Some(cell.to_string()),
            major_dimension: Some("ROWS".to_owned()),
            values: vec![vec![serde_json::Value::String(value.to_owned())]],
        };

        let response = self
            .authorize(self.http.put(url))
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn first_value(body: &ValueRange) -> String {
    match body.values.first().and_then(|row| row.first()) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Turn a non-success response into a classified error.
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned()
    });

    let err = RemoteError::http(status.as_u16(), message);
    Err(match retry_after {
        Some(hint) => err.with_retry_after(hint),
        None => err,
    })
}

fn error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let mut message = envelope.error.message;
    if let Some(status) = envelope.error.status {
        message = format!("{status}: {message}");
    }
    Some(message)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a request that never produced a response to a network code.
fn classify_request_error(err: reqwest::Error) -> RemoteError {
    let code = if err.is_timeout() {
        NetworkCode::TimedOut
    } else if let Some(kind) = io_error_kind(&err) {
        match kind {
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                NetworkCode::ConnectionReset
            }
            io::ErrorKind::ConnectionRefused => NetworkCode::ConnectionRefused,
            io::ErrorKind::TimedOut => NetworkCode::TimedOut,
            _ if err.is_connect() => connect_code(&err),
            _ => NetworkCode::Other,
        }
    } else if err.is_connect() {
        connect_code(&err)
    } else {
        NetworkCode::Other
    };
    RemoteError::network(code, err.to_string())
}

fn connect_code(err: &reqwest::Error) -> NetworkCode {
    if error_chain_mentions(err, "dns") {
        NetworkCode::DnsFailure
    } else {
        NetworkCode::ConnectionRefused
    }
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = inner.source();
    }
    None
}

fn error_chain_mentions(err: &reqwest::Error, needle: &str) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(inner) = source {
        if inner.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        source = inner.source();
    }
    false
}
