//! HTTP client for the Statelessor analysis API.
//!
//! Every call gets a fresh correlation id in the `X-Request-ID` header and
//! every failure goes through [`classify`], which decides whether the
//! service rejected the request, never answered, or the request could not
//! be built in the first place. Nothing is retried.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiErrorKind};
use crate::types::{AnalysisResult, HistoricalFinding, ScriptType, SshKeyPair};

/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Multipart field holding the uploaded archive.
pub const ARCHIVE_FIELD: &str = "zipFile";

const OP_ANALYZE_REPOSITORY: &str = "analyzeRepository";
const OP_ANALYZE_LOCAL_ARCHIVE: &str = "analyzeLocalArchive";
const OP_GENERATE_SCRIPT: &str = "generateScript";
const OP_FETCH_FINDINGS: &str = "fetchFindings";
const OP_GENERATE_SSH_KEY: &str = "generateSshKey";

/// Raw failure observed while talking to the service, before classification.
#[derive(Debug)]
pub enum Failure {
    /// The service answered with a non-success status.
    Status { status: StatusCode, body: String },
    /// reqwest reported an error building, sending, or decoding.
    Http(reqwest::Error),
    /// Something local went wrong before the request could be sent.
    Local(String),
}

/// Normalize any failure into an [`ApiError`] for `operation`.
pub fn classify(operation: &'static str, failure: Failure) -> ApiError {
    let kind = match failure {
        Failure::Status { status, body } => ApiErrorKind::Remote {
            status: status.as_u16(),
            message: remote_message(status, &body),
        },
        Failure::Http(err) if err.is_builder() => ApiErrorKind::RequestSetup {
            message: err.to_string(),
        },
        Failure::Http(err) if err.is_decode() => ApiErrorKind::RequestSetup {
            message: format!("invalid response body: {err}"),
        },
        Failure::Http(err) => ApiErrorKind::Transport {
            detail: err.to_string(),
        },
        Failure::Local(message) => ApiErrorKind::RequestSetup { message },
    };
    let error = ApiError::new(operation, kind);
    if let ApiErrorKind::Transport { detail } = &error.kind {
        warn!(operation, "no response from Statelessor API: {detail}");
    } else {
        warn!(operation, "Statelessor API call failed: {}", error.kind.cause());
    }
    error
}

/// `error` field of a JSON error body, else the status's reason phrase.
fn remote_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("error") {
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}

/// Client for the remote analysis service.
///
/// Cheap to clone; construct one per process and share it.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Build a client with the configured timeout and user agent.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| classify("createClient", Failure::Http(e)))?;
        Ok(Self {
            http,
            base_url: config.normalized_base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Analyze a Git repository cloned by the service.
    #[instrument(skip(self, ssh_key_id), fields(has_ssh_key = ssh_key_id.is_some()))]
    pub async fn analyze_repository(
        &self,
        git_url: &str,
        ssh_key_id: Option<&str>,
    ) -> Result<AnalysisResult, ApiError> {
        let op = OP_ANALYZE_REPOSITORY;
        let url = self.endpoint(op, &["analyze"])?;
        let body = json!({
            "type": "git",
            "gitUrl": git_url,
            "sshKeyId": ssh_key_id,
        });
        let response = self.send(op, self.http.post(url).json(&body)).await?;
        decode_json(op, response).await
    }

    /// Upload a packaged project and analyze it.
    ///
    /// The archive is streamed from disk rather than read into memory.
    #[instrument(skip(self, archive_path), fields(archive = %archive_path.display()))]
    pub async fn analyze_local_archive(
        &self,
        archive_path: &Path,
    ) -> Result<AnalysisResult, ApiError> {
        let op = OP_ANALYZE_LOCAL_ARCHIVE;
        let url = self.endpoint(op, &["analyze"])?;

        let file = tokio::fs::File::open(archive_path).await.map_err(|e| {
            classify(
                op,
                Failure::Local(format!("cannot open archive {}: {e}", archive_path.display())),
            )
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| classify(op, Failure::Local(format!("cannot stat archive: {e}"))))?
            .len();
        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project.zip".to_string());

        let part = Part::stream_with_length(Body::from(file), len)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| classify(op, Failure::Http(e)))?;
        let form = Form::new().text("type", "zip").part(ARCHIVE_FIELD, part);

        let response = self.send(op, self.http.post(url).multipart(form)).await?;
        decode_json(op, response).await
    }

    /// Fetch the raw text of an offline analysis script.
    #[instrument(skip(self))]
    pub async fn generate_script(&self, script_type: ScriptType) -> Result<String, ApiError> {
        let op = OP_GENERATE_SCRIPT;
        let url = self.endpoint(op, &["api", "script", script_type.as_str()])?;
        let response = self.send(op, self.http.get(url)).await?;
        response
            .text()
            .await
            .map_err(|e| classify(op, Failure::Http(e)))
    }

    /// Scan history for a project, oldest first.
    ///
    /// An empty body, `null`, or `[]` all mean "no history" and yield an
    /// empty list.
    #[instrument(skip(self))]
    pub async fn fetch_findings(
        &self,
        project_name: &str,
    ) -> Result<Vec<HistoricalFinding>, ApiError> {
        let op = OP_FETCH_FINDINGS;
        let url = self.endpoint(op, &["findings", project_name])?;
        let response = self.send(op, self.http.get(url)).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| classify(op, Failure::Http(e)))?;
        parse_findings(&raw).map_err(|e| {
            classify(op, Failure::Local(format!("invalid findings payload: {e}")))
        })
    }

    /// Ask the service to generate a deploy key for private repositories.
    #[instrument(skip(self))]
    pub async fn generate_ssh_key(&self) -> Result<SshKeyPair, ApiError> {
        let op = OP_GENERATE_SSH_KEY;
        let url = self.endpoint(op, &["api", "ssh", "generate"])?;
        let response = self.send(op, self.http.post(url).json(&json!({}))).await?;
        decode_json(op, response).await
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, op: &'static str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            classify(op, Failure::Local(format!("invalid base URL {}: {e}", self.base_url)))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                classify(op, Failure::Local(format!("base URL {} cannot have a path", self.base_url)))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach a fresh correlation id, send, and reject non-success statuses.
    async fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        debug!(operation = op, request_id = %request_id, "sending request");

        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(|e| classify(op, Failure::Http(e)))?;

        let status = response.status();
        debug!(operation = op, request_id = %request_id, status = status.as_u16(), "response received");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(op, Failure::Status { status, body }))
    }
}

async fn decode_json<T: DeserializeOwned>(op: &'static str, response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| classify(op, Failure::Http(e)))
}

fn parse_findings(raw: &str) -> Result<Vec<HistoricalFinding>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) if map.contains_key("findings") => {
            match map.remove("findings").unwrap_or(Value::Null) {
                Value::Null => Ok(Vec::new()),
                other => serde_json::from_value(other),
            }
        }
        other => serde_json::from_value(other),
    }
}
