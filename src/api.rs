// API client module: a small blocking HTTP client for the NodeODM REST API.
// Every call is synchronous; the UI layer decides when to poll.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::presets::TaskOption;
use crate::settings::ServerSettings;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Endpoints tried, in order, by [`ApiClient::test_connection`].
const PROBE_ENDPOINTS: [&str; 3] = ["/info", "/", "/task/list"];

/// Blocking NodeODM client: a reqwest client, the server base URL (no
/// trailing slash) and the optional access token sent as `?token=`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Lifecycle state reported by NodeODM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "StatusField")]
pub enum TaskStatus {
    Queued,
    Running,
    Failed,
    Completed,
    Canceled,
    Unknown(i64),
}

/// NodeODM sends `{"code": 20}`, older builds a bare `20`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusField {
    Object { code: i64 },
    Code(i64),
}

impl From<StatusField> for TaskStatus {
    fn from(field: StatusField) -> Self {
        match field {
            StatusField::Object { code } | StatusField::Code(code) => TaskStatus::from_code(code),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Unknown(0)
    }
}

impl TaskStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            10 => TaskStatus::Queued,
            20 => TaskStatus::Running,
            30 => TaskStatus::Failed,
            40 => TaskStatus::Completed,
            50 => TaskStatus::Canceled,
            other => TaskStatus::Unknown(other),
        }
    }

    /// No further progress will be reported.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Completed | TaskStatus::Canceled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => f.write_str("QUEUED"),
            TaskStatus::Running => f.write_str("RUNNING"),
            TaskStatus::Failed => f.write_str("FAILED"),
            TaskStatus::Completed => f.write_str("COMPLETED"),
            TaskStatus::Canceled => f.write_str("CANCELED"),
            TaskStatus::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Response of `/task/{uuid}/info`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: f64,
    /// Milliseconds; NodeODM reports -1 before processing starts.
    #[serde(default)]
    pub processing_time: i64,
    #[serde(default)]
    pub images_count: u64,
}

impl TaskInfo {
    fn placeholder(uuid: &str) -> Self {
        TaskInfo {
            uuid: uuid.to_string(),
            name: "Task".into(),
            status: TaskStatus::default(),
            progress: 0.0,
            processing_time: 0,
            images_count: 0,
        }
    }

    /// Processing time as `mm:ss`, or `None` if nothing has run yet.
    pub fn elapsed(&self) -> Option<String> {
        if self.processing_time <= 0 {
            return None;
        }
        let minutes = self.processing_time / (1000 * 60);
        let seconds = (self.processing_time / 1000) % 60;
        Some(format!("{minutes:02}:{seconds:02}"))
    }

    /// `name: STATUS (p%) (mm:ss)`
    pub fn status_line(&self) -> String {
        let mut line = format!("{}: {} ({}%)", self.name, self.status, self.progress as i64);
        if let Some(elapsed) = self.elapsed() {
            line.push_str(&format!(" ({elapsed})"));
        }
        line
    }
}

#[derive(Debug, Deserialize)]
struct TaskListEntry {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewTaskResponse {
    uuid: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct UuidRequest<'a> {
    uuid: &'a str,
}

impl ApiClient {
    /// Create a client for the server described by `settings`.
    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token().map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the token query parameter when one is configured.
    fn with_token(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.query(&[("token", token.as_str())]),
            None => req,
        }
    }

    fn get(&self, path: &str, timeout: Duration) -> Result<Response> {
        let url = self.url(path);
        debug!("GET {url}");
        self.with_token(self.client.get(&url).timeout(timeout))
            .send()
            .with_context(|| format!("Failed to send request to {url}"))
    }

    /// True when any of the probe endpoints answers 200.
    pub fn test_connection(&self) -> bool {
        PROBE_ENDPOINTS.iter().any(|endpoint| {
            match self.client.get(self.url(endpoint)).timeout(PROBE_TIMEOUT).send() {
                Ok(res) => res.status().is_success(),
                Err(err) => {
                    debug!("probe {endpoint} failed: {err}");
                    false
                }
            }
        })
    }

    /// Create a task with the given images and start processing. The GCP
    /// file, if any, is uploaded alongside the images as NodeODM expects.
    pub fn create_task(
        &self,
        images: &[PathBuf],
        gcp_file: Option<&Path>,
        options: &[TaskOption],
        name: Option<&str>,
    ) -> Result<String> {
        let mut form = multipart::Form::new();
        for path in images.iter().map(PathBuf::as_path).chain(gcp_file) {
            form = form
                .file("images", path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
        }
        if !options.is_empty() {
            let encoded = serde_json::to_string(options).context("Encoding task options")?;
            form = form.text("options", encoded);
        }
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }

        let url = self.url("/task/new");
        debug!("POST {url} ({} images)", images.len());
        let res = self
            .with_token(self.client.post(&url).timeout(UPLOAD_TIMEOUT))
            .multipart(form)
            .send()
            .context("Failed to send task creation request")?;
        let body: NewTaskResponse = success_json(res, "Task creation")?;
        match (body.uuid, body.error) {
            (Some(uuid), _) => Ok(uuid),
            (None, Some(error)) => bail!("Task creation failed: {}", error),
            (None, None) => bail!("Task creation failed: response had no uuid"),
        }
    }

    /// UUIDs of all tasks known to the server.
    pub fn task_list(&self) -> Result<Vec<String>> {
        let res = self.get("/task/list", REQUEST_TIMEOUT)?;
        let entries: Vec<TaskListEntry> = success_json(res, "Task list")?;
        Ok(entries.into_iter().filter_map(|e| e.uuid).collect())
    }

    /// Every task with its details. Tasks whose info cannot be fetched are
    /// still listed with a placeholder entry.
    pub fn tasks(&self) -> Result<Vec<TaskInfo>> {
        let uuids = self.task_list()?;
        Ok(uuids
            .iter()
            .map(|uuid| {
                self.task_info(uuid).unwrap_or_else(|err| {
                    warn!("no info for task {uuid}: {err:#}");
                    TaskInfo::placeholder(uuid)
                })
            })
            .collect())
    }

    pub fn task_info(&self, uuid: &str) -> Result<TaskInfo> {
        let res = self.get(&format!("/task/{uuid}/info"), REQUEST_TIMEOUT)?;
        success_json(res, "Task info")
    }

    /// Stream `all.zip` of a finished task to `output`. Returns bytes written.
    pub fn download_all(&self, uuid: &str, output: &Path) -> Result<u64> {
        let mut res = self.get(&format!("/task/{uuid}/download/all.zip"), DOWNLOAD_TIMEOUT)?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("Download failed: {} - {}", status, txt);
        }
        let mut file = File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let written = res
            .copy_to(&mut file)
            .context("Failed while downloading results")?;
        debug!("downloaded {written} bytes to {}", output.display());
        Ok(written)
    }

    pub fn cancel_task(&self, uuid: &str) -> Result<bool> {
        self.post_uuid("/task/cancel", uuid, "Cancel")
    }

    pub fn remove_task(&self, uuid: &str) -> Result<bool> {
        self.post_uuid("/task/remove", uuid, "Remove")
    }

    fn post_uuid(&self, path: &str, uuid: &str, what: &str) -> Result<bool> {
        let url = self.url(path);
        debug!("POST {url} ({uuid})");
        let res = self
            .with_token(self.client.post(&url))
            .json(&UuidRequest { uuid })
            .send()
            .with_context(|| format!("Failed to send {} request", what.to_lowercase()))?;
        let body: SuccessResponse = success_json(res, what)?;
        if let Some(error) = body.error {
            warn!("{what} {uuid}: {error}");
        }
        Ok(body.success)
    }
}

/// Decode a JSON body, or fail with the status and body text.
fn success_json<T: serde::de::DeserializeOwned>(res: Response, what: &str) -> Result<T> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_else(|_| "".into());
        bail!("{} failed: {} - {}", what, status, txt);
    }
    res.json()
        .with_context(|| format!("Parsing {} response json", what.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_object_or_bare_code() {
        let info: TaskInfo = serde_json::from_str(
            r#"{"uuid":"u1","name":"Survey","status":{"code":20},"progress":42.7,"processingTime":125000,"imagesCount":31}"#,
        )
        .unwrap();
        assert_eq!(info.status, TaskStatus::Running);
        assert_eq!(info.images_count, 31);
        assert_eq!(info.status_line(), "Survey: RUNNING (42%) (02:05)");

        let info: TaskInfo = serde_json::from_str(r#"{"uuid":"u2","status":40}"#).unwrap();
        assert_eq!(info.status, TaskStatus::Completed);
        assert!(info.status.is_terminal());
        assert_eq!(info.elapsed(), None);
    }

    #[test]
    fn unknown_and_missing_status() {
        let info: TaskInfo = serde_json::from_str(r#"{"uuid":"u3","status":{"code":99}}"#).unwrap();
        assert_eq!(info.status.to_string(), "UNKNOWN(99)");
        let info: TaskInfo = serde_json::from_str(r#"{"uuid":"u4"}"#).unwrap();
        assert_eq!(info.status, TaskStatus::Unknown(0));
        assert!(!info.status.is_terminal());
    }

    #[test]
    fn new_task_response_shapes() {
        let ok: NewTaskResponse = serde_json::from_str(r#"{"uuid":"abc"}"#).unwrap();
        assert_eq!(ok.uuid.as_deref(), Some("abc"));
        let err: NewTaskResponse = serde_json::from_str(r#"{"error":"Not enough images"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("Not enough images"));
    }

    #[test]
    fn client_strips_trailing_slash_and_empty_token() {
        let settings = ServerSettings {
            base_url: "http://odm:3000/".into(),
            token: String::new(),
        };
        let api = ApiClient::from_settings(&settings).unwrap();
        assert_eq!(api.base_url(), "http://odm:3000");
        assert_eq!(api.url("/task/new"), "http://odm:3000/task/new");
        assert!(api.token.is_none());
    }

    #[test]
    fn task_options_encode_as_name_value_pairs() {
        let options = vec![TaskOption {
            name: "dsm".into(),
            value: serde_json::json!(true),
        }];
        assert_eq!(
            serde_json::to_string(&options).unwrap(),
            r#"[{"name":"dsm","value":true}]"#
        );
    }
}
