use std::time::Duration;

use serde::Deserialize;

use crate::types::{
    JobId, JobKind, PromotionalVerdict, RateLimitNotice, StatusError, StatusSnapshot, SubmitError,
};

/// Header carrying the owner/user identifier on every request.
pub const OWNER_HEADER: &str = "x-owner-id";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub owner_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            owner_id: owner_id.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The backend job surface this client consumes. Tests substitute
/// scripted implementations.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Ask the backend to start a long-running job. Returns the new job
    /// id; does not start polling, and is never retried automatically.
    async fn submit(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<JobId, SubmitError>;

    /// One status probe for a job.
    async fn status(&self, job_id: &str) -> Result<StatusSnapshot, StatusError>;

    /// Lightweight promotional pre-check; a plain call, not a job.
    async fn classify(&self, content: &str) -> Result<PromotionalVerdict, SubmitError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    settings: ApiSettings,
}

#[derive(Deserialize)]
struct SubmitAccepted {
    job_id: JobId,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.detail.or(self.message)
    }
}

impl ReqwestJobApi {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, String> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| err.to_string())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn submit(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<JobId, SubmitError> {
        let client = self.build_client().map_err(SubmitError::Transport)?;
        let response = client
            .post(self.endpoint(kind.operation()))
            .header(OWNER_HEADER, &self.settings.owner_id)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let notice: RateLimitNotice = response
                .json()
                .await
                .map_err(|err| SubmitError::InvalidResponse(err.to_string()))?;
            return Err(SubmitError::RateLimited(notice));
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| status.to_string());
            return Err(SubmitError::Rejected { message });
        }

        let accepted: SubmitAccepted = response
            .json()
            .await
            .map_err(|err| SubmitError::InvalidResponse(err.to_string()))?;
        Ok(accepted.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusSnapshot, StatusError> {
        let client = self.build_client().map_err(StatusError::Transport)?;
        let response = client
            .get(self.endpoint(&format!("jobs/{job_id}")))
            .header(OWNER_HEADER, &self.settings.owner_id)
            .send()
            .await
            .map_err(|err| StatusError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Transport(format!(
                "status check returned {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|err| StatusError::InvalidResponse(err.to_string()))
    }

    async fn classify(&self, content: &str) -> Result<PromotionalVerdict, SubmitError> {
        let client = self.build_client().map_err(SubmitError::Transport)?;
        let response = client
            .post(self.endpoint("content/classify"))
            .header(OWNER_HEADER, &self.settings.owner_id)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| status.to_string());
            return Err(SubmitError::Rejected { message });
        }
        response
            .json()
            .await
            .map_err(|err| SubmitError::InvalidResponse(err.to_string()))
    }
}
