//! HTTP client for the lesson API

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::PopupService;
use super::error::ApiError;
use crate::lesson::{
    FieldErrors, LessonId, PopupDefinition, PopupId, PopupRecord, Submission, SubmissionPage,
    SubmissionRequest, active_definitions,
};

/// `{"data": ...}` envelope used by every resource response
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Body of a 409 or other message-only error response
#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// Body of a 422 response
#[derive(Debug, Deserialize)]
struct ValidationBody {
    #[serde(default)]
    errors: FieldErrors,
}

/// Lesson API client
pub struct ApiClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
}

impl ApiClient {
    /// Create a new client for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map non-success statuses onto typed errors
    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::CONFLICT => {
                let message = serde_json::from_str::<MessageBody>(&body)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| ApiError::ALREADY_SUBMITTED.to_string());
                Err(ApiError::Conflict { message })
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let errors = serde_json::from_str::<ValidationBody>(&body)
                    .map(|b| b.errors)
                    .unwrap_or_default();
                Err(ApiError::Validation(errors))
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(body)),
            _ => {
                let message = serde_json::from_str::<MessageBody>(&body)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or(body);
                Err(ApiError::ApiError { status: status.as_u16(), message })
            }
        }
    }
}

#[async_trait]
impl PopupService for ApiClient {
    async fn lesson_popups(&self, lesson: &LessonId) -> Result<Vec<PopupDefinition>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("lessons/{}/popups", lesson)))
            .header("accept", "application/json")
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        let envelope: DataEnvelope<Vec<PopupRecord>> = serde_json::from_str(&body)?;

        Ok(active_definitions(envelope.data))
    }

    async fn submit(
        &self,
        popup: &PopupId,
        request: &SubmissionRequest,
    ) -> Result<Submission, ApiError> {
        // Reject locally what the endpoint would reject anyway
        request.validate().map_err(ApiError::Validation)?;

        let response = self
            .client
            .post(self.url(&format!("video-popups/{}/submissions", popup)))
            .header("accept", "application/json")
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        let envelope: DataEnvelope<Submission> = serde_json::from_str(&body)?;

        Ok(envelope.data)
    }

    async fn submissions(&self, page: u32) -> Result<SubmissionPage, ApiError> {
        let response = self
            .client
            .get(self.url("video-popup-submissions"))
            .query(&[("page", page.max(1))])
            .header("accept", "application/json")
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
