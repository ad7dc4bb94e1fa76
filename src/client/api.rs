use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Answers keyed by the question's index in the test definition.
pub type Answers = BTreeMap<u32, String>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("progress store: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestListing {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub term: String,
    pub question_count: usize,
    pub duration_minutes: i32,
    #[serde(default)]
    pub attempt_id: Option<String>,
    #[serde(default)]
    pub attempt_status: Option<AttemptState>,
    #[serde(default)]
    pub percentage: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub index: u32,
    pub text: String,
    /// Option label ("A".."D") to option text.
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestView {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub term: String,
    pub duration_minutes: i32,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: String,
    pub test_id: String,
    pub status: AttemptState,
    pub time_taken_seconds: i64,
    #[serde(default)]
    pub remaining_seconds: i64,
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub test: TestView,
    pub attempt: AttemptView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishPayload {
    pub cheating: bool,
    pub answers: Answers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub percentage: i32,
    pub correct: i32,
    pub total: i32,
}

#[async_trait]
pub trait CbtApi: Send + Sync {
    async fn visible_tests(&self) -> Result<Vec<TestListing>, ClientError>;

    /// Creates or resumes the caller's attempt.
    async fn start(&self, test_id: &str) -> Result<StartedAttempt, ClientError>;

    async fn record_answer(
        &self,
        test_id: &str,
        attempt_id: &str,
        question_index: u32,
        option: &str,
    ) -> Result<(), ClientError>;

    async fn finish(
        &self,
        test_id: &str,
        attempt_id: &str,
        payload: &FinishPayload,
    ) -> Result<TestResult, ClientError>;
}

/// REST implementation against `{base_url}/tests/...` with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpCbtApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpCbtApi {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), token: token.into() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ClientError> {
        Ok(self.client.post(self.url(path)).bearer_auth(&self.token).json(body).send().await?)
    }
}

#[async_trait]
impl CbtApi for HttpCbtApi {
    async fn visible_tests(&self) -> Result<Vec<TestListing>, ClientError> {
        let response =
            self.client.get(self.url("/tests/visible")).bearer_auth(&self.token).send().await?;
        decode(response).await
    }

    async fn start(&self, test_id: &str) -> Result<StartedAttempt, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/tests/{test_id}/start")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    async fn record_answer(
        &self,
        test_id: &str,
        attempt_id: &str,
        question_index: u32,
        option: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .post_json(
                &format!("/tests/{test_id}/attempt/{attempt_id}/answer"),
                &serde_json::json!({ "question_index": question_index, "option": option }),
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(status_error(status, &body))
    }

    async fn finish(
        &self,
        test_id: &str,
        attempt_id: &str,
        payload: &FinishPayload,
    ) -> Result<TestResult, ClientError> {
        let response =
            self.post_json(&format!("/tests/{test_id}/attempt/{attempt_id}/finish"), payload).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

fn status_error(status: StatusCode, body: &str) -> ClientError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.detail)
        .unwrap_or_else(|_| body.trim().to_string());
    ClientError::Status { status: status.as_u16(), detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_is_taken_from_json_body() {
        let err = status_error(StatusCode::CONFLICT, r#"{"status":409,"detail":"Already taken"}"#);
        match err {
            ClientError::Status { status, detail } => {
                assert_eq!(status, 409);
                assert_eq!(detail, "Already taken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let err = status_error(StatusCode::BAD_GATEWAY, "  upstream down \n");
        assert_eq!(err.to_string(), "server returned 502: upstream down");
    }

    #[test]
    fn start_response_decodes() {
        let raw = r#"{
            "test": {
                "id": "t1", "title": "Quiz", "subject": "Maths", "term": "First",
                "duration_minutes": 10,
                "questions": [{"index": 2, "text": "Q", "options": {"A":"1","B":"2","C":"3","D":"4"}}]
            },
            "attempt": {
                "id": "a1", "test_id": "t1", "status": "in_progress",
                "started_at": "2025-03-01T09:00:00Z",
                "time_taken_seconds": 75, "remaining_seconds": 525,
                "answers": {"2": "C"}, "percentage": null, "cheating": false
            }
        }"#;

        let started: StartedAttempt = serde_json::from_str(raw).unwrap();
        assert_eq!(started.test.questions[0].index, 2);
        assert_eq!(started.attempt.status, AttemptState::InProgress);
        assert_eq!(started.attempt.answers.get(&2).map(String::as_str), Some("C"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpCbtApi::new("http://localhost:8000/api/v1/", "token").unwrap();
        assert_eq!(api.url("/tests/visible"), "http://localhost:8000/api/v1/tests/visible");
    }
}
