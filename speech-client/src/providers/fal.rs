//! fal.ai queue provider
//!
//! Requests go through the asynchronous queue API:
//! - submit the prompt, receiving status and result URLs
//! - poll the status URL (with logs) until the request completes
//! - fetch the result, which carries the URL of the generated audio

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::SynthesisConfig;
use crate::error::{Result, SynthesisError};
use crate::provider::{SpeechProvider, SynthesisEvent, SynthesisRequest, SynthesisStream};

/// Provider for the fal.ai queue API
pub struct FalProvider {
    client: Client,
    api_key: String,
    submit_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl FalProvider {
    /// Create a new provider with an explicit API key
    pub fn new(config: &SynthesisConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| SynthesisError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            submit_url: config.submit_url(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Create a provider, resolving the key from config or environment
    pub fn from_config(config: &SynthesisConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(config, api_key)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }
}

// Queue API request/response types

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    prompt: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueueHandle {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: QueueStatus,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    logs: Option<Vec<LogEntry>>,
}

#[derive(Debug, Deserialize)]
struct LogEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    audio: Option<AudioFile>,
}

#[derive(Debug, Deserialize)]
struct AudioFile {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

enum Phase {
    Submit,
    Poll(QueueHandle),
    Fetch(QueueHandle),
    Done,
}

/// State threaded through the event stream.
struct RequestState<'a> {
    provider: &'a FalProvider,
    request: &'a SynthesisRequest,
    phase: Phase,
    pending: VecDeque<SynthesisEvent>,
    started: Instant,
    polls: usize,
    logs_seen: usize,
    last_position: Option<Option<u32>>,
    announced_progress: bool,
}

impl<'a> RequestState<'a> {
    fn new(provider: &'a FalProvider, request: &'a SynthesisRequest) -> Self {
        Self {
            provider,
            request,
            phase: Phase::Submit,
            pending: VecDeque::new(),
            started: Instant::now(),
            polls: 0,
            logs_seen: 0,
            last_position: None,
            announced_progress: false,
        }
    }

    /// Run one protocol step. Returns false once the request is finished.
    async fn advance(&mut self) -> Result<bool> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Submit => {
                let handle = self.submit().await?;
                log::debug!("Submitted synthesis request {}", handle.request_id);
                self.phase = Phase::Poll(handle);
                Ok(true)
            }
            Phase::Poll(handle) => {
                if self.started.elapsed() > self.provider.timeout {
                    return Err(SynthesisError::Timeout {
                        seconds: self.provider.timeout.as_secs(),
                    });
                }
                if self.polls > 0 {
                    tokio::time::sleep(self.provider.poll_interval).await;
                }
                self.polls += 1;

                let status = self.poll(&handle).await?;
                let completed = self.record_status(status);
                self.phase = if completed {
                    Phase::Fetch(handle)
                } else {
                    Phase::Poll(handle)
                };
                Ok(true)
            }
            Phase::Fetch(handle) => {
                let audio_url = self.fetch_result(&handle).await?;
                self.pending.push_back(SynthesisEvent::Completed { audio_url });
                Ok(true)
            }
            Phase::Done => Ok(false),
        }
    }

    async fn submit(&self) -> Result<QueueHandle> {
        let body = SubmitRequest {
            prompt: &self.request.text,
            voice: self.request.voice.id(),
        };

        let response = self
            .provider
            .client
            .post(&self.provider.submit_url)
            .header("Authorization", self.provider.auth_header())
            .json(&body)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn poll(&self, handle: &QueueHandle) -> Result<StatusResponse> {
        let response = self
            .provider
            .client
            .get(&handle.status_url)
            .query(&[("logs", "1")])
            .header("Authorization", self.provider.auth_header())
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn fetch_result(&self, handle: &QueueHandle) -> Result<String> {
        let response = self
            .provider
            .client
            .get(&handle.response_url)
            .header("Authorization", self.provider.auth_header())
            .send()
            .await?;

        let result: ResultResponse = check_status(response).await?.json().await?;
        result
            .audio
            .and_then(|a| a.url)
            .filter(|url| !url.is_empty())
            .ok_or(SynthesisError::MissingAudio)
    }

    /// Queue events for a status response; true once the request completed.
    fn record_status(&mut self, status: StatusResponse) -> bool {
        match status.status {
            QueueStatus::InQueue => {
                if self.last_position != Some(status.queue_position) {
                    self.last_position = Some(status.queue_position);
                    self.pending.push_back(SynthesisEvent::Queued {
                        position: status.queue_position,
                    });
                }
            }
            QueueStatus::InProgress => {
                if !self.announced_progress {
                    self.announced_progress = true;
                    self.pending.push_back(SynthesisEvent::InProgress);
                }
            }
            QueueStatus::Completed => {}
        }

        // Logs are cumulative across polls
        let logs = status.logs.unwrap_or_default();
        for entry in logs.into_iter().skip(self.logs_seen) {
            self.logs_seen += 1;
            self.pending.push_back(SynthesisEvent::Log(entry.message));
        }

        matches!(status.status, QueueStatus::Completed)
    }
}

/// Turn a non-2xx response into an API error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
        Ok(ErrorResponse {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) => error_text,
    };

    Err(SynthesisError::ApiError {
        message,
        status_code: Some(status.as_u16()),
    })
}

impl SpeechProvider for FalProvider {
    fn synthesize<'a>(&'a self, request: &'a SynthesisRequest) -> SynthesisStream<'a> {
        let state = RequestState::new(self, request);

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((Ok(event), state));
                }
                match state.advance().await {
                    Ok(true) => continue,
                    Ok(false) => return None,
                    Err(e) => {
                        state.phase = Phase::Done;
                        return Some((Err(e), state));
                    }
                }
            }
        })
        .boxed()
    }

    fn name(&self) -> &'static str {
        "fal.ai"
    }

    fn is_available(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SynthesisError::MissingApiKey {
                env_var: crate::config::API_KEY_ENV.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voices::Voice;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "fal-ai/kokoro/american-english";

    fn provider_for(server: &MockServer) -> FalProvider {
        let config = SynthesisConfig {
            queue_url: server.uri(),
            poll_interval_ms: 5,
            request_timeout_secs: 10,
            ..Default::default()
        };
        FalProvider::new(&config, "test-key".to_string()).unwrap()
    }

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(format!("/{}", ENDPOINT)))
            .and(header("Authorization", "Key test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "req-1",
                "status_url": format!("{}/requests/req-1/status", server.uri()),
                "response_url": format!("{}/requests/req-1", server.uri()),
            })))
            .mount(server)
            .await;
    }

    async fn mount_result(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/requests/req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn collect(provider: &FalProvider, request: &SynthesisRequest) -> Vec<Result<SynthesisEvent>> {
        provider.synthesize(request).collect().await
    }

    #[tokio::test]
    async fn test_completed_request_yields_logs_then_url() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .and(query_param("logs", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "COMPLETED",
                "logs": [{"message": "loading model"}, {"message": "generating"}],
            })))
            .mount(&server)
            .await;
        mount_result(
            &server,
            serde_json::json!({"audio": {"url": "https://cdn.example/a.wav"}}),
        )
        .await;

        let provider = provider_for(&server);
        let request = SynthesisRequest::new("Hello world.", Voice::default());
        let events: Vec<SynthesisEvent> = collect(&provider, &request)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                SynthesisEvent::Log("loading model".to_string()),
                SynthesisEvent::Log("generating".to_string()),
                SynthesisEvent::Completed {
                    audio_url: "https://cdn.example/a.wav".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_sends_prompt_and_voice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{}", ENDPOINT)))
            .and(body_json(serde_json::json!({"prompt": "Hi there.", "voice": "am_echo"})))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "detail": "voice rejected"
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = SynthesisRequest::new("Hi there.", Voice::parse("am_echo").unwrap());
        let events = collect(&provider, &request).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(SynthesisError::ApiError {
                message,
                status_code,
            }) => {
                assert_eq!(message, "voice rejected");
                assert_eq!(*status_code, Some(422));
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_queue_then_progress_events() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "IN_QUEUE",
                "queue_position": 2,
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "IN_PROGRESS",
                "logs": [{"message": "step 1"}],
            })))
            .up_to_n_times(2)
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "COMPLETED",
                "logs": [{"message": "step 1"}, {"message": "step 2"}],
            })))
            .with_priority(3)
            .mount(&server)
            .await;
        mount_result(&server, serde_json::json!({"audio": {"url": "https://cdn.example/b.wav"}})).await;

        let provider = provider_for(&server);
        let request = SynthesisRequest::new("Text.", Voice::default());
        let events: Vec<SynthesisEvent> = collect(&provider, &request)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                SynthesisEvent::Queued { position: Some(2) },
                SynthesisEvent::InProgress,
                SynthesisEvent::Log("step 1".to_string()),
                SynthesisEvent::Log("step 2".to_string()),
                SynthesisEvent::Completed {
                    audio_url: "https://cdn.example/b.wav".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_stuck_queue_times_out() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "IN_QUEUE",
                "queue_position": 1,
            })))
            .mount(&server)
            .await;

        let config = SynthesisConfig {
            queue_url: server.uri(),
            poll_interval_ms: 200,
            request_timeout_secs: 1,
            ..Default::default()
        };
        let provider = FalProvider::new(&config, "test-key".to_string()).unwrap();
        let request = SynthesisRequest::new("Text.", Voice::default());
        let events = collect(&provider, &request).await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &SynthesisEvent::Queued { position: Some(1) }
        );
        assert!(matches!(
            events[1],
            Err(SynthesisError::Timeout { seconds: 1 })
        ));
    }

    #[tokio::test]
    async fn test_result_without_audio_url() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "COMPLETED"})),
            )
            .mount(&server)
            .await;
        mount_result(&server, serde_json::json!({"seed": 1})).await;

        let provider = provider_for(&server);
        let request = SynthesisRequest::new("Text.", Voice::default());
        let events = collect(&provider, &request).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(SynthesisError::MissingAudio)));
    }

    #[test]
    fn test_is_available_requires_key() {
        let provider = FalProvider::new(&SynthesisConfig::default(), "  ".to_string()).unwrap();
        assert!(provider.is_available().is_err());
    }
}
