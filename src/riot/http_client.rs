//! Resilient HTTP fetch for the Riot API.
//!
//! Every physical attempt takes one admission grant from the shared limiter.
//! 429 responses are retried after the server-advertised delay, transport
//! failures after a fixed delay; anything else is returned as-is for the
//! caller to inspect. Centralizing retry here means every endpoint call
//! respects the shared rate budget and upstream throttling signals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::rate_limiter::SlidingWindowLimiter;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("tftop/", env!("CARGO_PKG_VERSION"));

/// Physical attempt ceiling for one logical GET.
pub const MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);
const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A response as the transport saw it: status, headers (lowercase names),
/// and the raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Server-advertised retry delay, if present and parseable.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Connection-level failure (connect error, timeout). Always retryable.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Seam under the retry loop. Production uses [`ReqwestTransport`]; tests
/// substitute scripted responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<ApiResponse, TransportError>;
}

/// Real transport: reqwest with the Riot token header on every request.
pub struct ReqwestTransport {
    client: reqwest::Client,
    api_key: String,
}

impl ReqwestTransport {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> std::result::Result<ApiResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header("X-Riot-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// HTTP GET with admission control and bounded retry.
#[derive(Clone)]
pub struct RiotHttpClient {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<SlidingWindowLimiter>,
}

impl RiotHttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { transport, limiter }
    }

    /// One logical GET. Admission is acquired once per physical attempt; 429
    /// and transport failures are retried up to [`MAX_ATTEMPTS`] times. Any
    /// other status (success or not) is returned without inspecting the body.
    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        let mut last_status = None;
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            self.limiter.acquire(None).await;
            match self.transport.get(url).await {
                Ok(resp) if resp.status == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = resp
                        .retry_after()
                        .unwrap_or(DEFAULT_RETRY_AFTER)
                        .min(MAX_RETRY_AFTER);
                    warn!(url, attempt, delay = ?delay, "throttled upstream, backing off");
                    last_status = Some(resp.status.as_u16());
                    last_error = "429 Too Many Requests".to_string();
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!(url, attempt, error = %e, "transport failure, retrying");
                    last_status = None;
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(TRANSPORT_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(Error::FetchExhausted {
            attempts: MAX_ATTEMPTS,
            last_status,
            detail: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    struct ScriptedTransport {
        responses: StdMutex<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(
            responses: Vec<std::result::Result<ApiResponse, TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, _url: &str) -> std::result::Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("script exhausted".into())))
        }
    }

    fn resp(status: u16) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    fn resp_with_retry_after(status: u16, secs: &str) -> ApiResponse {
        let mut r = resp(status);
        r.headers.insert("retry-after".to_string(), secs.to_string());
        r
    }

    fn client(transport: Arc<ScriptedTransport>) -> (RiotHttpClient, Arc<SlidingWindowLimiter>) {
        let limiter = Arc::new(SlidingWindowLimiter::new(100, 1000));
        (RiotHttpClient::new(transport, limiter.clone()), limiter)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_twice_then_succeeds() {
        let transport = ScriptedTransport::new(vec![Ok(resp(429)), Ok(resp(429)), Ok(resp(200))]);
        let (http, limiter) = client(transport.clone());

        let result = http.get("https://example.test/x").await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(transport.calls(), 3);
        assert_eq!(limiter.total_grants().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_five_attempts() {
        let transport = ScriptedTransport::new(vec![
            Ok(resp(429)),
            Ok(resp(429)),
            Ok(resp(429)),
            Ok(resp(429)),
            Ok(resp(429)),
        ]);
        let (http, limiter) = client(transport.clone());

        let err = http.get("https://example.test/x").await.unwrap_err();
        match err {
            Error::FetchExhausted {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_status, Some(429));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls(), 5);
        assert_eq!(limiter.total_grants().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_status_returned_immediately() {
        let transport = ScriptedTransport::new(vec![Ok(resp(404))]);
        let (http, _) = client(transport.clone());

        let result = http.get("https://example.test/x").await.unwrap();
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_capped_at_ten_seconds() {
        let transport =
            ScriptedTransport::new(vec![Ok(resp_with_retry_after(429, "60")), Ok(resp(200))]);
        let (http, _) = client(transport);

        let start = Instant::now();
        http.get("https://example.test/x").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_retried_after_one_second() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError("connection reset".into())),
            Ok(resp(200)),
        ]);
        let (http, _) = client(transport.clone());

        let start = Instant::now();
        let result = http.get("https://example.test/x").await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(transport.calls(), 2);
    }
}
