//! HTTP retry helpers for transient errors.
//!
//! Every `OneMap` request goes through [`send_json`], which retries
//! connection failures, timeouts, HTTP 429 and HTTP 5xx with exponential
//! backoff. Other 4xx responses are permanent and returned immediately.

use std::time::Duration;

use crate::GeocodeError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Retry schedule for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base`, `2 * base`,
    /// `4 * base`, ...
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Whether a response status is worth retrying.
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the transport error is likely transient.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

/// Sends a request and parses the response body as JSON, retrying
/// transient failures according to `policy`.
///
/// The `build_request` closure is called on each attempt because
/// [`reqwest::RequestBuilder`] is consumed by `send()`.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the request still fails after all retries,
/// the server answers with a non-retryable status, or the body is not
/// valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    policy: RetryPolicy,
) -> Result<serde_json::Value, GeocodeError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<GeocodeError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                last_error = Some(GeocodeError::Http(e));
                continue;
            }
            Err(e) => return Err(GeocodeError::Http(e)),
        };

        let status = response.status();
        if is_retryable_status(status) {
            log::warn!("  HTTP {status} from {}", response.url());
            last_error = Some(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                GeocodeError::RateLimited
            } else {
                GeocodeError::Status { status: status.as_u16() }
            });
            continue;
        }
        if !status.is_success() {
            return Err(GeocodeError::Status { status: status.as_u16() });
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("  body read failed: {e}");
                last_error = Some(GeocodeError::Http(e));
                continue;
            }
        };

        return serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
            log::error!("JSON parse failed: {e}\n  body preview: {preview}");
            GeocodeError::Json(e)
        });
    }

    log::error!("Request failed after {} retries, giving up", policy.max_retries);
    Err(last_error.unwrap_or_else(|| GeocodeError::Parse {
        message: "request failed after all retries".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    /// Serves one canned `(status line, body)` response per connection on
    /// loopback, then stops accepting. Returns the URL and a hit counter.
    async fn stub_server(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/search", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut request = Vec::new();
                let mut buf = [0_u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (url, hits)
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let (url, hits) = stub_server(vec![
            ("503 Service Unavailable", ""),
            ("429 Too Many Requests", ""),
            ("200 OK", r#"{"found":0,"results":[]}"#),
        ])
        .await;
        let client = reqwest::Client::new();

        let body = send_json(|| client.get(&url), fast_policy(3)).await.unwrap();

        assert_eq!(body["found"], 0);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_without_retrying() {
        let (url, hits) = stub_server(vec![("404 Not Found", "")]).await;
        let client = reqwest::Client::new();
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(60),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            send_json(|| client.get(&url), policy),
        )
        .await
        .expect("404 must not wait for a backoff delay");

        assert!(matches!(result, Err(GeocodeError::Status { status: 404 })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let (url, hits) = stub_server(vec![
            ("503 Service Unavailable", ""),
            ("503 Service Unavailable", ""),
            ("502 Bad Gateway", ""),
        ])
        .await;
        let client = reqwest::Client::new();

        let result = send_json(|| client.get(&url), fast_policy(2)).await;

        assert!(matches!(result, Err(GeocodeError::Status { status: 502 })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_rate_limits_report_rate_limited() {
        let (url, _hits) = stub_server(vec![("429 Too Many Requests", ""); 2]).await;
        let client = reqwest::Client::new();

        let result = send_json(|| client.get(&url), fast_policy(1)).await;

        assert!(matches!(result, Err(GeocodeError::RateLimited)));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(u32::MAX) >= policy.delay_for(17));
    }

    #[test]
    fn classifies_statuses() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
    }
}
