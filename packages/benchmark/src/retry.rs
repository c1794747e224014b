//! HTTP retry for the engine's REST API.
//!
//! Every request to the coordinator goes through [`send_json`], which
//! retries connection failures, timeouts, HTTP 429 and HTTP 5xx with
//! exponential backoff. Trino answers 502/503/504 while a coordinator is
//! busy or restarting, and the statement protocol expects clients to retry
//! those.
//!
//! ```ignore
//! let page = retry::send_json(|| client.get(&next_uri)).await?;
//! ```

use std::time::Duration;

use crate::BenchError;

/// Retry attempts after the first request.
const MAX_RETRIES: u32 = 5;

/// Delay before the first retry; doubles on each further attempt.
const BASE_DELAY: Duration = Duration::from_millis(100);

/// Maximum length of the response body included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// `build_request` is called once per attempt since a
/// [`reqwest::RequestBuilder`] is consumed by sending it.
///
/// # Errors
///
/// * [`BenchError::Http`] if the request keeps failing at the transport
///   level or fails permanently
/// * [`BenchError::Protocol`] for a 4xx status (other than 429), a
///   retryable status that persists past the last attempt, or a body that
///   is not JSON
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, BenchError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_with_retry(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::debug!("Unparseable response from {url}: {preview}");
        BenchError::Protocol {
            message: format!("response from {url} is not JSON ({e}): {preview}"),
        }
    })
}

/// Returns the delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    BASE_DELAY * 2u32.saturating_pow(attempt.saturating_sub(1))
}

async fn send_with_retry<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, BenchError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let last = attempt >= max_retries;
        attempt += 1;

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) && !last => {
                log::warn!("  transient error: {e}");
                continue;
            }
            Err(e) => return Err(BenchError::Http(e)),
        };

        let status = response.status();
        if is_retryable_status(status) {
            if last {
                return Err(BenchError::Protocol {
                    message: format!("HTTP {status} after {max_retries} retries"),
                });
            }
            log::warn!("  HTTP {status} from {}", response.url());
            continue;
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            return Err(BenchError::Protocol {
                message: format!("HTTP {status}: {preview}"),
            });
        }

        return Ok(response);
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
