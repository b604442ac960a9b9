//! Conditional GET with rate limiting and retry logic
//!
//! Every upstream request goes through [`HttpHandler::conditional_get`],
//! which attaches `If-None-Match` when a validator token is known and folds
//! the response into [`Conditional`].

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::{ACCEPT, ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::constants::limits;
use crate::errors::{UpstreamError, UpstreamResult};

/// Outcome of a conditional request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<T> {
    /// 304: the resource matches the validator that was sent
    NotModified,
    /// 2xx: fresh content and the validator that identifies it
    Modified { body: T, etag: Option<String> },
}

impl<T> Conditional<T> {
    /// Transform the body of a modified response
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Conditional<U>, E> {
        match self {
            Conditional::NotModified => Ok(Conditional::NotModified),
            Conditional::Modified { body, etag } => Ok(Conditional::Modified {
                body: f(body)?,
                etag,
            }),
        }
    }
}

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client, rate limit and retry budget
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Unavailable` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32, max_retries: u32) -> UpstreamResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> UpstreamResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| UpstreamError::Unavailable {
            reason: "Rate limit must be non-zero".to_string(),
            status: None,
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// GET `url`, sending `If-None-Match: etag` when a token is given
    ///
    /// Transport errors and 502/503/504 are retried with exponential backoff;
    /// 403 and 429 are reported as [`UpstreamError::RateLimited`] without
    /// retrying.
    pub async fn conditional_get(
        &self,
        url: &Url,
        etag: Option<&str>,
        accept: Option<&'static str>,
    ) -> UpstreamResult<Conditional<String>> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;

            let mut request = self.client.get(url.as_str());
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }
            if let Some(etag) = etag {
                request = request.header(IF_NONE_MATCH, etag);
            }

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_MODIFIED {
                        tracing::debug!("Not modified: {}", url);
                        return Ok(Conditional::NotModified);
                    }
                    if status.is_success() {
                        let etag = response
                            .headers()
                            .get(ETAG)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let body = response.text().await?;
                        tracing::debug!("Fetched {} ({} bytes)", url, body.len());
                        return Ok(Conditional::Modified { body, etag });
                    }
                    match status {
                        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                            return Err(UpstreamError::RateLimited {
                                status: status.as_u16(),
                            });
                        }
                        StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT => UpstreamError::Unavailable {
                            reason: format!("server responded {}", status),
                            status: Some(status.as_u16()),
                        },
                        _ if status.is_server_error() => {
                            return Err(UpstreamError::Unavailable {
                                reason: format!("server responded {}", status),
                                status: Some(status.as_u16()),
                            });
                        }
                        _ => {
                            return Err(UpstreamError::UnexpectedStatus {
                                status: status.as_u16(),
                                url: url.to_string(),
                            });
                        }
                    }
                }
                Err(e) => UpstreamError::from(e),
            };

            if retries >= self.max_retries {
                tracing::warn!(
                    "Request to {} failed after {} retries: {}",
                    url,
                    retries,
                    error
                );
                return Err(error);
            }
            retries += 1;
            let delay = Self::backoff_delay(retries);
            tracing::warn!(
                "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                retries,
                self.max_retries,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(attempt))
    }
}
