//! Remote Session
//!
//! reqwest-backed implementation of the `RemoteSession` capability:
//! cookie-authenticated GET/POST with one centralized bounded-retry
//! policy and an optional outbound proxy fixed for the client's
//! lifetime.

pub mod endpoints;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::types::{AccountCredentials, RemoteSession, SessionError};

/// Referer attached to every request; the remote service rejects some
/// POST endpoints without it.
const REFERER: &str = "https://www.bilibili.com/";

/// Per-request timeout. Each retry attempt gets its own budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Retry Policy ────────────────────────────────────────────────

/// Bounded retry for transient transport failures, shared by every call
/// the client makes. Application-level errors inside a response body
/// are never retried; the tasks judge those.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep before retry number `retry` (1-based).
    fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .mul_f64(self.backoff_multiplier.powi(retry.saturating_sub(1) as i32))
    }
}

// ─── Client ──────────────────────────────────────────────────────

enum Payload<'a> {
    None,
    Form(&'a [(&'a str, String)]),
    Json(&'a Value),
}

/// Authenticated HTTP client for one account. Holds the credentials and
/// the retry policy; the proxy, when set, stays fixed so the client
/// keeps a consistent-looking identity for the whole run.
pub struct BiliClient {
    credentials: AccountCredentials,
    retry: RetryPolicy,
    http: Client,
}

impl BiliClient {
    /// Build a client for `credentials`, optionally routed through an
    /// HTTP proxy given as `host:port` or a full URL.
    pub fn new(credentials: AccountCredentials, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(credentials.user_agent.clone());

        if let Some(addr) = proxy {
            let url = normalize_proxy(addr);
            builder = builder.proxy(
                reqwest::Proxy::all(&url)
                    .with_context(|| format!("Invalid proxy address: {}", addr))?,
            );
        }

        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            credentials,
            retry: RetryPolicy::default(),
        })
    }

    fn cookie_header(&self) -> String {
        format!(
            "bili_jct={};SESSDATA={};DedeUserID={};",
            self.credentials.bili_jct, self.credentials.sessdata, self.credentials.dede_user_id
        )
    }

    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        payload: &Payload<'_>,
        headers: &[(&str, String)],
    ) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, endpoint)
            .header(reqwest::header::COOKIE, self.cookie_header());

        // Callers may override the referer (coin donation wants the
        // video page); only add the default when they don't.
        if !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("referer")) {
            req = req.header(reqwest::header::REFERER, REFERER);
        }

        if !query.is_empty() {
            req = req.query(query);
        }

        match payload {
            Payload::None => {}
            Payload::Form(form) => req = req.form(form),
            Payload::Json(body) => req = req.json(body),
        }

        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }

        req
    }

    /// Issue the call, retrying transport failures per the policy. The
    /// request is rebuilt for every attempt.
    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
        headers: &[(&str, String)],
    ) -> Result<Value, SessionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                let delay = self.retry.backoff(attempt - 1);
                debug!(
                    "retrying [{}] (attempt {}/{}) after {:?}",
                    endpoint, attempt, self.retry.max_attempts, delay
                );
                sleep(delay).await;
            }

            let req = self.build_request(method.clone(), endpoint, query, &payload, headers);
            let err = match req.send().await {
                Ok(resp) => match resp.text().await {
                    Ok(text) => return serde_json::from_str(&text).map_err(SessionError::BadBody),
                    Err(e) => e,
                },
                Err(e) => e,
            };

            warn!(
                "remote call [{}] attempt {}/{} failed: {}",
                endpoint, attempt, self.retry.max_attempts, err
            );

            if attempt >= self.retry.max_attempts {
                return Err(SessionError::Exhausted {
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}

#[async_trait]
impl RemoteSession for BiliClient {
    fn credentials(&self) -> &AccountCredentials {
        &self.credentials
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, SessionError> {
        self.call(Method::GET, endpoint, query, Payload::None, &[])
            .await
    }

    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, SessionError> {
        self.call(Method::POST, endpoint, &[], Payload::Form(form), headers)
            .await
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, SessionError> {
        self.call(Method::POST, endpoint, &[], Payload::Json(body), &[])
            .await
    }
}

/// Accept `host:port` as shorthand for an HTTP proxy URL.
fn normalize_proxy(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AccountCredentials {
        AccountCredentials {
            dede_user_id: "10001".to_string(),
            sessdata: "sess".to_string(),
            bili_jct: "jct".to_string(),
            user_agent: "ua-test".to_string(),
        }
    }

    #[test]
    fn test_cookie_header_carries_all_three_cookies() {
        let client = BiliClient::new(credentials(), None).unwrap();
        let header = client.cookie_header();
        assert!(header.contains("bili_jct=jct"));
        assert!(header.contains("SESSDATA=sess"));
        assert!(header.contains("DedeUserID=10001"));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_normalize_proxy_adds_scheme() {
        assert_eq!(normalize_proxy("127.0.0.1:8080"), "http://127.0.0.1:8080");
        assert_eq!(
            normalize_proxy("http://10.0.0.1:3128"),
            "http://10.0.0.1:3128"
        );
    }

    #[test]
    fn test_client_accepts_proxy_shorthand() {
        assert!(BiliClient::new(credentials(), Some("127.0.0.1:8080")).is_ok());
    }
}
