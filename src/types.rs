//! Shared Types
//!
//! Account credentials, run configuration, task outcomes, the final
//! account snapshot, and the capability traits (`RemoteSession`,
//! `Notifier`) the orchestration core depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// ─── Credentials ─────────────────────────────────────────────────

/// Browser user agent presented to the remote service when an account
/// does not configure its own.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Session identifiers for one account. Immutable for the duration of a
/// run; owned by the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCredentials {
    /// Numeric account id (the `DedeUserID` cookie).
    pub dede_user_id: String,
    /// Session token (the `SESSDATA` cookie).
    pub sessdata: String,
    /// Anti-CSRF token (the `bili_jct` cookie), echoed into POST bodies.
    pub bili_jct: String,
    /// User agent attached to every remote call.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

// ─── Run Configuration ───────────────────────────────────────────

/// Per-account knobs consumed by the chore tasks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Coins to donate per day (the daily exp reward caps at 5).
    pub coin_count: u32,
    /// Whether donating a coin also likes the video.
    pub select_like: bool,
    /// Quick-charge the B-coin coupon balance on the last day of the month.
    pub month_end_charge: bool,
    /// UP to charge; empty charges the account itself.
    pub charge_up_id: String,
    /// UP whose live room receives expiring bag gifts; empty uses the
    /// account's own room.
    pub gift_up_id: String,
    /// Ranking region queried when the followed feed has no videos.
    pub watch_region: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            coin_count: 0,
            select_like: false,
            month_end_charge: false,
            charge_up_id: String::new(),
            gift_up_id: String::new(),
            watch_region: "1".to_string(),
        }
    }
}

// ─── Task Outcome ────────────────────────────────────────────────

/// Classified result of one task execution. Never silently swallowed:
/// the orchestrator logs every non-success outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The chore completed, or was already completed today.
    Success,
    /// The chore did not complete but the session is still valid.
    SoftFailure(String),
    /// The remote service no longer accepts the session credentials.
    AuthExpired,
}

impl TaskOutcome {
    /// Shorthand for a soft failure with a diagnostic reason.
    pub fn soft(reason: impl Into<String>) -> Self {
        Self::SoftFailure(reason.into())
    }
}

// ─── Account Snapshot ────────────────────────────────────────────

/// Aggregate view of the account at the end of a run. Fetched fields
/// are optional so a failed remote read degrades the snapshot instead
/// of failing the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub uid: String,
    pub username: Option<String>,
    pub level: Option<u32>,
    pub current_exp: Option<i64>,
    pub next_exp: Option<i64>,
    pub coins: Option<f64>,
    pub vip_type: Option<i64>,
    pub vip_status: Option<i64>,
    /// Whole days until the next level. `None` at max level, when the
    /// account levels up today, or when no estimate is possible.
    pub days_to_next_level: Option<u32>,
    /// Whether the session was still accepted at the end of the run.
    pub signed_in: bool,
}

impl AccountSnapshot {
    /// Empty snapshot for a run still in progress or cancelled early.
    pub fn partial(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            username: None,
            level: None,
            current_exp: None,
            next_exp: None,
            coins: None,
            vip_type: None,
            vip_status: None,
            days_to_next_level: None,
            signed_in: true,
        }
    }

    /// Minimal snapshot for a run whose session expired before the
    /// aggregate could be fetched.
    pub fn expired(uid: &str) -> Self {
        Self {
            signed_in: false,
            ..Self::partial(uid)
        }
    }
}

// ─── Run Context ─────────────────────────────────────────────────

/// Run-scoped context created at run start and threaded explicitly
/// through orchestrator, aggregate, and notifier. Dropped with the run.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Correlation id carried by this run's log lines.
    pub trace_id: String,
    /// Account the run operates on.
    pub uid: String,
}

impl RunContext {
    pub fn new(uid: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            uid: uid.to_string(),
        }
    }
}

// ─── Session Capability ──────────────────────────────────────────

/// Failure of a remote call after the session's retry budget is spent.
/// Tasks map this to a soft failure, never to auth expiry.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("response body was not valid JSON: {0}")]
    BadBody(#[from] serde_json::Error),
}

/// Authenticated access to the remote service. One instance per run.
///
/// Transient transport failures are retried internally; an `Err` means
/// the retry budget is spent. Application-level failures always come
/// back as `Ok` bodies for the caller to judge.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Credentials the session was built with. Tasks echo `bili_jct`
    /// into CSRF form fields.
    fn credentials(&self) -> &AccountCredentials;

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, SessionError>;

    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, SessionError>;

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, SessionError>;
}

// ─── Notifier Capability ─────────────────────────────────────────

/// Outbound push channel for the end-of-run summary.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`. `Ok(true)` means the channel acknowledged the
    /// message; a transport error is the caller's to log, never to
    /// re-raise as a run failure.
    async fn push(&self, text: &str) -> anyhow::Result<bool>;
}

// ─── Application Configuration ───────────────────────────────────

/// One account to run: credentials, task knobs, and an optional
/// outbound proxy fixed for the whole run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    pub credentials: AccountCredentials,
    #[serde(default)]
    pub tasks: RunConfig,
    /// Outbound HTTP proxy, `host:port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// Telegram push settings shared by all accounts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The tracing level this config level maps to.
    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Top-level application config, stored as JSON in the config directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Accounts to run; each becomes an independent orchestration.
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
    /// Telegram push settings; summaries fall back to the log when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_default_user_agent() {
        let entry: AccountCredentials = serde_json::from_str(
            r#"{"dedeUserId":"123","sessdata":"s","biliJct":"j"}"#,
        )
        .unwrap();
        assert_eq!(entry.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_run_config_defaults_merge() {
        let cfg: RunConfig = serde_json::from_str(r#"{"coinCount":2}"#).unwrap();
        assert_eq!(cfg.coin_count, 2);
        assert!(!cfg.select_like);
        assert_eq!(cfg.watch_region, "1");
    }

    #[test]
    fn test_expired_snapshot_is_signed_out_and_empty() {
        let snapshot = AccountSnapshot::expired("42");
        assert!(!snapshot.signed_in);
        assert_eq!(snapshot.uid, "42");
        assert!(snapshot.level.is_none());
        assert!(snapshot.days_to_next_level.is_none());
    }

    #[test]
    fn test_run_context_trace_ids_are_unique() {
        let a = RunContext::new("1");
        let b = RunContext::new("1");
        assert_ne!(a.trace_id, b.trace_id);
    }
}
