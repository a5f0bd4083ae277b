//! Daily Chore Tasks
//!
//! Each task performs one chore end-to-end over the shared session and
//! classifies every response itself: a recognized "already done today"
//! signal is a Success, the not-logged-in signal is AuthExpired, and
//! anything else unexpected is a SoftFailure carrying the raw response.
//! Tasks never retry remote calls; the session already retried
//! transport failures.

pub mod charge;
pub mod coin;
pub mod live;
pub mod manga;
pub mod pinned;
pub mod vip;
pub mod watch;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::{RemoteSession, RunConfig, TaskOutcome};

/// Remote code meaning the session cookies are no longer accepted.
pub(crate) const CODE_NOT_LOGGED_IN: i64 = -101;

/// Annual vip type on the profile, and the status meaning it is active.
pub(crate) const VIP_TYPE_ANNUAL: i64 = 2;
pub(crate) const VIP_STATUS_ACTIVE: i64 = 1;

/// A unit of daily work over the shared session. Stateless across runs;
/// the registry constructs the set fresh for every execution.
#[async_trait]
pub trait Task: Send + Sync {
    /// Human-readable name used in the run journal.
    fn name(&self) -> &str;

    /// Execute the chore. An error escaping this method is a task
    /// defect; the orchestrator downgrades it to a soft failure.
    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome>;
}

/// Build the nine chore tasks in construction order. The orchestrator
/// shuffles this list before planning the final order.
pub fn chore_tasks(config: &RunConfig) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(watch::WatchVideoTask::new(config)),
        Box::new(manga::MangaSignTask::new()),
        Box::new(coin::DonateCoinTask::new(config)),
        Box::new(coin::Silver2CoinTask::new()),
        Box::new(live::LiveCheckInTask::new()),
        Box::new(live::DonateGiftTask::new(config)),
        Box::new(charge::ChargeTask::new(config)),
        Box::new(vip::VipPrivilegeTask::new()),
        Box::new(manga::ReadMangaTask::new()),
    ]
}

// ─── Response Helpers ────────────────────────────────────────────

/// The `code` field of a response body; -1 when absent.
pub(crate) fn code(resp: &Value) -> i64 {
    resp["code"].as_i64().unwrap_or(-1)
}

/// The `message`/`msg` field of a response body.
pub(crate) fn message(resp: &Value) -> &str {
    resp["message"]
        .as_str()
        .or_else(|| resp["msg"].as_str())
        .unwrap_or("")
}

/// The anti-CSRF token tasks echo into POST bodies.
pub(crate) fn csrf(session: &dyn RemoteSession) -> String {
    session.credentials().bili_jct.clone()
}

pub(crate) fn success() -> Result<TaskOutcome> {
    Ok(TaskOutcome::Success)
}

pub(crate) fn soft(reason: impl Into<String>) -> Result<TaskOutcome> {
    Ok(TaskOutcome::SoftFailure(reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chore_registry_has_nine_tasks() {
        let tasks = chore_tasks(&RunConfig::default());
        assert_eq!(tasks.len(), 9);
    }

    #[test]
    fn test_chore_names_are_unique() {
        let tasks = chore_tasks(&RunConfig::default());
        let mut names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_code_and_message_helpers() {
        let resp = json!({"code": -101, "message": "账号未登录"});
        assert_eq!(code(&resp), CODE_NOT_LOGGED_IN);
        assert_eq!(message(&resp), "账号未登录");

        let twirp = json!({"msg": "clockin clockin is duplicate"});
        assert_eq!(code(&twirp), -1);
        assert_eq!(message(&twirp), "clockin clockin is duplicate");
    }
}
