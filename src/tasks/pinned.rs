//! Pinned Tasks
//!
//! The two fixed-position tasks that always run before any chore:
//! session verification first, then the coin history fetch.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use tracing::{info, warn};

use crate::session::endpoints;
use crate::types::{RemoteSession, TaskOutcome};

use super::{code, soft, success, Task, CODE_NOT_LOGGED_IN};

pub struct VerifySessionTask;

impl VerifySessionTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for VerifySessionTask {
    fn name(&self) -> &str {
        "verify session"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session.get(endpoints::NAV_INFO, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("profile unavailable: {}", e)),
        };

        if resp["data"]["isLogin"].as_bool().unwrap_or(false) {
            info!(
                "session for [{}] is valid",
                session.credentials().dede_user_id
            );
            success()
        } else {
            warn!(
                "session for [{}] is no longer accepted",
                session.credentials().dede_user_id
            );
            Ok(TaskOutcome::AuthExpired)
        }
    }
}

pub struct CoinLogTask;

impl CoinLogTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for CoinLogTask {
    fn name(&self) -> &str {
        "coin history"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session.get(endpoints::COIN_LOG, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("coin log unavailable: {}", e)),
        };
        match code(&resp) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected coin log response: {}", resp)),
        }

        let today = Local::now().format("%Y-%m-%d").to_string();
        let mut changes = 0;
        let mut delta = 0.0;
        if let Some(list) = resp["data"]["list"].as_array() {
            for entry in list {
                if entry["time"].as_str().unwrap_or("").starts_with(&today) {
                    changes += 1;
                    delta += entry["delta"].as_f64().unwrap_or(0.0);
                }
            }
        }
        info!("{} coin changes today ({:+.1})", changes, delta);
        success()
    }
}
