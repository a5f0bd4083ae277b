//! Manga Tasks
//!
//! Daily manga clock-in plus a read-history record for the manga read
//! reward.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::session::endpoints;
use crate::types::{RemoteSession, TaskOutcome};

use super::{code, message, soft, success, Task, CODE_NOT_LOGGED_IN};

/// Message the clock-in endpoint returns when today's check-in exists.
const MANGA_DUPLICATE_MSG: &str = "clockin clockin is duplicate";

/// Chapter recorded by the read task (a free chapter of a long-running
/// series, same one every day).
const READ_COMIC_ID: i64 = 26009;
const READ_EP_ID: i64 = 300318;

pub struct MangaSignTask;

impl MangaSignTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for MangaSignTask {
    fn name(&self) -> &str {
        "manga check-in"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session
            .post_form(
                endpoints::MANGA_CLOCK_IN,
                &[("platform", "android".to_string())],
                &[],
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("manga clock-in failed: {}", e)),
        };

        if code(&resp) == 0 {
            info!("manga check-in done");
            return success();
        }
        match message(&resp) {
            MANGA_DUPLICATE_MSG => {
                info!("manga check-in was already done today");
                success()
            }
            _ if code(&resp) == CODE_NOT_LOGGED_IN => Ok(TaskOutcome::AuthExpired),
            _ => soft(format!("unexpected manga clock-in response: {}", resp)),
        }
    }
}

pub struct ReadMangaTask;

impl ReadMangaTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for ReadMangaTask {
    fn name(&self) -> &str {
        "read manga"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let body = json!({
            "device": "pc",
            "platform": "web",
            "comic_id": READ_COMIC_ID,
            "ep_id": READ_EP_ID,
        });
        let resp = match session.post_json(endpoints::MANGA_READ, &body).await {
            Ok(v) => v,
            Err(e) => return soft(format!("manga read record failed: {}", e)),
        };

        match code(&resp) {
            0 => {
                info!("manga read history recorded");
                success()
            }
            CODE_NOT_LOGGED_IN => Ok(TaskOutcome::AuthExpired),
            _ => soft(format!("unexpected manga read response: {}", resp)),
        }
    }
}
