//! Vip Privilege Task
//!
//! Claims the monthly privileges an active annual vip is entitled to.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::session::endpoints;
use crate::types::{RemoteSession, TaskOutcome};

use super::{code, csrf, soft, success, Task, CODE_NOT_LOGGED_IN, VIP_STATUS_ACTIVE, VIP_TYPE_ANNUAL};

/// Privilege kinds claimable each month: the B-coin coupon and the
/// member-shop coupon.
const PRIVILEGE_KINDS: [i64; 2] = [1, 2];

/// Remote code for a privilege already claimed this period.
const CODE_ALREADY_CLAIMED: i64 = 69801;

pub struct VipPrivilegeTask;

impl VipPrivilegeTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for VipPrivilegeTask {
    fn name(&self) -> &str {
        "vip privileges"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session.get(endpoints::NAV_INFO, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("profile lookup failed: {}", e)),
        };
        match code(&resp) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected profile response: {}", resp)),
        }

        let vip_type = resp["data"]["vip"]["type"].as_i64().unwrap_or(0);
        let vip_status = resp["data"]["vip"]["status"].as_i64().unwrap_or(0);
        if vip_type != VIP_TYPE_ANNUAL || vip_status != VIP_STATUS_ACTIVE {
            info!("not an active annual vip, no privileges to claim");
            return success();
        }

        let mut failures: Vec<String> = Vec::new();
        for kind in PRIVILEGE_KINDS {
            let form = [("type", kind.to_string()), ("csrf", csrf(session))];
            let resp = match session
                .post_form(endpoints::VIP_PRIVILEGE_RECEIVE, &form, &[])
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    failures.push(format!("privilege {}: {}", kind, e));
                    continue;
                }
            };
            match code(&resp) {
                0 => info!("claimed vip privilege {}", kind),
                CODE_ALREADY_CLAIMED => debug!("vip privilege {} already claimed", kind),
                CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
                _ => failures.push(format!("privilege {}: {}", kind, resp)),
            }
        }

        if failures.is_empty() {
            success()
        } else {
            soft(failures.join("; "))
        }
    }
}
