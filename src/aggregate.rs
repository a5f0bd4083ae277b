//! Level Progress Aggregate
//!
//! After the task batch, reads the account profile and today's reward
//! status and computes the expected days until the next level. Every
//! remote read degrades to a partial snapshot; this stage never fails
//! the run.

use serde_json::Value;
use tracing::{info, warn};

use crate::session::endpoints;
use crate::tasks::code;
use crate::types::{AccountSnapshot, RemoteSession, RunContext};

/// Level ceiling; no further progress is possible past it.
pub const MAX_LEVEL: u32 = 6;

/// Exp granted for each completed daily reward source.
const EXP_PER_REWARD: i64 = 5;

// ─── Reward Status ───────────────────────────────────────────────

/// Daily exp signals from the reward-status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardStatus {
    pub share: bool,
    pub watch: bool,
    pub login: bool,
    pub coin_exp: i64,
}

impl RewardStatus {
    /// Parse a reward-status response body; `None` when the body does
    /// not carry a usable payload.
    pub fn from_response(resp: &Value) -> Option<Self> {
        if code(resp) != 0 {
            return None;
        }
        let data = resp.get("data")?;
        Some(Self {
            share: data["share"].as_bool().unwrap_or(false),
            watch: data["watch"].as_bool().unwrap_or(false),
            login: data["login"].as_bool().unwrap_or(false),
            coin_exp: data["coins"].as_i64().unwrap_or(0),
        })
    }

    /// Experience the account earns today from the daily reward sources.
    pub fn daily_exp(&self) -> i64 {
        let rewards = [self.share, self.watch, self.login]
            .iter()
            .filter(|done| **done)
            .count() as i64;
        rewards * EXP_PER_REWARD + self.coin_exp
    }
}

// ─── Forecast ────────────────────────────────────────────────────

/// Whole days until the next level.
///
/// `None` when the account is at the level ceiling, when it levels up
/// today (`remaining <= daily_exp`), or when `daily_exp` is not
/// positive and no estimate is possible. Callers distinguish the three
/// through the accompanying level field.
pub fn days_to_next_level(
    level: u32,
    current_exp: i64,
    next_exp: i64,
    daily_exp: i64,
) -> Option<u32> {
    if level >= MAX_LEVEL {
        return None;
    }
    if daily_exp <= 0 {
        return None;
    }
    let remaining = next_exp - current_exp;
    if remaining <= daily_exp {
        return None;
    }
    Some((remaining / daily_exp) as u32 + 1)
}

/// Fetch the profile and reward status, assembling the final snapshot.
pub async fn build_snapshot(session: &dyn RemoteSession, ctx: &RunContext) -> AccountSnapshot {
    let mut snapshot = AccountSnapshot::partial(&ctx.uid);

    match session.get(endpoints::NAV_INFO, &[]).await {
        Ok(resp) if code(&resp) == 0 => fill_profile(&mut snapshot, &resp["data"]),
        Ok(resp) => warn!("profile read returned an error body: {}", resp),
        Err(e) => warn!("profile read failed, keeping a partial snapshot: {}", e),
    }

    let status = match session.get(endpoints::EXP_REWARD_STATUS, &[]).await {
        Ok(resp) => RewardStatus::from_response(&resp),
        Err(e) => {
            warn!("reward status read failed: {}", e);
            None
        }
    };

    if let (Some(level), Some(current), Some(next), Some(status)) = (
        snapshot.level,
        snapshot.current_exp,
        snapshot.next_exp,
        status,
    ) {
        let daily_exp = status.daily_exp();
        info!("today's reward exp: {}", daily_exp);
        snapshot.days_to_next_level = days_to_next_level(level, current, next, daily_exp);
    }

    snapshot
}

fn fill_profile(snapshot: &mut AccountSnapshot, data: &Value) {
    snapshot.username = data["uname"].as_str().map(|s| s.to_string());
    snapshot.coins = data["money"].as_f64();
    snapshot.vip_type = data["vip"]["type"].as_i64();
    snapshot.vip_status = data["vip"]["status"].as_i64();

    let level_info = &data["level_info"];
    if let Some(level) = level_info["current_level"].as_u64() {
        let level = level as u32;
        snapshot.level = Some(level);
        snapshot.current_exp = level_info["current_exp"].as_i64();
        // The ceiling level reports no next threshold.
        snapshot.next_exp = if level >= MAX_LEVEL {
            Some(0)
        } else {
            level_info["next_exp"].as_i64()
        };
    }
}
