//! Coin Tasks
//!
//! Daily coin donation (up to the 50-exp reward cap) and the live
//! silver-to-coin exchange.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::session::endpoints;
use crate::types::{RemoteSession, RunConfig, TaskOutcome};

use super::watch::ranking_bvids;
use super::{code, csrf, soft, success, Task, CODE_NOT_LOGGED_IN};

/// Exp granted per donated coin; the daily reward caps at 50 exp.
const EXP_PER_COIN: i64 = 10;
const DAILY_COIN_EXP_CAP: i64 = 50;

/// Remote code for a video whose per-user coin allowance is used up.
const CODE_COIN_CAP_REACHED: i64 = 34005;
/// Remote code for an account without enough coins.
const CODE_COINS_INSUFFICIENT: i64 = -104;

pub struct DonateCoinTask {
    count: u32,
    select_like: bool,
    region: String,
}

impl DonateCoinTask {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            count: config.coin_count.min(5),
            select_like: config.select_like,
            region: config.watch_region.clone(),
        }
    }
}

#[async_trait]
impl Task for DonateCoinTask {
    fn name(&self) -> &str {
        "donate coins"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        if self.count == 0 {
            debug!("coin donation is disabled for this account");
            return success();
        }

        // How much of today's coin exp is already earned decides how
        // many coins are still worth spending.
        let earned = match session.get(endpoints::COIN_EXP_TODAY, &[]).await {
            Ok(resp) => resp["number"].as_i64().unwrap_or(0),
            Err(e) => return soft(format!("coin exp lookup failed: {}", e)),
        };
        let mut quota =
            (self.count as i64).min((DAILY_COIN_EXP_CAP - earned).max(0) / EXP_PER_COIN);
        if quota == 0 {
            info!("daily coin exp already earned ({} exp)", earned);
            return success();
        }

        let balance = match session.get(endpoints::COIN_BALANCE, &[]).await {
            Ok(resp) => resp["data"]["money"].as_f64().unwrap_or(0.0),
            Err(e) => return soft(format!("coin balance lookup failed: {}", e)),
        };
        quota = quota.min(balance as i64);
        if quota <= 0 {
            info!("coin balance too low to donate ({:.1})", balance);
            return success();
        }

        let candidates = match session
            .get(
                endpoints::REGION_RANKING,
                &[("rid", self.region.clone()), ("day", "3".to_string())],
            )
            .await
        {
            Ok(resp) => ranking_bvids(&resp),
            Err(e) => return soft(format!("ranking lookup failed: {}", e)),
        };

        let mut donated = 0;
        for bvid in candidates {
            if donated >= quota {
                break;
            }

            // Skip videos this account already coined.
            let resp = match session
                .get(endpoints::ARCHIVE_COINS, &[("bvid", bvid.clone())])
                .await
            {
                Ok(v) => v,
                Err(_) => continue,
            };
            if resp["data"]["multiply"].as_i64().unwrap_or(0) > 0 {
                continue;
            }

            let form = [
                ("bvid", bvid.clone()),
                ("multiply", "1".to_string()),
                (
                    "select_like",
                    if self.select_like { "1" } else { "0" }.to_string(),
                ),
                ("cross_domain", "true".to_string()),
                ("csrf", csrf(session)),
            ];
            let headers = [
                (
                    "Referer",
                    format!("https://www.bilibili.com/video/{}", bvid),
                ),
                ("Origin", "https://www.bilibili.com".to_string()),
            ];
            let resp = match session
                .post_form(endpoints::DONATE_COIN, &form, &headers)
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    warn!("coin donation to [{}] failed: {}", bvid, e);
                    continue;
                }
            };
            match code(&resp) {
                0 => {
                    donated += 1;
                    info!("donated a coin to [{}] ({}/{})", bvid, donated, quota);
                }
                CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
                CODE_COINS_INSUFFICIENT => {
                    info!("coin balance exhausted after {} donations", donated);
                    break;
                }
                CODE_COIN_CAP_REACHED => {
                    debug!("[{}] coin cap reached, trying the next video", bvid);
                }
                _ => warn!("unexpected coin response for [{}]: {}", bvid, resp),
            }
        }

        if donated < quota {
            return soft(format!("donated {}/{} coins", donated, quota));
        }
        success()
    }
}

// ─── Silver Exchange ─────────────────────────────────────────────

/// Silver needed for one coin at the live exchange.
const SILVER_PER_COIN: i64 = 700;
/// Remote code for an exchange already performed today.
const CODE_ALREADY_EXCHANGED: i64 = 403;

pub struct Silver2CoinTask;

impl Silver2CoinTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for Silver2CoinTask {
    fn name(&self) -> &str {
        "silver to coin"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let wallet = match session
            .get(
                endpoints::LIVE_WALLET,
                &[
                    ("need_bp", "1".to_string()),
                    ("need_metal", "1".to_string()),
                ],
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("live wallet lookup failed: {}", e)),
        };
        match code(&wallet) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected live wallet response: {}", wallet)),
        }

        let silver = wallet["data"]["silver"].as_i64().unwrap_or(0);
        if silver < SILVER_PER_COIN {
            info!(
                "not enough silver to exchange ({} < {})",
                silver, SILVER_PER_COIN
            );
            return success();
        }

        let token = csrf(session);
        let resp = match session
            .post_form(
                endpoints::SILVER_TO_COIN,
                &[("csrf_token", token.clone()), ("csrf", token)],
                &[],
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("silver exchange failed: {}", e)),
        };
        match code(&resp) {
            0 => {
                info!("exchanged {} silver for a coin", SILVER_PER_COIN);
                success()
            }
            CODE_ALREADY_EXCHANGED => {
                info!("silver was already exchanged today");
                success()
            }
            CODE_NOT_LOGGED_IN => Ok(TaskOutcome::AuthExpired),
            _ => soft(format!("unexpected silver exchange response: {}", resp)),
        }
    }
}
