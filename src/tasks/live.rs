//! Live Tasks
//!
//! Daily live check-in and the send-out of bag gifts that are about to
//! expire.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::session::endpoints;
use crate::types::{RemoteSession, RunConfig, TaskOutcome};

use super::{code, csrf, soft, success, Task, CODE_NOT_LOGGED_IN};

/// Remote code for a live check-in already performed today.
const CODE_ALREADY_SIGNED: i64 = 1011040;

pub struct LiveCheckInTask;

impl LiveCheckInTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Task for LiveCheckInTask {
    fn name(&self) -> &str {
        "live check-in"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session.get(endpoints::LIVE_SIGN, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("live check-in failed: {}", e)),
        };
        match code(&resp) {
            0 => {
                let reward = resp["data"]["text"].as_str().unwrap_or("");
                info!("live check-in done {}", reward);
                success()
            }
            CODE_ALREADY_SIGNED => {
                info!("live check-in was already done today");
                success()
            }
            CODE_NOT_LOGGED_IN => Ok(TaskOutcome::AuthExpired),
            _ => soft(format!("unexpected live check-in response: {}", resp)),
        }
    }
}

// ─── Gift Send ───────────────────────────────────────────────────

/// Bag gifts expiring within this window get sent out.
const EXPIRY_WINDOW_SECS: i64 = 86_400;

struct BagGift {
    bag_id: i64,
    gift_id: i64,
    gift_num: i64,
}

pub struct DonateGiftTask {
    gift_up_id: String,
}

impl DonateGiftTask {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            gift_up_id: config.gift_up_id.clone(),
        }
    }
}

#[async_trait]
impl Task for DonateGiftTask {
    fn name(&self) -> &str {
        "send expiring gifts"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let resp = match session.get(endpoints::GIFT_BAG_LIST, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("gift bag lookup failed: {}", e)),
        };
        match code(&resp) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected gift bag response: {}", resp)),
        }

        let expiring = expiring_gifts(&resp, Utc::now().timestamp());
        if expiring.is_empty() {
            info!("no expiring gifts in the bag");
            return success();
        }

        let uid = session.credentials().dede_user_id.clone();
        let target = if self.gift_up_id.is_empty() {
            uid.clone()
        } else {
            self.gift_up_id.clone()
        };
        let room = match session
            .get(endpoints::LIVE_ROOM_INFO, &[("mid", target.clone())])
            .await
        {
            Ok(v) => v["data"]["roomid"].as_i64().unwrap_or(0),
            Err(e) => return soft(format!("live room lookup failed: {}", e)),
        };
        if room == 0 {
            return soft(format!("[{}] has no live room to receive gifts", target));
        }

        let mut sent = 0;
        for gift in &expiring {
            let form = [
                ("biz_id", room.to_string()),
                ("ruid", target.clone()),
                ("gift_id", gift.gift_id.to_string()),
                ("bag_id", gift.bag_id.to_string()),
                ("gift_num", gift.gift_num.to_string()),
                ("uid", uid.clone()),
                ("send_ruid", "0".to_string()),
                ("storm_beat_id", "0".to_string()),
                ("price", "0".to_string()),
                ("platform", "pc".to_string()),
                ("biz_code", "live".to_string()),
                ("csrf", csrf(session)),
            ];
            let resp = match session
                .post_form(endpoints::GIFT_BAG_SEND, &form, &[])
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    warn!("gift send failed: {}", e);
                    continue;
                }
            };
            match code(&resp) {
                0 => {
                    sent += 1;
                    info!(
                        "sent {}x gift {} to room {}",
                        gift.gift_num, gift.gift_id, room
                    );
                }
                CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
                _ => warn!("unexpected gift send response: {}", resp),
            }
        }

        if sent < expiring.len() {
            return soft(format!("sent {}/{} expiring gifts", sent, expiring.len()));
        }
        success()
    }
}

/// Gifts in the bag body that expire within the window. Permanent
/// gifts (`expire_at == 0`) stay in the bag.
fn expiring_gifts(resp: &Value, now: i64) -> Vec<BagGift> {
    resp["data"]["list"]
        .as_array()
        .map(|gifts| {
            gifts
                .iter()
                .filter(|g| {
                    let expire_at = g["expire_at"].as_i64().unwrap_or(0);
                    expire_at > 0 && expire_at - now < EXPIRY_WINDOW_SECS
                })
                .map(|g| BagGift {
                    bag_id: g["bag_id"].as_i64().unwrap_or(0),
                    gift_id: g["gift_id"].as_i64().unwrap_or(0),
                    gift_num: g["gift_num"].as_i64().unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiring_gifts_skips_permanent_and_distant() {
        let now = 1_700_000_000;
        let resp = json!({
            "code": 0,
            "data": {"list": [
                {"bag_id": 1, "gift_id": 1, "gift_num": 2, "expire_at": 0},
                {"bag_id": 2, "gift_id": 1, "gift_num": 1, "expire_at": now + 3600},
                {"bag_id": 3, "gift_id": 6, "gift_num": 5, "expire_at": now + 7 * 86_400},
            ]}
        });
        let gifts = expiring_gifts(&resp, now);
        assert_eq!(gifts.len(), 1);
        assert_eq!(gifts[0].bag_id, 2);
    }

    #[test]
    fn test_expiring_gifts_empty_bag() {
        let resp = json!({"code": 0, "data": {}});
        assert!(expiring_gifts(&resp, 0).is_empty());
    }
}
