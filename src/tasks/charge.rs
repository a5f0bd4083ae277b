//! Charge Task
//!
//! On the last day of the month, quick-pays the expiring B-coin coupon
//! balance to a configured UP (the account itself by default), then
//! posts the order comment.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::session::endpoints;
use crate::types::{RemoteSession, RunConfig, TaskOutcome};

use super::{code, csrf, soft, success, Task, CODE_NOT_LOGGED_IN, VIP_STATUS_ACTIVE, VIP_TYPE_ANNUAL};

/// Minimum coupon balance worth charging.
const MIN_COUPON_BALANCE: i64 = 2;
/// Order state meaning the quick-pay went through.
const ORDER_STATUS_PAID: i64 = 4;
/// Comment posted on the charge order.
const CHARGE_COMMENT_TEXT: &str = "up主，加油！";

pub struct ChargeTask {
    enabled: bool,
    up_id: String,
}

impl ChargeTask {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            enabled: config.month_end_charge,
            up_id: config.charge_up_id.clone(),
        }
    }
}

#[async_trait]
impl Task for ChargeTask {
    fn name(&self) -> &str {
        "month-end charge"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        if !self.enabled {
            debug!("month-end charge is disabled for this account");
            return success();
        }
        if !is_month_end(Local::now().date_naive()) {
            debug!("not the last day of the month, nothing to charge");
            return success();
        }

        let resp = match session.get(endpoints::NAV_INFO, &[]).await {
            Ok(v) => v,
            Err(e) => return soft(format!("profile lookup failed: {}", e)),
        };
        match code(&resp) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected profile response: {}", resp)),
        }

        let data = &resp["data"];
        let vip_type = data["vip"]["type"].as_i64().unwrap_or(0);
        let vip_status = data["vip"]["status"].as_i64().unwrap_or(0);
        if vip_type != VIP_TYPE_ANNUAL || vip_status != VIP_STATUS_ACTIVE {
            info!("not an active annual vip, skipping the charge");
            return success();
        }

        let coupon = data["wallet"]["coupon_balance"].as_i64().unwrap_or(0);
        if coupon < MIN_COUPON_BALANCE {
            info!("coupon balance {} below the charge minimum", coupon);
            return success();
        }

        let uid = session.credentials().dede_user_id.clone();
        let up = if self.up_id.is_empty() {
            uid.clone()
        } else {
            self.up_id.clone()
        };
        let form = [
            ("bp_num", coupon.to_string()),
            ("is_bp_remains_prior", "true".to_string()),
            ("up_mid", up.clone()),
            ("otype", "up".to_string()),
            ("oid", uid),
            ("csrf", csrf(session)),
        ];
        let resp = match session
            .post_form(endpoints::CHARGE_QUICK_PAY, &form, &[])
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("quick pay failed: {}", e)),
        };
        match code(&resp) {
            0 => {}
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected quick pay response: {}", resp)),
        }
        if resp["data"]["status"].as_i64().unwrap_or(0) != ORDER_STATUS_PAID {
            return soft(format!("charge order was not paid: {}", resp));
        }

        info!("charged {} B-coin coupons to [{}]", coupon, up);

        if let Some(order_no) = resp["data"]["order_no"].as_str() {
            let form = [
                ("order_id", order_no.to_string()),
                ("message", CHARGE_COMMENT_TEXT.to_string()),
                ("csrf", csrf(session)),
            ];
            match session.post_form(endpoints::CHARGE_COMMENT, &form, &[]).await {
                Ok(resp) if code(&resp) == 0 => debug!("charge comment posted"),
                Ok(resp) => warn!("charge comment rejected: {}", resp),
                Err(e) => warn!("charge comment failed: {}", e),
            }
        }

        success()
    }
}

/// Whether `date` is the last day of its month.
fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt()
        .map(|next| next.month() != date.month())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_end_detection() {
        let cases = [
            (NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), true),
            (NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), true),
            (NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(), true),
            (NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), true),
            (NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(), false),
            (NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), false),
        ];
        for (date, expected) in cases {
            assert_eq!(is_month_end(date), expected, "{}", date);
        }
    }
}
