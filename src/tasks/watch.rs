//! Watch & Share Task
//!
//! Picks a video from the followed-UP feed (region ranking as a
//! fallback), reports a playback heartbeat, then shares the same video
//! for the daily share reward.

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info};

use crate::session::endpoints;
use crate::types::{RemoteSession, RunConfig, TaskOutcome};

use super::{code, csrf, soft, success, Task, CODE_NOT_LOGGED_IN};

/// Remote code for a video that was already shared today.
const CODE_ALREADY_SHARED: i64 = 71000;

pub struct WatchVideoTask {
    region: String,
}

impl WatchVideoTask {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            region: config.watch_region.clone(),
        }
    }

    /// First bvid from the followed-UP feed, falling back to the region
    /// ranking when the feed is empty or unavailable.
    async fn pick_video(&self, session: &dyn RemoteSession) -> Option<String> {
        let uid = session.credentials().dede_user_id.clone();
        if let Ok(resp) = session
            .get(
                endpoints::FOLLOWED_FEED,
                &[("uid", uid), ("type_list", "8".to_string())],
            )
            .await
        {
            if code(&resp) == 0 {
                if let Some(bvid) = first_feed_bvid(&resp) {
                    return Some(bvid);
                }
            }
        }

        debug!("followed feed has no videos, falling back to region ranking");
        let resp = session
            .get(
                endpoints::REGION_RANKING,
                &[("rid", self.region.clone()), ("day", "3".to_string())],
            )
            .await
            .ok()?;
        ranking_bvids(&resp).into_iter().next()
    }
}

#[async_trait]
impl Task for WatchVideoTask {
    fn name(&self) -> &str {
        "watch video"
    }

    async fn run(&self, session: &dyn RemoteSession) -> Result<TaskOutcome> {
        let Some(bvid) = self.pick_video(session).await else {
            return soft("no candidate video to watch");
        };

        // The reported position must stay within the video's real
        // length; fall back to a typical length when the detail read
        // fails.
        let duration = match session
            .get(endpoints::VIDEO_VIEW, &[("bvid", bvid.clone())])
            .await
        {
            Ok(resp) if code(&resp) == 0 => resp["data"]["duration"].as_i64().unwrap_or(300),
            _ => 300,
        };
        let played_time = rand::thread_rng().gen_range(1..duration.max(2));
        let resp = match session
            .post_form(
                endpoints::REPORT_HEARTBEAT,
                &[
                    ("bvid", bvid.clone()),
                    ("played_time", played_time.to_string()),
                ],
                &[],
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("heartbeat report failed: {}", e)),
        };
        match code(&resp) {
            0 => info!("watched [{}] for {}s", bvid, played_time),
            CODE_NOT_LOGGED_IN => return Ok(TaskOutcome::AuthExpired),
            _ => return soft(format!("unexpected heartbeat response: {}", resp)),
        }

        let resp = match session
            .post_form(
                endpoints::SHARE_VIDEO,
                &[("bvid", bvid.clone()), ("csrf", csrf(session))],
                &[],
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return soft(format!("share failed: {}", e)),
        };
        match code(&resp) {
            0 => {
                info!("shared [{}]", bvid);
                success()
            }
            CODE_ALREADY_SHARED => {
                info!("a video was already shared today");
                success()
            }
            CODE_NOT_LOGGED_IN => Ok(TaskOutcome::AuthExpired),
            _ => soft(format!("unexpected share response: {}", resp)),
        }
    }
}

/// First bvid in a followed-UP dynamics feed body.
pub(crate) fn first_feed_bvid(resp: &Value) -> Option<String> {
    resp["data"]["cards"]
        .as_array()?
        .iter()
        .find_map(|card| card["desc"]["bvid"].as_str().map(|s| s.to_string()))
}

/// All bvids in a region ranking body, most popular first.
pub(crate) fn ranking_bvids(resp: &Value) -> Vec<String> {
    let list = resp["data"]
        .as_array()
        .or_else(|| resp["data"]["list"].as_array());
    list.map(|videos| {
        videos
            .iter()
            .filter_map(|v| v["bvid"].as_str().map(|s| s.to_string()))
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_feed_bvid_skips_cards_without_video() {
        let resp = json!({
            "code": 0,
            "data": {"cards": [
                {"desc": {"dynamic_id": 1}},
                {"desc": {"bvid": "BV1xx411c7mD"}},
            ]}
        });
        assert_eq!(first_feed_bvid(&resp).as_deref(), Some("BV1xx411c7mD"));
    }

    #[test]
    fn test_ranking_bvids_handles_both_body_shapes() {
        let flat = json!({"code": 0, "data": [{"bvid": "BV1a"}, {"bvid": "BV1b"}]});
        assert_eq!(ranking_bvids(&flat), vec!["BV1a", "BV1b"]);

        let nested = json!({"code": 0, "data": {"list": [{"bvid": "BV2a"}]}});
        assert_eq!(ranking_bvids(&nested), vec!["BV2a"]);

        let empty = json!({"code": 0, "data": {}});
        assert!(ranking_bvids(&empty).is_empty());
    }
}
