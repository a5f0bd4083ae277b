//! Run Summary Notification
//!
//! Formats the end-of-run summary and delivers it through a `Notifier`.
//! The Telegram implementation lives in `telegram`; a log-only fallback
//! covers accounts without a push channel.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::{AccountSnapshot, Notifier};

/// Mask a username for inclusion in outbound messages: everything but
/// the first and last character is starred out.
pub fn mask_username(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    match chars.len() {
        0 => String::new(),
        1 | 2 => format!("{}*", chars[0]),
        n => {
            let mut masked = String::new();
            masked.push(chars[0]);
            masked.extend(std::iter::repeat('*').take(n - 2));
            masked.push(chars[n - 1]);
            masked
        }
    }
}

/// Human-readable end-of-run summary for one account.
pub fn format_summary(snapshot: &AccountSnapshot) -> String {
    let mut lines = Vec::new();

    let name = snapshot
        .username
        .as_deref()
        .map(mask_username)
        .unwrap_or_else(|| "unknown".to_string());
    lines.push(format!("Daily run for {} ({})", snapshot.uid, name));

    if !snapshot.signed_in {
        lines.push("Session expired before the chores could run.".to_string());
        lines.push("Please refresh the account cookies.".to_string());
        return lines.join("\n");
    }

    match (snapshot.level, snapshot.current_exp, snapshot.next_exp) {
        (Some(level), Some(current), Some(next)) if next > 0 => {
            lines.push(format!("Level {} ({}/{} exp)", level, current, next));
        }
        (Some(level), Some(current), _) => {
            lines.push(format!("Level {} ({} exp)", level, current));
        }
        _ => lines.push("Level progress unavailable.".to_string()),
    }

    if let Some(coins) = snapshot.coins {
        lines.push(format!("Coins: {:.1}", coins));
    }

    match (snapshot.days_to_next_level, snapshot.level) {
        (Some(days), _) => lines.push(format!("Next level in about {} days.", days)),
        (None, Some(level)) if level >= crate::aggregate::MAX_LEVEL => {
            lines.push("Already at the highest level.".to_string());
        }
        _ => {}
    }

    lines.join("\n")
}

/// Fallback notifier that writes the summary into the run log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn push(&self, text: &str) -> Result<bool> {
        info!("run summary:\n{}", text);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountSnapshot;

    #[test]
    fn test_mask_username_lengths() {
        assert_eq!(mask_username(""), "");
        assert_eq!(mask_username("a"), "a*");
        assert_eq!(mask_username("ab"), "a*");
        assert_eq!(mask_username("alice"), "a***e");
        assert_eq!(mask_username("晚风拂柳"), "晚**柳");
    }

    #[test]
    fn test_summary_for_expired_session_mentions_cookies() {
        let summary = format_summary(&AccountSnapshot::expired("10001"));
        assert!(summary.contains("10001"));
        assert!(summary.contains("expired"));
        assert!(summary.contains("cookies"));
    }

    #[test]
    fn test_summary_reports_forecast_and_coins() {
        let mut snapshot = AccountSnapshot::partial("10001");
        snapshot.username = Some("alice".to_string());
        snapshot.level = Some(4);
        snapshot.current_exp = Some(4500);
        snapshot.next_exp = Some(10800);
        snapshot.coins = Some(52.0);
        snapshot.days_to_next_level = Some(253);

        let summary = format_summary(&snapshot);
        assert!(summary.contains("a***e"));
        assert!(summary.contains("Level 4"));
        assert!(summary.contains("52.0"));
        assert!(summary.contains("253 days"));
    }

    #[test]
    fn test_summary_at_max_level() {
        let mut snapshot = AccountSnapshot::partial("10001");
        snapshot.level = Some(6);
        snapshot.current_exp = Some(28888);
        snapshot.next_exp = Some(0);

        let summary = format_summary(&snapshot);
        assert!(summary.contains("highest level"));
    }
}
