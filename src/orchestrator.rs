//! Task Orchestrator
//!
//! Runs the daily batch for one account: plans the execution order,
//! isolates task failures, aborts early on auth expiry, and always
//! finalizes with an aggregate snapshot plus one notification attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::aggregate;
use crate::notify;
use crate::tasks::{self, pinned, Task};
use crate::types::{AccountSnapshot, Notifier, RemoteSession, RunConfig, RunContext, TaskOutcome};

/// Fixed delay between consecutive tasks, so one run never hammers the
/// remote service faster than a person would.
const PACING_DELAY: Duration = Duration::from_secs(3);

/// Granularity at which the pacing sleep observes cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(500);

/// Plan the final execution order: shuffle the chores, append the two
/// pinned tasks (history fetch, then the auth check), and reverse the
/// whole list. The reversal puts the auth check first and the history
/// fetch second while keeping the chore order randomized, so the
/// request pattern never repeats between days.
pub fn plan_order(chores: Vec<Box<dyn Task>>, rng: &mut impl Rng) -> Vec<Box<dyn Task>> {
    let mut list = chores;
    list.shuffle(rng);
    list.push(Box::new(pinned::CoinLogTask::new()));
    list.push(Box::new(pinned::VerifySessionTask::new()));
    list.reverse();
    list
}

pub struct TaskOrchestrator<'a> {
    session: &'a dyn RemoteSession,
    notifier: &'a dyn Notifier,
    config: RunConfig,
    cancel: Arc<AtomicBool>,
    pacing: Duration,
}

impl<'a> TaskOrchestrator<'a> {
    pub fn new(
        session: &'a dyn RemoteSession,
        notifier: &'a dyn Notifier,
        config: RunConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            notifier,
            config,
            cancel,
            pacing: PACING_DELAY,
        }
    }

    /// Override the inter-task pacing delay.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Execute the full run and return the final snapshot. This is the
    /// only entry point callers need.
    pub async fn run(&self, ctx: &RunContext) -> AccountSnapshot {
        let plan = {
            let mut rng = rand::thread_rng();
            plan_order(tasks::chore_tasks(&self.config), &mut rng)
        };
        self.run_plan(ctx, plan).await
    }

    /// Execute an already-planned task order.
    pub async fn run_plan(&self, ctx: &RunContext, plan: Vec<Box<dyn Task>>) -> AccountSnapshot {
        let total = plan.len();
        let mut expired = false;

        for (idx, task) in plan.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                info!("run for [{}] cancelled before [{}]", ctx.uid, task.name());
                return AccountSnapshot::partial(&ctx.uid);
            }

            info!("[{}]", task.name());
            match task.run(self.session).await {
                Ok(TaskOutcome::Success) => {}
                Ok(TaskOutcome::SoftFailure(reason)) => {
                    warn!("[{}] did not complete: {}", task.name(), reason);
                }
                Ok(TaskOutcome::AuthExpired) => {
                    warn!(
                        "[{}] found the session rejected, aborting remaining tasks",
                        task.name()
                    );
                    expired = true;
                    break;
                }
                // A task variant leaking an error is a defect, not a
                // reason to abort the other tasks.
                Err(defect) => {
                    error!("[{}] task defect: {:#}", task.name(), defect);
                }
            }

            if idx + 1 < total && self.paced_wait().await {
                info!("run for [{}] cancelled during pacing", ctx.uid);
                return AccountSnapshot::partial(&ctx.uid);
            }
        }

        self.finalize(ctx, expired).await
    }

    /// Sleep the pacing delay, waking early when cancellation is
    /// requested. Returns whether the run was cancelled.
    async fn paced_wait(&self) -> bool {
        let mut slept = Duration::ZERO;
        while slept < self.pacing {
            if self.cancel.load(Ordering::SeqCst) {
                return true;
            }
            let step = CANCEL_POLL.min(self.pacing - slept);
            sleep(step).await;
            slept += step;
        }
        self.cancel.load(Ordering::SeqCst)
    }

    /// Build the final snapshot and make the single notification
    /// attempt. Runs whether or not the session expired; a push failure
    /// never changes the returned snapshot.
    async fn finalize(&self, ctx: &RunContext, expired: bool) -> AccountSnapshot {
        let snapshot = if expired {
            AccountSnapshot::expired(&ctx.uid)
        } else {
            info!("daily tasks finished, computing level progress");
            aggregate::build_snapshot(self.session, ctx).await
        };

        let summary = notify::format_summary(&snapshot);
        match self.notifier.push(&summary).await {
            Ok(true) => info!("summary for [{}] delivered", ctx.uid),
            Ok(false) => warn!("summary for [{}] was rejected by the push channel", ctx.uid),
            Err(e) => error!("summary push for [{}] failed: {:#}", ctx.uid, e),
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    use crate::types::{AccountCredentials, SessionError};

    // ---- Test Doubles ---------------------------------------------------

    struct StubSession {
        credentials: AccountCredentials,
    }

    impl StubSession {
        fn new() -> Self {
            Self {
                credentials: AccountCredentials {
                    dede_user_id: "10001".to_string(),
                    sessdata: "sess".to_string(),
                    bili_jct: "jct".to_string(),
                    user_agent: "ua-test".to_string(),
                },
            }
        }
    }

    #[async_trait]
    impl RemoteSession for StubSession {
        fn credentials(&self) -> &AccountCredentials {
            &self.credentials
        }

        async fn get(
            &self,
            endpoint: &str,
            _query: &[(&str, String)],
        ) -> Result<Value, SessionError> {
            if endpoint.contains("exp/reward") {
                Ok(json!({
                    "code": 0,
                    "data": {"share": true, "watch": true, "login": true, "coins": 10}
                }))
            } else {
                Ok(json!({
                    "code": 0,
                    "data": {
                        "isLogin": true,
                        "uname": "alice",
                        "money": 52.0,
                        "vip": {"type": 1, "status": 0},
                        "level_info": {
                            "current_level": 4,
                            "current_exp": 4500,
                            "next_exp": 10800
                        }
                    }
                }))
            }
        }

        async fn post_form(
            &self,
            _endpoint: &str,
            _form: &[(&str, String)],
            _headers: &[(&str, String)],
        ) -> Result<Value, SessionError> {
            Ok(json!({"code": 0}))
        }

        async fn post_json(&self, _endpoint: &str, _body: &Value) -> Result<Value, SessionError> {
            Ok(json!({"code": 0}))
        }
    }

    struct ScriptedTask {
        name: String,
        // None scripts a defect: run returns an error.
        outcome: Option<TaskOutcome>,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Task for ScriptedTask {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _session: &dyn RemoteSession) -> Result<TaskOutcome> {
            self.journal.lock().unwrap().push(self.name.clone());
            match &self.outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(anyhow::anyhow!("scripted defect")),
            }
        }
    }

    fn scripted(
        outcomes: Vec<Option<TaskOutcome>>,
        journal: &Arc<Mutex<Vec<String>>>,
    ) -> Vec<Box<dyn Task>> {
        outcomes
            .into_iter()
            .enumerate()
            .map(|(i, outcome)| {
                Box::new(ScriptedTask {
                    name: format!("task-{}", i),
                    outcome,
                    journal: Arc::clone(journal),
                }) as Box<dyn Task>
            })
            .collect()
    }

    struct RecordingNotifier {
        fail: bool,
        pushed: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                pushed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn push(&self, text: &str) -> Result<bool> {
            self.pushed.lock().unwrap().push(text.to_string());
            if self.fail {
                anyhow::bail!("push transport down");
            }
            Ok(true)
        }
    }

    fn orchestrator<'a>(
        session: &'a StubSession,
        notifier: &'a RecordingNotifier,
        cancel: Arc<AtomicBool>,
    ) -> TaskOrchestrator<'a> {
        TaskOrchestrator::new(session, notifier, RunConfig::default(), cancel)
            .with_pacing(Duration::ZERO)
    }

    // ---- Ordering -------------------------------------------------------

    #[test]
    fn test_pinned_tasks_lead_every_order() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_order(tasks::chore_tasks(&RunConfig::default()), &mut rng);

            assert_eq!(plan.len(), 11);
            assert_eq!(plan[0].name(), "verify session");
            assert_eq!(plan[1].name(), "coin history");
            for task in &plan[2..] {
                assert_ne!(task.name(), "verify session");
                assert_ne!(task.name(), "coin history");
            }
        }
    }

    #[test]
    fn test_fixed_seed_gives_reproducible_order() {
        let order = |seed: u64| -> Vec<String> {
            let mut rng = StdRng::seed_from_u64(seed);
            plan_order(tasks::chore_tasks(&RunConfig::default()), &mut rng)
                .iter()
                .map(|t| t.name().to_string())
                .collect()
        };

        assert_eq!(order(7), order(7));
        // Different seeds permute the chores; the pinned prefix stays.
        let a = order(1);
        let b = order(2);
        assert_eq!(a[..2], b[..2]);
    }

    // ---- Execution Loop -------------------------------------------------

    #[tokio::test]
    async fn test_full_run_executes_all_tasks_and_notifies_once() {
        let session = StubSession::new();
        let notifier = RecordingNotifier::new(false);
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");

        let plan = scripted(
            vec![
                Some(TaskOutcome::Success),
                Some(TaskOutcome::Success),
                Some(TaskOutcome::Success),
            ],
            &journal,
        );
        let snapshot = orchestrator(&session, &notifier, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, plan)
            .await;

        assert_eq!(journal.lock().unwrap().len(), 3);
        assert_eq!(notifier.pushed.lock().unwrap().len(), 1);
        assert!(snapshot.signed_in);
        assert_eq!(snapshot.level, Some(4));
        // 6300 exp remaining at 25 exp per day.
        assert_eq!(snapshot.days_to_next_level, Some(253));
    }

    #[tokio::test]
    async fn test_auth_expiry_stops_remaining_tasks() {
        let session = StubSession::new();
        let notifier = RecordingNotifier::new(false);
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");

        let plan = scripted(
            vec![
                Some(TaskOutcome::Success),
                Some(TaskOutcome::AuthExpired),
                Some(TaskOutcome::Success),
                Some(TaskOutcome::Success),
            ],
            &journal,
        );
        let snapshot = orchestrator(&session, &notifier, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, plan)
            .await;

        // Nothing after the expiry observation ran.
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["task-0".to_string(), "task-1".to_string()]
        );
        assert!(!snapshot.signed_in);
        assert_eq!(snapshot.level, None);

        // The expiry is still reported.
        let pushed = notifier.pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert!(pushed[0].contains("expired"));
    }

    #[tokio::test]
    async fn test_soft_failure_never_stops_the_run() {
        let session = StubSession::new();
        let notifier = RecordingNotifier::new(false);
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");

        let plan = scripted(
            vec![
                Some(TaskOutcome::soft("remote said no")),
                Some(TaskOutcome::Success),
                Some(TaskOutcome::soft("remote said no again")),
            ],
            &journal,
        );
        let snapshot = orchestrator(&session, &notifier, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, plan)
            .await;

        assert_eq!(journal.lock().unwrap().len(), 3);
        assert_eq!(notifier.pushed.lock().unwrap().len(), 1);
        assert!(snapshot.signed_in);
    }

    #[tokio::test]
    async fn test_task_defect_is_downgraded_to_soft_failure() {
        let session = StubSession::new();
        let notifier = RecordingNotifier::new(false);
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");

        let plan = scripted(vec![None, Some(TaskOutcome::Success)], &journal);
        let snapshot = orchestrator(&session, &notifier, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, plan)
            .await;

        assert_eq!(journal.lock().unwrap().len(), 2);
        assert!(snapshot.signed_in);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_change_the_snapshot() {
        let session = StubSession::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");
        let outcomes = || vec![Some(TaskOutcome::Success), Some(TaskOutcome::Success)];

        let healthy = RecordingNotifier::new(false);
        let with_healthy = orchestrator(&session, &healthy, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, scripted(outcomes(), &journal))
            .await;

        let failing = RecordingNotifier::new(true);
        let with_failing = orchestrator(&session, &failing, Arc::new(AtomicBool::new(false)))
            .run_plan(&ctx, scripted(outcomes(), &journal))
            .await;

        assert_eq!(failing.pushed.lock().unwrap().len(), 1);
        assert_eq!(with_healthy, with_failing);
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_before_any_task() {
        let session = StubSession::new();
        let notifier = RecordingNotifier::new(false);
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new("10001");

        let plan = scripted(vec![Some(TaskOutcome::Success)], &journal);
        let snapshot = orchestrator(&session, &notifier, Arc::new(AtomicBool::new(true)))
            .run_plan(&ctx, plan)
            .await;

        assert!(journal.lock().unwrap().is_empty());
        assert!(notifier.pushed.lock().unwrap().is_empty());
        assert!(snapshot.signed_in);
        assert_eq!(snapshot.level, None);
    }
}
