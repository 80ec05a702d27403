//! Full-run scenarios over a scripted mock session.

use async_trait::async_trait;
use recon_runtime::catalog::{self, Invasiveness, TacticDefinition, TacticId};
use recon_runtime::config::{EngineConfig, Pacing};
use recon_runtime::executor::{ExecutorState, TacticExecutor};
use recon_runtime::impact::Effectiveness;
use recon_runtime::mission::{self, MissionOptions};
use recon_runtime::report::RunMode;
use recon_runtime::session::{
    ArtifactRef, CookieInfo, NavigationOutcome, ProbeRequest, Session, SessionError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Config with all pacing zeroed so runs complete immediately.
fn fast_config() -> EngineConfig {
    EngineConfig {
        pacing: Pacing {
            low_tier_ms: 0,
            medium_tier_ms: 0,
            high_tier_ms: 0,
            phase_transition_ms: 0,
            jitter_ms: 0,
        },
        ..EngineConfig::default()
    }
}

fn success_envelope(unlocked: &[&str]) -> Value {
    json!({
        "success": true,
        "details": "applied",
        "data": {},
        "features_unlocked": unlocked,
    })
}

fn metrics_payload(total: u64, visible: u64, text_len: u64, body: &str) -> Value {
    json!({
        "total_elements": total,
        "visible_elements": visible,
        "hidden_elements": total - visible,
        "interactive_elements": 20,
        "buttons": 5,
        "inputs": 3,
        "links": 30,
        "forms": 1,
        "images": 10,
        "scripts": 6,
        "iframes": 0,
        "body_text_length": text_len,
        "local_storage_items": 2,
        "body_html": body,
    })
}

type MetricsFn = Box<dyn Fn(usize) -> Result<Value, SessionError> + Send + Sync>;
type TacticFn = Box<dyn Fn(TacticId, usize) -> Result<Value, SessionError> + Send + Sync>;
type CensusFn = Box<dyn Fn(usize) -> Result<Value, SessionError> + Send + Sync>;

/// A session scripted by closures over per-probe call counters.
struct MockSession {
    metrics_calls: AtomicUsize,
    tactic_calls: AtomicUsize,
    census_calls: AtomicUsize,
    metrics_fn: MetricsFn,
    tactic_fn: TacticFn,
    census_fn: CensusFn,
    url: String,
}

impl MockSession {
    fn steady(metrics: Value) -> Self {
        Self::new(
            Box::new(move |_| Ok(metrics.clone())),
            Box::new(|_, _| Ok(success_envelope(&[]))),
            Box::new(|_| Ok(json!({"button": 5, "a[href]": 30}))),
        )
    }

    fn new(metrics_fn: MetricsFn, tactic_fn: TacticFn, census_fn: CensusFn) -> Self {
        Self {
            metrics_calls: AtomicUsize::new(0),
            tactic_calls: AtomicUsize::new(0),
            census_calls: AtomicUsize::new(0),
            metrics_fn,
            tactic_fn,
            census_fn,
            url: "https://example.com/".to_string(),
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn navigate(
        &mut self,
        url: &str,
        _timeout_ms: u64,
    ) -> Result<NavigationOutcome, SessionError> {
        self.url = url.to_string();
        Ok(NavigationOutcome {
            final_url: url.to_string(),
            load_time_ms: 5,
        })
    }

    async fn run_probe(&self, request: ProbeRequest) -> Result<Value, SessionError> {
        match request {
            ProbeRequest::Metrics => {
                let n = self.metrics_calls.fetch_add(1, Ordering::SeqCst);
                (self.metrics_fn)(n)
            }
            ProbeRequest::Tactic(id) => {
                let n = self.tactic_calls.fetch_add(1, Ordering::SeqCst);
                (self.tactic_fn)(id, n)
            }
            ProbeRequest::ElementCensus => {
                let n = self.census_calls.fetch_add(1, Ordering::SeqCst);
                (self.census_fn)(n)
            }
        }
    }

    async fn capture_artifact(&self, _label: &str) -> Option<ArtifactRef> {
        None
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.url.clone())
    }

    async fn current_title(&self) -> Result<String, SessionError> {
        Ok("Example Domain".to_string())
    }

    async fn cookies(&self) -> Result<Vec<CookieInfo>, SessionError> {
        Ok(Vec::new())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        Ok(())
    }
}

fn five_tactics() -> Vec<TacticDefinition> {
    catalog::liberation_catalog()[..5].to_vec()
}

#[tokio::test]
async fn test_full_mission_attempts_every_tactic() {
    let mut session = MockSession::steady(metrics_payload(100, 90, 4000, "<p>x</p>"));
    let report = mission::run_mission(
        &mut session,
        fast_config(),
        MissionOptions::new("https://example.com/", RunMode::Liberation),
    )
    .await
    .unwrap();

    let catalog_len = catalog::liberation_catalog().len();
    assert_eq!(report.tactic_results.len(), catalog_len);
    assert!(!report.incomplete);
    assert!(report.reliable);
    assert_eq!(report.statistics.attempted as usize, catalog_len);
    assert_eq!(report.statistics.succeeded as usize, catalog_len);
    assert_eq!(report.statistics.success_rate, 1.0);
    assert_eq!(report.target, "https://example.com/");
    assert_eq!(report.title.as_deref(), Some("Example Domain"));

    // Checkpoints in mission order
    let names: Vec<&str> = report.checkpoints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["baseline", "after_liberation", "final_state"]);
    assert!(report.checkpoints[0].new_elements.is_empty());
}

#[tokio::test]
async fn test_probe_failure_is_recorded_and_run_continues() {
    let session_tactics = five_tactics();
    let mut session = MockSession::new(
        Box::new(|_| Ok(metrics_payload(100, 90, 4000, "<p>x</p>"))),
        Box::new(|_, n| {
            if n == 2 {
                Err(SessionError::Probe("script threw".to_string()))
            } else {
                Ok(success_envelope(&[]))
            }
        }),
        Box::new(|_| Ok(json!({}))),
    );

    let mut executor = TacticExecutor::new(fast_config(), "m-test");
    let outcome = executor.run(&mut session, &session_tactics).await;

    assert_eq!(outcome.results.len(), 5);
    assert!(!outcome.incomplete);
    assert_eq!(executor.state(), ExecutorState::Completed);
    let failed = &outcome.results[2];
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("script threw"));
    assert!(outcome.results.iter().enumerate().all(|(i, r)| r.success || i == 2));
}

#[tokio::test]
async fn test_session_loss_yields_partial_results() {
    let tactics = catalog::liberation_catalog()[..6].to_vec();
    let mut session = MockSession::new(
        Box::new(|_| Ok(metrics_payload(100, 90, 4000, "<p>x</p>"))),
        Box::new(|_, n| {
            if n >= 1 {
                Err(SessionError::Unreachable("browser exited".to_string()))
            } else {
                Ok(success_envelope(&[]))
            }
        }),
        Box::new(|_| Ok(json!({}))),
    );

    let mut executor = TacticExecutor::new(fast_config(), "m-test");
    let outcome = executor.run(&mut session, &tactics).await;

    // The in-flight tactic is not recorded as failed; it was not completed.
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.incomplete);
    assert!(outcome.results[0].success);
    // An aborted run never reports a completed state.
    assert_eq!(executor.state(), ExecutorState::Aborted);
}

#[tokio::test]
async fn test_unchanged_page_produces_no_significant_impacts() {
    let mut session = MockSession::steady(metrics_payload(100, 90, 4000, "<p>x</p>"));
    let report = mission::run_mission(
        &mut session,
        fast_config(),
        MissionOptions::new("https://example.com/", RunMode::Safe),
    )
    .await
    .unwrap();

    assert_eq!(report.tactic_results.len(), catalog::safe_catalog().len());
    for result in &report.tactic_results {
        let impact = result.impact.as_ref().unwrap();
        assert!(!impact.significant_change);
        assert_eq!(impact.effectiveness, Effectiveness::Low);
    }
    assert!(report.statistics.most_effective.is_none());
}

#[tokio::test]
async fn test_large_change_rates_tactic_effective() {
    // The before-capture sees the small page, the after-capture the grown
    // one.
    let mut session = MockSession::new(
        Box::new(|n| {
            if n == 0 {
                Ok(metrics_payload(100, 80, 4000, "<p>small</p>"))
            } else {
                Ok(metrics_payload(180, 170, 9000, "<p>grown</p>"))
            }
        }),
        Box::new(|_, _| Ok(success_envelope(&["paywalled_content"]))),
        Box::new(|_| Ok(json!({"button": 5}))),
    );

    let tactics = vec![TacticDefinition {
        id: TacticId::BypassPaywall,
        phase: 2,
        tier: Invasiveness::Medium,
        description: "Attempt paywall bypass techniques",
    }];
    let mut executor = TacticExecutor::new(fast_config(), "m-test");
    let outcome = executor.run(&mut session, &tactics).await;

    let impact = outcome.results[0].impact.as_ref().unwrap();
    assert!(impact.significant_change);
    assert_eq!(impact.effectiveness, Effectiveness::High);
    assert_eq!(impact.elements_revealed, 90);
    assert_eq!(impact.features_unlocked, vec!["paywalled_content".to_string()]);
}

#[tokio::test]
async fn test_checkpoint_census_growth_appears_as_new_elements() {
    let session = MockSession::new(
        Box::new(|_| Ok(metrics_payload(100, 90, 4000, "<p>x</p>"))),
        Box::new(|_, _| Ok(success_envelope(&[]))),
        Box::new(|n| {
            if n == 0 {
                Ok(json!({"button": 5, "a[href]": 30}))
            } else {
                Ok(json!({"button": 12, "a[href]": 30, "select": 2}))
            }
        }),
    );

    let first = recon_runtime::checkpoint::record("baseline", &session, None)
        .await
        .unwrap();
    assert!(first.new_elements.is_empty());

    let second = recon_runtime::checkpoint::record("after_liberation", &session, Some(&first))
        .await
        .unwrap();
    assert_eq!(second.new_elements.get("button"), Some(&7));
    assert_eq!(second.new_elements.get("select"), Some(&2));
    assert!(!second.new_elements.contains_key("a[href]"));
}

#[tokio::test]
async fn test_cancel_stops_between_tactics() {
    let mut session = MockSession::steady(metrics_payload(100, 90, 4000, "<p>x</p>"));
    let mut executor = TacticExecutor::new(fast_config(), "m-test");
    let cancel = executor.cancel_handle();
    cancel.cancel();

    let outcome = executor.run(&mut session, catalog::safe_catalog()).await;
    assert!(outcome.results.is_empty());
    assert!(outcome.incomplete);
    assert_eq!(executor.state(), ExecutorState::Aborted);
}
