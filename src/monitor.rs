//! Polling host around the detection engine
//!
//! Every batch, whatever source delivered it, goes through
//! [`Monitor::process_items`], which holds the engine lock for the whole
//! check-then-mark pass so batches are never interleaved.

use std::time::Duration;

use chrono::FixedOffset;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::client::feed::FeedSource;
use crate::config::Config;
use crate::core::types::Token;
use crate::detect::{DetectionEngine, Phase};
use crate::ingest::TokenRecordParser;
use crate::transport::{Alert, AlertBus, AlertKind};
use crate::util::display;

/// Summary of one processed batch
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub reported: Vec<Token>,
    /// Accepted items in the batch
    pub total: usize,
    pub rejected: usize,
    /// Batch was processed in the startup phase
    pub first_run: bool,
    /// Latest tokens shown on first run when nothing was recent
    pub preview: Vec<Token>,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub threshold_minutes: i64,
    pub interval: Duration,
    pub display_limit: usize,
    pub startup_preview: usize,
    pub push_on_startup: bool,
    pub push_enabled: bool,
    pub offset: FixedOffset,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold_minutes: config.new_token_threshold_minutes,
            interval: Duration::from_secs(config.check_interval_minutes.saturating_mul(60)),
            display_limit: config.display_limit,
            startup_preview: config.startup_preview,
            push_on_startup: config.bark_push_on_startup,
            push_enabled: config.bark_enabled(),
            offset: display::display_offset(config.timezone_offset_hours),
        }
    }
}

pub struct Monitor {
    engine: Mutex<DetectionEngine>,
    feed: Box<dyn FeedSource>,
    alert_bus: AlertBus,
    settings: MonitorSettings,
}

impl Monitor {
    pub fn new(feed: Box<dyn FeedSource>, alert_bus: AlertBus, settings: MonitorSettings) -> Self {
        info!(
            feed = feed.name(),
            threshold_minutes = settings.threshold_minutes,
            interval_secs = settings.interval.as_secs(),
            "Initializing token monitor"
        );
        Self {
            engine: Mutex::new(DetectionEngine::with_threshold_minutes(settings.threshold_minutes)),
            feed,
            alert_bus,
            settings,
        }
    }

    pub async fn phase(&self) -> Phase {
        self.engine.lock().await.phase()
    }

    pub async fn seen_count(&self) -> usize {
        self.engine.lock().await.seen().len()
    }

    /// Parse, detect, report and publish one raw batch
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn process_items(&self, items: &[Value]) -> CycleReport {
        let parsed = TokenRecordParser::parse_batch(items);
        if parsed.rejected > 0 {
            info!(rejected = parsed.rejected, accepted = parsed.tokens.len(), "Feed items rejected");
        }

        let (first_run, reported) = {
            let mut engine = self.engine.lock().await;
            let first_run = engine.is_first_run();
            (first_run, engine.process_batch(&parsed.tokens))
        };

        let preview = if first_run && reported.is_empty() {
            display::latest_tokens(&parsed.tokens, self.settings.startup_preview)
        } else {
            Vec::new()
        };

        let report = CycleReport {
            reported,
            total: parsed.tokens.len(),
            rejected: parsed.rejected,
            first_run,
            preview,
        };

        self.render(&report);
        self.publish(&report);
        report
    }

    fn render(&self, report: &CycleReport) {
        let limit = self.settings.display_limit;
        let offset = self.settings.offset;

        if report.first_run {
            let window = self.settings.threshold_minutes;
            if !report.reported.is_empty() {
                display::print_token_list(
                    &format!("📈 Tokens created in the last {} minutes ({}):", window, report.reported.len()),
                    &report.reported,
                    limit,
                    offset,
                );
            } else {
                println!("No tokens created in the last {} minutes", window);
                if !report.preview.is_empty() {
                    display::print_token_list(
                        &format!("🪙 Latest {} tokens:", report.preview.len()),
                        &report.preview,
                        limit,
                        offset,
                    );
                }
            }
            info!("✨ Initial batch absorbed, now watching for new tokens");
        } else if report.reported.is_empty() {
            display::print_no_new_tokens(offset);
        } else {
            display::print_new_tokens(&report.reported, limit, offset);
        }
    }

    fn publish(&self, report: &CycleReport) {
        if !self.settings.push_enabled {
            return;
        }

        if report.first_run {
            if self.settings.push_on_startup {
                let tokens = if report.reported.is_empty() {
                    report.preview.clone()
                } else {
                    report.reported.clone()
                };
                self.alert_bus.publish(Alert::new(AlertKind::Startup, tokens));
            }
        } else if !report.reported.is_empty() {
            self.alert_bus
                .publish(Alert::new(AlertKind::NewTokens, report.reported.clone()));
        }
    }

    /// One fetch-and-detect cycle. A failed fetch leaves all state untouched.
    pub async fn run_once(&self) -> Option<CycleReport> {
        if self.phase().await == Phase::Startup {
            info!(
                threshold_minutes = self.settings.threshold_minutes,
                "First check, looking for recently created tokens"
            );
        } else {
            debug!("Checking for new tokens");
        }

        match self.feed.fetch().await {
            Ok(items) => {
                debug!(items = items.len(), source = self.feed.name(), "Batch fetched");
                Some(self.process_items(&items).await)
            }
            Err(e) => {
                error!(source = self.feed.name(), error = %e, "❌ All feed sources failed, skipping cycle");
                None
            }
        }
    }

    /// Poll until `shutdown` fires; the first poll happens immediately
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(report) = self.run_once().await {
                        debug!(
                            reported = report.reported.len(),
                            total = report.total,
                            rejected = report.rejected,
                            "Cycle complete"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!("🛑 Monitor shutting down");
                    break;
                }
            }
        }

        let engine = self.engine.lock().await;
        info!(
            batches = engine.batches_processed(),
            reported = engine.total_reported(),
            seen = engine.seen().len(),
            "Monitor stopped"
        );
        if engine.batches_processed() == 0 {
            warn!("Monitor stopped before any batch was processed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FeedError;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFeed {
        batches: Vec<Result<Vec<Value>, ()>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for ScriptedFeed {
        async fn fetch(&self) -> Result<Vec<Value>, FeedError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.batches.get(i) {
                Some(Ok(batch)) => Ok(batch.clone()),
                _ => Err(FeedError::Exhausted),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn settings(push_enabled: bool) -> MonitorSettings {
        MonitorSettings {
            threshold_minutes: 30,
            interval: Duration::from_secs(60),
            display_limit: 5,
            startup_preview: 3,
            push_on_startup: true,
            push_enabled,
            offset: display::display_offset(0),
        }
    }

    fn item(id: i64, minutes_ago: i64) -> Value {
        json!({"token": {
            "id": id,
            "name": format!("T{}", id),
            "ticker": "TCK",
            "token_address": "addr",
            "token_created_at": (Utc::now() - chrono::Duration::minutes(minutes_ago)).to_rfc3339(),
        }})
    }

    fn monitor_with(batches: Vec<Result<Vec<Value>, ()>>, bus: AlertBus, push: bool) -> Monitor {
        let feed = ScriptedFeed { batches, calls: AtomicUsize::new(0) };
        Monitor::new(Box::new(feed), bus, settings(push))
    }

    fn ids(tokens: &[Token]) -> Vec<i64> {
        tokens.iter().map(|t| t.token_id).collect()
    }

    #[test]
    fn test_settings_from_extreme_config() {
        let config = Config {
            check_interval_minutes: u64::MAX / 10,
            new_token_threshold_minutes: 200_000_000_000_000_000,
            ..Config::default()
        };
        let settings = MonitorSettings::from_config(&config);
        assert_eq!(settings.interval, Duration::from_secs(u64::MAX));

        let feed = ScriptedFeed { batches: vec![], calls: AtomicUsize::new(0) };
        let monitor = Monitor::new(Box::new(feed), AlertBus::new(), settings);
        assert_eq!(monitor.settings.threshold_minutes, 200_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_first_then_steady_cycle() {
        let monitor = monitor_with(
            vec![
                Ok(vec![item(1, 5), item(2, 120)]),
                Ok(vec![item(1, 5), item(3, 0)]),
            ],
            AlertBus::new(),
            false,
        );

        let first = monitor.run_once().await.unwrap();
        assert!(first.first_run);
        assert_eq!(ids(&first.reported), vec![1]);
        assert!(first.preview.is_empty());
        assert_eq!(monitor.phase().await, Phase::SteadyState);

        let second = monitor.run_once().await.unwrap();
        assert!(!second.first_run);
        assert_eq!(ids(&second.reported), vec![3]);
        assert_eq!(monitor.seen_count().await, 3);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_startup_phase() {
        let monitor = monitor_with(vec![Err(()), Ok(vec![item(1, 120)])], AlertBus::new(), false);

        assert!(monitor.run_once().await.is_none());
        assert_eq!(monitor.phase().await, Phase::Startup);

        let report = monitor.run_once().await.unwrap();
        assert!(report.first_run);
        assert!(report.reported.is_empty());
        assert_eq!(ids(&report.preview), vec![1]);
    }

    #[tokio::test]
    async fn test_rejections_counted() {
        let monitor = monitor_with(vec![], AlertBus::new(), false);
        let report = monitor
            .process_items(&[item(1, 120), json!({"token": {}}), json!(null)])
            .await;
        assert_eq!(report.rejected, 2);
        assert_eq!(report.total, 1);
    }

    #[tokio::test]
    async fn test_alerts_published() {
        let bus = AlertBus::new();
        let mut rx = bus.subscribe();
        let monitor = monitor_with(vec![], bus, true);

        monitor.process_items(&[item(1, 120), item(2, 90)]).await;
        let startup = rx.recv().await.unwrap();
        assert_eq!(startup.kind, AlertKind::Startup);
        assert_eq!(ids(&startup.tokens), vec![2, 1]);

        monitor.process_items(&[item(1, 120)]).await;
        monitor.process_items(&[item(4, 0)]).await;
        let new_tokens = rx.recv().await.unwrap();
        assert_eq!(new_tokens.kind, AlertKind::NewTokens);
        assert_eq!(ids(&new_tokens.tokens), vec![4]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_alerts_when_push_disabled() {
        let bus = AlertBus::new();
        let mut rx = bus.subscribe();
        let monitor = monitor_with(vec![], bus, false);

        monitor.process_items(&[item(1, 1)]).await;
        monitor.process_items(&[item(2, 1)]).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let monitor = monitor_with(vec![Ok(vec![item(1, 1)])], AlertBus::new(), false);
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            monitor.run(rx).await;
            monitor
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        let monitor = handle.await.unwrap();
        assert_eq!(monitor.phase().await, Phase::SteadyState);
    }
}
