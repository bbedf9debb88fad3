//! One alert cycle: run every due saved search, deliver what is new, and
//! remember what was delivered.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{Config, SearchConfig};
use crate::db::Store;
use crate::models::search::SearchTask;
use crate::services::dedup::DedupStore;
use crate::services::notifier::{AlertMessage, Notifier};
use crate::services::search::{ExecutionError, SearchExecutor, params_for};
use crate::services::selector::search_is_due;

/// Cooperative stop request, checked between searches.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one saved search during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    NotDue,
    SearchFailed,
    NoResults,
    AllSeen,
    Delivered { postings: usize },
    DeliveryFailed,
}

impl SearchOutcome {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotDue => "not_due",
            Self::SearchFailed => "search_failed",
            Self::NoResults => "no_results",
            Self::AllSeen => "all_seen",
            Self::Delivered { .. } => "delivered",
            Self::DeliveryFailed => "delivery_failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub searches: usize,
    pub not_due: usize,
    pub search_failed: usize,
    pub no_results: usize,
    pub all_seen: usize,
    pub delivered: usize,
    pub delivery_failed: usize,
    pub postings_delivered: usize,
    pub stopped_early: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: SearchOutcome) {
        match outcome {
            SearchOutcome::NotDue => self.not_due += 1,
            SearchOutcome::SearchFailed => self.search_failed += 1,
            SearchOutcome::NoResults => self.no_results += 1,
            SearchOutcome::AllSeen => self.all_seen += 1,
            SearchOutcome::Delivered { postings } => {
                self.delivered += 1;
                self.postings_delivered += postings;
            }
            SearchOutcome::DeliveryFailed => self.delivery_failed += 1,
        }
    }

    /// Searches that were actually run this cycle.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.searches - self.not_due
    }
}

pub struct AlertCycle {
    store: Store,
    executor: Arc<dyn SearchExecutor>,
    dedup: Arc<dyn DedupStore>,
    notifier: Arc<dyn Notifier>,
    search_defaults: SearchConfig,
    search_timeout: Duration,
    search_delay: Duration,
}

impl AlertCycle {
    #[must_use]
    pub fn new(
        store: Store,
        executor: Arc<dyn SearchExecutor>,
        dedup: Arc<dyn DedupStore>,
        notifier: Arc<dyn Notifier>,
        search_defaults: SearchConfig,
    ) -> Self {
        let search_timeout = Duration::from_secs(search_defaults.timeout_seconds.max(1));
        Self {
            store,
            executor,
            dedup,
            notifier,
            search_defaults,
            search_timeout,
            search_delay: Duration::ZERO,
        }
    }

    /// Wires the production collaborators from config.
    pub fn from_config(store: Store, config: &Config) -> Result<Self> {
        use crate::services::dedup::SeaOrmDedupStore;
        use crate::services::notifier::build_notifier;
        use crate::services::search::CliSearchExecutor;

        let executor = Arc::new(CliSearchExecutor::new(&config.search));
        let dedup = Arc::new(SeaOrmDedupStore::new(store.clone()));
        let notifier = build_notifier(&config.email)?;

        Ok(Self::new(store, executor, dedup, notifier, config.search.clone())
            .with_search_delay(Duration::from_secs(config.scheduler.search_delay_seconds)))
    }

    #[must_use]
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Runs every due search once. Only failing to load the snapshot of
    /// saved searches is an error; per-search failures are logged and
    /// counted in the report.
    pub async fn run_cycle(&self, stop: &StopFlag) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("alert_cycle", %cycle_id);
        self.run_cycle_inner(stop).instrument(span).await
    }

    async fn run_cycle_inner(&self, stop: &StopFlag) -> Result<CycleReport> {
        let start = Instant::now();
        let tasks = self.store.list_search_tasks().await?;

        info!(
            event = "cycle_started",
            searches = tasks.len(),
            "Starting alert cycle"
        );

        let mut report = CycleReport {
            searches: tasks.len(),
            ..CycleReport::default()
        };

        for (index, task) in tasks.iter().enumerate() {
            if stop.is_stopped() {
                info!("Stop requested, ending cycle before search {}", task.search.id);
                report.stopped_early = true;
                break;
            }

            let outcome = self.process_search(task).await;
            metrics::counter!("alert_searches_total", "outcome" => outcome.label()).increment(1);
            report.record(outcome);

            let is_last = index + 1 == tasks.len();
            if !is_last
                && !self.search_delay.is_zero()
                && !matches!(outcome, SearchOutcome::NotDue)
            {
                tokio::time::sleep(self.search_delay).await;
            }
        }

        metrics::counter!("alert_cycles_total").increment(1);
        metrics::counter!("alert_postings_delivered_total")
            .increment(u64::try_from(report.postings_delivered).unwrap_or(u64::MAX));
        metrics::histogram!("alert_cycle_duration_seconds").record(start.elapsed().as_secs_f64());

        info!(
            event = "cycle_finished",
            searches = report.searches,
            executed = report.executed(),
            delivered = report.delivered,
            postings = report.postings_delivered,
            failed = report.search_failed + report.delivery_failed,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Alert cycle finished"
        );

        Ok(report)
    }

    /// Drives one saved search through select, execute, filter, deliver and
    /// record. Never fails: every error ends as an outcome.
    pub async fn process_search(&self, task: &SearchTask) -> SearchOutcome {
        let search = &task.search;
        let observed_at = Utc::now();

        if !search_is_due(search, observed_at) {
            debug!(search_id = search.id, phase = "select", "Search not due yet");
            return SearchOutcome::NotDue;
        }

        info!(
            search_id = search.id,
            user_id = search.user_id,
            phase = "search",
            "Running search for '{}' in {}",
            search.keyword,
            search.country
        );

        let params = params_for(search, &self.search_defaults);
        let postings = match tokio::time::timeout(self.search_timeout, self.executor.execute(&params))
            .await
            .unwrap_or_else(|_| Err(ExecutionError::Timeout(self.search_timeout)))
        {
            Ok(postings) => postings,
            Err(e) => {
                warn!(
                    search_id = search.id,
                    user_id = search.user_id,
                    phase = "search",
                    error = %e,
                    "Search failed, will retry next cycle"
                );
                return SearchOutcome::SearchFailed;
            }
        };

        if postings.is_empty() {
            info!(search_id = search.id, phase = "search", "Search returned no postings");
            self.advance_last_run(search.id, observed_at).await;
            return SearchOutcome::NoResults;
        }

        let found = postings.len();
        let unseen = self.dedup.filter_unseen(search.id, postings).await;
        if unseen.is_empty() {
            info!(
                search_id = search.id,
                phase = "dedup",
                "All {} postings already delivered",
                found
            );
            self.advance_last_run(search.id, observed_at).await;
            return SearchOutcome::AllSeen;
        }

        let alert = AlertMessage {
            recipient_email: task.user_email.clone(),
            recipient_name: task.user_name.clone(),
            user_id: search.user_id,
            search_id: search.id,
            postings: unseen,
        };

        let outcome = match self.notifier.deliver(&alert).await {
            Ok(()) => {
                self.record_delivered(&alert).await;
                SearchOutcome::Delivered {
                    postings: alert.postings.len(),
                }
            }
            Err(e) => {
                warn!(
                    search_id = search.id,
                    user_id = search.user_id,
                    phase = "deliver",
                    notifier = self.notifier.name(),
                    error = %e,
                    "Alert delivery failed"
                );
                SearchOutcome::DeliveryFailed
            }
        };

        self.advance_last_run(search.id, observed_at).await;
        outcome
    }

    async fn record_delivered(&self, alert: &AlertMessage) {
        match self.dedup.mark_delivered(alert.search_id, &alert.postings).await {
            Ok(inserted) => debug!(
                search_id = alert.search_id,
                phase = "record",
                "Recorded {} new deliveries",
                inserted
            ),
            Err(e) => error!(
                search_id = alert.search_id,
                phase = "record",
                error = %e,
                "Failed to record delivered postings, they may be sent again"
            ),
        }
    }

    async fn advance_last_run(&self, search_id: i32, at: DateTime<Utc>) {
        if let Err(e) = self.store.advance_last_run(search_id, at).await {
            error!(
                search_id,
                phase = "record",
                error = %e,
                "Failed to update last run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_tallies_outcomes() {
        let mut report = CycleReport {
            searches: 5,
            ..CycleReport::default()
        };
        report.record(SearchOutcome::NotDue);
        report.record(SearchOutcome::Delivered { postings: 3 });
        report.record(SearchOutcome::Delivered { postings: 2 });
        report.record(SearchOutcome::DeliveryFailed);
        report.record(SearchOutcome::AllSeen);

        assert_eq!(report.executed(), 4);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.postings_delivered, 5);
        assert_eq!(report.delivery_failed, 1);
        assert_eq!(report.all_seen, 1);
    }

    #[test]
    fn test_stop_flag_is_shared() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_stopped());
        flag.request_stop();
        assert!(clone.is_stopped());
        flag.reset();
        assert!(!clone.is_stopped());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SearchOutcome::Delivered { postings: 1 }.label(), "delivered");
        assert_eq!(SearchOutcome::SearchFailed.label(), "search_failed");
    }
}
