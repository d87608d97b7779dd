//! Periodic batch monitor
//!
//! Rebuilds the batch report every `refresh.interval_seconds` and feeds
//! readings it has not evaluated yet through a long-lived alert evaluator, so
//! cooldowns carry across refreshes. Readings that arrive late, or share a
//! timestamp with one already seen, are still evaluated. Runs until the
//! cancellation token fires.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::{Alert, AlertEvaluator};
use crate::config::defaults::MAX_QUIET_REFRESH_FAILURES;
use crate::config::MonitorConfig;
use crate::dashboard::{build_batch_report, BatchReport};
use crate::repository::{RecordRepository, RepositoryResult};

/// Identifies a reading across refreshes: one sensor location per instant
type ReadingKey = (NaiveDateTime, Option<String>);

/// Result of one refresh
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub report: BatchReport,
    /// Alerts raised by readings first seen in this refresh
    pub new_alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub refreshes: u64,
    pub failures: u64,
    pub alerts_raised: u64,
}

pub struct Monitor {
    repo: Arc<dyn RecordRepository>,
    batch_id: String,
    config: MonitorConfig,
    evaluator: AlertEvaluator,
    /// Readings of the current day already fed to the evaluator
    evaluated: HashSet<ReadingKey>,
    cancel_token: CancellationToken,
}

impl Monitor {
    pub fn new(
        repo: Arc<dyn RecordRepository>,
        batch_id: impl Into<String>,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let evaluator = AlertEvaluator::from_config(&config);
        Self {
            repo,
            batch_id: batch_id.into(),
            config,
            evaluator,
            evaluated: HashSet::new(),
            cancel_token,
        }
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    /// Refresh once for `as_of`.
    ///
    /// Every reading of `as_of` not evaluated by an earlier refresh goes
    /// through the evaluator, whatever its timestamp.
    pub async fn tick(&mut self, as_of: NaiveDate) -> RepositoryResult<RefreshOutcome> {
        let report = build_batch_report(self.repo.as_ref(), &self.batch_id, as_of, &self.config).await?;

        let from = as_of.and_time(NaiveTime::MIN);
        let to = as_of.and_hms_milli_opt(23, 59, 59, 999).unwrap_or(from);
        let readings = self
            .repo
            .list_environmental_readings(&self.batch_id, from, to)
            .await?;

        // Keys of earlier days can no longer come back from the query
        self.evaluated.retain(|(at, _)| at.date() >= as_of);

        let mut new_alerts = Vec::new();
        for reading in &readings {
            if self.evaluated.insert((reading.recorded_at, reading.location.clone())) {
                new_alerts.extend(self.evaluator.check(reading));
            }
        }
        debug!(
            batch = %self.batch_id,
            readings = readings.len(),
            tracked = self.evaluated.len(),
            new_alerts = new_alerts.len(),
            "Evaluated readings"
        );

        Ok(RefreshOutcome { report, new_alerts })
    }

    /// Refresh on the configured interval until cancelled.
    ///
    /// `on_refresh` receives every successful outcome.
    pub async fn run<F>(mut self, mut on_refresh: F) -> MonitorStats
    where
        F: FnMut(&RefreshOutcome) + Send,
    {
        let mut stats = MonitorStats::default();
        let mut consecutive_failures = 0u32;
        let period = Duration::from_secs(self.config.refresh.interval_seconds.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            batch = %self.batch_id,
            interval_secs = period.as_secs(),
            source = self.repo.source_name(),
            "Monitor started"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(batch = %self.batch_id, "Monitor shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let today = Local::now().date_naive();
            match self.tick(today).await {
                Ok(outcome) => {
                    stats.refreshes += 1;
                    stats.alerts_raised += outcome.new_alerts.len() as u64;
                    consecutive_failures = 0;
                    info!(
                        batch = %outcome.report.batch.code,
                        age_days = outcome.report.age_days,
                        living_birds = outcome.report.kpis.living_birds,
                        new_alerts = outcome.new_alerts.len(),
                        unread = self.evaluator.unread_count(),
                        "Refreshed"
                    );
                    on_refresh(&outcome);
                }
                Err(e) => {
                    stats.failures += 1;
                    consecutive_failures += 1;
                    if consecutive_failures > MAX_QUIET_REFRESH_FAILURES {
                        error!(batch = %self.batch_id, failures = consecutive_failures, error = %e, "Refresh keeps failing");
                    } else {
                        warn!(batch = %self.batch_id, error = %e, "Refresh failed");
                    }
                }
            }
        }

        info!(
            refreshes = stats.refreshes,
            failures = stats.failures,
            alerts = stats.alerts_raised,
            "Monitor stopped"
        );
        stats
    }
}
