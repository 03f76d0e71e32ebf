use crate::config::DashboardConfig;
use crate::domain::notify::Notifier;
use crate::domain::storage::StateStore;
use crate::domain::ReportRecord;
use crate::error::{Result, WatchError};
use crate::infrastructure::{Launcher, Surface};
use crate::services::{
    aggregation::ReportAggregator,
    consent::dismiss_consent,
    message::{compose, MessageContext},
    period::current_period,
    policy::{Decision, NotificationPolicy},
};
use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

/// State carried from one poll to the next by whoever schedules polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Stored value after the previous poll; `None` before the first one.
    pub last_seen: Option<String>,
    pub polls: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub report: ReportRecord,
    pub decision: Decision,
    /// `None` when nothing had to be sent.
    pub delivered: Option<bool>,
}

pub struct WatchService {
    dashboard: DashboardConfig,
    launcher: Arc<dyn Launcher>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    /// Raised by `watch_until` to cut an in-flight extraction short.
    stop: watch::Sender<bool>,
}

impl WatchService {
    pub fn new(
        dashboard: DashboardConfig,
        launcher: Arc<dyn Launcher>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            dashboard,
            launcher,
            store,
            notifier,
            stop: watch::channel(false).0,
        }
    }

    pub fn current_period(&self) -> Result<String> {
        current_period(
            Utc::now(),
            self.dashboard.home_utc_offset_hours,
            &self.dashboard.month_labels,
        )
    }

    /// One full extraction run against a fresh browser session. The session
    /// is closed on every path.
    pub async fn collect(&self, period: &str) -> ReportRecord {
        let matrix = self.dashboard.matrix();

        let surface = match self.launcher.open(&self.dashboard).await {
            Ok(surface) => surface,
            Err(e) => {
                error!("Could not open the dashboard: {}", e);
                return ReportRecord::pending(period, &matrix);
            }
        };

        let mut stop = self.stop.subscribe();
        let report = tokio::select! {
            report = AssertUnwindSafe(self.drive(surface.as_ref(), period)).catch_unwind() => {
                report.unwrap_or_else(|_| {
                    error!("Extraction run panicked");
                    ReportRecord::pending(period, &matrix)
                })
            }
            _ = stop.wait_for(|stopping| *stopping) => {
                warn!("Shutdown requested, abandoning the extraction in flight");
                ReportRecord::pending(period, &matrix)
            }
        };
        surface.close().await;
        report
    }

    fn stopping(&self) -> bool {
        *self.stop.borrow()
    }

    async fn drive(&self, surface: &dyn Surface, period: &str) -> ReportRecord {
        let timing = &self.dashboard.timing;
        dismiss_consent(surface, &self.dashboard.selectors, timing).await;

        info!("Waiting {:?} for the first render", timing.initial_render());
        sleep(timing.initial_render()).await;
        self.screenshot(surface, "initial").await;

        let report = match ReportAggregator::new(surface, &self.dashboard) {
            Ok(aggregator) => aggregator.run(period).await,
            Err(e) => {
                error!("Could not build parsers: {}", e);
                ReportRecord::pending(period, &self.dashboard.matrix())
            }
        };

        self.screenshot(surface, "final").await;
        report
    }

    async fn screenshot(&self, surface: &dyn Surface, stage: &str) {
        let Some(dir) = &self.dashboard.screenshot_dir else {
            return;
        };
        let path = dir.join(format!(
            "{}_{}.png",
            Utc::now().format("%Y%m%d_%H%M%S"),
            stage
        ));
        match surface.screenshot(&path).await {
            Ok(()) => info!("Screenshot saved to {}", path.display()),
            Err(e) => warn!("Screenshot {} failed: {}", path.display(), e),
        }
    }

    /// Extraction only: no decision, no message, no state write.
    pub async fn report(&self) -> Result<ReportRecord> {
        let period = self.current_period()?;
        Ok(self.collect(&period).await)
    }

    pub async fn poll(&self, state: &mut PollState, manual: bool) -> Result<PollOutcome> {
        let period = self.current_period()?;
        let policy = NotificationPolicy::new(self.store.as_ref(), self.dashboard.persist_mode);
        state.polls += 1;
        info!(
            "Poll #{} ({}) for {}",
            state.polls,
            if manual { "manual" } else { "automatic" },
            period
        );

        let report = self.collect(&period).await;
        if self.stopping() {
            return Err(WatchError::Other(
                "poll interrupted by shutdown, nothing decided".to_string(),
            ));
        }
        let current = report.timestamp.as_deref();

        let last = match state.last_seen.take() {
            Some(last) => last,
            None => policy.last_seen()?,
        };
        info!("Last stored: {:?} | current: {:?}", last, current);

        let decision = policy.evaluate(current, &last, manual)?;
        let message = compose(
            decision,
            &report,
            &MessageContext {
                label: &self.dashboard.labels.timestamp,
                previous: &last,
                link: self.dashboard.link(),
            },
        );

        let delivered = match message {
            Some(text) => {
                let sent = self.notifier.send(&text).await;
                policy.delivered(decision, current, sent)?;
                Some(sent)
            }
            None => {
                info!("No change, nothing to send");
                None
            }
        };

        state.last_seen = Some(policy.last_seen()?);
        Ok(PollOutcome {
            report,
            decision,
            delivered,
        })
    }

    /// Automatic polls every `every`, the first one right away, until
    /// `shutdown` resolves. A poll in flight at that moment is abandoned: its
    /// browser is closed and nothing is sent or stored. Returns the number of
    /// polls started.
    pub async fn watch_until<F>(&self, every: Duration, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut state = PollState::default();
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.stop.send_replace(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let poll = self.poll(&mut state, false);
            tokio::pin!(poll);
            let (result, stopped) = tokio::select! {
                result = &mut poll => (result, false),
                _ = &mut shutdown => {
                    self.stop.send_replace(true);
                    ((&mut poll).await, true)
                }
            };
            match result {
                Ok(outcome) => info!("Poll finished with {:?}", outcome.decision),
                Err(e) if stopped => info!("{}", e),
                Err(e) => error!("Poll failed: {}", e),
            }
            if stopped {
                break;
            }
        }

        self.stop.send_replace(false);
        info!("Stopping after {} polls", state.polls);
        state.polls
    }
}
