use crate::config::DashboardConfig;
use crate::domain::{ReportRecord, ScoreResult};
use crate::error::Result;
use crate::infrastructure::Surface;
use crate::services::extraction::{DashboardSnapshot, TextExtractor};
use crate::services::locator::{RowHit, RowLocator};
use crate::services::navigation::{FilterNavigator, FilterTarget};
use crate::services::parsing::{Confidence, ScoreParser, TimestampParser};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Walks the category × sub-period matrix and reads one score per cell.
pub struct ReportAggregator<'a> {
    surface: &'a dyn Surface,
    config: &'a DashboardConfig,
    timestamps: TimestampParser,
    scores: ScoreParser,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(surface: &'a dyn Surface, config: &'a DashboardConfig) -> Result<Self> {
        Ok(Self {
            surface,
            config,
            timestamps: TimestampParser::new(&config.labels.timestamp)?,
            scores: ScoreParser::new(&config.labels),
        })
    }

    pub async fn run(&self, period: &str) -> ReportRecord {
        let matrix = self.config.matrix();
        let mut report = ReportRecord::pending(period, &matrix);

        report.timestamp = self.read_timestamp(&self.extractor().snapshot().await);

        let filters = &self.config.filters;
        let navigator = self.navigator();
        navigator
            .select(&FilterTarget::new(&filters.period, period))
            .await;
        if let Some(owner) = &self.config.owner {
            navigator
                .select(&FilterTarget::new(&filters.owner, owner))
                .await;
        }

        for sub_period in matrix.sub_periods() {
            if !navigator
                .select(&FilterTarget::new(&filters.sub_period, sub_period))
                .await
            {
                warn!("Reading {:?} with whatever the filter currently shows", sub_period);
            }

            for category in matrix.categories() {
                let result = AssertUnwindSafe(self.read_cell(category, sub_period))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!("Reading {} / {} panicked", category, sub_period);
                        ScoreResult::ExtractionError
                    });

                info!("{} / {}: {}", category, sub_period, result);
                report.record(category, sub_period, result);
            }
        }

        if report.timestamp.is_none() {
            report.timestamp = self.read_timestamp(&self.extractor().snapshot().await);
        }

        info!(
            "Report for {}: {}/{} cells with a score",
            period,
            report.successes(),
            matrix.len()
        );
        report
    }

    async fn read_cell(&self, category: &str, sub_period: &str) -> ScoreResult {
        let locator = RowLocator::new(
            self.surface,
            &self.config.selectors.rows,
            self.config.timing.element_timeout().max(self.config.timing.frame_read_timeout()),
        );

        let hit = match locator.locate(category, sub_period).await {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                info!("No row for {} / {}", category, sub_period);
                return ScoreResult::NotRecorded;
            }
            Err(e) => {
                warn!("Locating {} / {} failed: {}", category, sub_period, e);
                return ScoreResult::ExtractionError;
            }
        };

        sleep(self.config.timing.settle_delay()).await;
        let snapshot = self.extractor().snapshot().await;

        let result = if snapshot.frames_read == 0 {
            warn!("No frame answered while reading {} / {}", category, sub_period);
            ScoreResult::ExtractionError
        } else {
            match self.scores.parse(&snapshot.text) {
                Some(found) => {
                    debug!("Score {}% via {:?}", found.value, found.source);
                    ScoreResult::Percentage(found.value)
                }
                None => ScoreResult::NoData,
            }
        };

        self.reset(&hit).await;
        result
    }

    /// Clears the row selection so the next cell starts from the unfiltered view.
    async fn reset(&self, hit: &RowHit) {
        let outcome = match self.config.neutral_click {
            Some(point) => self.surface.click_at(point).await,
            None => self
                .surface
                .click_candidate(&hit.frame, &hit.selector, hit.index)
                .await
                .map(|_| ()),
        };
        if let Err(e) = outcome {
            warn!("Resetting selection after {:?} failed: {}", hit.text, e);
        }
        sleep(self.config.timing.settle_delay()).await;
    }

    fn read_timestamp(&self, snapshot: &DashboardSnapshot) -> Option<String> {
        match self.timestamps.parse(&snapshot.text) {
            Some(found) => {
                if found.confidence == Confidence::Unlabelled {
                    warn!(
                        "{} label missing, using bare date {:?}",
                        self.config.labels.timestamp, found.value
                    );
                } else {
                    info!("{} found: {:?}", self.config.labels.timestamp, found.value);
                }
                Some(found.value)
            }
            None => {
                warn!("{} not found in extracted text", self.config.labels.timestamp);
                None
            }
        }
    }

    fn extractor(&self) -> TextExtractor<'a> {
        TextExtractor::new(self.surface, self.config.timing.frame_read_timeout())
    }

    fn navigator(&self) -> FilterNavigator<'a> {
        FilterNavigator::new(self.surface, &self.config.selectors, &self.config.timing)
    }
}
