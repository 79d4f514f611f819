use crate::error::{Result, ScheduleError};
use crate::models::{BoxEntry, Day, RawBoxRecord, RawScheduleRecord, ScheduleEntry};
use crate::scrapers::browser::Script;
use crate::scrapers::extractor::{PageExtractor, Step};
use crate::scrapers::layout;
use crate::utils::normalize::Normalize;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{info, warn};

pub const CPBL_URL: &str = "https://cpbl.com.tw";

/// Reads the schedule widget on the league home page.
///
/// The three days share one pipeline and differ only in the interaction
/// that precedes extraction.
pub struct CpblScraper {
    extractor: PageExtractor,
    url: String,
    settle_delay: Duration,
}

impl CpblScraper {
    pub fn new(extractor: PageExtractor) -> Self {
        Self {
            extractor,
            url: CPBL_URL.to_string(),
            settle_delay: Duration::ZERO,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Extra fixed pause after the page reports ready
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Today's games, as the page shows them on load
    pub async fn fetch_current(&self) -> Result<Vec<ScheduleEntry>> {
        self.fetch::<RawScheduleRecord>(Day::Today).await
    }

    /// Yesterday's finished games with decision pitchers
    pub async fn fetch_previous(&self) -> Result<Vec<BoxEntry>> {
        self.fetch::<RawBoxRecord>(Day::Yesterday).await
    }

    pub async fn fetch_next(&self) -> Result<Vec<ScheduleEntry>> {
        self.fetch::<RawScheduleRecord>(Day::Tomorrow).await
    }

    pub async fn fetch<R>(&self, day: Day) -> Result<Vec<R::Output>>
    where
        R: Normalize + DeserializeOwned,
    {
        let json = self
            .extractor
            .extract(&self.steps(day), &Script::GameItems)
            .await?;
        let entries = parse_records::<R>(&json).map_err(|err| {
            warn!(%day, error = %err, "discarding schedule");
            err
        })?;
        info!(%day, games = entries.len(), "fetched schedule");
        Ok(entries)
    }

    /// Rendered HTML of a day's page, for offline replay
    pub async fn capture(&self, day: Day) -> Result<String> {
        self.extractor
            .extract(&self.steps(day), &Script::OuterHtml)
            .await
    }

    pub fn steps(&self, day: Day) -> Vec<Step> {
        let mut steps = vec![
            Step::Navigate(self.url.clone()),
            Step::WaitVisible(layout::DATE.to_string()),
        ];

        let control = match day {
            Day::Today => None,
            Day::Yesterday => Some(layout::PREV_CONTROL),
            Day::Tomorrow => Some(layout::NEXT_CONTROL),
        };
        if let Some(control) = control {
            steps.push(Step::WaitVisible(control.to_string()));
            steps.push(Step::Click(control.to_string()));
            steps.push(Step::WaitChanged(layout::DATE.to_string()));
        }
        // The header can flip before the game list is replaced
        steps.push(Step::WaitSettled(layout::GAME.to_string()));

        if !self.settle_delay.is_zero() {
            steps.push(Step::Sleep(self.settle_delay));
        }
        steps
    }
}

/// Parse the extraction script's output and normalize every record, in order.
/// One bad record fails the whole batch.
pub fn parse_records<R>(json: &str) -> Result<Vec<R::Output>>
where
    R: Normalize + DeserializeOwned,
{
    let raw: Vec<R> = serde_json::from_str(json)
        .context("Page did not return a list of game records")
        .map_err(ScheduleError::ExtractionFailed)?;

    raw.iter()
        .enumerate()
        .map(|(index, record)| {
            record.normalize().map_err(|err| {
                warn!(index, error = %err, "malformed game record");
                err
            })
        })
        .collect()
}
