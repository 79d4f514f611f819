use crate::error::{Result, ScheduleError};
use crate::scrapers::browser::{Browser, PageSession, Script};
use anyhow::{anyhow, bail, Context};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// Fingerprint of a selector with no matches
const EMPTY_CONTENT: &str = "[]";

/// One interaction performed before the extraction script runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Navigate(String),
    /// Poll until the selector matches a rendered element
    WaitVisible(String),
    Click(String),
    /// Poll until the selector's text differs from its text just before the
    /// preceding click
    WaitChanged(String),
    /// Poll the content of every match until it has moved away from what was
    /// rendered before the preceding click (when there was any) and then stays
    /// the same for `settle_polls` consecutive checks
    WaitSettled(String),
    Sleep(Duration),
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Browser sessions allowed to run at once
    pub max_sessions: usize,
    /// Bound on the whole interaction, from opening the session to the script result
    pub deadline: Duration,
    /// Bound on each readiness wait
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Identical checks in a row before content counts as settled
    pub settle_polls: u32,
    /// Time allowed for closing a session once the interaction is over
    pub close_grace: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_sessions: 2,
            deadline: Duration::from_secs(30),
            wait_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
            settle_polls: 5,
            close_grace: Duration::from_secs(5),
        }
    }
}

/// Runs scripted interactions against pages, one isolated session each
pub struct PageExtractor {
    browser: Arc<dyn Browser>,
    permits: Arc<Semaphore>,
    config: ExtractorConfig,
}

impl PageExtractor {
    pub fn new(browser: Arc<dyn Browser>, config: ExtractorConfig) -> Self {
        Self {
            browser,
            permits: Arc::new(Semaphore::new(config.max_sessions.max(1))),
            config,
        }
    }

    /// Run `steps` in a fresh session, then evaluate `script` and return its result.
    ///
    /// Any failure, including the deadline expiring, is
    /// [`ScheduleError::ExtractionFailed`]. The session is closed either way.
    pub async fn extract(&self, steps: &[Step], script: &Script) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(ScheduleError::extraction)?;

        let started = Instant::now();
        let deadline = self.config.deadline;

        let mut session = match timeout(deadline, self.browser.open()).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => return Err(ScheduleError::ExtractionFailed(err)),
            Err(_) => {
                return Err(ScheduleError::extraction(anyhow!(
                    "Timed out opening a browser session after {:?}",
                    deadline
                )))
            }
        };

        let remaining = deadline.saturating_sub(started.elapsed());
        let outcome = match timeout(remaining, self.run(session.as_mut(), steps, script)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("Interaction did not finish within {:?}", deadline)),
        };

        // Teardown keeps running in the background past the grace period so
        // a stuck browser cannot hold a session permit
        let closing = tokio::spawn(session.close());
        match timeout(self.config.close_grace, closing).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => warn!(error = %err, "failed to close browser session"),
            Ok(Err(err)) => warn!(error = %err, "browser session close task failed"),
            Err(_) => warn!(
                grace = ?self.config.close_grace,
                "browser session still closing, continuing in background"
            ),
        }

        outcome.map_err(ScheduleError::ExtractionFailed)
    }

    async fn run(
        &self,
        session: &mut dyn PageSession,
        steps: &[Step],
        script: &Script,
    ) -> anyhow::Result<String> {
        let watched_text: Vec<&str> = steps
            .iter()
            .filter_map(|step| match step {
                Step::WaitChanged(selector) => Some(selector.as_str()),
                _ => None,
            })
            .collect();
        let watched_content: Vec<&str> = steps
            .iter()
            .filter_map(|step| match step {
                Step::WaitSettled(selector) => Some(selector.as_str()),
                _ => None,
            })
            .collect();
        let mut text_before_click: HashMap<&str, Option<String>> = HashMap::new();
        let mut content_before_click: HashMap<&str, String> = HashMap::new();

        for step in steps {
            debug!(?step, "interaction step");
            match step {
                Step::Navigate(url) => session.navigate(url).await?,
                Step::WaitVisible(selector) => self.wait_visible(session, selector).await?,
                Step::Click(selector) => {
                    for &watch in &watched_text {
                        text_before_click.insert(watch, inner_text(session, watch).await?);
                    }
                    for &watch in &watched_content {
                        content_before_click.insert(watch, fingerprint(session, watch).await?);
                    }
                    session.click(selector).await?;
                }
                Step::WaitChanged(selector) => {
                    let before = text_before_click.get(selector.as_str()).cloned().flatten();
                    self.wait_changed(session, selector, before).await?;
                }
                Step::WaitSettled(selector) => {
                    let before = content_before_click.get(selector.as_str()).cloned();
                    self.wait_settled(session, selector, before).await?;
                }
                Step::Sleep(duration) => sleep(*duration).await,
            }
        }

        session
            .evaluate(script)
            .await
            .context("Extraction script failed")
    }

    async fn wait_visible(
        &self,
        session: &mut dyn PageSession,
        selector: &str,
    ) -> anyhow::Result<()> {
        let give_up = Instant::now() + self.config.wait_timeout;
        let visible = Script::Visible(selector.to_string());
        loop {
            if session.evaluate(&visible).await? == "true" {
                return Ok(());
            }
            if Instant::now() >= give_up {
                bail!(
                    "`{}` not visible after {:?}",
                    selector,
                    self.config.wait_timeout
                );
            }
            sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_changed(
        &self,
        session: &mut dyn PageSession,
        selector: &str,
        before: Option<String>,
    ) -> anyhow::Result<()> {
        let give_up = Instant::now() + self.config.wait_timeout;
        loop {
            let now = inner_text(session, selector).await?;
            if now.is_some() && now != before {
                debug!(selector, ?before, ?now, "page content changed");
                return Ok(());
            }
            if Instant::now() >= give_up {
                bail!(
                    "`{}` did not change after {:?}",
                    selector,
                    self.config.wait_timeout
                );
            }
            sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_settled(
        &self,
        session: &mut dyn PageSession,
        selector: &str,
        before_click: Option<String>,
    ) -> anyhow::Result<()> {
        // An empty list before the click cannot be told apart from an empty
        // day, so only a non-empty one has to be replaced first
        let mut stale = before_click.filter(|before| before != EMPTY_CONTENT);
        let mut last: Option<String> = None;
        let mut repeats = 0;
        let give_up = Instant::now() + self.config.wait_timeout;

        loop {
            let now = fingerprint(session, selector).await?;
            if stale.as_ref() == Some(&now) {
                repeats = 0;
            } else {
                stale = None;
                if last.as_ref() == Some(&now) {
                    repeats += 1;
                } else {
                    repeats = 1;
                }
                if repeats >= self.config.settle_polls {
                    debug!(selector, polls = repeats, "page content settled");
                    return Ok(());
                }
            }
            last = Some(now);

            if Instant::now() >= give_up {
                bail!(
                    "`{}` did not settle after {:?}",
                    selector,
                    self.config.wait_timeout
                );
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

async fn fingerprint(session: &mut dyn PageSession, selector: &str) -> anyhow::Result<String> {
    session
        .evaluate(&Script::Fingerprint(selector.to_string()))
        .await
}

async fn inner_text(
    session: &mut dyn PageSession,
    selector: &str,
) -> anyhow::Result<Option<String>> {
    let json = session
        .evaluate(&Script::InnerText(selector.to_string()))
        .await?;
    serde_json::from_str(&json).context("Text check returned invalid JSON")
}
