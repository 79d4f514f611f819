//! Browser automation seam.
//!
//! A [`Browser`] hands out isolated [`PageSession`]s. The live implementation
//! drives headless Chromium over the DevTools protocol; see
//! [`crate::scrapers::captured`] for the replay implementation.

use crate::scrapers::layout;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as Chromium, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Scripts evaluated in the page. Every script yields a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// `"true"` when the selector matches a rendered element, `"false"` otherwise
    Visible(String),
    /// JSON string with the trimmed text of the first match, or JSON `null`
    InnerText(String),
    /// JSON array with the text content of every match, in document order.
    /// Compared between polls to tell when rendered content has moved on.
    Fingerprint(String),
    /// JSON array of raw game records, in page order
    GameItems,
    /// The serialized document
    OuterHtml,
}

impl Script {
    pub fn to_js(&self) -> String {
        match self {
            Script::Visible(selector) => format!(
                r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return "false";
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return String(style.display !== "none" && style.visibility !== "hidden" && (rect.width > 0 || rect.height > 0));
}})()"#,
                sel = js_string(selector)
            ),
            Script::InnerText(selector) => format!(
                r#"(() => {{
  const el = document.querySelector({sel});
  return JSON.stringify(el ? el.innerText.trim() : null);
}})()"#,
                sel = js_string(selector)
            ),
            Script::Fingerprint(selector) => format!(
                r#"JSON.stringify(Array.from(document.querySelectorAll({sel}), (el) => el.textContent.trim()))"#,
                sel = js_string(selector)
            ),
            Script::GameItems => game_items_js(),
            Script::OuterHtml => "document.documentElement.outerHTML".to_string(),
        }
    }
}

fn js_string(value: &str) -> String {
    // A JSON string literal is a valid JS string literal
    serde_json::Value::String(value.to_string()).to_string()
}

fn game_items_js() -> String {
    let text_fields: String = layout::TEXT_FIELDS
        .iter()
        .map(|(key, sel)| format!("{}: text(game, {}), ", js_string(key), js_string(sel)))
        .collect();
    let link_fields: String = layout::LINK_FIELDS
        .iter()
        .map(|(key, sel)| format!("{}: link(game, {}), ", js_string(key), js_string(sel)))
        .collect();

    format!(
        r#"(() => {{
  const text = (root, sel) => {{
    const el = root.querySelector(sel);
    const value = el ? el.innerText.trim() : "";
    return value === "" ? undefined : value;
  }};
  const link = (root, sel) => {{
    const el = root.querySelector(sel);
    return el ? (el.getAttribute("href") || "").trim() : undefined;
  }};
  const pageDate = text(document, {date});
  const pageDay = text(document, {day});
  const games = [];
  document.querySelectorAll({section}).forEach((section) => {{
    const date = text(section, {date}) ?? pageDate;
    const day = text(section, {day}) ?? pageDay;
    section.querySelectorAll({game}).forEach((game) => {{
      games.push({{ date, day, {text_fields}{link_fields}}});
    }});
  }});
  return JSON.stringify(games);
}})()"#,
        date = js_string(layout::DATE),
        day = js_string(layout::WEEKDAY),
        section = js_string(layout::SECTION),
        game = js_string(layout::GAME),
        text_fields = text_fields,
        link_fields = link_fields,
    )
}

/// Source of isolated automation sessions
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

/// One page in one isolated session
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Click the first element matching `selector`; fails if there is none
    async fn click(&mut self, selector: &str) -> Result<()>;

    async fn evaluate(&mut self, script: &Script) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Launches a fresh headless Chromium for every session
#[derive(Debug, Clone, Default)]
pub struct ChromeBrowser {
    executable: Option<PathBuf>,
    headful: bool,
}

impl ChromeBrowser {
    pub fn new(executable: Option<PathBuf>, headless: bool) -> Self {
        Self {
            executable,
            headful: !headless,
        }
    }

    fn config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if self.headful {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(anyhow::Error::msg)
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        let (browser, mut handler) = Chromium::launch(self.config()?)
            .await
            .context("Failed to launch Chromium")?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "devtools event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                events.abort();
                return Err(err).context("Failed to open a browser tab");
            }
        };

        Ok(Box::new(ChromeSession {
            browser,
            page,
            events,
        }))
    }
}

struct ChromeSession {
    browser: Chromium,
    page: Page,
    events: JoinHandle<()>,
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("Click target `{}` not found", selector))?;
        element
            .click()
            .await
            .with_context(|| format!("Failed to click `{}`", selector))?;
        Ok(())
    }

    async fn evaluate(&mut self, script: &Script) -> Result<String> {
        let params = EvaluateParams::builder()
            .expression(script.to_js())
            .return_by_value(true)
            .build()
            .map_err(anyhow::Error::msg)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .context("Script evaluation failed")?;
        result
            .into_value::<String>()
            .context("Script did not return a string")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeSession {
            mut browser,
            page,
            events,
        } = *self;
        drop(page);
        let closed = browser.close().await;
        if tokio::time::timeout(Duration::from_secs(5), events)
            .await
            .is_err()
        {
            warn!("browser event loop did not stop after close");
        }
        closed.context("Failed to close Chromium")?;
        Ok(())
    }
}
