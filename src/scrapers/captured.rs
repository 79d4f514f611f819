use crate::models::Day;
use crate::scrapers::browser::{Browser, PageSession, Script};
use crate::scrapers::layout;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Replays schedule pages captured from the live site.
///
/// Scripts are answered natively from the captured markup using the same
/// selector tables the live extraction script is built from. Clicking the
/// calendar controls moves between the captured days.
#[derive(Debug, Clone)]
pub struct CapturedSite {
    pages: Arc<CapturedPages>,
}

#[derive(Debug, Clone)]
struct CapturedPages {
    current: String,
    previous: Option<String>,
    next: Option<String>,
}

impl CapturedSite {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            pages: Arc::new(CapturedPages {
                current: current.into(),
                previous: None,
                next: None,
            }),
        }
    }

    pub fn with_previous(self, html: impl Into<String>) -> Self {
        let pages = Arc::unwrap_or_clone(self.pages);
        Self {
            pages: Arc::new(CapturedPages {
                previous: Some(html.into()),
                ..pages
            }),
        }
    }

    pub fn with_next(self, html: impl Into<String>) -> Self {
        let pages = Arc::unwrap_or_clone(self.pages);
        Self {
            pages: Arc::new(CapturedPages {
                next: Some(html.into()),
                ..pages
            }),
        }
    }

    /// Load pages written by [`CapturedSite::file_name`]. Only the current
    /// day's page is mandatory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |day: Day| {
            let path = dir.join(Self::file_name(day));
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read captured page {}", path.display()))
        };

        let mut site = Self::new(read(Day::Today)?);
        if let Ok(html) = read(Day::Yesterday) {
            site = site.with_previous(html);
        }
        if let Ok(html) = read(Day::Tomorrow) {
            site = site.with_next(html);
        }
        Ok(site)
    }

    pub fn file_name(day: Day) -> &'static str {
        match day {
            Day::Today => "current.html",
            Day::Yesterday => "previous.html",
            Day::Tomorrow => "next.html",
        }
    }
}

#[async_trait]
impl Browser for CapturedSite {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(CapturedPage {
            pages: Arc::clone(&self.pages),
            day: None,
        }))
    }
}

struct CapturedPage {
    pages: Arc<CapturedPages>,
    /// `None` until the first navigation
    day: Option<Day>,
}

impl CapturedPage {
    fn html(&self) -> Result<&str> {
        let day = self.day.context("No page loaded")?;
        let html = match day {
            Day::Today => Some(&self.pages.current),
            Day::Yesterday => self.pages.previous.as_ref(),
            Day::Tomorrow => self.pages.next.as_ref(),
        };
        html.map(String::as_str)
            .ok_or_else(|| anyhow!("No captured page for {}", day))
    }
}

#[async_trait]
impl PageSession for CapturedPage {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(url, "serving captured page");
        self.day = Some(Day::Today);
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        if !matches_any(self.html()?, selector)? {
            bail!("Click target `{}` not found", selector);
        }
        let day = self.day.context("No page loaded")?;
        self.day = Some(match (selector, day) {
            (layout::PREV_CONTROL, Day::Today) => Day::Yesterday,
            (layout::PREV_CONTROL, Day::Tomorrow) => Day::Today,
            (layout::NEXT_CONTROL, Day::Today) => Day::Tomorrow,
            (layout::NEXT_CONTROL, Day::Yesterday) => Day::Today,
            (layout::PREV_CONTROL, Day::Yesterday) | (layout::NEXT_CONTROL, Day::Tomorrow) => {
                bail!("No captured page beyond {}", day)
            }
            _ => day,
        });
        // Surface a missing page at click time, like a dead control on the live site
        self.html()?;
        Ok(())
    }

    async fn evaluate(&mut self, script: &Script) -> Result<String> {
        evaluate_captured(self.html()?, script)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .ok()
        .with_context(|| format!("Invalid selector `{}`", css))
}

fn matches_any(html: &str, css: &str) -> Result<bool> {
    let document = Html::parse_document(html);
    let found = document.select(&selector(css)?).next().is_some();
    Ok(found)
}

fn first_text(root: ElementRef<'_>, css: &str) -> Result<Option<String>> {
    Ok(root
        .select(&selector(css)?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string()))
}

/// Text of the first match, treating empty text as absent like hidden
/// elements in a rendered page
fn field_text(root: ElementRef<'_>, css: &str) -> Result<Option<String>> {
    Ok(first_text(root, css)?.filter(|text| !text.is_empty()))
}

fn first_link(root: ElementRef<'_>, css: &str) -> Result<Option<String>> {
    Ok(root
        .select(&selector(css)?)
        .next()
        .map(|el| el.value().attr("href").unwrap_or_default().trim().to_string()))
}

/// Answer a script from captured markup, producing the same string the
/// in-browser script would
pub(crate) fn evaluate_captured(html: &str, script: &Script) -> Result<String> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    match script {
        Script::Visible(css) => Ok(root.select(&selector(css)?).next().is_some().to_string()),
        Script::InnerText(css) => Ok(serde_json::to_string(&first_text(root, css)?)?),
        Script::Fingerprint(css) => {
            let texts: Vec<String> = root
                .select(&selector(css)?)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .collect();
            Ok(serde_json::to_string(&texts)?)
        }
        Script::OuterHtml => Ok(html.to_string()),
        Script::GameItems => {
            let page_date = field_text(root, layout::DATE)?;
            let page_day = field_text(root, layout::WEEKDAY)?;
            let section_selector = selector(layout::SECTION)?;
            let game_selector = selector(layout::GAME)?;
            let mut games = Vec::new();

            for section in root.select(&section_selector) {
                let date = field_text(section, layout::DATE)?.or_else(|| page_date.clone());
                let day = field_text(section, layout::WEEKDAY)?.or_else(|| page_day.clone());

                for game in section.select(&game_selector) {
                    let mut record = Map::new();
                    insert(&mut record, "date", date.clone());
                    insert(&mut record, "day", day.clone());
                    for (key, css) in layout::TEXT_FIELDS {
                        insert(&mut record, key, field_text(game, css)?);
                    }
                    for (key, css) in layout::LINK_FIELDS {
                        insert(&mut record, key, first_link(game, css)?);
                    }
                    games.push(Value::Object(record));
                }
            }

            Ok(serde_json::to_string(&games)?)
        }
    }
}

/// Absent values are left out entirely, as `JSON.stringify` drops `undefined`
fn insert(record: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        record.insert(key.to_string(), Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = include_str!("../../fixtures/current.html");
    const PREVIOUS: &str = include_str!("../../fixtures/previous.html");
    const MULTI_DAY: &str = include_str!("../../fixtures/multi_day.html");

    async fn open(site: &CapturedSite) -> Box<dyn PageSession> {
        let mut page = site.open().await.unwrap();
        page.navigate("https://cpbl.com.tw").await.unwrap();
        page
    }

    #[tokio::test]
    async fn test_evaluate_before_navigate_fails() {
        let site = CapturedSite::new(CURRENT);
        let mut page = site.open().await.unwrap();
        assert!(page.evaluate(&Script::OuterHtml).await.is_err());
    }

    #[tokio::test]
    async fn test_visibility_and_text() {
        let site = CapturedSite::new(CURRENT);
        let mut page = open(&site).await;

        assert_eq!(page.evaluate(&Script::Visible(".prev".into())).await.unwrap(), "true");
        assert_eq!(page.evaluate(&Script::Visible(".missing".into())).await.unwrap(), "false");
        assert_eq!(
            page.evaluate(&Script::InnerText(".date".into())).await.unwrap(),
            "\"06/01\""
        );
        assert_eq!(
            page.evaluate(&Script::InnerText(".missing".into())).await.unwrap(),
            "null"
        );
    }

    #[tokio::test]
    async fn test_game_items_omit_absent_fields() {
        let site = CapturedSite::new(CURRENT);
        let mut page = open(&site).await;

        let json = page.evaluate(&Script::GameItems).await.unwrap();
        let games: Vec<Map<String, Value>> = serde_json::from_str(&json).unwrap();

        assert_eq!(games.len(), 3);
        assert_eq!(games[0]["date"], "06/01");
        assert_eq!(games[0]["away_team_url"], "/team/index?teamNo=ACN011");
        assert_eq!(games[0]["away_score"], "3");
        // The third game has not started: no score block
        assert!(!games[2].contains_key("away_score"));
        assert!(!games[2].contains_key("wins_pitcher"));
    }

    #[tokio::test]
    async fn test_game_items_take_date_from_their_section() {
        let site = CapturedSite::new(MULTI_DAY);
        let mut page = open(&site).await;

        let json = page.evaluate(&Script::GameItems).await.unwrap();
        let games: Vec<Map<String, Value>> = serde_json::from_str(&json).unwrap();

        let seen: Vec<(&str, &str, &str)> = games
            .iter()
            .map(|g| {
                (
                    g["game_no"].as_str().unwrap(),
                    g["date"].as_str().unwrap(),
                    g["day"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            seen,
            [
                ("10", "06/07", "六"),
                ("11", "06/08", "日"),
                ("12", "06/08", "日"),
                // Empty section header falls back to the page header
                ("13", "06/07", "六"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fingerprint_tracks_game_items() {
        let site = CapturedSite::new(CURRENT).with_previous(PREVIOUS);
        let mut page = open(&site).await;
        let content = Script::Fingerprint(".game_item".into());

        let today = page.evaluate(&content).await.unwrap();
        let texts: Vec<String> = serde_json::from_str(&today).unwrap();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("中信兄弟"));

        page.click(".prev").await.unwrap();
        assert_ne!(page.evaluate(&content).await.unwrap(), today);
        assert_eq!(
            page.evaluate(&Script::Fingerprint(".missing".into())).await.unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn test_click_moves_between_days() {
        let site = CapturedSite::new(CURRENT).with_previous(PREVIOUS);
        let mut page = open(&site).await;

        page.click(".prev").await.unwrap();
        let date = page.evaluate(&Script::InnerText(".date".into())).await.unwrap();
        assert_eq!(date, "\"05/31\"");

        page.click(".next").await.unwrap();
        let date = page.evaluate(&Script::InnerText(".date".into())).await.unwrap();
        assert_eq!(date, "\"06/01\"");
    }

    #[tokio::test]
    async fn test_click_without_captured_page_fails() {
        let site = CapturedSite::new(CURRENT);
        let mut page = open(&site).await;

        let err = page.click(".next").await.unwrap_err();
        assert!(err.to_string().contains("No captured page"));
        assert!(page.click(".no-such-control").await.is_err());
    }

    #[test]
    fn test_from_dir_requires_current_page() {
        let dir = std::env::temp_dir().join(format!("cpbl_captured_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(CapturedSite::from_dir(&dir).is_err());

        std::fs::write(dir.join(CapturedSite::file_name(Day::Today)), CURRENT).unwrap();
        let site = CapturedSite::from_dir(&dir).unwrap();
        assert!(site.pages.previous.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
