use crate::error::ScheduleError;
use crate::models::{BoxEntry, ScheduleEntry};
use crate::scrapers::cpbl::CpblScraper;
use crate::store::SnapshotStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    pub scraper: Arc<CpblScraper>,
}

/// An on-demand fetch that failed; the client only sees a 500
struct FetchFailed(ScheduleError);

impl IntoResponse for FetchFailed {
    fn into_response(self) -> Response {
        error!(error = %self.0, "on-demand fetch failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch schedule").into_response()
    }
}

/// Whatever snapshot is published, even if empty or stale
async fn schedule(State(state): State<AppState>) -> Json<Vec<ScheduleEntry>> {
    let snapshot = state.store.get().await;
    Json(snapshot.games.clone())
}

async fn yesterday(State(state): State<AppState>) -> Result<Json<Vec<BoxEntry>>, FetchFailed> {
    let games = state.scraper.fetch_previous().await.map_err(FetchFailed)?;
    Ok(Json(games))
}

async fn tomorrow(State(state): State<AppState>) -> Result<Json<Vec<ScheduleEntry>>, FetchFailed> {
    let games = state.scraper.fetch_next().await.map_err(FetchFailed)?;
    Ok(Json(games))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/schedule", get(schedule))
        .route("/schedule/yesterday", get(yesterday))
        .route("/schedule/tomorrow", get(tomorrow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::captured::CapturedSite;
    use crate::scrapers::extractor::{ExtractorConfig, PageExtractor};
    use crate::store::Snapshot;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const CURRENT: &str = include_str!("../fixtures/current.html");
    const PREVIOUS: &str = include_str!("../fixtures/previous.html");
    const NEXT: &str = include_str!("../fixtures/next.html");

    fn state(site: CapturedSite) -> AppState {
        let config = ExtractorConfig {
            wait_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            settle_polls: 2,
            ..ExtractorConfig::default()
        };
        AppState {
            store: SnapshotStore::new(),
            scraper: Arc::new(CpblScraper::new(PageExtractor::new(Arc::new(site), config))),
        }
    }

    async fn get_path(state: AppState, path: &str) -> (StatusCode, Vec<u8>) {
        let response = router(state)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_ok() {
        let (status, body) = get_path(state(CapturedSite::new(CURRENT)), "/schedule").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_schedule_serves_snapshot_with_flat_fields() {
        let state = state(CapturedSite::new(CURRENT));
        let games = state.scraper.fetch_current().await.unwrap();
        state.store.replace(Snapshot::new(games)).await;

        let (status, body) = get_path(state, "/schedule").await;
        assert_eq!(status, StatusCode::OK);

        let json: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 3);
        let keys: Vec<&str> = json[0].as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = vec![
            "date",
            "day",
            "time",
            "location",
            "game_no",
            "away_team",
            "away_team_abbr",
            "away_team_single",
            "away_sp",
            "away_score",
            "home_team",
            "home_team_abbr",
            "home_team_single",
            "home_score",
            "home_sp",
        ];
        let mut keys = keys;
        keys.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(json[0]["away_team"], "中信兄弟");
    }

    #[tokio::test]
    async fn test_yesterday_returns_box_entries() {
        let site = CapturedSite::new(CURRENT).with_previous(PREVIOUS);
        let (status, body) = get_path(state(site), "/schedule/yesterday").await;
        assert_eq!(status, StatusCode::OK);

        let json: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[0]["wins_pitcher"], "富藍戈");
        assert!(json[1]["saves_pitcher"].is_null());
        assert!(json[0].get("away_sp").is_none());
    }

    #[tokio::test]
    async fn test_tomorrow_does_not_touch_snapshot() {
        let state = state(CapturedSite::new(CURRENT).with_next(NEXT));
        let (status, body) = get_path(state.clone(), "/schedule/tomorrow").await;
        assert_eq!(status, StatusCode::OK);

        let json: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[0]["date"], "06/02");
        assert!(state.store.get().await.games.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_500() {
        let (status, body) =
            get_path(state(CapturedSite::new(CURRENT)), "/schedule/yesterday").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"Failed to fetch schedule");
    }
}
