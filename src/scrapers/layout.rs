//! Selectors for the cpbl.com.tw schedule widget.
//!
//! Both the in-browser extraction script and the captured-page evaluator are
//! generated from these tables, so the two always read the same fields.

/// Date header of the calendar widget (and of each date section)
pub const DATE: &str = ".date";
pub const WEEKDAY: &str = ".day";

/// One block of games sharing a date
pub const SECTION: &str = ".major";
pub const GAME: &str = ".game_item";

/// Calendar navigation controls
pub const PREV_CONTROL: &str = ".prev";
pub const NEXT_CONTROL: &str = ".next";

/// Record key and selector of every field read from an element's text
pub const TEXT_FIELDS: &[(&str, &str)] = &[
    ("time", ".time"),
    ("location", ".place"),
    ("game_no", ".game_no a"),
    ("away_score", ".score_wrap .away"),
    ("home_score", ".score_wrap .home"),
    ("away_sp", ".away_sp .name a"),
    ("home_sp", ".home_sp .name a"),
    ("wins_pitcher", ".wins .name a"),
    ("loses_pitcher", ".loses .name a"),
    ("saves_pitcher", ".saves .name a"),
];

/// Record key and selector of every field read from an `href` attribute
pub const LINK_FIELDS: &[(&str, &str)] = &[
    ("away_team_url", ".away .team_name a"),
    ("home_team_url", ".home .team_name a"),
];
