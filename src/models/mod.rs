use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical display identity of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRecord {
    pub full_name: &'static str,
    pub abbreviation: &'static str,
    pub single_glyph: &'static str,
}

impl TeamRecord {
    /// Returned for team codes missing from the directory
    pub const UNKNOWN: TeamRecord = TeamRecord {
        full_name: "未知",
        abbreviation: "未知",
        single_glyph: "未知",
    };
}

/// Which day of the calendar widget to read, relative to the page's default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Today,
    Yesterday,
    Tomorrow,
}

impl Day {
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Today => "today",
            Day::Yesterday => "yesterday",
            Day::Tomorrow => "tomorrow",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A game item as the schedule page exposes it, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawScheduleRecord {
    pub date: Option<String>,
    pub day: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub game_no: Option<String>,
    pub away_team_url: Option<String>,
    pub away_sp: Option<String>,
    pub away_score: Option<String>,
    pub home_team_url: Option<String>,
    pub home_score: Option<String>,
    pub home_sp: Option<String>,
}

/// A finished game item as the page exposes it, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBoxRecord {
    pub date: Option<String>,
    pub day: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub game_no: Option<String>,
    pub away_team_url: Option<String>,
    pub away_score: Option<String>,
    pub home_team_url: Option<String>,
    pub home_score: Option<String>,
    pub wins_pitcher: Option<String>,
    pub loses_pitcher: Option<String>,
    pub saves_pitcher: Option<String>,
}

/// One scheduled or in-progress game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: String,
    pub day: String,
    pub time: Option<String>,
    pub location: String,
    pub game_no: String,
    pub away_team: String,
    pub away_team_abbr: String,
    pub away_team_single: String,
    pub away_sp: Option<String>,
    pub away_score: String,
    pub home_team: String,
    pub home_team_abbr: String,
    pub home_team_single: String,
    pub home_score: String,
    pub home_sp: Option<String>,
}

impl ScheduleEntry {
    pub fn format(&self) -> String {
        format!(
            "{} ({}) {} #{} @{}: {} {} - {} {}  SP {} / {}",
            self.date,
            self.day,
            self.time.as_deref().unwrap_or("--:--"),
            self.game_no,
            self.location,
            self.away_team,
            self.away_score,
            self.home_score,
            self.home_team,
            self.away_sp.as_deref().unwrap_or("-"),
            self.home_sp.as_deref().unwrap_or("-"),
        )
    }
}

/// One completed game with its decision pitchers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxEntry {
    pub date: String,
    pub day: String,
    pub time: Option<String>,
    pub location: String,
    pub game_no: String,
    pub away_team: String,
    pub away_team_abbr: String,
    pub away_team_single: String,
    pub away_score: String,
    pub home_team: String,
    pub home_team_abbr: String,
    pub home_team_single: String,
    pub home_score: String,
    pub wins_pitcher: Option<String>,
    pub loses_pitcher: Option<String>,
    pub saves_pitcher: Option<String>,
}

impl BoxEntry {
    pub fn format(&self) -> String {
        let mut line = format!(
            "{} ({}) #{} @{}: {} {} - {} {}  W {} L {}",
            self.date,
            self.day,
            self.game_no,
            self.location,
            self.away_team,
            self.away_score,
            self.home_score,
            self.home_team,
            self.wins_pitcher.as_deref().unwrap_or("-"),
            self.loses_pitcher.as_deref().unwrap_or("-"),
        );
        if let Some(save) = &self.saves_pitcher {
            line.push_str(&format!(" S {}", save));
        }
        line
    }
}
