//! Turns raw page records into typed entries.
//!
//! Every rule here is pure: blank strings count as absent, scores default to
//! `"0"`, optional fields stay `None`, and a missing structural field fails
//! the record instead of dropping it.

use crate::error::{Result, ScheduleError};
use crate::models::{BoxEntry, RawBoxRecord, RawScheduleRecord, ScheduleEntry, TeamRecord};
use crate::utils::teams;

const DEFAULT_SCORE: &str = "0";

/// A raw record type that can be normalized into a domain entry
pub trait Normalize {
    type Output;

    fn normalize(&self) -> Result<Self::Output>;
}

impl Normalize for RawScheduleRecord {
    type Output = ScheduleEntry;

    fn normalize(&self) -> Result<ScheduleEntry> {
        normalize_schedule(self)
    }
}

impl Normalize for RawBoxRecord {
    type Output = BoxEntry;

    fn normalize(&self) -> Result<BoxEntry> {
        normalize_box(self)
    }
}

pub fn normalize_schedule(raw: &RawScheduleRecord) -> Result<ScheduleEntry> {
    let date = required(&raw.date, "date")?;
    let day = required(&raw.day, "day")?;
    let location = required(&raw.location, "location")?;
    let game_no = required(&raw.game_no, "game_no")?;
    let away = team(&raw.away_team_url, "away_team_url")?;
    let home = team(&raw.home_team_url, "home_team_url")?;

    Ok(ScheduleEntry {
        date,
        day,
        time: optional(&raw.time),
        location,
        game_no,
        away_team: away.full_name.to_string(),
        away_team_abbr: away.abbreviation.to_string(),
        away_team_single: away.single_glyph.to_string(),
        away_sp: optional(&raw.away_sp),
        away_score: score(&raw.away_score),
        home_team: home.full_name.to_string(),
        home_team_abbr: home.abbreviation.to_string(),
        home_team_single: home.single_glyph.to_string(),
        home_score: score(&raw.home_score),
        home_sp: optional(&raw.home_sp),
    })
}

pub fn normalize_box(raw: &RawBoxRecord) -> Result<BoxEntry> {
    let date = required(&raw.date, "date")?;
    let day = required(&raw.day, "day")?;
    let location = required(&raw.location, "location")?;
    let game_no = required(&raw.game_no, "game_no")?;
    let away = team(&raw.away_team_url, "away_team_url")?;
    let home = team(&raw.home_team_url, "home_team_url")?;

    Ok(BoxEntry {
        date,
        day,
        time: optional(&raw.time),
        location,
        game_no,
        away_team: away.full_name.to_string(),
        away_team_abbr: away.abbreviation.to_string(),
        away_team_single: away.single_glyph.to_string(),
        away_score: score(&raw.away_score),
        home_team: home.full_name.to_string(),
        home_team_abbr: home.abbreviation.to_string(),
        home_team_single: home.single_glyph.to_string(),
        home_score: score(&raw.home_score),
        wins_pitcher: optional(&raw.wins_pitcher),
        loses_pitcher: optional(&raw.loses_pitcher),
        saves_pitcher: optional(&raw.saves_pitcher),
    })
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, field: &'static str) -> Result<String> {
    optional(value).ok_or(ScheduleError::MalformedRecord { field })
}

fn score(value: &Option<String>) -> String {
    optional(value).unwrap_or_else(|| DEFAULT_SCORE.to_string())
}

fn team(href: &Option<String>, field: &'static str) -> Result<TeamRecord> {
    required(href, field).map(|href| teams::resolve_href(&href))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn scenario_a() -> RawScheduleRecord {
        RawScheduleRecord {
            date: s("06/01"),
            day: s("六"),
            time: s("17:05"),
            location: s("台北"),
            game_no: s("1"),
            away_team_url: s("/team/index?teamNo=ACN011"),
            away_score: s("3"),
            home_team_url: s("/team/index?teamNo=ADD011"),
            home_score: s("5"),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_schedule_resolves_teams() {
        let entry = normalize_schedule(&scenario_a()).unwrap();

        assert_eq!(entry.away_team, "中信兄弟");
        assert_eq!(entry.away_team_abbr, "中信");
        assert_eq!(entry.away_team_single, "象");
        assert_eq!(entry.home_team, "統一獅");
        assert_eq!(entry.home_team_abbr, "統一");
        assert_eq!(entry.away_score, "3");
        assert_eq!(entry.home_score, "5");
        assert_eq!(entry.time.as_deref(), Some("17:05"));
        assert_eq!(entry.away_sp, None);
        assert_eq!(entry.home_sp, None);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = scenario_a();
        let first = serde_json::to_string(&normalize_schedule(&raw).unwrap()).unwrap();
        let second = serde_json::to_string(&normalize_schedule(&raw).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_pitchers_serialize_as_null() {
        let entry = normalize_schedule(&scenario_a()).unwrap();
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();

        assert!(json["away_sp"].is_null());
        assert!(json["home_sp"].is_null());
        assert!(!json.to_string().contains("undefined"));
    }

    #[test]
    fn test_blank_pitcher_is_absent() {
        let raw = RawScheduleRecord {
            away_sp: s("   "),
            home_sp: s(" 德保拉 "),
            ..scenario_a()
        };
        let entry = normalize_schedule(&raw).unwrap();
        assert_eq!(entry.away_sp, None);
        assert_eq!(entry.home_sp.as_deref(), Some("德保拉"));
    }

    #[test]
    fn test_missing_scores_default_to_zero() {
        let raw = RawScheduleRecord {
            away_score: None,
            home_score: s(""),
            ..scenario_a()
        };
        let entry = normalize_schedule(&raw).unwrap();
        assert_eq!(entry.away_score, "0");
        assert_eq!(entry.home_score, "0");
    }

    #[test]
    fn test_scores_pass_through_unchanged() {
        let raw = RawScheduleRecord {
            away_score: s("010"),
            home_score: s("12"),
            ..scenario_a()
        };
        let entry = normalize_schedule(&raw).unwrap();
        assert_eq!(entry.away_score, "010");
        assert_eq!(entry.home_score, "12");
    }

    #[test]
    fn test_missing_game_no_is_malformed() {
        let raw = RawScheduleRecord {
            game_no: None,
            ..scenario_a()
        };
        match normalize_schedule(&raw) {
            Err(ScheduleError::MalformedRecord { field }) => assert_eq!(field, "game_no"),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_required_fields_are_checked() {
        let cases: [(fn(&mut RawScheduleRecord), &str); 5] = [
            (|r| r.date = None, "date"),
            (|r| r.day = s(" "), "day"),
            (|r| r.location = None, "location"),
            (|r| r.away_team_url = None, "away_team_url"),
            (|r| r.home_team_url = s(""), "home_team_url"),
        ];

        for (mutate, expected) in cases {
            let mut raw = scenario_a();
            mutate(&mut raw);
            match normalize_schedule(&raw) {
                Err(ScheduleError::MalformedRecord { field }) => assert_eq!(field, expected),
                other => panic!("expected MalformedRecord for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_unknown_team_is_not_an_error() {
        let raw = RawScheduleRecord {
            home_team_url: s("/team/index?teamNo=NEW001"),
            ..scenario_a()
        };
        let entry = normalize_schedule(&raw).unwrap();
        assert_eq!(entry.home_team, TeamRecord::UNKNOWN.full_name);
        assert_eq!(entry.home_team_abbr, TeamRecord::UNKNOWN.abbreviation);
        assert_eq!(entry.home_team_single, TeamRecord::UNKNOWN.single_glyph);
        assert_eq!(entry.away_team, "中信兄弟");
    }

    #[test]
    fn test_normalize_box() {
        let raw = RawBoxRecord {
            date: s("05/31"),
            day: s("五"),
            location: s("新莊"),
            game_no: s("88"),
            away_team_url: s("/team/index?teamNo=AAA011"),
            away_score: s("2"),
            home_team_url: s("/team/index?teamNo=AEO011"),
            home_score: s("4"),
            wins_pitcher: s("富藍戈"),
            loses_pitcher: s("徐若熙"),
            saves_pitcher: None,
            ..Default::default()
        };

        let entry = raw.normalize().unwrap();
        assert_eq!(entry.away_team, "味全龍");
        assert_eq!(entry.home_team_single, "悍");
        assert_eq!(entry.wins_pitcher.as_deref(), Some("富藍戈"));
        assert_eq!(entry.loses_pitcher.as_deref(), Some("徐若熙"));
        assert_eq!(entry.saves_pitcher, None);
        assert_eq!(entry.time, None);

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("away_sp").is_none());
        assert!(json["saves_pitcher"].is_null());
    }
}
