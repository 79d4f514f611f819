use crate::models::TeamRecord;
use tracing::warn;

/// Team links on the schedule page all look like `/team/index?teamNo=ACN011`
pub const TEAM_URL_PREFIX: &str = "/team/index?teamNo=";

static TEAMS: [(&str, TeamRecord); 6] = [
    (
        "ACN011",
        TeamRecord {
            full_name: "中信兄弟",
            abbreviation: "中信",
            single_glyph: "象",
        },
    ),
    (
        "AEO011",
        TeamRecord {
            full_name: "富邦悍將",
            abbreviation: "富邦",
            single_glyph: "悍",
        },
    ),
    (
        "AJL011",
        TeamRecord {
            full_name: "樂天桃猿",
            abbreviation: "樂天",
            single_glyph: "猿",
        },
    ),
    (
        "ADD011",
        TeamRecord {
            full_name: "統一獅",
            abbreviation: "統一",
            single_glyph: "獅",
        },
    ),
    (
        "AKP011",
        TeamRecord {
            full_name: "台鋼雄鷹",
            abbreviation: "台鋼",
            single_glyph: "鷹",
        },
    ),
    (
        "AAA011",
        TeamRecord {
            full_name: "味全龍",
            abbreviation: "味全",
            single_glyph: "龍",
        },
    ),
];

/// Look up a team by its league code. Unknown codes yield
/// [`TeamRecord::UNKNOWN`] and a warning, never an error.
pub fn resolve(code: &str) -> TeamRecord {
    match TEAMS.iter().find(|(c, _)| *c == code) {
        Some((_, team)) => *team,
        None => {
            warn!(code, "unknown team code");
            TeamRecord::UNKNOWN
        }
    }
}

/// Resolve a team link as it appears in the page markup
pub fn resolve_href(href: &str) -> TeamRecord {
    match href.strip_prefix(TEAM_URL_PREFIX) {
        Some(code) => resolve(code),
        None => {
            warn!(href, "team link does not match the expected format");
            TeamRecord::UNKNOWN
        }
    }
}
