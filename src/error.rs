use thiserror::Error;

/// Failures of the schedule pipeline.
///
/// An unknown team code is deliberately not represented here: it resolves to
/// [`crate::TeamRecord::UNKNOWN`] and is only logged.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Navigation, interaction, script evaluation or a timeout failed, or the
    /// page returned something that is not a list of game records.
    #[error("page extraction failed: {0:#}")]
    ExtractionFailed(#[source] anyhow::Error),

    /// A record was missing a field every game on the page must carry.
    #[error("malformed record: missing `{field}`")]
    MalformedRecord { field: &'static str },
}

impl ScheduleError {
    pub fn extraction(err: impl Into<anyhow::Error>) -> Self {
        Self::ExtractionFailed(err.into())
    }
}

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;
