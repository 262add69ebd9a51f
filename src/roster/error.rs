use std::fmt;

use chrono::NaiveDate;

use crate::errors::AppError;

/// Why a prediction or selection could not be computed.
///
/// The first four variants describe inconsistent roster data. They are raised where they
/// are detected and reach the caller unchanged; retrying with the same data cannot help.
#[derive(Debug)]
pub enum RosterError {
    /// No committed schedule exists to anchor the prediction.
    NoBaseline,
    /// The anchor schedule's `pre` list carries no rotation marker.
    MarkerIntegrity { date: NaiveDate },
    /// A pending assignment was found in `pre` before the marker.
    MarkerStatus { date: NaiveDate, member_id: i64 },
    /// The marker member is not part of the current rotation pool.
    MarkerNotInPool { member_id: i64 },
    /// A collaborator failed to answer.
    Store(AppError),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::NoBaseline => {
                write!(f, "No committed schedule exists to anchor the prediction")
            }
            RosterError::MarkerIntegrity { date } => {
                write!(f, "Schedule {} has no rotation marker in its pre list", date)
            }
            RosterError::MarkerStatus { date, member_id } => write!(
                f,
                "Schedule {} has an unresolved pre assignment for member {}",
                date, member_id
            ),
            RosterError::MarkerNotInPool { member_id } => write!(
                f,
                "Rotation marker member {} is not in the rotation pool",
                member_id
            ),
            RosterError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RosterError {}

impl From<AppError> for RosterError {
    fn from(err: AppError) -> Self {
        RosterError::Store(err)
    }
}
