use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{ErrorBody, ErrorCode, ReviewError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Server returned {status}: {} ({})", .error.message, .error.code)]
    Remote { status: StatusCode, error: ErrorBody },

    #[error("Review {} refused the transition: {}", .conflict.review_id, .conflict.message)]
    ReviewConflict { conflict: ReviewError },
}

impl ApiError {
    /// True for failures where no HTTP response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::RequestFailed(_) | ApiError::Transport(_) | ApiError::Io(_)
        )
    }

    /// Status code reported by the server, if the failure came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            ApiError::ReviewConflict { .. } => Some(StatusCode::CONFLICT),
            ApiError::RequestFailed(err) => err.status(),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::Remote { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                Some("Verify your credentials using: crucible-cli auth test")
            }
            ApiError::Remote { error, .. } => match error.code {
                ErrorCode::NotPermitted => {
                    Some("Check that your user may perform this action on the review")
                }
                ErrorCode::NotFound => Some("Check if the review or comment id is correct"),
                ErrorCode::PermaIdFormat => Some("Review ids look like CR-45"),
                ErrorCode::IllegalArgument => Some("Review the request parameters"),
                ErrorCode::IllegalState => Some("The review is not in a state that allows this"),
                ErrorCode::ReviewContentTooLarge => Some("Split the change into smaller reviews"),
                ErrorCode::Unknown => None,
            },
            ApiError::ReviewConflict { .. } => {
                Some("Retry with --ignore-warnings to override failed conditions")
            }
            ApiError::RequestFailed(_) | ApiError::Transport(_) => {
                Some("Check your network connection and the profile base_url")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
