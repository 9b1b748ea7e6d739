//! Error types for timeline loading and pagination.

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: The data source failed to deliver a view or page
    E001SourceFailure,
    /// E002: A fixture could not be read or parsed
    E002InvalidFixture,
    /// E003: The driver's command channel or session is gone
    E003SessionClosed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001SourceFailure => "E001",
            Self::E002InvalidFixture => "E002",
            Self::E003SessionClosed => "E003",
        }
    }
}

/// Errors surfaced by the timeline engine to its UI collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimelineError {
    /// Fetching from the data source failed. `offset` is `None` for the initial view.
    #[error("[{code}] Timeline fetch failed{}: {message}", offset_suffix(.offset))]
    Source {
        code: &'static str,
        offset: Option<u64>,
        message: String,
    },

    /// Fixture content was malformed
    #[error("[{code}] Invalid timeline fixture: {message}")]
    InvalidFixture { code: &'static str, message: String },

    /// The session or driver has been shut down
    #[error("[{code}] Timeline session closed")]
    SessionClosed { code: &'static str },
}

fn offset_suffix(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" at offset {}", offset),
        None => String::new(),
    }
}

impl TimelineError {
    /// Create a source failure for the page starting at `offset`
    pub fn page_failure(offset: u64, message: impl Into<String>) -> Self {
        Self::Source {
            code: ErrorCode::E001SourceFailure.as_str(),
            offset: Some(offset),
            message: message.into(),
        }
    }

    /// Create a source failure for the initial timeline view
    pub fn view_failure(message: impl Into<String>) -> Self {
        Self::Source {
            code: ErrorCode::E001SourceFailure.as_str(),
            offset: None,
            message: message.into(),
        }
    }

    pub fn invalid_fixture(message: impl Into<String>) -> Self {
        Self::InvalidFixture {
            code: ErrorCode::E002InvalidFixture.as_str(),
            message: message.into(),
        }
    }

    pub fn session_closed() -> Self {
        Self::SessionClosed {
            code: ErrorCode::E003SessionClosed.as_str(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Source { code, .. }
            | Self::InvalidFixture { code, .. }
            | Self::SessionClosed { code } => *code,
        }
    }
}

/// Result type alias for TimelineError
pub type Result<T> = std::result::Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_codes() {
        let err = TimelineError::page_failure(40, "connection reset");
        assert_eq!(err.code(), "E001");
        assert_eq!(
            err.to_string(),
            "[E001] Timeline fetch failed at offset 40: connection reset"
        );

        let err = TimelineError::view_failure("timeout");
        assert_eq!(err.to_string(), "[E001] Timeline fetch failed: timeout");

        assert_eq!(TimelineError::invalid_fixture("bad json").code(), "E002");
        assert_eq!(TimelineError::session_closed().code(), "E003");
    }
}
