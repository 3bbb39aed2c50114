// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::{error, fmt, io};

#[derive(Debug)]
pub enum CanidError {
    Io(io::Error),
    Format(String),
    Json(serde_json::Error),
    Csv(csv::Error),
}

// These allow conversion to CanidError, required for main() to return Result<()> and for '?' to
// work.

impl From<io::Error> for CanidError {
    fn from(e: io::Error) -> Self {
        CanidError::Io(e)
    }
}

impl From<String> for CanidError {
    fn from(s: String) -> Self {
        CanidError::Format(s)
    }
}

impl From<serde_json::Error> for CanidError {
    fn from(e: serde_json::Error) -> Self {
        CanidError::Json(e)
    }
}

impl From<csv::Error> for CanidError {
    fn from(e: csv::Error) -> Self {
        CanidError::Csv(e)
    }
}

impl fmt::Display for CanidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanidError::Io(e) => write!(f, "I/O error: {}", e),
            CanidError::Format(msg) => write!(f, "Format error: {}", msg),
            CanidError::Json(e) => write!(f, "JSON error: {}", e),
            CanidError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl error::Error for CanidError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CanidError::Io(e) => Some(e),
            CanidError::Json(e) => Some(e),
            CanidError::Csv(e) => Some(e),
            CanidError::Format(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format_error() {
        let err = CanidError::from(String::from("No sequences found"));
        assert_eq!(err.to_string(), "Format error: No sequences found");
    }

    #[test]
    fn test_io_error_has_source() {
        let err = CanidError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
