use std::fmt;

use crate::status_code::{self, StatusCode, status_code_t};

/// A status value carrying a code and optional message.
///
/// Every fallible operation in fslite reports failure through a `Status`.
/// The message should name the offending id (file, chunk or node) so that a
/// caller can retry or inspect.
#[derive(Debug, Clone)]
#[must_use]
pub struct Status {
    code: status_code_t,
    message: Option<String>,
}

impl Status {
    /// Create a status with just a code.
    pub fn new(code: status_code_t) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Create a status with a code and a descriptive message.
    pub fn with_message(code: status_code_t, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(msg.into()),
        }
    }

    /// Return the numeric status code.
    pub fn code(&self) -> status_code_t {
        self.code
    }

    /// Return the optional message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether this status represents success (code == OK).
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::OK
    }

    /// Whether this status reports a missing file, chunk or node.
    pub fn is_not_found(&self) -> bool {
        status_code::is_not_found(self.code)
    }

    /// Produce a human-readable description like `"Meta::NotFound(3000) file missing"`.
    pub fn describe(&self) -> String {
        let name = status_code::to_string(self.code);
        match &self.message {
            Some(msg) => format!("{}({}) {}", name, self.code, msg),
            None => format!("{}({})", name, self.code),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for Status {}

impl From<status_code_t> for Status {
    fn from(code: status_code_t) -> Self {
        Self::new(code)
    }
}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Self::with_message(StatusCode::IO_ERROR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_code::{MetaCode, StorageCode};

    #[test]
    fn test_status_ok() {
        let s = Status::new(StatusCode::OK);
        assert!(s.is_ok());
        assert_eq!(s.code(), 0);
        assert!(s.message().is_none());
        assert_eq!(s.describe(), "OK(0)");
    }

    #[test]
    fn test_status_with_message() {
        let s = Status::with_message(MetaCode::NOT_FOUND, "file a3f9c1b2 not found");
        assert!(!s.is_ok());
        assert!(s.is_not_found());
        assert_eq!(s.code(), 3000);
        assert_eq!(s.message(), Some("file a3f9c1b2 not found"));
        assert_eq!(s.describe(), "Meta::NotFound(3000) file a3f9c1b2 not found");
    }

    #[test]
    fn test_status_display() {
        let s = Status::new(StorageCode::INSUFFICIENT_CAPACITY);
        assert_eq!(format!("{}", s), "Storage::InsufficientCapacity(4100)");
    }

    #[test]
    fn test_status_from_code() {
        let s: Status = StatusCode::INVALID_ARG.into();
        assert_eq!(s.code(), 3);
        assert!(!s.is_not_found());
    }

    #[test]
    fn test_status_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let s: Status = err.into();
        assert_eq!(s.code(), StatusCode::IO_ERROR);
        assert_eq!(s.message(), Some("disk on fire"));
    }

    #[test]
    fn test_status_is_error() {
        let s = Status::new(StatusCode::UNKNOWN);
        let e: &dyn std::error::Error = &s;
        assert!(e.to_string().contains("Unknown"));
    }
}
