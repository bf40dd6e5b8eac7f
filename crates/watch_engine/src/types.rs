use std::fmt;

use thiserror::Error;
use watch_core::Item;

/// Pagination position within one full-resource fetch. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub end_cursor: Option<String>,
    pub has_more: bool,
}

impl PageCursor {
    pub fn start() -> Self {
        Self {
            end_cursor: None,
            has_more: true,
        }
    }

    pub fn end() -> Self {
        Self {
            end_cursor: None,
            has_more: false,
        }
    }

    pub fn next(end_cursor: impl Into<String>) -> Self {
        Self {
            end_cursor: Some(end_cursor.into()),
            has_more: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
    pub next: PageCursor,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthExpired, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidReference,
    AuthExpired,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl FailureKind {
    /// Everything except a rejected session or a bad reference.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, FailureKind::InvalidReference | FailureKind::AuthExpired)
    }

    /// Whether a session refresh and another attempt may help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::InvalidReference)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidReference => write!(f, "invalid reference"),
            FailureKind::AuthExpired => write!(f, "session expired"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "unexpected response shape"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
