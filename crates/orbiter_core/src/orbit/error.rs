//! Error types for the orbit layer.
//!
//! # Responsibility
//! - Report metadata, handler-name, response and action failures.
//! - Wrap tokenizer failures so one `OrbitResult` covers a whole note update.
//!
//! # Invariants
//! - `InvalidField::found` names the stored value's type and spelling.

use crate::markup::{KvValue, MarkupError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrbitResult<T> = Result<T, OrbitError>;

/// Which handler family a name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Feed,
    Schedule,
    Feedback,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Schedule => "schedule",
            Self::Feedback => "feedback",
        }
    }
}

impl Display for HandlerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for metadata reads, strategy updates and migrations.
#[derive(Debug)]
pub enum OrbitError {
    Markup(MarkupError),
    /// Response index outside the handler's response set.
    InvalidResponse { response: usize, available: usize },
    UnknownHandlerName { kind: HandlerKind, name: String },
    /// A scheduling field required by the operation is absent.
    MissingField(String),
    /// A metadata field holds a value of the wrong type or range.
    InvalidField {
        key: String,
        expected: &'static str,
        found: String,
    },
    /// A legacy review-history payload could not be decoded.
    LegacyPayload(String),
    UnknownAction(String),
    /// An action was given a missing or unusable argument.
    InvalidArgument {
        action: &'static str,
        message: String,
    },
}

impl OrbitError {
    /// `InvalidField` for a stored value of the wrong type.
    pub(crate) fn invalid_field(key: &str, expected: &'static str, found: &KvValue) -> Self {
        Self::InvalidField {
            key: key.to_string(),
            expected,
            found: format!("{} `{}`", found.type_name(), found.encode()),
        }
    }
}

impl Display for OrbitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markup(err) => write!(f, "{err}"),
            Self::InvalidResponse {
                response,
                available,
            } => write!(
                f,
                "response {response} is out of range; handler accepts 0..{available}"
            ),
            Self::UnknownHandlerName { kind, name } => {
                write!(f, "unknown {kind} handler `{name}`")
            }
            Self::MissingField(key) => write!(f, "metadata field `{key}` is missing"),
            Self::InvalidField {
                key,
                expected,
                found,
            } => write!(
                f,
                "metadata field `{key}` must be {expected}, found {found}"
            ),
            Self::LegacyPayload(message) => {
                write!(f, "invalid review history payload: {message}")
            }
            Self::UnknownAction(action) => write!(f, "unsupported action `{action}`"),
            Self::InvalidArgument { action, message } => {
                write!(f, "invalid argument for `{action}`: {message}")
            }
        }
    }
}

impl Error for OrbitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Markup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MarkupError> for OrbitError {
    fn from(value: MarkupError) -> Self {
        Self::Markup(value)
    }
}
