//! Inline markup model: fragments, sequences and the tokenizer.
//!
//! # Responsibility
//! - Turn raw note text into a lossless sequence of typed fragments.
//! - Serialize fragments back to text.
//!
//! # Invariants
//! - Parsing then serializing an unedited note reproduces it byte-for-byte.
//! - Parse failures abort the whole note; there is no partial result.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod brackets;
pub mod component;
pub mod sequence;
pub mod tokenizer;
pub mod value;

pub use component::{Button, Component, ComponentKind, KeyValue, PageRef, Tag, KV_SEPARATOR};
pub use sequence::ComponentList;
pub use tokenizer::tokenize;
pub use value::{format_long_date, parse_date, KvValue, ValueDecodeError};

pub type MarkupResult<T> = Result<T, MarkupError>;

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// A matched substring lacks the delimiters its kind requires.
    Malformed {
        kind: ComponentKind,
        fragment: String,
    },
}

impl MarkupError {
    pub(crate) fn malformed(kind: ComponentKind, fragment: &str) -> Self {
        Self::Malformed {
            kind,
            fragment: fragment.to_string(),
        }
    }
}

impl Display for MarkupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { kind, fragment } => {
                write!(f, "malformed {kind} markup: `{fragment}`")
            }
        }
    }
}

impl Error for MarkupError {}
