//! Error taxonomy and its mapping onto HTTP status classes.
//!
//! Every error produced by a Tessera crate classifies itself as exactly one
//! [`ErrorKind`]. The HTTP layer translates kinds through [`ErrorKind::status`]
//! and [`StatusClass::code`]; anything it cannot classify is [`StatusClass::Internal`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of every failure the core can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    NameConflict,
    DanglingLink,
    LinkLoop,
    DuplicateAssignment,
    OutOfBounds,
    InvalidStep,
    ShapeMismatch,
    InvalidResize,
    InvalidSelection,
    InvalidName,
    TypeMismatch,
    CyclicLink,
    Forbidden,
    NotImplemented,
    StorageIO,
    Internal,
}

impl ErrorKind {
    /// The status class the HTTP layer reports for this kind.
    pub fn status(&self) -> StatusClass {
        match self {
            Self::NotFound => StatusClass::NotFound,
            Self::NameConflict | Self::DuplicateAssignment | Self::CyclicLink => {
                StatusClass::Conflict
            }
            Self::DanglingLink => StatusClass::Gone,
            Self::LinkLoop
            | Self::OutOfBounds
            | Self::InvalidStep
            | Self::ShapeMismatch
            | Self::InvalidResize
            | Self::InvalidSelection
            | Self::InvalidName
            | Self::TypeMismatch => StatusClass::BadRequest,
            Self::Forbidden => StatusClass::Forbidden,
            Self::NotImplemented => StatusClass::NotImplemented,
            Self::StorageIO | Self::Internal => StatusClass::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// HTTP-level status classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Gone,
    Internal,
    NotImplemented,
}

impl StatusClass {
    /// Numeric HTTP status code.
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Gone => 410,
            Self::Internal => 500,
            Self::NotImplemented => 501,
        }
    }

    /// Reverse mapping; unknown codes are `Internal`.
    pub fn from_code(code: u16) -> Self {
        match code {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            410 => Self::Gone,
            501 => Self::NotImplemented,
            _ => Self::Internal,
        }
    }
}
