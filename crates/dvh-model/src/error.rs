use thiserror::Error;

use crate::units::Unit;

#[derive(Debug, Error)]
pub enum DvhError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("no conversion from {from} to {to}")]
    UnknownUnits { from: Unit, to: Unit },
    #[error("percent conversion involving {unit} requires a reference value")]
    MissingReference { unit: Unit },
    #[error("{0}")]
    Message(String),
}

impl DvhError {
    /// Build a parse error tagged with the source line it was raised on.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DvhError>;
