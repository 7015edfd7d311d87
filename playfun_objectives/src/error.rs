#![allow(missing_docs)]

use std::{error::Error, fmt, io, sync::Arc};

#[derive(Debug, Clone)]
pub enum ObjectivesError {
    ReadError {
        filename: String,
        error: Arc<io::Error>,
    },
    WriteError {
        filename: String,
        error: Arc<io::Error>,
    },
    ParseError {
        filename: String,
        line: usize,
    },
    NoObjectives {
        filename: String,
    },
}

impl fmt::Display for ObjectivesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectivesError::ReadError { filename, error } => {
                write!(f, "failed to read {}:\n  {}", filename, error)
            }
            ObjectivesError::WriteError { filename, error } => {
                write!(f, "failed to write {}:\n  {}", filename, error)
            }
            ObjectivesError::ParseError { filename, line } => {
                write!(f, "invalid objective at {}:{}", filename, line)
            }
            ObjectivesError::NoObjectives { filename } => {
                write!(f, "no objectives with positive weight in {}", filename)
            }
        }
    }
}

impl Error for ObjectivesError {}

#[derive(Debug, Clone)]
pub enum MotifsError {
    ReadError {
        filename: String,
        error: Arc<io::Error>,
    },
    ParseError {
        filename: String,
        line: usize,
    },
    NoMotifs {
        filename: String,
    },
}

impl fmt::Display for MotifsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotifsError::ReadError { filename, error } => {
                write!(f, "failed to read {}:\n  {}", filename, error)
            }
            MotifsError::ParseError { filename, line } => {
                write!(f, "invalid motif at {}:{}", filename, line)
            }
            MotifsError::NoMotifs { filename } => {
                write!(f, "no motifs with positive weight in {}", filename)
            }
        }
    }
}

impl Error for MotifsError {}
