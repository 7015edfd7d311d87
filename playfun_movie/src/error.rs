#![allow(missing_docs)]

use std::{error::Error, fmt, io, sync::Arc};

#[derive(Debug, Clone)]
pub enum MovieError {
    ReadError {
        filename: String,
        error: Arc<io::Error>,
    },
    WriteError {
        filename: String,
        error: Arc<io::Error>,
    },
}

impl fmt::Display for MovieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovieError::ReadError { filename, error } => {
                write!(f, "failed to read {}:\n  {}", filename, error)
            }
            MovieError::WriteError { filename, error } => {
                write!(f, "failed to write {}:\n  {}", filename, error)
            }
        }
    }
}

impl Error for MovieError {}
