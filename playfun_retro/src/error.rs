#![allow(missing_docs)]

use std::{error::Error, fmt, io, sync::Arc};

use crate::abi::API_VERSION;

#[derive(Debug, Clone)]
pub enum CoreLoadError {
    DlOpenError(Arc<dlopen::Error>),
    UndefinedSymbol(String),
    ApiVersionMismatch { found: u32 },
}

impl fmt::Display for CoreLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreLoadError::DlOpenError(error) => write!(f, "{}", error),
            CoreLoadError::UndefinedSymbol(name) => write!(f, "undefined symbol {}", name),
            CoreLoadError::ApiVersionMismatch { found } => write!(
                f,
                "core speaks libretro API version {}, expected {}",
                found, API_VERSION
            ),
        }
    }
}

impl Error for CoreLoadError {}

impl From<dlopen::Error> for CoreLoadError {
    fn from(v: dlopen::Error) -> Self {
        Self::DlOpenError(Arc::new(v))
    }
}

#[derive(Debug, Clone)]
pub enum RomLoadError {
    ReadError {
        filename: String,
        error: Arc<io::Error>,
    },
    Rejected {
        filename: String,
    },
}

impl fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomLoadError::ReadError { filename, error } => {
                write!(f, "failed to read {}:\n  {}", filename, error)
            }
            RomLoadError::Rejected { filename } => {
                write!(f, "core rejected {}", filename)
            }
        }
    }
}

impl Error for RomLoadError {}
