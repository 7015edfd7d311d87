#![allow(missing_docs)]

use std::{error::Error, fmt};

use playfun_retro::{CoreLoadError, RomLoadError};

#[derive(Debug, Clone)]
pub enum InitError {
    CoreLoadError { core_path: String, error: CoreLoadError },
    RomLoadError(RomLoadError),
    NoDefaultCore,
    AlreadyInitialized,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::CoreLoadError { core_path, error } => {
                write!(f, "failed to load core {}:\n  {}", core_path, error)
            }
            InitError::RomLoadError(error) => write!(f, "{}", error),
            InitError::NoDefaultCore => write!(
                f,
                "no core found in the default locations; pass a core path explicitly"
            ),
            InitError::AlreadyInitialized => write!(f, "frontend is already initialized"),
        }
    }
}

impl Error for InitError {}

impl From<RomLoadError> for InitError {
    fn from(v: RomLoadError) -> Self {
        Self::RomLoadError(v)
    }
}
