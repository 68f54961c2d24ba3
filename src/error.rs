//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("llm error: {0}")]
    Llm(#[from] ProviderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn directory_error_display() {
        let e = AppError::Directory("table not seeded".into());
        assert!(e.to_string().contains("table not seeded"));
    }

    #[test]
    fn llm_error_converts() {
        let e: AppError = ProviderError::Request("timeout".into()).into();
        assert!(e.to_string().contains("timeout"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        // satisfies std::error::Error trait
        let _: &dyn Error = &e;
    }
}
