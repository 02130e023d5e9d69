use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DatapagesError {
    #[error("malformed identifier range: {0}")]
    MalformedIdentifier(String),

    #[error("sample join passes produced different columns: {0}")]
    SchemaMismatch(String),

    #[error("missing mandatory config keys: {0}")]
    MissingConfigKeys(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("ENA request failed: {0}")]
    ArchiveHttp(String),

    #[error("ENA returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("tracking database error: {0}")]
    Tracking(String),

    #[error("registry database error: {0}")]
    Registry(String),

    #[error("cache error: {0}")]
    CacheRead(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
