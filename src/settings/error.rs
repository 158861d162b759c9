use std::error::Error;
use thiserror::Error as ThisError;

type Cause = Box<dyn Error + Send + Sync>;

#[derive(Debug, ThisError)]
pub enum SettingsError {
    #[error("failed to parse settings file {path:?}: {cause}")]
    FileParse { path: Option<String>, cause: Cause },
    #[error("invalid value in env var {name}: {cause}")]
    InvalidEnv { name: String, cause: Cause },
    #[error("missing settings value {0}")]
    MissingValue(String),
}
