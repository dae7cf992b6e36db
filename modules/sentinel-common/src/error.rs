use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crisis not found: {0}")]
    CrisisNotFound(Uuid),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
