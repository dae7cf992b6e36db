use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Empty response from oracle")]
    Empty,

    #[error("Oracle call timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(e: serde_json::Error) -> Self {
        OracleError::Malformed(e.to_string())
    }
}
