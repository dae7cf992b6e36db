pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ScannerSettings};
pub use error::SentinelError;
pub use types::*;
