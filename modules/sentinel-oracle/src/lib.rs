pub mod claude;
pub mod error;
pub mod oracle;
pub mod schema;
pub mod util;

pub use claude::ClaudeOracle;
pub use error::OracleError;
pub use oracle::{infer, InferRequest, Oracle};
pub use schema::StructuredOutput;
pub use util::{strip_code_blocks, truncate_to_char_boundary};
