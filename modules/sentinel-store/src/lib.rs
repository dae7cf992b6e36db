pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::CandidateStore;
