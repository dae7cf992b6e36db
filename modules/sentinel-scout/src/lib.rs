pub mod conclusion;
pub mod deep_scan;
pub mod discovery;
pub mod extraction;
pub mod fanout;
pub mod gatherers;
pub mod search;
pub mod shapes;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod verification;

pub use conclusion::ConclusionSynthesizer;
pub use deep_scan::{DeepScanReport, DeepScanner};
pub use discovery::{Discovery, DiscoveryReport, RelevanceFilter};
pub use extraction::{ClaimExtractor, ExtractedClaim};
pub use gatherers::{EvidenceGatherer, GathererSet};
pub use search::{SearchBackend, SearchHit, SerperSearch};
pub use sources::{FeedSource, SearchSignalSource, SignalSource};
pub use verification::{Association, ClaimRequest, VerificationReport, Verifier};
