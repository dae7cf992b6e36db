use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use sentinel_oracle::{infer, truncate_to_char_boundary, Oracle};

use crate::shapes::ClaimExtraction;

const MIN_INPUT_CHARS: usize = 5;
const MAX_INPUT_BYTES: usize = 30_000;
const UNKNOWN_CLAIM_LOCATION: &str = "Unknown";

const EXTRACTION_SYSTEM: &str = "You are an intelligence analyst. Turn raw \
reports and news snippets into discrete, checkable claims. Ignore framing \
like \"my uncle forwarded this\" or \"is this true?\" and state only the \
alleged event. Give the most specific city, district or region mentioned, \
or \"Unknown\". If the text implies immediate danger, keep that in the claim.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedClaim {
    pub text: String,
    pub location: String,
}

/// Decomposes free text into (claim, location) pairs via the oracle.
#[derive(Clone)]
pub struct ClaimExtractor {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl ClaimExtractor {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Never fails: oracle errors yield no claims.
    pub async fn extract(&self, text: &str) -> Vec<ExtractedClaim> {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_INPUT_CHARS {
            return Vec::new();
        }
        let input = truncate_to_char_boundary(trimmed, MAX_INPUT_BYTES);
        let prompt = format!(
            "CURRENT DATE: {}\n\nINPUT TEXT:\n\"{input}\"",
            Utc::now().format("%Y-%m-%d")
        );

        let extraction = match infer::<ClaimExtraction>(
            self.oracle.as_ref(),
            self.timeout,
            EXTRACTION_SYSTEM,
            prompt,
        )
        .await
        {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Claim extraction failed");
                return Vec::new();
            }
        };

        let claims: Vec<ExtractedClaim> = extraction
            .claims
            .into_iter()
            .filter_map(|c| {
                let text = c.text.trim().to_string();
                if text.chars().count() <= MIN_INPUT_CHARS {
                    return None;
                }
                let location = c
                    .location
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| UNKNOWN_CLAIM_LOCATION.to_string());
                Some(ExtractedClaim { text, location })
            })
            .collect();

        match claims.first() {
            Some(top) => info!(count = claims.len(), top = %top.text, location = %top.location, "Claims extracted"),
            None => debug!("No usable claims extracted"),
        }
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOracle;
    use serde_json::json;

    fn extractor(oracle: MockOracle) -> (Arc<MockOracle>, ClaimExtractor) {
        let oracle = Arc::new(oracle);
        let extractor = ClaimExtractor::new(oracle.clone(), Duration::from_secs(5));
        (oracle, extractor)
    }

    #[tokio::test]
    async fn short_input_skips_the_oracle() {
        let (oracle, extractor) = extractor(MockOracle::new());
        assert!(extractor.extract("  hi  ").await.is_empty());
        assert_eq!(oracle.calls("ClaimExtraction"), 0);
    }

    #[tokio::test]
    async fn trivial_claims_dropped_and_location_defaulted() {
        let (_, extractor) = extractor(MockOracle::new().on(
            "ClaimExtraction",
            json!({ "claims": [
                { "text": "Dam burst in Pune, water entering homes", "location": "Pune" },
                { "text": "fake", "location": "X" },
                { "text": "Schools shut after gas leak", "location": null }
            ]}),
        ));
        let claims = extractor
            .extract("My uncle forwarded this: dam burst in Pune!!")
            .await;
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].location, "Pune");
        assert_eq!(claims[1].location, "Unknown");
    }

    #[tokio::test]
    async fn oracle_failure_yields_nothing() {
        let (_, extractor) = extractor(MockOracle::new().failing("ClaimExtraction"));
        assert!(extractor.extract("Bridge collapse reported in Andheri").await.is_empty());
    }
}
