use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::schema::StructuredOutput;

/// One structured-output request: instructions, input, and the JSON schema the
/// reply must satisfy.
#[derive(Debug, Clone)]
pub struct InferRequest {
    /// Output type name, e.g. `ClaimVerdict`.
    pub shape: String,
    pub system: String,
    pub prompt: String,
    pub schema: Value,
}

impl InferRequest {
    pub fn of<T: StructuredOutput>(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            shape: T::shape_name(),
            system: system.into(),
            prompt: prompt.into(),
            schema: T::output_schema(),
        }
    }
}

/// A reasoning engine that turns instructions plus input into structured JSON.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn infer(&self, request: &InferRequest) -> Result<Value, OracleError>;
}

/// Ask the oracle for a `T`, bounded by `timeout`.
pub async fn infer<T: StructuredOutput>(
    oracle: &dyn Oracle,
    timeout: Duration,
    system: impl Into<String>,
    prompt: impl Into<String>,
) -> Result<T, OracleError> {
    let request = InferRequest::of::<T>(system, prompt);
    debug!(shape = %request.shape, prompt_len = request.prompt.len(), "Oracle request");

    let value = tokio::time::timeout(timeout, oracle.infer(&request))
        .await
        .map_err(|_| OracleError::Timeout(timeout.as_secs()))??;

    serde_json::from_value(value).map_err(|e| {
        warn!(shape = %request.shape, error = %e, "Oracle reply did not match schema");
        OracleError::Malformed(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Echo {
        word: String,
    }

    struct Fixed(Value);

    #[async_trait]
    impl Oracle for Fixed {
        async fn infer(&self, request: &InferRequest) -> Result<Value, OracleError> {
            assert_eq!(request.shape, "Echo");
            Ok(self.0.clone())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Oracle for Stalled {
        async fn infer(&self, _request: &InferRequest) -> Result<Value, OracleError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(OracleError::Empty)
        }
    }

    #[tokio::test]
    async fn typed_reply_is_deserialized() {
        let oracle = Fixed(serde_json::json!({ "word": "flood" }));
        let echo: Echo = infer(&oracle, Duration::from_secs(1), "sys", "hi")
            .await
            .unwrap();
        assert_eq!(echo.word, "flood");
    }

    #[tokio::test]
    async fn shape_mismatch_is_malformed() {
        let oracle = Fixed(serde_json::json!({ "other": 1 }));
        let err = infer::<Echo>(&oracle, Duration::from_secs(1), "sys", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out() {
        let err = infer::<Echo>(&Stalled, Duration::from_secs(60), "sys", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Timeout(60)));
    }
}
