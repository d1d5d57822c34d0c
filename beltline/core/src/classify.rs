//! Defect Classification Client
//!
//! HTTP client for the external classification service. The core only
//! depends on the service's request/response contract:
//!
//! - Request: `POST` multipart form with one binary field `image` carrying a
//!   PNG (`texture.png`, `image/png`) to the configured endpoint.
//! - Response: JSON `{status, is_defected, defect_type, defect_percentage,
//!   threshold, message}`.
//!
//! The classifier sits behind a trait so the pipeline can be exercised with
//! stubs; the service's model internals are out of scope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::EncodedImage;
use crate::config::LineConfig;

/// Classification verdict driving the diversion branch
///
/// Immutable once constructed. The default verdict is "not defective" and is
/// applied whenever classification fails for any reason.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the service judged the surface defective
    pub is_defective: bool,
    /// Defect class reported by the service, if any
    pub defect_type: Option<String>,
    /// Fraction of the surface judged defective, in `[0, 1]`
    pub defect_percentage: f32,
    /// Decision threshold the service applied, in `[0, 1]`
    pub threshold: f32,
    /// Informational message from the service
    pub message: Option<String>,
}

/// Wire format of the classification service response
///
/// Every field is defaultable; the service is free to omit informational
/// fields.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassifyResponse {
    /// Service status string, informational only
    pub status: String,
    /// Whether a defect was detected
    pub is_defected: bool,
    /// Defect class name, empty when none
    pub defect_type: String,
    /// Fraction of the surface judged defective
    pub defect_percentage: f32,
    /// Decision threshold the service applied
    pub threshold: f32,
    /// Human-readable message, informational only
    pub message: String,
}

impl From<ClassifyResponse> for Verdict {
    fn from(response: ClassifyResponse) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            is_defective: response.is_defected,
            defect_type: non_empty(response.defect_type),
            defect_percentage: response.defect_percentage,
            threshold: response.threshold,
            message: non_empty(response.message),
        }
    }
}

/// Shared cell holding the item's current verdict
///
/// The single piece of state crossing the synchronous/asynchronous boundary:
/// written by the pipeline task when a run resolves, read once per pass by
/// the motion state machine at the divert transition, and reset to the
/// default at the start of each pass. There is no guard against a run that
/// outlives its pass writing into the freshly reset slot; with at most one
/// in-flight run per pass that write only re-applies a stale verdict before
/// the next read.
#[derive(Clone, Default)]
pub struct VerdictSlot(Arc<Mutex<Verdict>>);

impl VerdictSlot {
    /// Create a slot holding the default (not defective) verdict
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored verdict
    pub fn store(&self, verdict: Verdict) {
        *self.0.lock() = verdict;
    }

    /// Read the current verdict
    #[must_use]
    pub fn load(&self) -> Verdict {
        self.0.lock().clone()
    }

    /// Reset the stored verdict to the default
    pub fn reset(&self) {
        *self.0.lock() = Verdict::default();
    }
}

/// Errors from a single classification attempt
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Endpoint unreachable, request build failure, or timeout
    #[error("classification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Valid transport but a non-success HTTP status
    #[error("classification service returned {status}: {body}")]
    Status {
        /// HTTP status code returned by the service
        status: reqwest::StatusCode,
        /// Response body, for logs
        body: String,
    },

    /// Valid transport and status but an unparsable body
    #[error("failed to parse classification response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Defect classifier trait
///
/// Implement this to plug in a different service or a test stub.
#[async_trait]
pub trait DefectClassifier: Send + Sync {
    /// Get the classifier name for logs
    fn name(&self) -> &str;

    /// Submit an encoded image and parse the verdict
    async fn classify(&self, image: &EncodedImage) -> Result<Verdict, ClassifyError>;

    /// Check whether the service is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

/// HTTP classifier talking to the external classification service
#[derive(Clone)]
pub struct HttpClassifier {
    /// Endpoint URL the image is posted to
    endpoint: String,
    /// HTTP client with a bounded request timeout
    http_client: reqwest::Client,
}

impl HttpClassifier {
    /// Create a classifier for the given endpoint with a bounded timeout
    ///
    /// The timeout caps the whole round trip so a hung request cannot
    /// suppress future captures beyond the configured cooldown.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create from `LineConfig`
    #[must_use]
    pub fn from_config(config: &LineConfig) -> Self {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    /// Get the configured endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form_for(image: &EncodedImage) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name("texture.png")
            .mime_str("image/png")?;
        Ok(reqwest::multipart::Form::new().part("image", part))
    }
}

#[async_trait]
impl DefectClassifier for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn classify(&self, image: &EncodedImage) -> Result<Verdict, ClassifyError> {
        let form = Self::form_for(image)?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Status { status, body });
        }

        let body = response.text().await?;
        let parsed: ClassifyResponse = serde_json::from_str(&body)?;

        tracing::debug!(
            status = %parsed.status,
            is_defected = parsed.is_defected,
            defect_type = %parsed.defect_type,
            "classification response"
        );

        Ok(Verdict::from(parsed))
    }

    async fn health_check(&self) -> bool {
        self.http_client.get(&self.endpoint).send().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_verdict_is_not_defective() {
        let verdict = Verdict::default();
        assert!(!verdict.is_defective);
        assert_eq!(verdict.defect_type, None);
    }

    #[test]
    fn test_parse_full_response() {
        let body = r#"{
            "status": "ok",
            "is_defected": true,
            "defect_type": "crack",
            "defect_percentage": 0.42,
            "threshold": 0.3,
            "message": "defect found"
        }"#;

        let parsed: ClassifyResponse = serde_json::from_str(body).unwrap();
        let verdict = Verdict::from(parsed);

        assert!(verdict.is_defective);
        assert_eq!(verdict.defect_type.as_deref(), Some("crack"));
        assert!((verdict.defect_percentage - 0.42).abs() < f32::EPSILON);
        assert!((verdict.threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(verdict.message.as_deref(), Some("defect found"));
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let parsed: ClassifyResponse = serde_json::from_str(r#"{"is_defected": false}"#).unwrap();
        let verdict = Verdict::from(parsed);

        assert!(!verdict.is_defective);
        assert_eq!(verdict.defect_type, None);
        assert_eq!(verdict.message, None);
        assert!(verdict.defect_percentage.abs() < f32::EPSILON);
    }

    #[test]
    fn test_malformed_body_is_a_parse_error() {
        let result = serde_json::from_str::<ClassifyResponse>("not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_verdict_slot_store_load_reset() {
        let slot = VerdictSlot::new();
        assert_eq!(slot.load(), Verdict::default());

        let defective = Verdict {
            is_defective: true,
            defect_type: Some("scratch".to_string()),
            ..Verdict::default()
        };
        slot.store(defective.clone());
        assert_eq!(slot.load(), defective);

        // Clones share the same cell.
        let alias = slot.clone();
        alias.reset();
        assert_eq!(slot.load(), Verdict::default());
    }

    #[test]
    fn test_classifier_retains_endpoint() {
        let classifier = HttpClassifier::new("http://127.0.0.1:5000/inspect", Duration::from_secs(10));
        assert_eq!(classifier.endpoint(), "http://127.0.0.1:5000/inspect");
        assert_eq!(classifier.name(), "http");
    }
}
