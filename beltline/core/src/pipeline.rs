//! Inspection Pipeline Orchestrator
//!
//! Runs the capture → classify → apply-verdict sequence out of line with the
//! tick loop, so the network round trip never stalls motion updates. One
//! pipeline run is spawned per fired trigger; the trigger's
//! once-per-pass guard keeps at most one run in flight per item.
//!
//! Every run resolves the verdict slot: on any failure at any stage the
//! default "not defective" verdict is stored and the failure is logged.
//! There are no retries and no cancellation; a run that outlives its pass
//! simply writes into the reset slot.

use std::sync::Arc;

use tracing::{info, warn};

use crate::capture::SurfaceCapture;
use crate::classify::{DefectClassifier, Verdict, VerdictSlot};

/// The capture/classify pipeline for a single item
#[derive(Clone)]
pub struct InspectionPipeline {
    capture: Arc<dyn SurfaceCapture>,
    classifier: Arc<dyn DefectClassifier>,
    verdict: VerdictSlot,
}

impl InspectionPipeline {
    /// Create a pipeline over the given collaborators and verdict slot
    pub fn new(
        capture: Arc<dyn SurfaceCapture>,
        classifier: Arc<dyn DefectClassifier>,
        verdict: VerdictSlot,
    ) -> Self {
        Self {
            capture,
            classifier,
            verdict,
        }
    }

    /// The capture provider, also used for per-pass surface re-rolls
    #[must_use]
    pub fn capture_provider(&self) -> &Arc<dyn SurfaceCapture> {
        &self.capture
    }

    /// Launch one detached pipeline run
    ///
    /// Must be called from within a tokio runtime. Returns the join handle,
    /// which callers may ignore; the run always resolves the verdict slot
    /// on its own.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run().await })
    }

    /// Execute one capture → classify → apply run to completion
    pub async fn run(&self) {
        let image = match self.capture.capture().await {
            Ok(image) => image,
            Err(error) => {
                warn!(%error, "capture failed, applying default verdict");
                self.verdict.store(Verdict::default());
                return;
            }
        };

        match self.classifier.classify(&image).await {
            Ok(verdict) => {
                info!(
                    classifier = self.classifier.name(),
                    is_defective = verdict.is_defective,
                    defect_type = verdict.defect_type.as_deref().unwrap_or(""),
                    defect_percentage = verdict.defect_percentage,
                    "classification complete"
                );
                self.verdict.store(verdict);
            }
            Err(error) => {
                warn!(
                    classifier = self.classifier.name(),
                    %error,
                    "classification failed, applying default verdict"
                );
                self.verdict.store(Verdict::default());
            }
        }
    }
}
