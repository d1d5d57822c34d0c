//! Product Line
//!
//! Ties the synchronous motion state machine to the asynchronous inspection
//! pipeline. Each tick the conveyor advances; when the trigger fires a
//! pipeline run is spawned, and when a pass resets the capture boundary is
//! asked for a fresh random surface. Must be driven from within a tokio
//! runtime.

use std::sync::Arc;
use std::time::Duration;

use crate::capture::SurfaceCapture;
use crate::classify::{DefectClassifier, VerdictSlot};
use crate::config::LineConfig;
use crate::motion::{Conveyor, TickReport};
use crate::pipeline::InspectionPipeline;

/// A single-item inspection line
pub struct ProductLine {
    conveyor: Conveyor,
    pipeline: InspectionPipeline,
}

impl ProductLine {
    /// Build a line from its configuration and collaborators
    pub fn new(
        config: LineConfig,
        capture: Arc<dyn SurfaceCapture>,
        classifier: Arc<dyn DefectClassifier>,
    ) -> Self {
        let verdict = VerdictSlot::new();
        let conveyor = Conveyor::new(config, verdict.clone());
        let pipeline = InspectionPipeline::new(capture, classifier, verdict);
        // The first pass gets a random surface too, like every reset after.
        pipeline.capture_provider().randomize();
        Self { conveyor, pipeline }
    }

    /// The underlying motion state machine
    #[must_use]
    pub fn conveyor(&self) -> &Conveyor {
        &self.conveyor
    }

    /// Advance the line by `dt`, launching the pipeline when the trigger
    /// fires and re-rolling the surface when a pass resets
    pub fn advance(&mut self, dt: Duration) -> TickReport {
        let report = self.conveyor.advance(dt);
        if report.capture_fired {
            self.pipeline.spawn();
        }
        if report.reset {
            self.pipeline.capture_provider().randomize();
        }
        report
    }
}
