//! Beltline Core - Headless Conveyor Inspection Line
//!
//! This crate simulates a single item traveling along a conveyor, snapshots
//! its visual surface as it crosses an inspection gate, submits the snapshot
//! to an external classification service, and diverts the item onto an
//! accept or reject branch based on the verdict. It is completely
//! independent of any rendering or UI framework: an external driver calls
//! [`ProductLine::advance`] at whatever cadence it likes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ tick driver (beltline-sim, tests, an engine frame loop, ...) │
//! └──────────────────────────┬───────────────────────────────────┘
//!                            │ advance(dt)
//! ┌──────────────────────────┴───────────────────────────────────┐
//! │                       ProductLine                            │
//! │  ┌────────────┐ trigger ┌─────────────────────────────────┐  │
//! │  │  Conveyor  │ fired   │       InspectionPipeline        │  │
//! │  │ (motion +  ├────────▶│ capture ─▶ classify ─▶ verdict  │  │
//! │  │  trigger)  │         │  (detached tokio task)          │  │
//! │  └─────┬──────┘         └──────┬─────────────┬────────────┘  │
//! │        │ read at divert        │             │ HTTP          │
//! │        ▼                       ▼             ▼               │
//! │   VerdictSlot ◀───────── SurfaceCapture  DefectClassifier    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ProductLine`]: conveyor plus pipeline, the one struct drivers hold
//! - [`Conveyor`]: the position/phase state machine
//! - [`InspectionPipeline`]: the capture → classify → apply sequence
//! - [`SurfaceCapture`]: boundary to the (external) rendering subsystem
//! - [`DefectClassifier`] / [`HttpClassifier`]: the classification service
//! - [`Verdict`] / [`VerdictSlot`]: the result and the one shared cell
//! - [`LineConfig`]: injected line geometry and service parameters
//!
//! # Module Overview
//!
//! - [`config`]: TOML/env configuration loading
//! - [`motion`]: motion state machine and move-towards kinematics
//! - [`trigger`]: spatial + cooldown capture trigger
//! - [`capture`]: surface capture boundary and PNG encoding
//! - [`classify`]: classification service client and verdict types
//! - [`pipeline`]: asynchronous pipeline orchestration
//! - [`line`]: the driver-facing wrapper

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod classify;
pub mod config;
pub mod line;
pub mod motion;
pub mod pipeline;
pub mod trigger;

// Re-exports for convenience
pub use capture::{Bitmap, CaptureError, EncodedImage, Surface, SurfaceCapture, TexturePool};
pub use classify::{
    ClassifyError, ClassifyResponse, DefectClassifier, HttpClassifier, Verdict, VerdictSlot,
};
pub use config::{default_config_path, load_config, load_config_from_path, ConfigError, LineConfig};
pub use line::ProductLine;
pub use motion::{move_towards, Branch, Conveyor, Item, Phase, TickReport};
pub use pipeline::InspectionPipeline;
pub use trigger::{gate_distance, should_capture, TriggerParams};
