//! Hook-driven synchronization for DocPilot.
//!
//! [`run_pipeline`] executes one source-to-artifact run;
//! [`HookCoordinator`] serializes runs per document key, coalesces
//! triggers that arrive mid-run, and records every trigger in the
//! execution log.

mod coordinator;
mod pipeline;

pub use coordinator::HookCoordinator;
pub use pipeline::{DocumentTarget, PipelineContext, PipelineReport, run_pipeline};
