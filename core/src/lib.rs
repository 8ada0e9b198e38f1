//! herd-core — elementwise vector arithmetic distributed over a fixed worker
//! group.
//!
//! One leader owns the full-length vectors; the group jointly agrees the
//! problem size, scatters equal chunks, computes on local slices, and gathers
//! results back to the leader for display. All cross-member interaction goes
//! through the collective primitives in [`group`]; there is no shared mutable
//! state between members.

pub mod barrier;
pub mod config;
pub mod group;
pub mod ops;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod vector;

pub use config::GroupConfig;
pub use group::{GroupChannel, WorkerGroup};
pub use orchestrator::{KernelSet, RunPlan, run};
pub use partition::SizeAgreement;
pub use vector::LocalSlice;
