// src/analysis/mod.rs
//
// Per-frame event and kinematics components.
//
// Signal flow:
//   Ball center + feet  → touch_counter ──→ new_touch ─┐
//   Hip midpoint        ─────────────────→ velocity_tracker
//   Ball crop           → optical_flow → spin_estimator
//
// Orchestrated by pipeline::FrameAnalysisPipeline.

pub mod optical_flow;
pub mod spin_estimator;
pub mod touch_counter;
pub mod velocity_tracker;

pub use optical_flow::{BlockMatchConfig, BlockMatchFlow, FlowField, FlowProvider, FlowStats};
pub use spin_estimator::{SpinEstimator, SpinLabel, SpinRule};
pub use touch_counter::{Leg, TouchCounter, TouchUpdate};
pub use velocity_tracker::{VelocityCalculator, VelocitySample};

#[cfg(feature = "opencv")]
pub use optical_flow::FarnebackFlow;
