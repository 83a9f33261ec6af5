// src/lib.rs
//
// Ball touch, player velocity and ball spin analysis over per-frame
// detections, pose landmarks and (optionally) decoded pixels.
//
// Spin needs pixels. The binary only decodes video with the "opencv"
// feature; a default build reads traces alone, so its spin label stays
// blank. Library callers can pass pixels through `FrameInput::pixels` and
// get the built-in block-matching flow without OpenCV.

pub mod analysis;
pub mod config;
pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod pose;
pub mod trace;
pub mod types;
pub mod video_processor;

pub use pipeline::{FrameAnalysisPipeline, FrameInput, FrameResult};
pub use types::Config;
