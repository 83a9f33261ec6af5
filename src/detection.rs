// src/detection.rs
//
// Detector output as consumed by the analysis core. The detector itself
// (YOLO or otherwise) runs outside this crate; we only see its boxes.

use crate::types::{BoundingBox, DetectionConfig, Point2D};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionLabel {
    Player,
    Ball,
    Other,
}

impl DetectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionLabel::Player => "Player",
            DetectionLabel::Ball => "Ball",
            DetectionLabel::Other => "Object",
        }
    }
}

impl Detection {
    pub fn label(&self, config: &DetectionConfig) -> DetectionLabel {
        if self.class_id == config.ball_class_id {
            DetectionLabel::Ball
        } else if self.class_id == config.player_class_id {
            DetectionLabel::Player
        } else {
            DetectionLabel::Other
        }
    }
}

/// Ball observation extracted from one frame's detections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallObservation {
    pub center: Point2D,
    pub bbox: BoundingBox,
}

/// Pick the ball out of a frame's detections.
///
/// When several boxes carry the ball class the last one wins, matching the
/// order the detector reports them in. A ball box that violates the
/// bounding-box invariant is an input error.
pub fn find_ball(detections: &[Detection], ball_class_id: u32) -> Result<Option<BallObservation>> {
    let Some(det) = detections
        .iter()
        .rev()
        .find(|d| d.class_id == ball_class_id)
    else {
        return Ok(None);
    };

    det.bbox.validate()?;
    Ok(Some(BallObservation {
        center: det.bbox.center(),
        bbox: det.bbox,
    }))
}
