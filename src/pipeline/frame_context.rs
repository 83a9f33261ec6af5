// src/pipeline/frame_context.rs
//
// Per-frame inputs, the geometry extracted from them, and the combined
// result handed to rendering. Nothing here outlives the frame.

use crate::analysis::SpinLabel;
use crate::detection::{BallObservation, Detection};
use crate::pose::{PoseLandmarks, PoseObservation};
use crate::types::{BoundingBox, Frame, Point2D};
use serde::Serialize;

/// Raw collaborator output for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// 1-based, strictly increasing
    pub frame_idx: u64,
    pub width: usize,
    pub height: usize,
    /// Decoded pixels; without them spin classification cannot run
    pub pixels: Option<&'a Frame>,
    pub detections: &'a [Detection],
    pub landmarks: Option<&'a PoseLandmarks>,
}

/// Geometry extracted from one frame's detections and landmarks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameObservation {
    pub frame_idx: u64,
    pub ball: Option<BallObservation>,
    pub pose: PoseObservation,
}

impl FrameObservation {
    pub fn ball_center(&self) -> Option<Point2D> {
        self.ball.map(|b| b.center)
    }

    pub fn ball_bbox(&self) -> Option<BoundingBox> {
        self.ball.map(|b| b.bbox)
    }

    pub fn has_pose(&self) -> bool {
        self.pose.right_foot.is_some()
            || self.pose.left_foot.is_some()
            || self.pose.player_pos.is_some()
    }
}

/// Everything downstream rendering needs for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_idx: u64,
    pub right_leg_touches: u32,
    pub left_leg_touches: u32,
    pub rotation_text: SpinLabel,
    /// px/s, held between touches
    pub velocity: f32,
    pub new_touch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_accessors() {
        let bbox = BoundingBox::new(10, 10, 30, 30);
        let obs = FrameObservation {
            frame_idx: 4,
            ball: Some(BallObservation {
                center: bbox.center(),
                bbox,
            }),
            pose: PoseObservation::default(),
        };
        assert_eq!(obs.ball_center(), Some(Point2D::new(20.0, 20.0)));
        assert_eq!(obs.ball_bbox(), Some(bbox));
        assert!(!obs.has_pose());
    }

    #[test]
    fn test_result_json_shape() {
        let result = FrameResult {
            frame_idx: 7,
            right_leg_touches: 2,
            left_leg_touches: 1,
            rotation_text: SpinLabel::Backspin,
            velocity: 12.5,
            new_touch: false,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["rotation_text"], "Backspin");
        assert_eq!(json["right_leg_touches"], 2);
        assert_eq!(json["velocity"], 12.5);
    }
}
