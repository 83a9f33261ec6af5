// src/pose.rs
//
// Pose landmarks as delivered by the external pose estimator
// (MediaPipe BlazePose topology, 33 points, normalized coordinates).

use crate::types::Point2D;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const NUM_LANDMARKS: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    /// Position in the estimator's output sequence
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Leg chains drawn on the overlay, hip to toe
pub const RIGHT_LEG: [PoseLandmark; 4] = [
    PoseLandmark::RightHip,
    PoseLandmark::RightKnee,
    PoseLandmark::RightAnkle,
    PoseLandmark::RightFootIndex,
];

pub const LEFT_LEG: [PoseLandmark; 4] = [
    PoseLandmark::LeftHip,
    PoseLandmark::LeftKnee,
    PoseLandmark::LeftAnkle,
    PoseLandmark::LeftFootIndex,
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32, // 0-1 normalized
    pub y: f32, // 0-1 normalized
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }

    /// Scale to pixels, truncating to the pixel grid
    pub fn to_pixel(&self, width: usize, height: usize) -> Point2D {
        Point2D::new(
            (self.x * width as f32) as i32 as f32,
            (self.y * height as f32) as i32 as f32,
        )
    }
}

/// One person's full landmark set for a frame
#[derive(Debug, Clone, PartialEq)]
pub struct PoseLandmarks {
    points: Vec<Landmark>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            bail!(
                "expected {} pose landmarks, got {}",
                NUM_LANDMARKS,
                points.len()
            );
        }
        Ok(Self { points })
    }

    pub fn get(&self, landmark: PoseLandmark) -> &Landmark {
        &self.points[landmark.index()]
    }

    pub fn visible_pixel(
        &self,
        landmark: PoseLandmark,
        width: usize,
        height: usize,
        threshold: f32,
    ) -> Option<Point2D> {
        let lm = self.get(landmark);
        lm.is_visible(threshold).then(|| lm.to_pixel(width, height))
    }

    /// Midpoint of both hips, only when both are visible
    pub fn hip_midpoint(&self, width: usize, height: usize, threshold: f32) -> Option<Point2D> {
        let left = self.get(PoseLandmark::LeftHip);
        let right = self.get(PoseLandmark::RightHip);
        if !(left.is_visible(threshold) && right.is_visible(threshold)) {
            return None;
        }
        let mid = Landmark::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0, 1.0);
        Some(mid.to_pixel(width, height))
    }
}

/// Body points the touch and velocity logic care about
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseObservation {
    pub right_foot: Option<Point2D>,
    pub left_foot: Option<Point2D>,
    pub player_pos: Option<Point2D>,
}

impl PoseObservation {
    pub fn extract(
        landmarks: Option<&PoseLandmarks>,
        width: usize,
        height: usize,
        threshold: f32,
    ) -> Self {
        let Some(lms) = landmarks else {
            return Self::default();
        };

        Self {
            right_foot: lms.visible_pixel(PoseLandmark::RightFootIndex, width, height, threshold),
            left_foot: lms.visible_pixel(PoseLandmark::LeftFootIndex, width, height, threshold),
            player_pos: lms.hip_midpoint(width, height, threshold),
        }
    }
}
