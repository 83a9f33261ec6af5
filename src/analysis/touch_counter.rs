// src/analysis/touch_counter.rs
//
// Rising-edge touch detection per leg. A foot "touches" while it is within
// `threshold_px` of the ball center; a touch is counted only on the frame
// where that predicate flips from false to true.

use crate::types::Point2D;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Leg {
    Right,
    Left,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Right => "right",
            Leg::Left => "left",
        }
    }
}

/// Result of one `detect_and_count` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchUpdate {
    /// Either leg registered a fresh touch this frame
    pub new_touch: bool,
    pub right_edge: bool,
    pub left_edge: bool,
    pub right_leg_touches: u32,
    pub left_leg_touches: u32,
}

impl TouchUpdate {
    pub fn edges(&self) -> impl Iterator<Item = (Leg, u32)> + '_ {
        [
            (Leg::Right, self.right_edge, self.right_leg_touches),
            (Leg::Left, self.left_edge, self.left_leg_touches),
        ]
        .into_iter()
        .filter(|(_, edge, _)| *edge)
        .map(|(leg, _, count)| (leg, count))
    }
}

pub struct TouchCounter {
    right_leg_touches: u32,
    left_leg_touches: u32,
    prev_right_touch: bool,
    prev_left_touch: bool,
    threshold_px: f32,
}

impl TouchCounter {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            right_leg_touches: 0,
            left_leg_touches: 0,
            prev_right_touch: false,
            prev_left_touch: false,
            threshold_px,
        }
    }

    fn is_touching(&self, ball: Option<Point2D>, foot: Option<Point2D>) -> bool {
        match (ball, foot) {
            (Some(b), Some(f)) => b.distance(&f) < self.threshold_px,
            _ => false,
        }
    }

    pub fn detect_and_count(
        &mut self,
        ball_center: Option<Point2D>,
        right_foot: Option<Point2D>,
        left_foot: Option<Point2D>,
    ) -> TouchUpdate {
        let right_touch = self.is_touching(ball_center, right_foot);
        let left_touch = self.is_touching(ball_center, left_foot);

        let right_edge = right_touch && !self.prev_right_touch;
        let left_edge = left_touch && !self.prev_left_touch;

        if right_edge {
            self.right_leg_touches += 1;
            debug!("Right leg touch #{}", self.right_leg_touches);
        }
        if left_edge {
            self.left_leg_touches += 1;
            debug!("Left leg touch #{}", self.left_leg_touches);
        }

        self.prev_right_touch = right_touch;
        self.prev_left_touch = left_touch;

        TouchUpdate {
            new_touch: right_edge || left_edge,
            right_edge,
            left_edge,
            right_leg_touches: self.right_leg_touches,
            left_leg_touches: self.left_leg_touches,
        }
    }

    pub fn right_leg_touches(&self) -> u32 {
        self.right_leg_touches
    }

    pub fn left_leg_touches(&self) -> u32 {
        self.left_leg_touches
    }
}

impl Default for TouchCounter {
    fn default() -> Self {
        Self::new(50.0)
    }
}
