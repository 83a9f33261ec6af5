// src/analysis/velocity_tracker.rs
//
// Player speed sampled between consecutive touches, held between samples.

use crate::types::Point2D;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum VelocityState {
    /// No touch with a known player position yet
    Idle,
    /// Baseline from the most recent touch with a known position
    Primed {
        prev_player_pos: Point2D,
        prev_touch_frame_idx: u64,
    },
}

/// Outcome of one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySample {
    /// Current (possibly held) velocity in px/s
    pub velocity: f32,
    /// A new sample was taken this frame
    pub sampled: bool,
}

pub struct VelocityCalculator {
    state: VelocityState,
    last_velocity: f32,
    fps: f64,
}

impl VelocityCalculator {
    pub fn new(fps: f64) -> Self {
        Self {
            state: VelocityState::Idle,
            last_velocity: 0.0,
            fps,
        }
    }

    pub fn update(&mut self, player_pos: Option<Point2D>, frame_idx: u64, new_touch: bool) -> f32 {
        self.update_sample(player_pos, frame_idx, new_touch).velocity
    }

    pub fn update_sample(
        &mut self,
        player_pos: Option<Point2D>,
        frame_idx: u64,
        new_touch: bool,
    ) -> VelocitySample {
        let pos = match (new_touch, player_pos) {
            (true, Some(pos)) => pos,
            _ => {
                return VelocitySample {
                    velocity: self.last_velocity,
                    sampled: false,
                }
            }
        };

        let mut sampled = false;
        if let VelocityState::Primed {
            prev_player_pos,
            prev_touch_frame_idx,
        } = self.state
        {
            let time_elapsed = self.time_elapsed(prev_touch_frame_idx, frame_idx);
            if time_elapsed > 0.0 {
                let dist = pos.distance(&prev_player_pos);
                self.last_velocity = (dist as f64 / time_elapsed) as f32;
                sampled = true;
                debug!(
                    "Velocity sample at frame {}: {:.1}px over {:.2}s = {:.1} px/s",
                    frame_idx, dist, time_elapsed, self.last_velocity
                );
            } else {
                warn!(
                    "Frame index {} does not advance past {}, velocity held",
                    frame_idx, prev_touch_frame_idx
                );
            }
        }

        self.state = VelocityState::Primed {
            prev_player_pos: pos,
            prev_touch_frame_idx: frame_idx,
        };

        VelocitySample {
            velocity: self.last_velocity,
            sampled,
        }
    }

    fn time_elapsed(&self, from_frame: u64, to_frame: u64) -> f64 {
        if self.fps > 0.0 {
            (to_frame as f64 - from_frame as f64) / self.fps
        } else {
            1.0
        }
    }

    pub fn last_velocity(&self) -> f32 {
        self.last_velocity
    }

    pub fn is_primed(&self) -> bool {
        matches!(self.state, VelocityState::Primed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Option<Point2D> {
        Some(Point2D::new(x, y))
    }

    #[test]
    fn test_one_second_between_touches() {
        let mut calc = VelocityCalculator::new(30.0);
        assert_eq!(calc.update(p(0.0, 0.0), 30, true), 0.0);
        assert!(calc.is_primed());
        let v = calc.update(p(100.0, 0.0), 60, true);
        assert!((v - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_holds_between_touches() {
        let mut calc = VelocityCalculator::new(30.0);
        calc.update(p(0.0, 0.0), 30, true);
        calc.update(p(100.0, 0.0), 60, true);
        for frame in 61..90 {
            let s = calc.update_sample(p(500.0, 500.0), frame, false);
            assert!(!s.sampled);
            assert!((s.velocity - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_zero_before_two_touches() {
        let mut calc = VelocityCalculator::new(30.0);
        assert_eq!(calc.update(p(0.0, 0.0), 1, false), 0.0);
        assert_eq!(calc.update(None, 2, true), 0.0);
        assert!(!calc.is_primed());
        assert_eq!(calc.update(p(10.0, 0.0), 3, true), 0.0);
        assert_eq!(calc.last_velocity(), 0.0);
    }

    #[test]
    fn test_touch_without_position_keeps_baseline() {
        let mut calc = VelocityCalculator::new(10.0);
        calc.update(p(0.0, 0.0), 10, true);
        calc.update(None, 15, true);
        let v = calc.update(p(30.0, 40.0), 20, true);
        // 50px over 1s, measured from the frame-10 baseline
        assert!((v - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_positive_fps_falls_back_to_one_second() {
        let mut calc = VelocityCalculator::new(0.0);
        calc.update(p(0.0, 0.0), 1, true);
        let v = calc.update(p(3.0, 4.0), 500, true);
        assert!((v - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_stalled_frame_index_holds_and_rebases() {
        let mut calc = VelocityCalculator::new(30.0);
        calc.update(p(0.0, 0.0), 30, true);
        let s = calc.update_sample(p(10.0, 0.0), 30, true);
        assert!(!s.sampled);
        assert_eq!(s.velocity, 0.0);
        let v = calc.update(p(40.0, 0.0), 60, true);
        assert!((v - 30.0).abs() < 1e-3);
    }
}
