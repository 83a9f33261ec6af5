// src/pipeline/metrics.rs
//
// Counters for one analysis run, summarized in the per-file log.

use crate::analysis::SpinLabel;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: u64,
    pub frames_with_ball: u64,
    pub frames_with_pose: u64,
    pub frames_with_player_pos: u64,
    pub touch_events: u64,
    pub velocity_samples: u64,
    pub backspin_frames: u64,
    pub forward_spin_frames: u64,
    pub no_spin_frames: u64,
    /// Events lost to a full event queue
    pub events_evicted: u64,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            frames_with_ball: 0,
            frames_with_pose: 0,
            frames_with_player_pos: 0,
            touch_events: 0,
            velocity_samples: 0,
            backspin_frames: 0,
            forward_spin_frames: 0,
            no_spin_frames: 0,
            events_evicted: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_spin(&mut self, label: SpinLabel) {
        match label {
            SpinLabel::Backspin => self.backspin_frames += 1,
            SpinLabel::ForwardSpin => self.forward_spin_frames += 1,
            SpinLabel::NoSpin => self.no_spin_frames += 1,
            SpinLabel::Unclassified => {}
        }
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            fps: self.fps(),
            frames_with_ball: self.frames_with_ball,
            frames_with_pose: self.frames_with_pose,
            frames_with_player_pos: self.frames_with_player_pos,
            touch_events: self.touch_events,
            velocity_samples: self.velocity_samples,
            backspin_frames: self.backspin_frames,
            forward_spin_frames: self.forward_spin_frames,
            no_spin_frames: self.no_spin_frames,
            events_evicted: self.events_evicted,
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_with_ball: u64,
    pub frames_with_pose: u64,
    pub frames_with_player_pos: u64,
    pub touch_events: u64,
    pub velocity_samples: u64,
    pub backspin_frames: u64,
    pub forward_spin_frames: u64,
    pub no_spin_frames: u64,
    pub events_evicted: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_tally() {
        let mut m = PipelineMetrics::new();
        m.record_spin(SpinLabel::Backspin);
        m.record_spin(SpinLabel::Backspin);
        m.record_spin(SpinLabel::Unclassified);
        m.record_spin(SpinLabel::NoSpin);
        let s = m.summary();
        assert_eq!(s.backspin_frames, 2);
        assert_eq!(s.no_spin_frames, 1);
        assert_eq!(s.forward_spin_frames, 0);
    }
}
