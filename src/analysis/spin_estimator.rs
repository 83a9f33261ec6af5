// src/analysis/spin_estimator.rs
//
// Coarse ball-spin label from vertical optical flow between the previous
// and current ball crops. Rotation about the horizontal axis moves the
// ball's surface texture up (backspin) or down (forward spin) while the
// spread of the vertical flow separates rotation from plain translation.

use super::optical_flow::{FlowProvider, FlowStats};
use crate::types::{Frame, GrayFrame, SpinConfig};
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinLabel {
    /// Classification did not run this frame
    #[default]
    Unclassified,
    NoSpin,
    Backspin,
    ForwardSpin,
}

impl SpinLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpinLabel::Unclassified => "",
            SpinLabel::NoSpin => "No Spin",
            SpinLabel::Backspin => "Backspin",
            SpinLabel::ForwardSpin => "Forward Spin",
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, SpinLabel::Unclassified)
    }
}

impl Serialize for SpinLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fixed-threshold rule on vertical flow statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinRule {
    pub backspin_mean_dy: f32,
    pub forward_spin_mean_dy: f32,
    pub min_std_dy: f32,
}

impl Default for SpinRule {
    fn default() -> Self {
        Self::from(&SpinConfig::default())
    }
}

impl From<&SpinConfig> for SpinRule {
    fn from(cfg: &SpinConfig) -> Self {
        Self {
            backspin_mean_dy: cfg.backspin_mean_dy,
            forward_spin_mean_dy: cfg.forward_spin_mean_dy,
            min_std_dy: cfg.min_std_dy,
        }
    }
}

impl SpinRule {
    /// Horizontal statistics are not consulted.
    pub fn classify(&self, stats: &FlowStats) -> SpinLabel {
        let spread = stats.std_dy > self.min_std_dy;
        if stats.mean_dy < self.backspin_mean_dy && spread {
            SpinLabel::Backspin
        } else if stats.mean_dy > self.forward_spin_mean_dy && spread {
            SpinLabel::ForwardSpin
        } else {
            SpinLabel::NoSpin
        }
    }
}

pub struct SpinEstimator<F: FlowProvider> {
    flow: F,
    rule: SpinRule,
    prev_ball_crop: Option<GrayFrame>,
    last_stats: Option<FlowStats>,
}

impl<F: FlowProvider> SpinEstimator<F> {
    pub fn new(flow: F, rule: SpinRule) -> Self {
        Self {
            flow,
            rule,
            prev_ball_crop: None,
            last_stats: None,
        }
    }

    /// Classify spin between the stored crop and `curr_ball_crop`, then
    /// make `curr_ball_crop` the stored crop (or clear it when absent/empty).
    pub fn estimate(&mut self, curr_ball_crop: Option<&Frame>) -> SpinLabel {
        let curr = curr_ball_crop
            .filter(|c| !c.is_empty() && c.is_consistent())
            .map(GrayFrame::from_frame);
        self.estimate_gray(curr)
    }

    pub fn estimate_gray(&mut self, curr: Option<GrayFrame>) -> SpinLabel {
        let curr = curr.filter(|c| !c.is_empty() && c.is_consistent());
        self.last_stats = None;

        let label = match (&self.prev_ball_crop, &curr) {
            (Some(prev), Some(curr)) if prev.same_shape(curr) => {
                match self.flow.compute(prev, curr) {
                    Ok(field) => {
                        let stats = field.stats();
                        let label = self.rule.classify(&stats);
                        debug!(
                            "Spin flow: mean_dy={:.2} std_dy={:.2} mean_dx={:.2} std_dx={:.2} -> {:?}",
                            stats.mean_dy, stats.std_dy, stats.mean_dx, stats.std_dx, label
                        );
                        self.last_stats = Some(stats);
                        label
                    }
                    Err(e) => {
                        warn!("Optical flow calculation failed: {}", e);
                        SpinLabel::Unclassified
                    }
                }
            }
            _ => SpinLabel::Unclassified,
        };

        self.prev_ball_crop = curr;
        label
    }

    /// Flow statistics from the most recent classification, if it ran
    pub fn last_stats(&self) -> Option<FlowStats> {
        self.last_stats
    }

    pub fn has_previous_crop(&self) -> bool {
        self.prev_ball_crop.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::optical_flow::FlowField;
    use anyhow::{bail, Result};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Returns a fixed field whose dy values average `mean` with population
    /// std `std` (half the pixels at mean-std, half at mean+std)
    struct SyntheticFlow {
        mean: f32,
        std: f32,
        calls: Rc<Cell<usize>>,
    }

    impl SyntheticFlow {
        fn new(mean: f32, std: f32) -> Self {
            Self {
                mean,
                std,
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl FlowProvider for SyntheticFlow {
        fn compute(&mut self, _prev: &GrayFrame, curr: &GrayFrame) -> Result<FlowField> {
            self.calls.set(self.calls.get() + 1);
            let n = curr.width * curr.height;
            let vectors: Vec<(f32, f32)> = (0..n)
                .map(|i| {
                    let dy = if i % 2 == 0 {
                        self.mean - self.std
                    } else {
                        self.mean + self.std
                    };
                    (0.0, dy)
                })
                .collect();
            FlowField::from_vectors(curr.width, curr.height, &vectors)
        }
    }

    struct FailingFlow;

    impl FlowProvider for FailingFlow {
        fn compute(&mut self, _prev: &GrayFrame, _curr: &GrayFrame) -> Result<FlowField> {
            bail!("flow backend unavailable")
        }
    }

    fn crop(width: usize, height: usize) -> GrayFrame {
        GrayFrame::new(vec![128; width * height], width, height)
    }

    fn stats(mean_dy: f32, std_dy: f32) -> FlowStats {
        FlowStats {
            mean_dy,
            std_dy,
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_boundaries() {
        let rule = SpinRule::default();
        assert_eq!(rule.classify(&stats(-1.01, 0.51)), SpinLabel::Backspin);
        assert_eq!(rule.classify(&stats(-1.0, 0.51)), SpinLabel::NoSpin);
        assert_eq!(rule.classify(&stats(-1.01, 0.5)), SpinLabel::NoSpin);
        assert_eq!(rule.classify(&stats(1.01, 0.51)), SpinLabel::ForwardSpin);
        assert_eq!(rule.classify(&stats(1.0, 0.51)), SpinLabel::NoSpin);
        assert_eq!(rule.classify(&stats(1.01, 0.5)), SpinLabel::NoSpin);
        assert_eq!(rule.classify(&stats(0.0, 3.0)), SpinLabel::NoSpin);
    }

    #[test]
    fn test_rule_ignores_horizontal_flow() {
        let rule = SpinRule::default();
        let s = FlowStats {
            mean_dx: 10.0,
            std_dx: 10.0,
            mean_dy: 0.0,
            std_dy: 0.0,
        };
        assert_eq!(rule.classify(&s), SpinLabel::NoSpin);
    }

    #[test]
    fn test_configured_thresholds() {
        let rule = SpinRule {
            backspin_mean_dy: -0.25,
            forward_spin_mean_dy: 0.25,
            min_std_dy: 0.1,
        };
        assert_eq!(rule.classify(&stats(-0.5, 0.2)), SpinLabel::Backspin);
        assert_eq!(rule.classify(&stats(0.5, 0.2)), SpinLabel::ForwardSpin);
    }

    #[test]
    fn test_first_call_is_unclassified() {
        let mut est = SpinEstimator::new(SyntheticFlow::new(-2.0, 1.0), SpinRule::default());
        assert_eq!(est.estimate_gray(Some(crop(10, 10))), SpinLabel::Unclassified);
        assert!(est.has_previous_crop());
        assert_eq!(est.estimate_gray(Some(crop(10, 10))), SpinLabel::Backspin);
    }

    #[test]
    fn test_synthetic_fields_classify() {
        let cases = [
            (-1.5, 1.0, SpinLabel::Backspin),
            (1.5, 1.0, SpinLabel::ForwardSpin),
            (-1.5, 0.25, SpinLabel::NoSpin),
            (0.5, 1.0, SpinLabel::NoSpin),
        ];
        for (mean, std, expected) in cases {
            let mut est = SpinEstimator::new(SyntheticFlow::new(mean, std), SpinRule::default());
            est.estimate_gray(Some(crop(6, 6)));
            assert_eq!(est.estimate_gray(Some(crop(6, 6))), expected, "mean={mean} std={std}");
            let s = est.last_stats().unwrap();
            assert!((s.mean_dy - mean).abs() < 1e-5);
            assert!((s.std_dy - std).abs() < 1e-5);
        }
    }

    #[test]
    fn test_shape_change_skips_but_updates_history() {
        let flow = SyntheticFlow::new(2.0, 1.0);
        let calls = flow.calls.clone();
        let mut est = SpinEstimator::new(flow, SpinRule::default());

        est.estimate_gray(Some(crop(10, 10)));
        assert_eq!(est.estimate_gray(Some(crop(12, 10))), SpinLabel::Unclassified);
        assert_eq!(calls.get(), 0);
        assert!(est.last_stats().is_none());

        // History now holds the 12x10 crop
        assert_eq!(est.estimate_gray(Some(crop(12, 10))), SpinLabel::ForwardSpin);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_missing_crop_clears_history() {
        let mut est = SpinEstimator::new(SyntheticFlow::new(2.0, 1.0), SpinRule::default());
        est.estimate_gray(Some(crop(8, 8)));
        assert_eq!(est.estimate_gray(None), SpinLabel::Unclassified);
        assert!(!est.has_previous_crop());
        assert_eq!(est.estimate_gray(Some(crop(8, 8))), SpinLabel::Unclassified);
    }

    #[test]
    fn test_empty_crop_treated_as_absent() {
        let mut est = SpinEstimator::new(SyntheticFlow::new(2.0, 1.0), SpinRule::default());
        est.estimate_gray(Some(crop(8, 8)));
        assert_eq!(est.estimate_gray(Some(crop(0, 8))), SpinLabel::Unclassified);
        assert!(!est.has_previous_crop());

        let empty = Frame::new(Vec::new(), 0, 0, 0.0);
        assert_eq!(est.estimate(Some(&empty)), SpinLabel::Unclassified);
        assert!(!est.has_previous_crop());
    }

    #[test]
    fn test_short_buffers_treated_as_absent() {
        let flow = SyntheticFlow::new(2.0, 1.0);
        let calls = flow.calls.clone();
        let mut est = SpinEstimator::new(flow, SpinRule::default());

        let short_rgb = Frame {
            data: vec![0; 10],
            width: 8,
            height: 8,
            timestamp_ms: 0.0,
        };
        est.estimate_gray(Some(crop(8, 8)));
        assert_eq!(est.estimate(Some(&short_rgb)), SpinLabel::Unclassified);
        assert!(!est.has_previous_crop());

        est.estimate_gray(Some(crop(8, 8)));
        let short_gray = GrayFrame {
            data: vec![0; 5],
            width: 8,
            height: 8,
        };
        assert_eq!(est.estimate_gray(Some(short_gray)), SpinLabel::Unclassified);
        assert!(!est.has_previous_crop());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_rgb_crops_go_through_gray() {
        let mut est = SpinEstimator::new(SyntheticFlow::new(-3.0, 2.0), SpinRule::default());
        let rgb = Frame::new(vec![90; 5 * 4 * 3], 5, 4, 0.0);
        assert_eq!(est.estimate(Some(&rgb)), SpinLabel::Unclassified);
        assert_eq!(est.estimate(Some(&rgb)), SpinLabel::Backspin);
    }

    #[test]
    fn test_flow_failure_is_unclassified_and_keeps_crop() {
        let mut est = SpinEstimator::new(FailingFlow, SpinRule::default());
        est.estimate_gray(Some(crop(8, 8)));
        assert_eq!(est.estimate_gray(Some(crop(8, 8))), SpinLabel::Unclassified);
        assert!(est.has_previous_crop());
    }

    #[test]
    fn test_label_text() {
        assert_eq!(SpinLabel::Unclassified.as_str(), "");
        assert_eq!(SpinLabel::ForwardSpin.as_str(), "Forward Spin");
        assert_eq!(
            serde_json::to_string(&SpinLabel::NoSpin).unwrap(),
            "\"No Spin\""
        );
    }
}
