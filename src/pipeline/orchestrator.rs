// src/pipeline/orchestrator.rs
//
// FrameAnalysisPipeline: single entry point, call process_frame() once per
// frame in order. Each frame runs every component exactly once:
//
//   1. ball center/bbox from detections
//   2. ball crop from pixels → SpinEstimator
//   3. feet + hip midpoint from landmarks
//   4. TouchCounter
//   5. VelocityCalculator
//
// Absent inputs are passed through as absent; no component is skipped
// because another one had nothing to work with. Inputs that break the
// frame contract are rejected before any component state changes.

use super::event_bus::{EventBus, PipelineEvent};
use super::frame_context::{FrameInput, FrameObservation, FrameResult};
use super::metrics::PipelineMetrics;
use crate::analysis::{
    BlockMatchConfig, BlockMatchFlow, FlowProvider, SpinEstimator, SpinRule, TouchCounter,
    VelocityCalculator,
};
use crate::detection::find_ball;
use crate::pose::PoseObservation;
use crate::types::{Config, DetectionConfig, PoseConfig};
use anyhow::{bail, Context, Result};
use tracing::{debug, info};

const MAX_PENDING_EVENTS: usize = 256;

pub struct FrameAnalysisPipeline<F: FlowProvider = BlockMatchFlow> {
    touch_counter: TouchCounter,
    velocity: VelocityCalculator,
    spin: SpinEstimator<F>,
    detection: DetectionConfig,
    pose: PoseConfig,
    event_bus: EventBus,
    metrics: PipelineMetrics,
    last_frame_idx: Option<u64>,
    last_observation: Option<FrameObservation>,
}

impl FrameAnalysisPipeline<BlockMatchFlow> {
    /// Pipeline with the built-in block-matching flow
    pub fn new(config: &Config, fps: f64) -> Self {
        let flow = BlockMatchFlow::new(BlockMatchConfig {
            block_size: config.spin.block_size,
            search_range: config.spin.search_range,
        });
        Self::with_flow(config, fps, flow)
    }
}

impl<F: FlowProvider> FrameAnalysisPipeline<F> {
    pub fn with_flow(config: &Config, fps: f64, flow: F) -> Self {
        info!(
            "Frame pipeline: touch threshold={:.1}px, fps={:.2}, spin mean_dy=({:.2}, {:.2}) std_dy>{:.2}",
            config.touch.threshold_px,
            fps,
            config.spin.backspin_mean_dy,
            config.spin.forward_spin_mean_dy,
            config.spin.min_std_dy
        );

        Self {
            touch_counter: TouchCounter::new(config.touch.threshold_px),
            velocity: VelocityCalculator::new(fps),
            spin: SpinEstimator::new(flow, SpinRule::from(&config.spin)),
            detection: config.detection.clone(),
            pose: config.pose.clone(),
            event_bus: EventBus::with_capacity(MAX_PENDING_EVENTS),
            metrics: PipelineMetrics::new(),
            last_frame_idx: None,
            last_observation: None,
        }
    }

    fn validate(&self, input: &FrameInput) -> Result<()> {
        if input.frame_idx == 0 {
            bail!("frame index must start at 1");
        }
        if let Some(last) = self.last_frame_idx {
            if input.frame_idx <= last {
                bail!(
                    "frame index {} does not advance past {}",
                    input.frame_idx,
                    last
                );
            }
        }
        if input.width == 0 || input.height == 0 {
            bail!("frame {} has zero size", input.frame_idx);
        }
        if let Some(px) = input.pixels {
            if px.width != input.width || px.height != input.height {
                bail!(
                    "frame {} pixels are {}x{}, expected {}x{}",
                    input.frame_idx,
                    px.width,
                    px.height,
                    input.width,
                    input.height
                );
            }
            px.validate()
                .with_context(|| format!("frame {}", input.frame_idx))?;
        }
        Ok(())
    }

    /// Geometric extraction only; touches no component state.
    pub fn observe(&self, input: &FrameInput) -> Result<FrameObservation> {
        let ball = find_ball(input.detections, self.detection.ball_class_id)
            .with_context(|| format!("frame {}", input.frame_idx))?;
        let pose = PoseObservation::extract(
            input.landmarks,
            input.width,
            input.height,
            self.pose.visibility_threshold,
        );

        Ok(FrameObservation {
            frame_idx: input.frame_idx,
            ball,
            pose,
        })
    }

    /// Process one frame through every component.
    pub fn process_frame(&mut self, input: &FrameInput) -> Result<FrameResult> {
        self.validate(input)?;
        let obs = self.observe(input)?;
        self.last_frame_idx = Some(input.frame_idx);

        // ── SPIN ────────────────────────────────────────────────
        let crop = match (input.pixels, obs.ball_bbox()) {
            (Some(px), Some(bbox)) => px.crop(&bbox),
            _ => None,
        };
        let rotation = self.spin.estimate(crop.as_ref());

        // ── TOUCHES ─────────────────────────────────────────────
        let touch = self.touch_counter.detect_and_count(
            obs.ball_center(),
            obs.pose.right_foot,
            obs.pose.left_foot,
        );

        // ── VELOCITY ────────────────────────────────────────────
        let sample =
            self.velocity
                .update_sample(obs.pose.player_pos, input.frame_idx, touch.new_touch);

        // ── EVENTS + METRICS ────────────────────────────────────
        for (leg, count) in touch.edges() {
            self.event_bus.publish(PipelineEvent::Touch {
                frame_idx: input.frame_idx,
                leg,
                count,
            });
            self.metrics.touch_events += 1;
        }
        if sample.sampled {
            self.event_bus.publish(PipelineEvent::VelocitySampled {
                frame_idx: input.frame_idx,
                velocity: sample.velocity,
            });
            self.metrics.velocity_samples += 1;
        }
        if rotation.is_classified() {
            self.event_bus.publish(PipelineEvent::SpinClassified {
                frame_idx: input.frame_idx,
                label: rotation,
            });
        }

        self.metrics.events_evicted = self.event_bus.evicted();
        self.metrics.total_frames += 1;
        if obs.ball.is_some() {
            self.metrics.frames_with_ball += 1;
        }
        if input.landmarks.is_some() {
            self.metrics.frames_with_pose += 1;
        }
        if obs.pose.player_pos.is_some() {
            self.metrics.frames_with_player_pos += 1;
        }
        self.metrics.record_spin(rotation);

        if touch.new_touch {
            debug!(
                "Frame {}: touches R={} L={}, velocity={:.1} px/s",
                input.frame_idx, touch.right_leg_touches, touch.left_leg_touches, sample.velocity
            );
        }

        self.last_observation = Some(obs);

        Ok(FrameResult {
            frame_idx: input.frame_idx,
            right_leg_touches: touch.right_leg_touches,
            left_leg_touches: touch.left_leg_touches,
            rotation_text: rotation,
            velocity: sample.velocity,
            new_touch: touch.new_touch,
        })
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.event_bus.drain().collect()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Geometry of the most recently processed frame
    pub fn last_observation(&self) -> Option<&FrameObservation> {
        self.last_observation.as_ref()
    }

    pub fn last_frame_idx(&self) -> Option<u64> {
        self.last_frame_idx
    }
}
