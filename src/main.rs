// src/main.rs

use anyhow::Result;
use ball_touch_analysis::analysis::FlowProvider;
use ball_touch_analysis::pipeline::{FrameAnalysisPipeline, FrameInput, FrameResult, MetricsSummary};
use ball_touch_analysis::pose::PoseLandmarks;
use ball_touch_analysis::trace::{JsonlWriter, TraceReader, TraceRecord};
use ball_touch_analysis::types::{Config, Frame};
use ball_touch_analysis::video_processor::{OutputPaths, VideoProcessor};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config_missing = !Path::new(&config_path).exists();
    let config = if config_missing {
        Config::default()
    } else {
        Config::load(&config_path)?
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ball_touch_analysis={}", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("⚽ Ball touch analysis starting");
    if config_missing {
        warn!("Config {} not found, using defaults", config_path);
    } else {
        info!("✓ Configuration loaded from {}", config_path);
    }

    #[cfg(not(feature = "opencv"))]
    info!("Built without the opencv feature: traces only, no pixels, spin labels stay blank");
    #[cfg(feature = "opencv")]
    info!("Spin from Farneback flow on decoded video next to each trace");

    let processor = VideoProcessor::new(config.video.clone());
    let traces = processor.find_trace_files()?;
    if traces.is_empty() {
        error!("No trace files found in {}", config.video.input_dir);
        return Ok(());
    }
    processor.ensure_output_dir()?;

    let mut failed = 0usize;
    for (idx, trace_path) in traces.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing trace {}/{}: {}",
            idx + 1,
            traces.len(),
            trace_path.display()
        );

        match process_trace(trace_path, &processor, &config) {
            Ok(stats) => log_stats(&stats),
            Err(e) => {
                failed += 1;
                error!("Failed to process {}: {:#}", trace_path.display(), e);
            }
        }
    }

    info!(
        "Done: {} processed, {} failed",
        traces.len() - failed,
        failed
    );
    Ok(())
}

struct ProcessingStats {
    summary: MetricsSummary,
    right_leg_touches: u32,
    left_leg_touches: u32,
    last_velocity: f32,
    results_written: usize,
    events_written: usize,
    duration_secs: f64,
}

fn log_stats(stats: &ProcessingStats) {
    let s = &stats.summary;
    info!("✓ Trace processed");
    info!("  Total frames: {}", s.total_frames);
    info!(
        "  Frames with ball: {} ({:.1}%)",
        s.frames_with_ball,
        100.0 * s.frames_with_ball as f64 / s.total_frames.max(1) as f64
    );
    info!(
        "  Frames with pose: {} ({:.1}%)",
        s.frames_with_pose,
        100.0 * s.frames_with_pose as f64 / s.total_frames.max(1) as f64
    );
    info!(
        "  Touches: right={} left={}",
        stats.right_leg_touches, stats.left_leg_touches
    );
    info!(
        "  Velocity samples: {} (last {:.1} px/s)",
        s.velocity_samples, stats.last_velocity
    );
    info!(
        "  Spin frames: backspin={} forward={} none={}",
        s.backspin_frames, s.forward_spin_frames, s.no_spin_frames
    );
    info!(
        "  Wrote {} results, {} events",
        stats.results_written, stats.events_written
    );
    if s.events_evicted > 0 {
        warn!("  Events evicted from a full queue: {}", s.events_evicted);
    }
    info!(
        "  Processing time: {:.2}s ({:.1} FPS)",
        stats.duration_secs, s.fps
    );
}

struct TraceOutputs {
    results: JsonlWriter<BufWriter<File>>,
    events: JsonlWriter<BufWriter<File>>,
}

impl TraceOutputs {
    fn create(paths: &OutputPaths) -> Result<Self> {
        info!("Results: {}", paths.results.display());
        Ok(Self {
            results: JsonlWriter::create(&paths.results)?,
            events: JsonlWriter::create(&paths.events)?,
        })
    }
}

/// Runs one trace record through the pipeline and writes its outputs.
fn analyze_record<F: FlowProvider>(
    pipeline: &mut FrameAnalysisPipeline<F>,
    record: &TraceRecord,
    pixels: Option<&Frame>,
    outputs: &mut TraceOutputs,
) -> Result<(FrameResult, Option<PoseLandmarks>)> {
    let landmarks = record.pose()?;
    let input = FrameInput {
        frame_idx: record.frame_idx,
        width: record.width,
        height: record.height,
        pixels,
        detections: &record.detections,
        landmarks: landmarks.as_ref(),
    };

    let result = pipeline.process_frame(&input)?;
    outputs.results.write(&result)?;
    for event in pipeline.drain_events() {
        outputs.events.write(&event)?;
    }

    Ok((result, landmarks))
}

fn finish<F: FlowProvider>(
    pipeline: &FrameAnalysisPipeline<F>,
    outputs: TraceOutputs,
    last: Option<FrameResult>,
    start: Instant,
) -> Result<ProcessingStats> {
    let results_written = outputs.results.written();
    let events_written = outputs.events.written();
    outputs.results.finish()?;
    outputs.events.finish()?;

    Ok(ProcessingStats {
        summary: pipeline.metrics().summary(),
        right_leg_touches: last.map(|r| r.right_leg_touches).unwrap_or(0),
        left_leg_touches: last.map(|r| r.left_leg_touches).unwrap_or(0),
        last_velocity: last.map(|r| r.velocity).unwrap_or(0.0),
        results_written,
        events_written,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(not(feature = "opencv"))]
fn process_trace(
    trace_path: &Path,
    processor: &VideoProcessor,
    config: &Config,
) -> Result<ProcessingStats> {
    let start = Instant::now();
    let paths = processor.output_paths(trace_path)?;
    let mut outputs = TraceOutputs::create(&paths)?;

    let video = processor.video_for_trace(trace_path);
    if video.exists() {
        warn!(
            "Found {} but built without the opencv feature; spin stays unclassified",
            video.display()
        );
    }

    let mut pipeline = FrameAnalysisPipeline::new(config, config.velocity.fps);
    let mut last = None;

    for record in TraceReader::open(trace_path)? {
        let record = record?;
        let (result, _) = analyze_record(&mut pipeline, &record, None, &mut outputs)?;
        last = Some(result);
    }

    finish(&pipeline, outputs, last, start)
}

#[cfg(feature = "opencv")]
fn process_trace(
    trace_path: &Path,
    processor: &VideoProcessor,
    config: &Config,
) -> Result<ProcessingStats> {
    use ball_touch_analysis::analysis::FarnebackFlow;
    use ball_touch_analysis::overlay::draw_frame_overlay;
    use opencv::prelude::*;

    let start = Instant::now();
    let paths = processor.output_paths(trace_path)?;
    let mut outputs = TraceOutputs::create(&paths)?;

    let video = processor.video_for_trace(trace_path);
    let mut reader = if video.exists() {
        Some(processor.open_video(&video)?)
    } else {
        warn!(
            "No video at {}; spin stays unclassified",
            video.display()
        );
        None
    };

    let fps = reader
        .as_ref()
        .map(|r| r.fps)
        .filter(|fps| *fps > 0.0)
        .unwrap_or(config.velocity.fps);
    let mut writer = match &reader {
        Some(r) => processor.create_writer(&paths.annotated, r.width, r.height, fps)?,
        None => None,
    };

    let mut pipeline = FrameAnalysisPipeline::with_flow(config, fps, FarnebackFlow::default());
    let mut last = None;

    for record in TraceReader::open(trace_path)? {
        let record = record?;

        // Trace frame indices are 1-based decode positions
        let mut decoded = None;
        if let Some(r) = reader.as_mut() {
            while (r.current_frame as u64) < record.frame_idx {
                match r.read_frame()? {
                    Some(frame) => decoded = Some(frame),
                    None => {
                        decoded = None;
                        break;
                    }
                }
            }
            if (r.current_frame as u64) != record.frame_idx {
                decoded = None;
            }
        }

        let pixels = decoded.as_ref().map(|d| &d.frame);
        let (result, landmarks) = analyze_record(&mut pipeline, &record, pixels, &mut outputs)?;

        if let (Some(w), Some(mut d)) = (writer.as_mut(), decoded) {
            draw_frame_overlay(
                &mut d.bgr,
                &record.detections,
                landmarks.as_ref(),
                &result,
                &config.detection,
                config.pose.visibility_threshold,
            )?;
            w.write(&d.bgr)?;
        }

        if let Some(r) = reader.as_ref() {
            if r.current_frame % 150 == 0 && r.current_frame > 0 {
                info!("  Progress: {:.1}%", r.progress());
            }
        }
        last = Some(result);
    }

    if let Some(mut w) = writer {
        w.release()?;
    }

    finish(&pipeline, outputs, last, start)
}
