// src/video_processor.rs
//
// Input discovery and output paths for a batch run. Decoding and annotated
// writing need OpenCV and sit behind the "opencv" feature.

use crate::types::VideoConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const TRACE_EXTENSION: &str = "jsonl";

pub struct VideoProcessor {
    config: VideoConfig,
}

/// Where one input's outputs land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub results: PathBuf,
    pub events: PathBuf,
    pub annotated: PathBuf,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// Every `*.jsonl` trace under the input directory, sorted by path
    pub fn find_trace_files(&self) -> Result<Vec<PathBuf>> {
        let input_dir = Path::new(&self.config.input_dir);
        if !input_dir.is_dir() {
            anyhow::bail!("Input directory {} does not exist", input_dir.display());
        }

        let mut traces: Vec<PathBuf> = WalkDir::new(input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(TRACE_EXTENSION))
                    .unwrap_or(false)
            })
            .collect();
        traces.sort();

        info!("Found {} trace files", traces.len());
        Ok(traces)
    }

    /// Video that sits next to a trace with the same stem
    pub fn video_for_trace(&self, trace: &Path) -> PathBuf {
        trace.with_extension(&self.config.video_extension)
    }

    pub fn output_paths(&self, input: &Path) -> Result<OutputPaths> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("No usable file name in {}", input.display()))?;
        let dir = Path::new(&self.config.output_dir);

        Ok(OutputPaths {
            results: dir.join(format!("{}_results.jsonl", stem)),
            events: dir.join(format!("{}_events.jsonl", stem)),
            annotated: dir.join(format!("{}_annotated.mp4", stem)),
        })
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("Failed to create {}", self.config.output_dir))
    }
}

#[cfg(feature = "opencv")]
pub use decode::{DecodedFrame, VideoReader};

#[cfg(feature = "opencv")]
mod decode {
    use super::VideoProcessor;
    use crate::types::Frame;
    use anyhow::{Context, Result};
    use opencv::{
        core::{self, Mat},
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriter},
    };
    use std::path::Path;
    use tracing::info;

    pub struct VideoReader {
        cap: VideoCapture,
        pub fps: f64,
        pub total_frames: i32,
        pub current_frame: i32,
        pub width: i32,
        pub height: i32,
    }

    /// Decoded frame in both layouts: BGR for drawing, RGB for analysis
    pub struct DecodedFrame {
        pub bgr: Mat,
        pub frame: Frame,
    }

    fn path_str(path: &Path) -> Result<&str> {
        path.to_str()
            .with_context(|| format!("Non UTF-8 path {}", path.display()))
    }

    impl VideoProcessor {
        pub fn open_video(&self, path: &Path) -> Result<VideoReader> {
            info!("Opening video: {}", path.display());

            let cap = VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY)?;
            if !cap.is_opened()? {
                anyhow::bail!("Failed to open video file {}", path.display());
            }

            let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
            let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
            let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
            let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

            info!(
                "Video properties: {}x{} @ {:.1} FPS, {} frames",
                width, height, fps, total_frames
            );

            Ok(VideoReader {
                cap,
                fps,
                total_frames,
                current_frame: 0,
                width,
                height,
            })
        }

        pub fn create_writer(
            &self,
            output_path: &Path,
            width: i32,
            height: i32,
            fps: f64,
        ) -> Result<Option<VideoWriter>> {
            if !self.config.save_annotated {
                return Ok(None);
            }

            self.ensure_output_dir()?;
            info!("Output video: {}", output_path.display());

            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let writer = VideoWriter::new(
                path_str(output_path)?,
                fourcc,
                fps,
                core::Size::new(width, height),
                true,
            )?;

            Ok(Some(writer))
        }
    }

    impl VideoReader {
        pub fn read_frame(&mut self) -> Result<Option<DecodedFrame>> {
            let mut bgr = Mat::default();
            if !VideoCaptureTrait::read(&mut self.cap, &mut bgr)? || bgr.empty() {
                return Ok(None);
            }

            self.current_frame += 1;
            let timestamp_ms = if self.fps > 0.0 {
                (self.current_frame as f64 / self.fps) * 1000.0
            } else {
                0.0
            };

            let mut rgb = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
            let data = rgb.data_bytes()?.to_vec();

            let frame = Frame::new(data, bgr.cols() as usize, bgr.rows() as usize, timestamp_ms);
            Ok(Some(DecodedFrame { bgr, frame }))
        }

        pub fn progress(&self) -> f32 {
            if self.total_frames == 0 {
                return 0.0;
            }
            (self.current_frame as f32 / self.total_frames as f32) * 100.0
        }
    }
}
