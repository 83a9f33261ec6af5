// src/types.rs

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub touch: TouchConfig,
    pub velocity: VelocityConfig,
    pub spin: SpinConfig,
    pub detection: DetectionConfig,
    pub pose: PoseConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// Foot-to-ball distance (px) below which a foot counts as touching
    pub threshold_px: f32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self { threshold_px: 50.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Frame rate used when the trace does not carry one
    pub fps: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

/// Spin rule thresholds are raw pixel-flow units; they depend on capture
/// resolution and frame rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    pub backspin_mean_dy: f32,
    pub forward_spin_mean_dy: f32,
    pub min_std_dy: f32,
    /// Block matcher settings for the built-in flow provider
    pub block_size: usize,
    pub search_range: usize,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            backspin_mean_dy: -1.0,
            forward_spin_mean_dy: 1.0,
            min_std_dy: 0.5,
            block_size: 8,
            search_range: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// COCO "sports ball"
    pub ball_class_id: u32,
    /// COCO "person"
    pub player_class_id: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ball_class_id: 32,
            player_class_id: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub visibility_threshold: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub save_annotated: bool,
    /// Extension of the source video that sits next to each trace file
    pub video_extension: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
            save_annotated: false,
            video_extension: "mp4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Pixel rectangle `[x1, y1, x2, y2]`, serialized as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl From<[i32; 4]> for BoundingBox {
    fn from(b: [i32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_valid(&self) -> bool {
        self.x1 >= 0 && self.y1 >= 0 && self.x1 <= self.x2 && self.y1 <= self.y2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            bail!(
                "invalid bounding box [{}, {}, {}, {}]",
                self.x1,
                self.y1,
                self.x2,
                self.y2
            );
        }
        Ok(())
    }

    /// Integer midpoint (floor division, matching detector pixel grid).
    /// Summed in i64 so boxes near the i32 limit do not overflow.
    pub fn center(&self) -> Point2D {
        let mid = |a: i32, b: i32| (a as i64 + b as i64).div_euclid(2) as f32;
        Point2D::new(mid(self.x1, self.x2), mid(self.y1, self.y2))
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// Packed RGB frame, row-major, 3 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize, timestamp_ms: f64) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            data,
            width,
            height,
            timestamp_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Buffer holds exactly `width * height` RGB pixels
    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(3))
            .map_or(false, |n| n == self.data.len())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_consistent() {
            bail!(
                "frame buffer holds {} bytes, {}x{} RGB needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.width.saturating_mul(self.height).saturating_mul(3)
            );
        }
        Ok(())
    }

    /// Copy out the region covered by `bbox`, clipped to the frame.
    /// Returns None when nothing of the box lies inside the frame or the
    /// buffer does not match the frame size.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        if !self.is_consistent() {
            return None;
        }
        let x1 = (bbox.x1.max(0) as usize).min(self.width);
        let y1 = (bbox.y1.max(0) as usize).min(self.height);
        let x2 = (bbox.x2.max(0) as usize).min(self.width);
        let y2 = (bbox.y2.max(0) as usize).min(self.height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let w = x2 - x1;
        let h = y2 - y1;
        let mut data = Vec::with_capacity(w * h * 3);
        for y in y1..y2 {
            let start = (y * self.width + x1) * 3;
            data.extend_from_slice(&self.data[start..start + w * 3]);
        }

        Some(Frame::new(data, w, h, self.timestamp_ms))
    }
}

/// Grayscale image, row-major: pixel at (x, y) = data[y * width + x]
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert from RGB packed bytes (3 bytes per pixel)
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Self {
        let gray = rgb
            .chunks_exact(3)
            .map(|p| {
                // ITU-R BT.601 luma
                (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) as u8
            })
            .collect();
        Self::new(gray, width, height)
    }

    pub fn from_frame(frame: &Frame) -> Self {
        Self::from_rgb(&frame.data, frame.width, frame.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .map_or(false, |n| n == self.data.len())
    }

    pub fn same_shape(&self, other: &GrayFrame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: usize, height: usize) -> Frame {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let v = (y * width + x) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, width, height, 0.0)
    }

    #[test]
    fn test_bbox_center_floors() {
        let b = BoundingBox::new(10, 20, 15, 31);
        assert_eq!(b.center(), Point2D::new(12.0, 25.0));
    }

    #[test]
    fn test_bbox_center_near_i32_max() {
        let b = BoundingBox::new(i32::MAX - 2, 0, i32::MAX, 1);
        assert!(b.is_valid());
        assert_eq!(b.center(), Point2D::new((i32::MAX - 1) as f32, 0.0));
    }

    #[test]
    fn test_bbox_validation() {
        assert!(BoundingBox::new(0, 0, 0, 0).is_valid());
        assert!(BoundingBox::new(1, 2, 3, 4).validate().is_ok());
        assert!(BoundingBox::new(5, 0, 4, 10).validate().is_err());
        assert!(BoundingBox::new(-1, 0, 4, 10).validate().is_err());
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let b: BoundingBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(b, BoundingBox::new(1, 2, 3, 4));
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1,2,3,4]");
    }

    #[test]
    fn test_crop_copies_region() {
        let frame = gradient_frame(8, 4);
        let crop = frame.crop(&BoundingBox::new(2, 1, 5, 3)).unwrap();
        assert_eq!((crop.width, crop.height), (3, 2));
        assert_eq!(crop.data[0], 10); // (2, 1)
        assert_eq!(crop.data[3 * 3], 18); // (2, 2)
    }

    #[test]
    fn test_crop_clips_and_rejects_empty() {
        let frame = gradient_frame(8, 4);
        let clipped = frame.crop(&BoundingBox::new(6, 2, 20, 20)).unwrap();
        assert_eq!((clipped.width, clipped.height), (2, 2));

        assert!(frame.crop(&BoundingBox::new(3, 1, 3, 3)).is_none());
        assert!(frame.crop(&BoundingBox::new(10, 10, 12, 12)).is_none());
    }

    #[test]
    fn test_short_buffer_is_inconsistent() {
        let short = Frame {
            data: vec![0; 10],
            width: 64,
            height: 48,
            timestamp_ms: 0.0,
        };
        assert!(!short.is_consistent());
        assert!(short.validate().is_err());
        assert!(short.crop(&BoundingBox::new(10, 10, 30, 30)).is_none());
        assert!(gradient_frame(4, 4).validate().is_ok());

        let gray = GrayFrame {
            data: vec![0; 3],
            width: 2,
            height: 2,
        };
        assert!(!gray.is_consistent());
    }

    #[test]
    fn test_gray_conversion() {
        let gray = GrayFrame::from_rgb(&[255, 255, 255, 0, 0, 0], 2, 1);
        assert!(gray.data[0] >= 254);
        assert_eq!(gray.data[1], 0);
        assert!(gray.same_shape(&GrayFrame::new(vec![0, 0], 2, 1)));
    }
}
