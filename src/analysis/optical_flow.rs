// src/analysis/optical_flow.rs
//
// Dense optical flow between two equally sized grayscale crops.
//
// `FlowProvider` is the seam to whatever dense-flow primitive is available.
// Two implementations ship with the crate:
//
//   BlockMatchFlow: SAD block matching, pure Rust, always available.
//     Every pixel in a block receives that block's
//     displacement, so the field is piecewise constant.
//   FarnebackFlow: OpenCV's polynomial-expansion flow (feature "opencv").

use crate::types::GrayFrame;
use anyhow::{bail, Result};

// ============================================================================
// FLOW FIELD
// ============================================================================

/// Per-pixel displacement, row-major, same dimensions as the input images
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    pub width: usize,
    pub height: usize,
    pub dx: Vec<f32>,
    pub dy: Vec<f32>,
}

impl FlowField {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dx: vec![0.0; width * height],
            dy: vec![0.0; width * height],
        }
    }

    /// Build from per-pixel `(dx, dy)` vectors
    pub fn from_vectors(width: usize, height: usize, vectors: &[(f32, f32)]) -> Result<Self> {
        if vectors.len() != width * height {
            bail!(
                "flow has {} vectors, expected {}x{}",
                vectors.len(),
                width,
                height
            );
        }
        Ok(Self {
            width,
            height,
            dx: vectors.iter().map(|v| v.0).collect(),
            dy: vectors.iter().map(|v| v.1).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.dx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }

    fn fill_block(&mut self, bx: usize, by: usize, size: usize, v: (f32, f32)) {
        for y in by..by + size {
            let row = y * self.width;
            for x in bx..bx + size {
                self.dx[row + x] = v.0;
                self.dy[row + x] = v.1;
            }
        }
    }

    pub fn stats(&self) -> FlowStats {
        let (mean_dx, std_dx) = mean_std(&self.dx);
        let (mean_dy, std_dy) = mean_std(&self.dy);
        FlowStats {
            mean_dx,
            std_dx,
            mean_dy,
            std_dy,
        }
    }
}

/// Summary statistics of a flow field (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowStats {
    pub mean_dx: f32,
    pub std_dx: f32,
    pub mean_dy: f32,
    pub std_dy: f32,
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}

// ============================================================================
// PROVIDER SEAM
// ============================================================================

pub trait FlowProvider {
    /// Dense flow from `prev` to `curr`. Both images have the same shape.
    fn compute(&mut self, prev: &GrayFrame, curr: &GrayFrame) -> Result<FlowField>;
}

impl<F: FlowProvider + ?Sized> FlowProvider for Box<F> {
    fn compute(&mut self, prev: &GrayFrame, curr: &GrayFrame) -> Result<FlowField> {
        (**self).compute(prev, curr)
    }
}

// ============================================================================
// BLOCK MATCHER
// ============================================================================

#[derive(Debug, Clone)]
pub struct BlockMatchConfig {
    /// Block size in pixels (square blocks), clamped to the image size
    pub block_size: usize,
    /// Maximum search displacement in pixels (±), both axes
    pub search_range: usize,
}

impl Default for BlockMatchConfig {
    fn default() -> Self {
        Self {
            block_size: 8,
            search_range: 4,
        }
    }
}

pub struct BlockMatchFlow {
    config: BlockMatchConfig,
}

impl BlockMatchFlow {
    pub fn new(config: BlockMatchConfig) -> Self {
        Self { config }
    }
}

impl Default for BlockMatchFlow {
    fn default() -> Self {
        Self::new(BlockMatchConfig::default())
    }
}

/// SAD between the `size`×`size` block at (rx, ry) in `prev` and (cx, cy) in `curr`
#[inline]
fn sad_block(
    prev: &GrayFrame,
    curr: &GrayFrame,
    rx: usize,
    ry: usize,
    cx: usize,
    cy: usize,
    size: usize,
) -> u32 {
    let mut sum: u32 = 0;
    for dy in 0..size {
        let r_row = (ry + dy) * prev.width + rx;
        let c_row = (cy + dy) * curr.width + cx;
        for dx in 0..size {
            let diff = prev.data[r_row + dx] as i32 - curr.data[c_row + dx] as i32;
            sum += diff.unsigned_abs();
        }
    }
    sum
}

/// Best displacement of the block at (bx, by). Ties keep the smaller
/// displacement, so flat regions report zero motion.
fn match_block(
    prev: &GrayFrame,
    curr: &GrayFrame,
    bx: usize,
    by: usize,
    size: usize,
    search_range: usize,
) -> (i32, i32) {
    let min_x = bx.saturating_sub(search_range);
    let max_x = (bx + search_range).min(curr.width - size);
    let min_y = by.saturating_sub(search_range);
    let max_y = (by + search_range).min(curr.height - size);

    let mut best_sad = sad_block(prev, curr, bx, by, bx, by, size);
    let mut best = (0i32, 0i32);

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            let d = (cx as i32 - bx as i32, cy as i32 - by as i32);
            let score = sad_block(prev, curr, bx, by, cx, cy, size);
            let closer = d.0.abs() + d.1.abs() < best.0.abs() + best.1.abs();
            if score < best_sad || (score == best_sad && closer) {
                best_sad = score;
                best = d;
            }
        }
    }

    best
}

/// Block origins covering `[0, len)`; the last block is pulled back to fit.
fn block_origins(len: usize, size: usize) -> Vec<usize> {
    let mut origins: Vec<usize> = (0..=len - size).step_by(size).collect();
    if origins.last().map_or(true, |&o| o + size < len) {
        origins.push(len - size);
    }
    origins
}

impl FlowProvider for BlockMatchFlow {
    fn compute(&mut self, prev: &GrayFrame, curr: &GrayFrame) -> Result<FlowField> {
        if !prev.same_shape(curr) {
            bail!(
                "flow inputs differ in shape: {}x{} vs {}x{}",
                prev.width,
                prev.height,
                curr.width,
                curr.height
            );
        }
        if curr.is_empty() {
            bail!("flow inputs are empty");
        }
        if !(prev.is_consistent() && curr.is_consistent()) {
            bail!("flow input buffers do not match {}x{}", curr.width, curr.height);
        }

        let size = self
            .config
            .block_size
            .min(curr.width)
            .min(curr.height)
            .max(1);
        let mut field = FlowField::zeros(curr.width, curr.height);

        for &by in &block_origins(curr.height, size) {
            for &bx in &block_origins(curr.width, size) {
                let (dx, dy) = match_block(prev, curr, bx, by, size, self.config.search_range);
                field.fill_block(bx, by, size, (dx as f32, dy as f32));
            }
        }

        Ok(field)
    }
}

// ============================================================================
// OPENCV FARNEBACK
// ============================================================================

#[cfg(feature = "opencv")]
pub use farneback::FarnebackFlow;

#[cfg(feature = "opencv")]
mod farneback {
    use super::{FlowField, FlowProvider};
    use crate::types::GrayFrame;
    use anyhow::Result;
    use opencv::{
        core::{self, Mat},
        prelude::*,
        video,
    };

    /// Parameters of `calcOpticalFlowFarneback`
    #[derive(Debug, Clone)]
    pub struct FarnebackFlow {
        pub pyr_scale: f64,
        pub levels: i32,
        pub winsize: i32,
        pub iterations: i32,
        pub poly_n: i32,
        pub poly_sigma: f64,
    }

    impl Default for FarnebackFlow {
        fn default() -> Self {
            Self {
                pyr_scale: 0.5,
                levels: 3,
                winsize: 15,
                iterations: 3,
                poly_n: 5,
                poly_sigma: 1.2,
            }
        }
    }

    fn to_mat(gray: &GrayFrame) -> Result<Mat> {
        if !gray.is_consistent() {
            anyhow::bail!("gray buffer does not match {}x{}", gray.width, gray.height);
        }
        // Borrowed view, cloned so the Mat owns its pixels
        let view = unsafe {
            Mat::new_rows_cols_with_data(
                gray.height as i32,
                gray.width as i32,
                core::CV_8UC1,
                gray.data.as_ptr() as *mut core::c_void,
                core::Mat_AUTO_STEP,
            )?
        };
        Ok(view.try_clone()?)
    }

    impl FlowProvider for FarnebackFlow {
        fn compute(&mut self, prev: &GrayFrame, curr: &GrayFrame) -> Result<FlowField> {
            let prev_mat = to_mat(prev)?;
            let curr_mat = to_mat(curr)?;
            let mut flow = Mat::default();

            video::calc_optical_flow_farneback(
                &prev_mat,
                &curr_mat,
                &mut flow,
                self.pyr_scale,
                self.levels,
                self.winsize,
                self.iterations,
                self.poly_n,
                self.poly_sigma,
                0,
            )?;

            // 2-channel Mat (horizontal, vertical)
            let mut field = FlowField::zeros(curr.width, curr.height);
            for y in 0..curr.height {
                for x in 0..curr.width {
                    let v = flow.at_2d::<core::Vec2f>(y as i32, x as i32)?;
                    let i = y * curr.width + x;
                    field.dx[i] = v[0];
                    field.dy[i] = v[1];
                }
            }
            Ok(field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Textured pattern shifted by (sx, sy): pixel (x, y) shows the
    /// pattern value at (x - sx, y - sy)
    fn textured(width: usize, height: usize, sx: i32, sy: i32) -> GrayFrame {
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let px = x as i32 - sx;
                let py = y as i32 - sy;
                let v = (px * 37 + py * 91 + (px * py) % 13).rem_euclid(251);
                data[y * width + x] = v as u8;
            }
        }
        GrayFrame::new(data, width, height)
    }

    #[test]
    fn test_stats_population_std() {
        let field =
            FlowField::from_vectors(2, 2, &[(1.0, -2.0), (3.0, -2.0), (1.0, 0.0), (3.0, 0.0)])
                .unwrap();
        let s = field.stats();
        assert!((s.mean_dx - 2.0).abs() < 1e-6);
        assert!((s.std_dx - 1.0).abs() < 1e-6);
        assert!((s.mean_dy + 1.0).abs() < 1e-6);
        assert!((s.std_dy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_vectors_checks_length() {
        assert!(FlowField::from_vectors(3, 3, &[(0.0, 0.0); 4]).is_err());
    }

    #[test]
    fn test_block_origins_cover_range() {
        assert_eq!(block_origins(16, 8), vec![0, 8]);
        assert_eq!(block_origins(20, 8), vec![0, 8, 12]);
        assert_eq!(block_origins(5, 5), vec![0]);
    }

    #[test]
    fn test_identical_frames_have_zero_flow() {
        let frame = textured(32, 32, 0, 0);
        let field = BlockMatchFlow::default().compute(&frame, &frame).unwrap();
        let s = field.stats();
        assert_eq!(s.mean_dx, 0.0);
        assert_eq!(s.mean_dy, 0.0);
    }

    #[test]
    fn test_recovers_vertical_shift() {
        let prev = textured(40, 40, 0, 0);
        let curr = textured(40, 40, 0, 2);
        let field = BlockMatchFlow::default().compute(&prev, &curr).unwrap();

        // Interior blocks see the true shift
        let i = 16 * 40 + 16;
        assert_eq!(field.dy[i], 2.0);
        assert_eq!(field.dx[i], 0.0);
        // Bottom row blocks cannot reach their match inside the image
        assert!(field.stats().mean_dy > 0.5);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let a = textured(16, 16, 0, 0);
        let b = textured(16, 12, 0, 0);
        assert!(BlockMatchFlow::default().compute(&a, &b).is_err());
    }

    #[test]
    fn test_short_buffer_is_error() {
        let a = textured(16, 16, 0, 0);
        let mut b = a.clone();
        b.data.truncate(100);
        assert!(BlockMatchFlow::default().compute(&a, &b).is_err());
    }

    #[test]
    fn test_tiny_crop_clamps_block() {
        let prev = textured(3, 5, 0, 0);
        let field = BlockMatchFlow::default().compute(&prev, &prev).unwrap();
        assert_eq!(field.len(), 15);
    }
}
