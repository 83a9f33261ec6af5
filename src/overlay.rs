// src/overlay.rs
//
// On-screen summary of a FrameResult. The text lines are plain strings so
// any renderer can use them; the OpenCV drawing lives behind the "opencv"
// feature.

use crate::pipeline::FrameResult;

pub fn overlay_lines(result: &FrameResult) -> [String; 4] {
    [
        format!("Left Leg Touches: {}", result.left_leg_touches),
        format!("Right Leg Touches: {}", result.right_leg_touches),
        format!("Ball Direction: {}", result.rotation_text.as_str()),
        format!("Player Velocity: {:.1} px/s", result.velocity),
    ]
}

#[cfg(feature = "opencv")]
pub use draw::draw_frame_overlay;

#[cfg(feature = "opencv")]
mod draw {
    use super::overlay_lines;
    use crate::detection::{Detection, DetectionLabel};
    use crate::pipeline::FrameResult;
    use crate::pose::{PoseLandmarks, LEFT_LEG, RIGHT_LEG};
    use crate::types::DetectionConfig;
    use anyhow::Result;
    use opencv::{
        core::{self, Mat},
        imgproc,
        prelude::*,
    };

    // BGR
    const TEXT_COLORS: [(f64, f64, f64); 4] = [
        (0.0, 255.0, 255.0),
        (255.0, 0.0, 0.0),
        (0.0, 0.0, 255.0),
        (0.0, 128.0, 255.0),
    ];

    fn scalar(c: (f64, f64, f64)) -> core::Scalar {
        core::Scalar::new(c.0, c.1, c.2, 0.0)
    }

    /// Detection boxes, leg keypoints and the four summary lines
    pub fn draw_frame_overlay(
        output: &mut Mat,
        detections: &[Detection],
        landmarks: Option<&PoseLandmarks>,
        result: &FrameResult,
        config: &DetectionConfig,
        visibility_threshold: f32,
    ) -> Result<()> {
        for det in detections {
            let label = det.label(config);
            let color = match label {
                DetectionLabel::Player => scalar((0.0, 255.0, 0.0)),
                _ => scalar((0.0, 0.0, 255.0)),
            };
            let b = det.bbox;
            imgproc::rectangle(
                output,
                core::Rect::new(b.x1, b.y1, b.width(), b.height()),
                color,
                2,
                imgproc::LINE_8,
                0,
            )?;
            imgproc::put_text(
                output,
                label.as_str(),
                core::Point::new(b.x1, b.y1 - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.9,
                color,
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        if let Some(lms) = landmarks {
            let (w, h) = (output.cols() as usize, output.rows() as usize);
            let legs = [
                (&RIGHT_LEG, scalar((255.0, 0.0, 0.0))),
                (&LEFT_LEG, scalar((0.0, 255.0, 255.0))),
            ];
            for (leg, color) in legs {
                for &point in leg.iter() {
                    if let Some(p) = lms.visible_pixel(point, w, h, visibility_threshold) {
                        imgproc::circle(
                            output,
                            core::Point::new(p.x as i32, p.y as i32),
                            6,
                            color,
                            -1,
                            imgproc::LINE_8,
                            0,
                        )?;
                    }
                }
            }
        }

        for (i, (line, color)) in overlay_lines(result)
            .iter()
            .zip(TEXT_COLORS.iter())
            .enumerate()
        {
            imgproc::put_text(
                output,
                line,
                core::Point::new(20, 30 + 25 * i as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.6,
                scalar(*color),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        Ok(())
    }
}
