//! BlazePose landmark model through ONNX Runtime.
//!
//! Runs `pose_landmark_full` on the whole frame (letterboxed to 256x256), so it
//! suits clips with one person filling most of the picture.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{Mat, Size, CV_8U},
    imgproc,
    prelude::*,
};
use ort::session::Session;
use std::path::Path;

use super::detector::PoseDetector;
use super::landmark::{Landmark, LandmarkSet};
use crate::decoder::FrameData;

pub const INPUT_SIZE: i32 = 256;
/// 33 body landmarks plus 6 auxiliary ROI points
const MODEL_LANDMARKS: usize = 39;
const VALUES_PER_LANDMARK: usize = 5;
const PRESENCE_THRESHOLD: f32 = 0.5;

const INPUT_NAME: &str = "input_1";
const LANDMARKS_OUTPUT: &str = "Identity";
const PRESENCE_OUTPUT: &str = "Identity_1";

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Placement of the scaled frame inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scaled_w: i32,
    pub scaled_h: i32,
    pub pad_x: i32,
    pub pad_y: i32,
}

impl Letterbox {
    pub fn fit(width: i32, height: i32) -> Self {
        let scale = INPUT_SIZE as f64 / width.max(height).max(1) as f64;
        let scaled_w = ((width as f64 * scale).round() as i32).clamp(1, INPUT_SIZE);
        let scaled_h = ((height as f64 * scale).round() as i32).clamp(1, INPUT_SIZE);
        Self {
            scaled_w,
            scaled_h,
            pad_x: (INPUT_SIZE - scaled_w) / 2,
            pad_y: (INPUT_SIZE - scaled_h) / 2,
        }
    }

    /// Model-input pixel coordinates → normalized frame coordinates
    pub fn unproject(&self, x: f32, y: f32, z: f32) -> (f64, f64, f64) {
        let nx = (x as f64 - self.pad_x as f64) / self.scaled_w as f64;
        let ny = (y as f64 - self.pad_y as f64) / self.scaled_h as f64;
        // z shares the x scale, as in the reference graph
        let nz = z as f64 / self.scaled_w as f64;
        (nx, ny, nz)
    }
}

pub struct OnnxPoseDetector {
    session: Session,
    model: String,
}

impl OnnxPoseDetector {
    pub fn from_file(path: &Path) -> Result<Self> {
        crate::utils::logger::info(&format!("Loading pose model: {}", path.display()));

        let session = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {}", e))?
            .commit_from_file(path)
            .map_err(|e| anyhow!("Failed to load model {}: {}", path.display(), e))?;

        Ok(Self {
            session,
            model: path.display().to_string(),
        })
    }

    /// BGR frame → NHWC RGB tensor in [0, 1], zero padded
    fn preprocess(image: &Mat) -> Result<(Vec<f32>, Letterbox)> {
        let image = to_bgr(image)?;
        let boxed = Letterbox::fit(image.cols(), image.rows());

        let mut resized = Mat::default();
        imgproc::resize(
            &image,
            &mut resized,
            Size::new(boxed.scaled_w, boxed.scaled_h),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;
        if !resized.is_continuous() {
            return Err(anyhow!("Resized frame is not continuous"));
        }
        let bgr = resized.data_bytes()?;

        let side = INPUT_SIZE as usize;
        let mut tensor = vec![0f32; side * side * 3];
        for row in 0..boxed.scaled_h as usize {
            for col in 0..boxed.scaled_w as usize {
                let src = (row * boxed.scaled_w as usize + col) * 3;
                let dst = ((row + boxed.pad_y as usize) * side + col + boxed.pad_x as usize) * 3;
                tensor[dst] = bgr[src + 2] as f32 / 255.0;
                tensor[dst + 1] = bgr[src + 1] as f32 / 255.0;
                tensor[dst + 2] = bgr[src] as f32 / 255.0;
            }
        }

        Ok((tensor, boxed))
    }
}

/// 8-bit gray or BGRA frames are converted; anything else is rejected
fn to_bgr(image: &Mat) -> Result<Mat> {
    if image.depth() != CV_8U {
        return Err(anyhow!("expected an 8-bit frame, got depth {}", image.depth()));
    }
    let code = match image.channels() {
        3 => return Ok(image.try_clone()?),
        1 => imgproc::COLOR_GRAY2BGR,
        4 => imgproc::COLOR_BGRA2BGR,
        n => return Err(anyhow!("unsupported frame with {} channels", n)),
    };
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(image, &mut bgr, code)?;
    Ok(bgr)
}

/// Decodes the raw landmark output; `None` when presence is below threshold.
pub fn decode_landmarks(raw: &[f32], presence_logit: f32, boxed: &Letterbox) -> Result<Option<LandmarkSet>> {
    if sigmoid(presence_logit) < PRESENCE_THRESHOLD {
        return Ok(None);
    }
    if raw.len() < MODEL_LANDMARKS * VALUES_PER_LANDMARK {
        return Err(anyhow!(
            "landmark output has {} values, expected {}",
            raw.len(),
            MODEL_LANDMARKS * VALUES_PER_LANDMARK
        ));
    }

    let landmarks = raw
        .chunks_exact(VALUES_PER_LANDMARK)
        .take(MODEL_LANDMARKS)
        .map(|v| {
            let (x, y, z) = boxed.unproject(v[0], v[1], v[2]);
            Landmark::new(x, y, z).with_visibility(sigmoid(v[3]) as f64)
        })
        .collect();

    LandmarkSet::new(landmarks).map(Some)
}

impl PoseDetector for OnnxPoseDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Option<LandmarkSet>> {
        if frame.image.empty() {
            return Ok(None);
        }
        let (data, boxed) = Self::preprocess(&frame.image)?;

        let shape: Vec<i64> = vec![1, INPUT_SIZE as i64, INPUT_SIZE as i64, 3];
        let input = ort::value::Tensor::from_array((shape, data))
            .map_err(|e| anyhow!("Failed to create input tensor: {}", e))?;

        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input])
            .map_err(|e| anyhow!("Inference failed on frame {}: {}", frame.index, e))?;

        let (_, raw) = outputs
            .get(LANDMARKS_OUTPUT)
            .ok_or_else(|| anyhow!("model has no '{}' output", LANDMARKS_OUTPUT))?
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Bad landmark output: {}", e))?;
        let (_, presence) = outputs
            .get(PRESENCE_OUTPUT)
            .ok_or_else(|| anyhow!("model has no '{}' output", PRESENCE_OUTPUT))?
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Bad presence output: {}", e))?;

        let presence_logit = *presence.first().context("empty presence output")?;
        decode_landmarks(raw, presence_logit, &boxed)
    }

    fn describe(&self) -> String {
        format!("onnx ({})", self.model)
    }
}
