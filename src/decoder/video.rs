use anyhow::{anyhow, Context, Result};
use opencv::{prelude::*, videoio};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::frame_data::FrameData;

/// Where frames come from: a file path or a numeric camera index
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    File(PathBuf),
    Camera(i32),
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow!("empty video source"));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            let index = s
                .parse::<i32>()
                .with_context(|| format!("camera index out of range: {}", s))?;
            return Ok(SourceSpec::Camera(index));
        }
        Ok(SourceSpec::File(PathBuf::from(s)))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::File(path) => write!(f, "{}", path.display()),
            SourceSpec::Camera(index) => write!(f, "camera {}", index),
        }
    }
}

/// Source properties as reported by the capture backend
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub source: String,
    pub backend: String,
    pub width: u32,
    pub height: u32,
    /// 0.0 when the backend does not report a rate (common for cameras)
    pub fps: f64,
    /// None for live sources
    pub frame_count: Option<u64>,
}

/// Anything that yields frames in stream order
pub trait FrameSource {
    /// `Ok(None)` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<FrameData>>;
}

/// Stream position for a frame.
///
/// Files report `CAP_PROP_POS_MSEC`; live cameras usually report 0 for
/// every frame, so later frames fall back to `index / fps`, then to the
/// wall clock.
pub fn resolve_timestamp(pos_msec: f64, index: u64, fps: f64, wall: Duration) -> Duration {
    if pos_msec.is_finite() && (pos_msec > 0.0 || index == 0) {
        return Duration::from_secs_f64(pos_msec.max(0.0) / 1000.0);
    }
    if fps.is_finite() && fps > 0.0 {
        return Duration::from_secs_f64(index as f64 / fps);
    }
    wall
}

pub struct VideoSource {
    capture: videoio::VideoCapture,
    info: SourceInfo,
    next_index: u64,
    started: Option<Instant>,
}

impl VideoSource {
    pub fn open(spec: &SourceSpec) -> Result<Self> {
        crate::utils::logger::info(&format!("Opening video source: {}", spec));

        let capture = match spec {
            SourceSpec::File(path) => {
                let path_str = path
                    .to_str()
                    .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {}", path.display()))?;
                videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
                    .with_context(|| format!("Failed to open video file: {}", spec))?
            }
            SourceSpec::Camera(index) => videoio::VideoCapture::new(*index, videoio::CAP_ANY)
                .with_context(|| format!("Failed to open {}", spec))?,
        };

        if !capture.is_opened()? {
            let err_msg = format!("Failed to open video source: {}", spec);
            crate::utils::logger::error(&err_msg);
            return Err(anyhow!(err_msg));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let frame_count = match spec {
            SourceSpec::File(_) => {
                let count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
                (count > 0.0).then_some(count as u64)
            }
            SourceSpec::Camera(_) => None,
        };
        let backend = capture.get_backend_name().unwrap_or_else(|_| "unknown".to_string());

        let info = SourceInfo {
            source: spec.to_string(),
            backend,
            width,
            height,
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 0.0 },
            frame_count,
        };

        crate::utils::logger::info(&format!(
            "Source opened: {}x{} @ {:.2} fps, backend {}, frames {:?}",
            info.width, info.height, info.fps, info.backend, info.frame_count
        ));

        Ok(Self {
            capture,
            info,
            next_index: 0,
            started: None,
        })
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<FrameData>> {
        let mut image = Mat::default();
        if !self.capture.read(&mut image)? || image.empty() {
            crate::utils::logger::debug(&format!("End of stream after {} frames", self.next_index));
            return Ok(None);
        }

        let started = *self.started.get_or_insert_with(Instant::now);
        let pos_msec = self.capture.get(videoio::CAP_PROP_POS_MSEC).unwrap_or(0.0);
        let timestamp = resolve_timestamp(pos_msec, self.next_index, self.info.fps, started.elapsed());

        let frame = FrameData::new(self.next_index, timestamp, image);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_spec_parsing() {
        assert_eq!("0".parse::<SourceSpec>().unwrap(), SourceSpec::Camera(0));
        assert_eq!(" 2 ".parse::<SourceSpec>().unwrap(), SourceSpec::Camera(2));
        assert_eq!(
            "clips/squat.mp4".parse::<SourceSpec>().unwrap(),
            SourceSpec::File(PathBuf::from("clips/squat.mp4"))
        );
        assert!("".parse::<SourceSpec>().is_err());
        assert!("99999999999".parse::<SourceSpec>().is_err());
    }

    #[test]
    fn test_timestamp_prefers_stream_position() {
        let ts = resolve_timestamp(1500.0, 45, 30.0, Duration::from_secs(9));
        assert_eq!(ts, Duration::from_millis(1500));
        assert_eq!(resolve_timestamp(0.0, 0, 30.0, Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_falls_back_to_rate_then_wall_clock() {
        assert_eq!(resolve_timestamp(0.0, 60, 30.0, Duration::from_secs(9)), Duration::from_secs(2));
        assert_eq!(resolve_timestamp(0.0, 60, 0.0, Duration::from_secs(9)), Duration::from_secs(9));
        assert_eq!(resolve_timestamp(f64::NAN, 3, f64::NAN, Duration::from_millis(120)), Duration::from_millis(120));
    }
}
