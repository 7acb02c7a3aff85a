use anyhow::{anyhow, Context, Result};
use opencv::{core::Size, prelude::*, videoio::VideoWriter};
use std::path::{Path, PathBuf};

use crate::core::session::FrameSink;
use crate::decoder::{FrameData, SourceInfo};
use crate::pose::joints::AngleRecord;
use crate::pose::landmark::LandmarkSet;
use crate::renderer::draw_overlay;

/// Writes every frame, with the pose overlay, to a video file at the
/// source's resolution and rate.
pub struct AnnotatedWriter {
    writer: VideoWriter,
    path: PathBuf,
    frames_written: u64,
    released: bool,
}

impl AnnotatedWriter {
    pub fn create(path: &Path, info: &SourceInfo, fourcc: &str, fallback_fps: f64) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Output path is not valid UTF-8: {}", path.display()))?;

        let mut code = fourcc.chars();
        let (Some(c1), Some(c2), Some(c3), Some(c4)) = (code.next(), code.next(), code.next(), code.next()) else {
            return Err(anyhow!("fourcc must be 4 characters, got '{}'", fourcc));
        };
        let fourcc_code = VideoWriter::fourcc(c1, c2, c3, c4)?;

        let fps = if info.fps > 0.0 { info.fps } else { fallback_fps };
        let size = Size::new(info.width as i32, info.height as i32);

        let writer = VideoWriter::new(path_str, fourcc_code, fps, size, true)
            .with_context(|| format!("Failed to create video writer: {}", path.display()))?;
        if !writer.is_opened()? {
            let err_msg = format!("Failed to open video writer ({}): {}", fourcc, path.display());
            crate::utils::logger::error(&err_msg);
            return Err(anyhow!(err_msg));
        }

        crate::utils::logger::info(&format!(
            "Annotated output: {} ({}x{} @ {:.2} fps, {})",
            path.display(),
            info.width,
            info.height,
            fps,
            fourcc
        ));

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            frames_written: 0,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for AnnotatedWriter {
    fn write_frame(
        &mut self,
        frame: &mut FrameData,
        landmarks: Option<&LandmarkSet>,
        record: Option<&AngleRecord>,
    ) -> Result<()> {
        let ts = frame.seconds();
        draw_overlay(&mut frame.image, ts, landmarks, record)?;
        self.writer
            .write(&frame.image)
            .with_context(|| format!("Failed to write frame {}", frame.index))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.writer.release()?;
            crate::utils::logger::info(&format!(
                "Released video writer after {} frames: {}",
                self.frames_written,
                self.path.display()
            ));
        }
        Ok(())
    }
}

impl Drop for AnnotatedWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            crate::utils::logger::error(&format!("Releasing video writer: {}", e));
        }
    }
}
