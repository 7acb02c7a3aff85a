use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::landmark::{Landmark, LandmarkSet};
use crate::decoder::FrameData;

/// Per-frame landmark detection.
/// Implement this for each pose backend; `None` means nobody was found.
pub trait PoseDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Option<LandmarkSet>>;

    fn describe(&self) -> String;
}

#[derive(Deserialize)]
struct ReplayLine {
    frame: u64,
    landmarks: Option<Vec<Landmark>>,
}

/// Replays landmarks exported by an external pose tool, one JSON object per
/// frame: `{"frame": 12, "landmarks": [{"x":..,"y":..,"z":..,"visibility":..}, ...]}`
pub struct ReplayDetector {
    frames: HashMap<u64, LandmarkSet>,
    source: String,
}

impl ReplayDetector {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open landmark file: {}", path.display()))?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut frames = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", source))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: ReplayLine = serde_json::from_str(trimmed)
                .with_context(|| format!("{}:{}: invalid landmark record", source, line_no + 1))?;

            if let Some(points) = parsed.landmarks {
                let set = LandmarkSet::new(points)
                    .with_context(|| format!("{}:{}: frame {}", source, line_no + 1, parsed.frame))?;
                frames.insert(parsed.frame, set);
            }
        }

        crate::utils::logger::debug(&format!(
            "Replay detector loaded {} frames with landmarks from {}",
            frames.len(),
            source
        ));

        Ok(Self {
            frames,
            source: source.to_string(),
        })
    }
}

impl PoseDetector for ReplayDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Option<LandmarkSet>> {
        Ok(self.frames.get(&frame.index).cloned())
    }

    fn describe(&self) -> String {
        format!("replay ({} frames with landmarks from {})", self.frames.len(), self.source)
    }
}
