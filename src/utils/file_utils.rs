use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants;

/// Output file names for one session, sharing a start-time stamp
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub video: PathBuf,
}

impl OutputPaths {
    pub fn stamped(dir: &Path, at: DateTime<Local>) -> Self {
        let stamp = at.format(constants::OUTPUT_STAMP_FORMAT).to_string();
        Self {
            csv: dir.join(format!("{}_{}.csv", constants::CSV_PREFIX, stamp)),
            video: dir.join(format!(
                "{}_{}.{}",
                constants::VIDEO_PREFIX,
                stamp,
                constants::VIDEO_EXTENSION
            )),
        }
    }
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamped_names_share_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        let paths = OutputPaths::stamped(Path::new("out"), at);
        assert_eq!(paths.csv, PathBuf::from("out/angles_20260307_090501.csv"));
        assert_eq!(paths.video, PathBuf::from("out/annotated_20260307_090501.mp4"));
    }
}
