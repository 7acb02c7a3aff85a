use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pose::joints::Side;
use crate::shared::constants;

/// Settings read from `JointAngles.config` (`key = value` per line).
/// Command-line flags override whatever the file sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub write_video: bool,
    pub fourcc: String,
    pub side: Side,
    pub stop_key: char,
    pub fallback_fps: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            write_video: true,
            fourcc: constants::DEFAULT_FOURCC.to_string(),
            side: Side::default(),
            stop_key: constants::DEFAULT_STOP_KEY,
            fallback_fps: constants::DEFAULT_FALLBACK_FPS,
        }
    }
}

impl Settings {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            crate::utils::logger::debug(&format!("No config at {}, using defaults", path.display()));
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut settings = Self::default();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                bail!("expected 'key = value', got '{}'", trimmed);
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "output-dir" => settings.output_dir = PathBuf::from(value),
                "write-video" => settings.write_video = parse_bool(key, value)?,
                "fourcc" => settings.fourcc = parse_fourcc(value)?,
                "side" => settings.side = value.parse::<Side>().with_context(|| format!("bad value for {}", key))?,
                "stop-key" => settings.stop_key = parse_key(value)?,
                "fallback-fps" => {
                    let fps: f64 = value
                        .parse()
                        .with_context(|| format!("bad value for {}: '{}'", key, value))?;
                    if !(fps.is_finite() && fps > 0.0) {
                        bail!("fallback-fps must be positive, got {}", value);
                    }
                    settings.fallback_fps = fps;
                }
                other => crate::utils::logger::debug(&format!("Ignoring unknown config key '{}'", other)),
            }
        }

        Ok(settings)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("bad value for {}: '{}' (expected true or false)", key, value),
    }
}

pub fn parse_fourcc(value: &str) -> Result<String> {
    if value.chars().count() != 4 || !value.is_ascii() {
        bail!("fourcc must be exactly 4 ASCII characters, got '{}'", value);
    }
    Ok(value.to_string())
}

pub fn parse_key(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() => Ok(c),
        _ => bail!("stop-key must be a single character, got '{}'", value),
    }
}
