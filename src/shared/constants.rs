pub const APP_NAME: &str = "joint-angles";

pub const CONFIG_FILE: &str = "JointAngles.config";
pub const ERROR_LOG_FILE: &str = "joint-angles.error.log";
pub const DEBUG_LOG_FILE: &str = "joint-angles.debug.log";

pub const CSV_PREFIX: &str = "angles";
pub const VIDEO_PREFIX: &str = "annotated";
pub const VIDEO_EXTENSION: &str = "mp4";
pub const OUTPUT_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Decimal places for every CSV value (ts and angles).
pub const CSV_DECIMALS: usize = 2;

pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const DEFAULT_FOURCC: &str = "mp4v";
pub const DEFAULT_STOP_KEY: char = 'q';
pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;

/// Landmarks per body in the MediaPipe pose topology.
pub const POSE_LANDMARK_COUNT: usize = 33;
