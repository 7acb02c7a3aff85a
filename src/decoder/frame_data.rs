use opencv::core::Mat;
use std::time::Duration;

/// One decoded frame (BGR) and its position in the stream
pub struct FrameData {
    pub index: u64,
    pub timestamp: Duration,
    pub image: Mat,
}

impl FrameData {
    pub fn new(index: u64, timestamp: Duration, image: Mat) -> Self {
        Self { index, timestamp, image }
    }

    /// Frame without pixels, for sources that only carry timing
    #[cfg(test)]
    pub fn blank(index: u64, timestamp: Duration) -> Self {
        Self::new(index, timestamp, Mat::default())
    }

    pub fn seconds(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }
}
