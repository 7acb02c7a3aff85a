use std::time::{Duration, Instant};

/// Wall-clock stopwatch for per-stage timing in the debug log
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Returns the lap time and restarts the stopwatch
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.duration_since(self.start);
        self.start = now;
        lap
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames per second over `elapsed`, 0.0 for an empty interval
pub fn rate(frames: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        frames as f64 / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        assert_eq!(rate(60, Duration::from_secs(2)), 30.0);
        assert_eq!(rate(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_lap_restarts() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));
        let first = timer.lap();
        assert!(first >= Duration::from_millis(5));
        assert!(timer.elapsed() < first + Duration::from_secs(1));
    }
}
