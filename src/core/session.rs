use anyhow::Result;

use super::interrupt::StopSignal;
use crate::decoder::{FrameData, FrameSource};
use crate::pose::detector::PoseDetector;
use crate::pose::joints::{self, AngleRecord, Side};
use crate::pose::landmark::LandmarkSet;
use crate::utils::logger;
use crate::utils::time_utils::{rate, Timer};

/// Receives every frame after detection (the annotated-video writer).
pub trait FrameSink {
    fn write_frame(
        &mut self,
        frame: &mut FrameData,
        landmarks: Option<&LandmarkSet>,
        record: Option<&AngleRecord>,
    ) -> Result<()>;

    /// Flush and release; called once after the loop, however it ended
    fn finish(&mut self) -> Result<()>;
}

/// Everything one run produced, in frame order
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutput {
    pub joints: Vec<&'static str>,
    pub records: Vec<AngleRecord>,
    pub frames_read: u64,
    pub frames_skipped: u64,
    pub stopped_early: bool,
}

impl SessionOutput {
    fn new() -> Self {
        Self {
            joints: joints::joint_names(),
            records: Vec::new(),
            frames_read: 0,
            frames_skipped: 0,
            stopped_early: false,
        }
    }
}

/// Reads `source` to the end (or until `stop` fires), measuring joint angles
/// on every frame where `detector` finds a body. Frames without landmarks are
/// skipped without error.
pub fn run_session(
    source: &mut dyn FrameSource,
    detector: &mut dyn PoseDetector,
    mut sink: Option<&mut dyn FrameSink>,
    stop: &StopSignal,
    side: Side,
) -> Result<SessionOutput> {
    let mut output = SessionOutput::new();
    let wall = Timer::new();
    let mut stage = Timer::new();

    logger::info(&format!("Session started with detector: {}", detector.describe()));

    let result = (|| -> Result<()> {
        loop {
            if stop.should_stop()? {
                output.stopped_early = true;
                logger::info(&format!("Stopped after {} frames", output.frames_read));
                break;
            }

            let Some(mut frame) = source.next_frame()? else {
                break;
            };
            output.frames_read += 1;

            stage.lap();
            let landmarks = detector.detect(&frame)?;
            let inference = stage.lap();

            let record = match &landmarks {
                Some(set) => {
                    let record = joints::measure(frame.index, frame.seconds(), set, side);
                    logger::debug(&format!(
                        "frame {} t={:.3}s angles={:?} ({}us)",
                        record.frame_index,
                        record.ts,
                        record.angles,
                        inference.as_micros()
                    ));
                    Some(record)
                }
                None => {
                    output.frames_skipped += 1;
                    logger::debug(&format!("frame {} t={:.3}s: no landmarks, skipped", frame.index, frame.seconds()));
                    None
                }
            };

            if let Some(sink) = sink.as_deref_mut() {
                sink.write_frame(&mut frame, landmarks.as_ref(), record.as_ref())?;
            }

            if let Some(record) = record {
                output.records.push(record);
            }
        }
        Ok(())
    })();

    if let Some(sink) = sink.as_deref_mut() {
        let finished = sink.finish();
        // a loop error wins over a release error
        result?;
        finished?;
    } else {
        result?;
    }

    logger::info(&format!(
        "Session finished{}: {} frames read, {} with landmarks, {} skipped, {:.1} fps over {} ms",
        if output.stopped_early { " (stopped early)" } else { "" },
        output.frames_read,
        output.records.len(),
        output.frames_skipped,
        rate(output.frames_read, wall.elapsed()),
        wall.elapsed_ms()
    ));

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::table::write_csv;
    use crate::pose::joints::tests::standing_pose;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Blank frames at a fixed rate
    struct ScriptedSource {
        total: u64,
        next: u64,
        fps: f64,
    }

    impl ScriptedSource {
        fn new(total: u64, fps: f64) -> Self {
            Self { total, next: 0, fps }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<FrameData>> {
            if self.next >= self.total {
                return Ok(None);
            }
            let frame = FrameData::blank(self.next, Duration::from_secs_f64(self.next as f64 / self.fps));
            self.next += 1;
            Ok(Some(frame))
        }
    }

    /// Hands out pre-baked results in order
    struct ScriptedDetector {
        results: VecDeque<Option<LandmarkSet>>,
    }

    impl PoseDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &FrameData) -> Result<Option<LandmarkSet>> {
            Ok(self.results.pop_front().flatten())
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[derive(Default)]
    struct CountingSink {
        frames: Vec<(u64, bool)>,
        finished: u32,
    }

    impl FrameSink for CountingSink {
        fn write_frame(
            &mut self,
            frame: &mut FrameData,
            landmarks: Option<&LandmarkSet>,
            record: Option<&AngleRecord>,
        ) -> Result<()> {
            assert_eq!(landmarks.is_some(), record.is_some());
            self.frames.push((frame.index, record.is_some()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished += 1;
            Ok(())
        }
    }

    struct FailingDetector;

    impl PoseDetector for FailingDetector {
        fn detect(&mut self, _frame: &FrameData) -> Result<Option<LandmarkSet>> {
            anyhow::bail!("model exploded")
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn detector(results: Vec<Option<LandmarkSet>>) -> ScriptedDetector {
        ScriptedDetector { results: results.into() }
    }

    #[test]
    fn test_straight_missing_bent_sequence() {
        let mut source = ScriptedSource::new(3, 10.0);
        let mut det = detector(vec![Some(standing_pose(false)), None, Some(standing_pose(true))]);
        let mut sink = CountingSink::default();
        let stop = StopSignal::manual();

        let output = run_session(&mut source, &mut det, Some(&mut sink), &stop, Side::Left).unwrap();

        assert_eq!(output.frames_read, 3);
        assert_eq!(output.frames_skipped, 1);
        assert_eq!(output.records.len(), 2);
        assert!(!output.stopped_early);

        let first = &output.records[0];
        let third = &output.records[1];
        assert_eq!(first.frame_index, 0);
        assert_eq!(third.frame_index, 2);
        assert!((first.angle("Knee").unwrap() - 180.0).abs() < 0.5);
        assert!((third.angle("Knee").unwrap() - 90.0).abs() < 0.01);
        assert!((third.ts - 0.2).abs() < 1e-9);

        assert_eq!(sink.frames, vec![(0, true), (1, false), (2, true)]);
        assert_eq!(sink.finished, 1);

        let mut buf = Vec::new();
        write_csv(&mut buf, &output).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ts,Knee,Hip,Elbow,Torso-Fwd");
        assert!(lines[1].starts_with("0.00,179."));
        assert!(lines[2].starts_with("0.20,90.00,"));
    }

    #[test]
    fn test_no_landmarks_is_not_an_error() {
        let mut source = ScriptedSource::new(4, 30.0);
        let mut det = detector(vec![]);
        let output = run_session(&mut source, &mut det, None, &StopSignal::manual(), Side::Auto).unwrap();

        assert_eq!(output.frames_read, 4);
        assert_eq!(output.frames_skipped, 4);
        assert!(output.records.is_empty());
    }

    #[test]
    fn test_records_never_exceed_frames() {
        let mut source = ScriptedSource::new(2, 30.0);
        let mut det = detector(vec![Some(standing_pose(false)); 5]);
        let output = run_session(&mut source, &mut det, None, &StopSignal::manual(), Side::Right).unwrap();

        assert_eq!(output.records.len(), 2);
        assert!(output.records.len() as u64 <= output.frames_read);
        assert!(output.records.iter().all(|r| r.angles.iter().all(|a| (0.0..=180.0).contains(a))));
    }

    #[test]
    fn test_stop_signal_ends_loop() {
        let mut source = ScriptedSource::new(100, 30.0);
        let mut det = detector(vec![Some(standing_pose(false)); 100]);
        let stop = StopSignal::manual();
        stop.raise();

        let output = run_session(&mut source, &mut det, None, &stop, Side::Left).unwrap();
        assert!(output.stopped_early);
        assert_eq!(output.frames_read, 0);
    }

    /// Raises the stop signal once frame `after` has been written
    struct StoppingSink<'a> {
        stop: &'a StopSignal,
        after: u64,
        inner: CountingSink,
    }

    impl FrameSink for StoppingSink<'_> {
        fn write_frame(
            &mut self,
            frame: &mut FrameData,
            landmarks: Option<&LandmarkSet>,
            record: Option<&AngleRecord>,
        ) -> Result<()> {
            self.inner.write_frame(frame, landmarks, record)?;
            if frame.index == self.after {
                self.stop.raise();
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.inner.finish()
        }
    }

    #[test]
    fn test_stop_mid_stream_keeps_earlier_records() {
        let mut source = ScriptedSource::new(100, 30.0);
        let mut det = detector(vec![Some(standing_pose(false)); 100]);
        let stop = StopSignal::manual();
        let mut sink = StoppingSink { stop: &stop, after: 1, inner: CountingSink::default() };

        let output = run_session(&mut source, &mut det, Some(&mut sink), &stop, Side::Left).unwrap();

        assert!(output.stopped_early);
        assert_eq!(output.frames_read, 2);
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records.iter().map(|r| r.frame_index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(sink.inner.frames, vec![(0, true), (1, true)]);
        assert_eq!(sink.inner.finished, 1);
        assert_eq!(source.next, 2);
    }

    #[test]
    fn test_sink_released_on_detector_error() {
        let mut source = ScriptedSource::new(3, 30.0);
        let mut sink = CountingSink::default();
        let err = run_session(&mut source, &mut FailingDetector, Some(&mut sink), &StopSignal::manual(), Side::Left)
            .unwrap_err();

        assert!(err.to_string().contains("model exploded"));
        assert_eq!(sink.finished, 1);
        assert!(sink.frames.is_empty());
    }
}
