use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::Point3;
use crate::shared::constants::POSE_LANDMARK_COUNT;

/// One pose keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, visibility: 1.0 }
    }

    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn point(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

/// MediaPipe pose landmark indices (33 total)
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Skeleton edges drawn on annotated frames
pub const POSE_CONNECTIONS: &[(BodyLandmark, BodyLandmark)] = &[
    (BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder),
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftElbow),
    (BodyLandmark::LeftElbow, BodyLandmark::LeftWrist),
    (BodyLandmark::RightShoulder, BodyLandmark::RightElbow),
    (BodyLandmark::RightElbow, BodyLandmark::RightWrist),
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftHip),
    (BodyLandmark::RightShoulder, BodyLandmark::RightHip),
    (BodyLandmark::LeftHip, BodyLandmark::RightHip),
    (BodyLandmark::LeftHip, BodyLandmark::LeftKnee),
    (BodyLandmark::LeftKnee, BodyLandmark::LeftAnkle),
    (BodyLandmark::RightHip, BodyLandmark::RightKnee),
    (BodyLandmark::RightKnee, BodyLandmark::RightAnkle),
    (BodyLandmark::LeftAnkle, BodyLandmark::LeftHeel),
    (BodyLandmark::LeftHeel, BodyLandmark::LeftFootIndex),
    (BodyLandmark::RightAnkle, BodyLandmark::RightHeel),
    (BodyLandmark::RightHeel, BodyLandmark::RightFootIndex),
    (BodyLandmark::LeftEar, BodyLandmark::LeftEye),
    (BodyLandmark::RightEar, BodyLandmark::RightEye),
];

/// All body landmarks detected in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    /// Accepts at least the 33 body landmarks; extra trailing entries
    /// (e.g. auxiliary ROI points) are dropped.
    pub fn new(mut landmarks: Vec<Landmark>) -> Result<Self> {
        if landmarks.len() < POSE_LANDMARK_COUNT {
            bail!(
                "expected {} pose landmarks, got {}",
                POSE_LANDMARK_COUNT,
                landmarks.len()
            );
        }
        landmarks.truncate(POSE_LANDMARK_COUNT);
        Ok(Self { landmarks })
    }

    pub fn get(&self, which: BodyLandmark) -> &Landmark {
        &self.landmarks[which.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }
}
