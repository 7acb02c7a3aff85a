use anyhow::{bail, Result};
use std::str::FromStr;

use super::landmark::{BodyLandmark, LandmarkSet};
use crate::geometry::joint_angle;

/// Side-agnostic body part, resolved to a landmark through a [`Side`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Ear,
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Side {
    #[default]
    Left,
    Right,
    /// Pick the side with the higher mean visibility, per frame
    Auto,
}

impl FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "auto" => Ok(Side::Auto),
            other => bail!("unknown side '{}' (expected left, right or auto)", other),
        }
    }
}

impl BodyPart {
    pub fn landmark(self, right: bool) -> BodyLandmark {
        use BodyLandmark::*;
        match (self, right) {
            (BodyPart::Ear, false) => LeftEar,
            (BodyPart::Ear, true) => RightEar,
            (BodyPart::Shoulder, false) => LeftShoulder,
            (BodyPart::Shoulder, true) => RightShoulder,
            (BodyPart::Elbow, false) => LeftElbow,
            (BodyPart::Elbow, true) => RightElbow,
            (BodyPart::Wrist, false) => LeftWrist,
            (BodyPart::Wrist, true) => RightWrist,
            (BodyPart::Hip, false) => LeftHip,
            (BodyPart::Hip, true) => RightHip,
            (BodyPart::Knee, false) => LeftKnee,
            (BodyPart::Knee, true) => RightKnee,
            (BodyPart::Ankle, false) => LeftAnkle,
            (BodyPart::Ankle, true) => RightAnkle,
        }
    }
}

/// A named angle measured at `vertex` between `from` and `to`
#[derive(Debug, Clone, Copy)]
pub struct JointSpec {
    pub name: &'static str,
    pub from: BodyPart,
    pub vertex: BodyPart,
    pub to: BodyPart,
}

impl JointSpec {
    pub fn parts(&self) -> [BodyPart; 3] {
        [self.from, self.vertex, self.to]
    }
}

/// Measured joints, in CSV column order
pub const JOINTS: &[JointSpec] = &[
    JointSpec { name: "Knee", from: BodyPart::Hip, vertex: BodyPart::Knee, to: BodyPart::Ankle },
    JointSpec { name: "Hip", from: BodyPart::Shoulder, vertex: BodyPart::Hip, to: BodyPart::Knee },
    JointSpec { name: "Elbow", from: BodyPart::Shoulder, vertex: BodyPart::Elbow, to: BodyPart::Wrist },
    JointSpec { name: "Torso-Fwd", from: BodyPart::Hip, vertex: BodyPart::Shoulder, to: BodyPart::Ear },
];

pub fn joint_names() -> Vec<&'static str> {
    JOINTS.iter().map(|j| j.name).collect()
}

/// Angles for one frame with detected landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct AngleRecord {
    pub frame_index: u64,
    /// Seconds from stream start
    pub ts: f64,
    /// Degrees, indexed like [`JOINTS`]
    pub angles: Vec<f64>,
    pub right_side: bool,
}

impl AngleRecord {
    #[cfg(test)]
    pub fn angle(&self, name: &str) -> Option<f64> {
        JOINTS
            .iter()
            .position(|j| j.name == name)
            .and_then(|i| self.angles.get(i).copied())
    }
}

/// Resolves `Side::Auto` by mean visibility over every part the table uses.
pub fn resolve_side(side: Side, landmarks: &LandmarkSet) -> bool {
    match side {
        Side::Left => false,
        Side::Right => true,
        Side::Auto => {
            let mean_visibility = |right: bool| {
                let mut total = 0.0;
                let mut count = 0usize;
                for part in JOINTS.iter().flat_map(|j| j.parts()) {
                    total += landmarks.get(part.landmark(right)).visibility;
                    count += 1;
                }
                total / count.max(1) as f64
            };
            mean_visibility(true) > mean_visibility(false)
        }
    }
}

pub fn measure(frame_index: u64, ts: f64, landmarks: &LandmarkSet, side: Side) -> AngleRecord {
    let right = resolve_side(side, landmarks);
    let point = |part: BodyPart| landmarks.get(part.landmark(right)).point();

    let angles = JOINTS
        .iter()
        .map(|j| joint_angle(point(j.from), point(j.vertex), point(j.to)))
        .collect();

    AngleRecord { frame_index, ts, angles, right_side: right }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pose::landmark::Landmark;
    use crate::shared::constants::POSE_LANDMARK_COUNT;

    /// Upright figure facing the camera; `knee_bent` folds the lower leg
    /// forward by 90 degrees on both sides.
    pub(crate) fn standing_pose(knee_bent: bool) -> LandmarkSet {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); POSE_LANDMARK_COUNT];
        let mut put = |lm: BodyLandmark, x: f64, y: f64| points[lm.index()] = Landmark::new(x, y, 0.0);

        for (dx, right) in [(-0.05, false), (0.05, true)] {
            let x = 0.5 + dx;
            let pick = |l: BodyLandmark, r: BodyLandmark| if right { r } else { l };
            put(pick(BodyLandmark::LeftEar, BodyLandmark::RightEar), x, 0.05);
            put(pick(BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder), x, 0.25);
            put(pick(BodyLandmark::LeftElbow, BodyLandmark::RightElbow), x + dx, 0.35);
            put(pick(BodyLandmark::LeftWrist, BodyLandmark::RightWrist), x + dx, 0.50);
            put(pick(BodyLandmark::LeftHip, BodyLandmark::RightHip), x, 0.50);
            put(pick(BodyLandmark::LeftKnee, BodyLandmark::RightKnee), x, 0.70);
            if knee_bent {
                put(pick(BodyLandmark::LeftAnkle, BodyLandmark::RightAnkle), x + 0.20, 0.70);
            } else {
                put(pick(BodyLandmark::LeftAnkle, BodyLandmark::RightAnkle), x, 0.90);
            }
        }

        LandmarkSet::new(points).unwrap()
    }

    #[test]
    fn test_table_names_in_column_order() {
        assert_eq!(joint_names(), vec!["Knee", "Hip", "Elbow", "Torso-Fwd"]);
    }

    #[test]
    fn test_straight_and_bent_knee() {
        let straight = measure(0, 0.0, &standing_pose(false), Side::Left);
        let bent = measure(1, 0.1, &standing_pose(true), Side::Left);

        // the 1e-6 denominator term costs a fraction of a degree at these scales
        assert!((straight.angle("Knee").unwrap() - 180.0).abs() < 0.5);
        assert!((bent.angle("Knee").unwrap() - 90.0).abs() < 0.01);
        assert!((straight.angle("Hip").unwrap() - 180.0).abs() < 0.5);
        assert!((straight.angle("Torso-Fwd").unwrap() - 180.0).abs() < 0.5);
        assert!(straight.angle("Wrist").is_none());
    }

    #[test]
    fn test_all_angles_in_range() {
        let record = measure(0, 0.0, &standing_pose(true), Side::Right);
        assert_eq!(record.angles.len(), JOINTS.len());
        assert!(record.angles.iter().all(|a| (0.0..=180.0).contains(a)));
        assert!(record.right_side);
    }

    #[test]
    fn test_auto_side_prefers_visible_side() {
        let pose = standing_pose(false);
        let mut points: Vec<Landmark> = pose.iter().copied().collect();
        for part in [BodyPart::Ear, BodyPart::Shoulder, BodyPart::Elbow, BodyPart::Wrist, BodyPart::Hip, BodyPart::Knee, BodyPart::Ankle] {
            let idx = part.landmark(false).index();
            points[idx] = points[idx].with_visibility(0.2);
        }
        let occluded_left = LandmarkSet::new(points).unwrap();

        assert!(resolve_side(Side::Auto, &occluded_left));
        assert!(!resolve_side(Side::Auto, &pose));
        assert!(!resolve_side(Side::Left, &occluded_left));
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("Right".parse::<Side>().unwrap(), Side::Right);
        assert_eq!(" auto ".parse::<Side>().unwrap(), Side::Auto);
        assert!("both".parse::<Side>().is_err());
    }
}
