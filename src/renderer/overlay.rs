use anyhow::Result;
use opencv::{
    core::{Point, Scalar},
    imgproc,
    prelude::*,
};

use crate::pose::joints::{AngleRecord, JOINTS};
use crate::pose::landmark::{Landmark, LandmarkSet, POSE_CONNECTIONS};

/// Landmarks less visible than this are left off the skeleton
pub const MIN_DRAW_VISIBILITY: f64 = 0.5;

const BONE_COLOR: (f64, f64, f64) = (255.0, 255.0, 255.0);
const JOINT_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const TEXT_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const MISS_COLOR: (f64, f64, f64) = (0.0, 165.0, 255.0);

fn bgr(c: (f64, f64, f64)) -> Scalar {
    Scalar::new(c.0, c.1, c.2, 0.0)
}

/// Normalized landmark → pixel position, clamped to the frame
pub fn to_pixel(lm: &Landmark, width: i32, height: i32) -> Point {
    let x = (lm.x * width as f64).round().clamp(0.0, (width - 1).max(0) as f64);
    let y = (lm.y * height as f64).round().clamp(0.0, (height - 1).max(0) as f64);
    Point::new(x as i32, y as i32)
}

pub fn angle_label(name: &str, degrees: f64) -> String {
    format!("{}: {:.0} deg", name, degrees)
}

fn put_text(image: &mut Mat, text: &str, origin: Point, scale: f64, color: Scalar) -> Result<()> {
    imgproc::put_text(
        image,
        text,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        2,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(())
}

/// Draws the skeleton, per-joint angle labels and a timestamp HUD in place.
pub fn draw_overlay(
    image: &mut Mat,
    ts: f64,
    landmarks: Option<&LandmarkSet>,
    record: Option<&AngleRecord>,
) -> Result<()> {
    if image.empty() {
        return Ok(());
    }
    let (w, h) = (image.cols(), image.rows());

    if let Some(set) = landmarks {
        for (a, b) in POSE_CONNECTIONS {
            let (la, lb) = (set.get(*a), set.get(*b));
            if la.visibility < MIN_DRAW_VISIBILITY || lb.visibility < MIN_DRAW_VISIBILITY {
                continue;
            }
            imgproc::line(image, to_pixel(la, w, h), to_pixel(lb, w, h), bgr(BONE_COLOR), 2, imgproc::LINE_AA, 0)?;
        }
        for lm in set.iter().filter(|lm| lm.visibility >= MIN_DRAW_VISIBILITY) {
            imgproc::circle(image, to_pixel(lm, w, h), 4, bgr(JOINT_COLOR), -1, imgproc::LINE_8, 0)?;
        }
    }

    if let (Some(set), Some(record)) = (landmarks, record) {
        for (joint, degrees) in JOINTS.iter().zip(&record.angles) {
            let vertex = set.get(joint.vertex.landmark(record.right_side));
            let at = to_pixel(vertex, w, h);
            put_text(image, &format!("{:.0}", degrees), Point::new(at.x + 8, at.y - 8), 0.5, bgr(TEXT_COLOR))?;
        }
    }

    let mut y = 24;
    put_text(image, &format!("t = {:.2}s", ts), Point::new(10, y), 0.6, bgr(TEXT_COLOR))?;
    match record {
        Some(record) => {
            for (joint, degrees) in JOINTS.iter().zip(&record.angles) {
                y += 22;
                put_text(image, &angle_label(joint.name, *degrees), Point::new(10, y), 0.6, bgr(TEXT_COLOR))?;
            }
        }
        None => {
            put_text(image, "no pose", Point::new(10, y + 22), 0.6, bgr(MISS_COLOR))?;
        }
    }

    Ok(())
}
