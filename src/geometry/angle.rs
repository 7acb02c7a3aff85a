use serde::{Deserialize, Serialize};

/// Added to the magnitude product so near-zero segments never divide by zero.
pub const DENOMINATOR_EPSILON: f64 = 1e-6;

/// 3-D point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// Angle at vertex `b` between the segments b→a and b→c, in degrees.
///
/// Always returns a finite value in [0, 180].
pub fn joint_angle(a: Point3, b: Point3, c: Point3) -> f64 {
    let ba = a.sub(b);
    let bc = c.sub(b);

    let mut cosine = ba.dot(bc) / (ba.norm() * bc.norm() + DENOMINATOR_EPSILON);
    if cosine.is_nan() {
        cosine = 1.0;
    }

    cosine.clamp(-1.0, 1.0).acos().to_degrees()
}
