pub mod angle;

pub use angle::{joint_angle, Point3};
