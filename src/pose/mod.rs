pub mod detector;
pub mod joints;
pub mod landmark;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use detector::{PoseDetector, ReplayDetector};
