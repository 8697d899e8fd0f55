//! roster-hw — Frame acquisition.
//!
//! Provides V4L2 camera access and grayscale conversion behind the
//! [`FrameSource`] trait consumed by the capture loop.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::Frame;
