//! Platform-specific capture implementations
//!
//! This module provides the touch-frame plumbing and, where the platform has
//! one, the hardware frame source.

pub mod touch;

#[cfg(target_os = "macos")]
pub mod macos;

use crate::engine::GestureResult;
use touch::FrameSource;

// Re-export touch channel
pub use touch::TrackpadChannel;

/// Frame source for the built-in trackpad.
///
/// The device itself is only acquired when the source is opened.
pub fn hardware_frame_source() -> GestureResult<Box<dyn FrameSource>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::multitouch::MultitouchSource::new()))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Err(crate::engine::GestureError::PlatformError(
            "Trackpad capture is only implemented for macOS".to_string(),
        ))
    }
}
