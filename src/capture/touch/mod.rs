//! Trackpad touch capture
//!
//! Frame types delivered by touch-surface drivers, the `FrameSource` seam, a
//! trace replayer, and the `TrackpadChannel` that feeds frames into the tap
//! classifier.

pub mod channel;
pub mod replay;
pub mod source;
pub mod types;

pub use channel::TrackpadChannel;
pub use replay::{ReplaySource, TraceClock};
pub use source::{FrameSink, FrameSource, SourceClock, WallClock};
pub use types::{FingerRecord, FingerState, TouchFrame};
