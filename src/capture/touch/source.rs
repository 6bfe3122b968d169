use crate::capture::touch::types::TouchFrame;
use crate::engine::GestureResult;
use std::sync::Arc;
use std::time::Instant;

/// Callback receiving frames, possibly on a driver-owned thread
pub type FrameSink = Arc<dyn Fn(TouchFrame) + Send + Sync>;

/// Time base that frame processing and the recovery tick are measured against
pub trait SourceClock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Live sources run on the wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl SourceClock for WallClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Something that pushes touch frames: a hardware driver or a recorded trace
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Begin delivering frames to `sink`. Fails if the device is unavailable.
    fn open(&mut self, sink: FrameSink) -> GestureResult<()>;

    /// Stop delivering frames. Safe to call when not open.
    fn close(&mut self);

    /// Clock for this source. When a frame is delivered it must read as that frame's time.
    fn clock(&self) -> Arc<dyn SourceClock> {
        Arc::new(WallClock)
    }
}
