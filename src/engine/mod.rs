//! Engine plumbing shared by every input channel

pub mod channel;

pub use channel::{GestureError, GestureResult, InputChannel};
