//! macOS capture implementations
//!
//! Uses the private MultitouchSupport framework for raw trackpad contacts.

pub mod multitouch;

pub use multitouch::MultitouchSource;
