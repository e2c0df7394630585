//! Event system for exthost

pub mod emitter;
pub mod types;

pub use emitter::EventEmitter;
pub use types::{HostEvent, InstanceEvent, ThemeDelta, ThemeMap};
