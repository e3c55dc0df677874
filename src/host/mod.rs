//! Adapters for hosts that call with their own block sizes: a desktop plugin
//! style block callback and an offline WAV renderer built on top of it.

pub mod desktop;
pub mod render;

pub use desktop::{DesktopProcessor, HostParameters};
pub use render::{RenderJob, RenderReport};
