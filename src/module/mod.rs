//! Compiled effect modules.
//!
//! A module image is a small header plus a JSON body naming the effect family
//! and the size of the linear memory. Instantiating it yields a
//! [`ModuleInstance`], which owns that memory and exposes the flat export
//! surface: `prepare`, `reset`, `destroy`, `process` over byte offsets, and a
//! `set_<id>`/`get_<id>` pair per parameter.

pub mod image;
pub mod instance;
pub mod memory;

pub use image::ModuleImage;
pub use instance::{Export, ModuleInstance};
pub use memory::{LinearMemory, QuantumLayout};

/// Render quantum of the browser-style host.
pub const DEFAULT_QUANTUM: usize = 128;
