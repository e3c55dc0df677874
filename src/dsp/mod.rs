//! Stateful DSP primitives shared by every effect family.
//!
//! Nothing in here allocates after construction/resize; all processing entry
//! points are per-sample and `#[inline]`.

pub mod common;
pub mod delay_line;
pub mod dynamics;
pub mod filter;
pub mod lfo;
pub mod shaper;
