//! Sampling of DDGI irradiance fields on the CPU.
//!
//! The sampling core itself lives in [`gpu`], shared with shaders; this crate
//! provides the host side of it: settings, cascade scrolling, CPU atlases and
//! batched queries.

mod atlas;
mod error;
mod field;
mod scroller;
mod settings;

pub use ddgi_gpu as gpu;

pub use self::atlas::*;
pub use self::error::*;
pub use self::field::*;
pub use self::scroller::*;
pub use self::settings::*;
