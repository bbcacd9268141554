//! Probe addressing, cascade selection and irradiance blending, shared by the
//! DDGI shaders and the host-side sampler.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod atlas;
mod cascade;
mod irradiance;
mod lighting;
mod octahedral;
mod probe;
mod utils;
mod volume;

pub use self::atlas::*;
pub use self::cascade::*;
pub use self::irradiance::*;
pub use self::lighting::*;
pub use self::octahedral::*;
pub use self::probe::*;
pub use self::utils::*;
pub use self::volume::*;

/// Maximum number of cascades a volume can hold.
pub const DDGI_MAX_CASCADES: usize = 4;
