mod f32_ext;
mod vec3_ext;

use spirv_std::Image;

pub use self::f32_ext::*;
pub use self::vec3_ext::*;

pub type Tex<'a> = &'a Image!(2D, type = f32, sampled);
