use core::f32::consts::FRAC_1_PI;

use glam::Vec3;

use crate::DdgiVolume;

pub struct IndirectLighting;

impl IndirectLighting {
    /// Turns irradiance sampled from the volume into radiance diffusely
    /// reflected off a Lambertian surface of given albedo.
    pub fn diffuse(
        volume: &DdgiVolume,
        irradiance: Vec3,
        albedo: Vec3,
    ) -> Vec3 {
        albedo * FRAC_1_PI * irradiance * volume.indirect_lighting_intensity()
    }
}
