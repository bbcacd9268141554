use glam::{uvec3, UVec3, Vec3};
use log::warn;

use crate::{gpu, DdgiError};

/// User-facing configuration of a probe volume.
#[derive(Clone, Debug, PartialEq)]
pub struct DdgiSettings {
    /// Number of probes along each axis, identical for all cascades
    pub probes_counts: UVec3,

    /// Number of cascades, up to [`gpu::DDGI_MAX_CASCADES`]
    pub cascades_count: u32,

    /// Distance between probes of the first cascade
    pub probe_spacing: f32,

    /// How much larger the spacing of each next cascade gets
    pub cascade_spacing_ratio: f32,

    /// Exponent used to compress probe irradiance
    pub irradiance_gamma: f32,

    /// Whether probes should get blended in a perceptual space
    pub gamma_blending: bool,

    pub indirect_lighting_intensity: f32,

    /// Maximum length of rays traced from probes
    pub ray_max_distance: f32,

    /// How much of the previous frame is kept when updating probes, in `0..=1`
    pub probe_history_weight: f32,

    /// Number of rays traced from each probe per frame
    pub rays_count: u32,

    /// Irradiance of points outside of all cascades
    pub fallback_irradiance: Vec3,

    /// How far shaded points get pushed off surfaces before sampling
    pub surface_bias: f32,
}

impl DdgiSettings {
    pub fn validate(&self) -> Result<(), DdgiError> {
        if self.probes_counts.min_element() == 0 {
            return Err(DdgiError::InvalidProbesCount(self.probes_counts));
        }

        let max_cascades = gpu::DDGI_MAX_CASCADES as u32;

        if self.cascades_count == 0 || self.cascades_count > max_cascades {
            return Err(DdgiError::InvalidCascadesCount {
                actual: self.cascades_count,
                max: max_cascades,
            });
        }

        if !(self.probe_spacing.is_finite() && self.probe_spacing > 0.0) {
            return Err(DdgiError::InvalidSpacing(self.probe_spacing));
        }

        if !(self.cascade_spacing_ratio.is_finite()
            && self.cascade_spacing_ratio > 0.0)
        {
            return Err(DdgiError::InvalidSpacing(self.cascade_spacing_ratio));
        }

        Ok(())
    }

    /// Clamps parameters that have an obvious closest valid value.
    pub fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.probe_history_weight) {
            warn!(
                "Probe history weight {} is out of range; clamping",
                self.probe_history_weight
            );

            self.probe_history_weight =
                if self.probe_history_weight.is_nan() {
                    Self::default().probe_history_weight
                } else {
                    self.probe_history_weight.clamp(0.0, 1.0)
                };
        }

        if self.rays_count == 0 {
            warn!("Rays count cannot be zero; using one ray per probe");

            self.rays_count = 1;
        }

        let gamma = self.irradiance_gamma;

        if !(gamma.is_finite() && gamma > 0.0) {
            warn!(
                "Irradiance gamma {} must be positive; disabling gamma \
                 blending",
                self.irradiance_gamma
            );

            self.irradiance_gamma = 1.0;
            self.gamma_blending = false;
        }
    }

    /// Returns distance between probes of given cascade.
    pub fn cascade_spacing(&self, cascade_idx: u32) -> f32 {
        self.probe_spacing * self.cascade_spacing_ratio.powi(cascade_idx as i32)
    }

    pub fn flags(&self) -> u32 {
        let mut flags = 0;

        if self.gamma_blending {
            flags |= gpu::DdgiVolume::FLAG_GAMMA_BLENDING;
        }

        flags
    }
}

impl Default for DdgiSettings {
    fn default() -> Self {
        Self {
            probes_counts: uvec3(16, 8, 16),
            cascades_count: 4,
            probe_spacing: 2.0,
            cascade_spacing_ratio: 2.0,
            irradiance_gamma: 5.0,
            gamma_blending: true,
            indirect_lighting_intensity: 1.0,
            ray_max_distance: 10_000.0,
            probe_history_weight: 0.97,
            rays_count: 256,
            fallback_irradiance: Vec3::ZERO,
            surface_bias: 0.2,
        }
    }
}
