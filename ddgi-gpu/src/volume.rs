use bytemuck::{Pod, Zeroable};
use glam::{IVec4, Mat4, UVec4, Vec3, Vec4, Vec4Swizzles};

use crate::{DdgiCascade, ProbeGrid, DDGI_MAX_CASCADES};

/// Per-frame description of the probe volume, produced by the host and read
/// by every sampling invocation.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DdgiVolume {
    /// x - probes count along the x axis
    /// y - probes count along the y axis
    /// z - probes count along the z axis
    /// w - number of active cascades
    pub probes_counts: UVec4,

    /// Per cascade:
    /// xyz - origin
    /// w - probe spacing
    pub cascades_origin: [Vec4; DDGI_MAX_CASCADES],

    /// Per cascade:
    /// xyz - toroidal scroll offset, in probes
    /// w - unused
    pub cascades_scroll_offset: [IVec4; DDGI_MAX_CASCADES],

    /// Per cascade:
    /// xyz - sign of the scroll performed during the last frame
    /// w - unused
    pub cascades_scroll_direction: [IVec4; DDGI_MAX_CASCADES],

    /// x - irradiance encoding gamma
    /// y - indirect lighting intensity
    /// z - ray max distance
    /// w - probe history weight
    pub params: Vec4,

    /// x - rays count per probe
    /// y - flags (see `Self::FLAG_*`)
    /// z - frame index
    /// w - unused
    pub payload: UVec4,

    /// Random rotation applied to probe rays by the update pass
    pub rays_rotation: Mat4,

    /// xyz - camera's forward direction
    /// w - unused
    pub view_direction: Vec4,

    /// xyz - irradiance returned for points outside of all cascades
    /// w - unused
    pub fallback_irradiance: Vec4,
}

impl DdgiVolume {
    /// Whether the irradiance atlas is stored in a gamma-compressed form (and
    /// so should be blended in a perceptual space).
    pub const FLAG_GAMMA_BLENDING: u32 = 1;

    pub fn grid(&self) -> ProbeGrid {
        ProbeGrid::new(self.probes_counts.xyz())
    }

    pub fn cascades_count(&self) -> u32 {
        self.probes_counts.w.min(DDGI_MAX_CASCADES as u32)
    }

    pub fn cascade(&self, idx: u32) -> DdgiCascade {
        let origin = self.cascades_origin[idx as usize];

        DdgiCascade {
            idx,
            grid: self.grid(),
            origin: origin.xyz(),
            spacing: origin.w,
            scroll_offset: self.cascades_scroll_offset[idx as usize].xyz(),
            scroll_direction: self.cascades_scroll_direction[idx as usize]
                .xyz(),
        }
    }

    pub fn irradiance_gamma(&self) -> f32 {
        self.params.x
    }

    pub fn indirect_lighting_intensity(&self) -> f32 {
        self.params.y
    }

    pub fn ray_max_distance(&self) -> f32 {
        self.params.z
    }

    pub fn probe_history_weight(&self) -> f32 {
        self.params.w
    }

    pub fn rays_count(&self) -> u32 {
        self.payload.x
    }

    pub fn flags(&self) -> u32 {
        self.payload.y
    }

    pub fn frame(&self) -> u32 {
        self.payload.z
    }

    pub fn is_gamma_blending(&self) -> bool {
        self.flags() & Self::FLAG_GAMMA_BLENDING > 0
    }

    pub fn view_direction(&self) -> Vec3 {
        self.view_direction.xyz()
    }

    pub fn fallback_irradiance(&self) -> Vec3 {
        self.fallback_irradiance.xyz()
    }
}
