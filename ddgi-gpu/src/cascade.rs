use glam::{IVec3, UVec3, Vec3};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{DdgiVolume, F32Ext, ProbeGrid};

/// Single probe grid of a volume, unpacked from [`DdgiVolume`].
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DdgiCascade {
    pub idx: u32,
    pub grid: ProbeGrid,
    pub origin: Vec3,
    pub spacing: f32,
    pub scroll_offset: IVec3,
    pub scroll_direction: IVec3,
}

impl DdgiCascade {
    /// Returns the half-size of the grid, measured between the outermost
    /// probes.
    pub fn extent(&self) -> Vec3 {
        0.5 * self.spacing * self.grid.coords_end().as_vec3()
    }

    /// Returns width of the band (just inside of the extent) across which
    /// this cascade fades out.
    pub fn fade_distance(&self) -> f32 {
        0.5 * self.spacing
    }

    /// Returns the center of the grid, including the toroidal scroll.
    pub fn scrolled_origin(&self) -> Vec3 {
        self.origin + self.scroll_offset.as_vec3() * self.spacing
    }

    /// Returns how strongly this cascade covers given point: `1.0` inside,
    /// going down to `0.0` across the fade band.
    pub fn fade_weight(&self, world_pos: Vec3) -> f32 {
        let dist = self.extent() - (world_pos - self.scrolled_origin()).abs();

        (dist.min_element() / self.fade_distance()).saturate()
    }

    /// Returns world-space position of given probe, without its relocation.
    pub fn probe_world_position(&self, coords: UVec3) -> Vec3 {
        self.origin + coords.as_vec3() * self.spacing - self.extent()
            + self.scroll_offset.as_vec3() * self.spacing
    }

    /// Returns coordinates of the probe at the lower corner of the grid cell
    /// enclosing given point.
    pub fn base_probe_coords(&self, world_pos: Vec3) -> UVec3 {
        let coords = (world_pos - self.scrolled_origin() + self.extent())
            / self.spacing;

        coords
            .floor()
            .clamp(Vec3::ZERO, self.grid.coords_end().as_vec3())
            .as_uvec3()
    }

    /// Returns index of the atlas slot holding given probe.
    pub fn probe_index(&self, coords: UVec3) -> u32 {
        self.grid.scrolling_index(self.scroll_offset, coords)
    }

    /// Returns whether given atlas slot (addressed by its unscrolled
    /// coordinates) has just wrapped around to the other side of the grid
    /// and so holds data of a probe that was far away a frame ago.
    ///
    /// Only the plane exposed by a single-probe scroll is reported.
    pub fn is_slot_scrolled_in(&self, slot_coords: UVec3) -> bool {
        let counts = self.grid.counts().as_ivec3();
        let slot_coords = slot_coords.as_ivec3();
        let mut axis = 0;

        while axis < 3 {
            let direction = self.scroll_direction[axis];
            let count = counts[axis];
            let offset = self.scroll_offset[axis];

            if direction != 0 {
                let coord = if direction > 0 {
                    (count + offset - 1).rem_euclid(count)
                } else {
                    offset.rem_euclid(count)
                };

                if slot_coords[axis] == coord {
                    return true;
                }
            }

            axis += 1;
        }

        false
    }
}

pub struct CascadeSelector;

impl CascadeSelector {
    /// Picks the cascade that should light given point.
    ///
    /// Cascades are tried in ascending order and the first one whose fade
    /// weight exceeds `dither` wins; varying `dither` per pixel and per frame
    /// turns the boundary between cascades into a noisy transition band
    /// instead of a visible seam.
    pub fn select(
        volume: &DdgiVolume,
        world_pos: Vec3,
        dither: f32,
    ) -> Option<DdgiCascade> {
        let mut cascade_idx = 0;

        while cascade_idx < volume.cascades_count() {
            let cascade = volume.cascade(cascade_idx);

            if cascade.fade_weight(world_pos) > dither {
                return Some(cascade);
            }

            cascade_idx += 1;
        }

        None
    }
}
