use std::f32::consts::TAU;

use glam::{ivec3, uvec3, uvec4, EulerRot, IVec3, Mat4, UVec3, Vec3, Vec4};
use log::{debug, info, trace};
use rand::Rng;

use crate::{gpu, DdgiError, DdgiSettings};

/// Keeps the cascades of a volume centered around the camera, scrolling them
/// one probe at a time so that most probes survive the camera's movement.
#[derive(Clone, Debug)]
pub struct DdgiVolumeScroller {
    settings: DdgiSettings,
    cascades: [CascadeScroll; gpu::DDGI_MAX_CASCADES],
    frame: u32,
}

impl DdgiVolumeScroller {
    pub fn new(mut settings: DdgiSettings) -> Result<Self, DdgiError> {
        settings.sanitize();
        settings.validate()?;

        info!(
            "Initializing volume; probes = {}, cascades = {}, spacing = {}",
            settings.probes_counts,
            settings.cascades_count,
            settings.probe_spacing,
        );

        Ok(Self {
            settings,
            cascades: Default::default(),
            frame: 0,
        })
    }

    pub fn settings(&self) -> &DdgiSettings {
        &self.settings
    }

    /// Forgets cascades' positions, making the next update reset all of them.
    pub fn reset(&mut self) {
        self.cascades = Default::default();
    }

    /// Moves cascades towards given camera position and returns the volume
    /// that should be used for the upcoming frame.
    pub fn update(&mut self, camera_pos: Vec3, view_dir: Vec3) -> ScrollUpdate {
        let counts = self.settings.probes_counts;
        let mut volume = self.volume(view_dir);
        let mut reset_mask = 0;

        for cascade_idx in 0..self.settings.cascades_count {
            let spacing = self.settings.cascade_spacing(cascade_idx);
            let cascade = &mut self.cascades[cascade_idx as usize];

            if cascade.follow(camera_pos, spacing, counts) {
                debug!(
                    "Cascade {} reset; origin = {}",
                    cascade_idx, cascade.origin
                );

                reset_mask |= 1 << cascade_idx;
            } else if cascade.direction != IVec3::ZERO {
                trace!(
                    "Cascade {} scrolled; direction = {}, offset = {}",
                    cascade_idx,
                    cascade.direction,
                    cascade.offset,
                );
            }

            volume.cascades_origin[cascade_idx as usize] =
                cascade.origin.extend(spacing);

            volume.cascades_scroll_offset[cascade_idx as usize] =
                cascade.offset.extend(0);

            volume.cascades_scroll_direction[cascade_idx as usize] =
                cascade.direction.extend(0);
        }

        self.frame = self.frame.wrapping_add(1);

        ScrollUpdate { volume, reset_mask }
    }

    fn volume(&self, view_dir: Vec3) -> gpu::DdgiVolume {
        let settings = &self.settings;
        let mut rng = rand::thread_rng();

        let rays_rotation = Mat4::from_euler(
            EulerRot::XYZ,
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
        );

        gpu::DdgiVolume {
            probes_counts: settings
                .probes_counts
                .extend(settings.cascades_count),
            params: Vec4::new(
                settings.irradiance_gamma,
                settings.indirect_lighting_intensity,
                settings.ray_max_distance,
                settings.probe_history_weight,
            ),
            payload: uvec4(
                settings.rays_count,
                settings.flags(),
                self.frame,
                0,
            ),
            rays_rotation,
            view_direction: view_dir.normalize_or_zero().extend(0.0),
            fallback_irradiance: settings.fallback_irradiance.extend(0.0),
            ..Default::default()
        }
    }
}

/// Volume prepared for a single frame.
#[derive(Clone, Copy, Debug)]
pub struct ScrollUpdate {
    pub volume: gpu::DdgiVolume,

    /// Bit `n` is set when cascade `n` got reset during this update, i.e. all
    /// of its probes have to be invalidated.
    pub reset_mask: u32,
}

impl ScrollUpdate {
    pub fn is_reset(&self, cascade_idx: u32) -> bool {
        1u32.checked_shl(cascade_idx)
            .map_or(false, |bit| self.reset_mask & bit > 0)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct CascadeScroll {
    /// Grid's center, not including the scroll offset
    origin: Vec3,

    /// Toroidal scroll offset, kept within `0..counts`
    offset: IVec3,

    /// Sign of the last scroll
    direction: IVec3,

    /// Camera's position snapped to the grid, in cells; `None` before the
    /// first update
    cell: Option<IVec3>,
}

impl CascadeScroll {
    /// Moves this cascade towards the camera; returns whether the cascade got
    /// reset instead of scrolled.
    fn follow(
        &mut self,
        camera_pos: Vec3,
        spacing: f32,
        counts: UVec3,
    ) -> bool {
        let cell = (camera_pos / spacing).floor().as_ivec3();

        // `None` when the camera jumped too far for the difference to fit
        let delta = self.cell.and_then(|prev_cell| {
            Some(ivec3(
                cell.x.checked_sub(prev_cell.x)?,
                cell.y.checked_sub(prev_cell.y)?,
                cell.z.checked_sub(prev_cell.z)?,
            ))
        });

        self.cell = Some(cell);

        let delta = delta.filter(|delta| {
            let distance = uvec3(
                delta.x.unsigned_abs(),
                delta.y.unsigned_abs(),
                delta.z.unsigned_abs(),
            );

            distance.cmplt(counts).all()
        });

        let counts = counts.as_ivec3();

        let Some(delta) = delta else {
            self.origin = cell.as_vec3() * spacing;
            self.offset = IVec3::ZERO;
            self.direction = IVec3::ZERO;

            return true;
        };

        let offset = self.offset + delta;

        let wraps = ivec3(
            offset.x.div_euclid(counts.x),
            offset.y.div_euclid(counts.y),
            offset.z.div_euclid(counts.z),
        );

        self.offset = offset - wraps * counts;
        self.origin += (wraps * counts).as_vec3() * spacing;
        self.direction = delta.signum();

        false
    }
}
