use std::num::NonZeroUsize;
use std::thread;

use glam::Vec3;
use rand::Rng;

use crate::{gpu, DdgiError, ProbeAtlas};

/// Snapshot of a probe volume that can be queried for irradiance.
///
/// The field borrows its atlases immutably, so it can be shared between any
/// number of threads for as long as the frame lasts.
#[derive(Clone, Copy, Debug)]
pub struct IrradianceField<'a> {
    volume: &'a gpu::DdgiVolume,
    probe_states: &'a ProbeAtlas,
    probe_distances: &'a ProbeAtlas,
    probe_irradiance: &'a ProbeAtlas,
    bias: f32,
}

impl<'a> IrradianceField<'a> {
    pub fn new(
        volume: &'a gpu::DdgiVolume,
        probe_states: &'a ProbeAtlas,
        probe_distances: &'a ProbeAtlas,
        probe_irradiance: &'a ProbeAtlas,
    ) -> Result<Self, DdgiError> {
        let grid = volume.grid();
        let cascades_count = volume.cascades_count();

        if grid.counts().min_element() == 0 {
            return Err(DdgiError::InvalidProbesCount(grid.counts()));
        }

        if cascades_count == 0 {
            return Err(DdgiError::InvalidCascadesCount {
                actual: volume.probes_counts.w,
                max: gpu::DDGI_MAX_CASCADES as u32,
            });
        }

        probe_states.validate("states", grid.atlas_blocks(cascades_count))?;

        probe_distances.validate(
            "distances",
            gpu::AtlasLayout::distance(volume).size(),
        )?;

        probe_irradiance.validate(
            "irradiance",
            gpu::AtlasLayout::irradiance(volume).size(),
        )?;

        Ok(Self {
            volume,
            probe_states,
            probe_distances,
            probe_irradiance,
            bias: 0.0,
        })
    }

    /// Sets how far sampled points get pushed off their surfaces.
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn volume(&self) -> &gpu::DdgiVolume {
        self.volume
    }

    pub fn sample(&self, position: Vec3, normal: Vec3, dither: f32) -> Vec3 {
        gpu::sample_irradiance(
            self.volume,
            self.probe_states,
            self.probe_distances,
            self.probe_irradiance,
            position,
            normal,
            self.bias,
            dither,
        )
    }

    pub fn sample_point(&self, point: &SamplePoint) -> Vec3 {
        self.sample(point.position, point.normal, point.dither)
    }

    /// Samples all points, storing irradiance of `points[i]` at `out[i]`.
    pub fn sample_batch(
        &self,
        points: &[SamplePoint],
        out: &mut [Vec3],
    ) -> Result<(), DdgiError> {
        Self::check_batch(points, out)?;

        for (point, out) in points.iter().zip(out) {
            *out = self.sample_point(point);
        }

        Ok(())
    }

    /// Same as [`Self::sample_batch()`], but spreads the work across all
    /// available cores.
    pub fn sample_batch_parallel(
        &self,
        points: &[SamplePoint],
        out: &mut [Vec3],
    ) -> Result<(), DdgiError> {
        Self::check_batch(points, out)?;

        if points.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "metrics")]
        let tt = std::time::Instant::now();

        let threads = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        let chunk_size = points.len().div_ceil(threads);

        thread::scope(|scope| {
            for (points, out) in
                points.chunks(chunk_size).zip(out.chunks_mut(chunk_size))
            {
                scope.spawn(move || {
                    for (point, out) in points.iter().zip(out) {
                        *out = self.sample_point(point);
                    }
                });
            }
        });

        #[cfg(feature = "metrics")]
        log::debug!(
            "Sampled {} points; threads = {}, tt = {}",
            points.len(),
            threads,
            humantime::format_duration(tt.elapsed()),
        );

        Ok(())
    }

    /// Turns irradiance into radiance diffusely reflected off a surface of
    /// given albedo, applying the volume's intensity.
    pub fn indirect_diffuse(&self, irradiance: Vec3, albedo: Vec3) -> Vec3 {
        gpu::IndirectLighting::diffuse(self.volume, irradiance, albedo)
    }

    fn check_batch(
        points: &[SamplePoint],
        out: &[Vec3],
    ) -> Result<(), DdgiError> {
        if points.len() == out.len() {
            Ok(())
        } else {
            Err(DdgiError::BatchSizeMismatch {
                points: points.len(),
                outputs: out.len(),
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub position: Vec3,
    pub normal: Vec3,

    /// Per-sample random value in `0..1`, used to blend between cascades
    pub dither: f32,
}

impl SamplePoint {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            dither: 0.0,
        }
    }

    pub fn with_dither(mut self, dither: f32) -> Self {
        self.dither = dither;
        self
    }

    pub fn with_random_dither(mut self, rng: &mut impl Rng) -> Self {
        self.dither = rng.gen();
        self
    }
}
