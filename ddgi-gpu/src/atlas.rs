use glam::{uvec2, UVec2, Vec2, Vec4};
use spirv_std::Sampler;

use crate::{DdgiVolume, ProbeGrid, Tex};

/// Read-only 2D image that can be sampled with bilinear filtering and
/// clamp-to-edge addressing.
pub trait AtlasSampler {
    /// Samples the image at normalized coordinates.
    fn sample(&self, uv: Vec2) -> Vec4;

    /// Reads a single texel, without any filtering.
    fn load(&self, texel: UVec2) -> Vec4;
}

/// Atlas bound as a sampled GPU texture.
pub struct GpuAtlas<'a> {
    tex: Tex<'a>,
    sampler: &'a Sampler,
}

impl<'a> GpuAtlas<'a> {
    pub fn new(tex: Tex<'a>, sampler: &'a Sampler) -> Self {
        Self { tex, sampler }
    }
}

impl AtlasSampler for GpuAtlas<'_> {
    fn sample(&self, uv: Vec2) -> Vec4 {
        self.tex.sample_by_lod(*self.sampler, uv, 0.0)
    }

    fn load(&self, texel: UVec2) -> Vec4 {
        self.tex.fetch(texel)
    }
}

/// Describes how probes' octahedral maps are packed into an atlas.
///
/// Each probe gets a square block of `resolution + 2` texels - the interior
/// holds the octahedral map, while the outermost ring of texels mirrors the
/// opposite edges of the map so that bilinear filtering stays continuous
/// across the octahedral fold without bleeding into neighbouring probes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct AtlasLayout {
    pub grid: ProbeGrid,
    pub cascades_count: u32,
    pub resolution: u32,
}

impl AtlasLayout {
    pub const IRRADIANCE_RESOLUTION: u32 = 6;
    pub const DISTANCE_RESOLUTION: u32 = 14;

    pub fn irradiance(volume: &DdgiVolume) -> Self {
        Self {
            grid: volume.grid(),
            cascades_count: volume.cascades_count(),
            resolution: Self::IRRADIANCE_RESOLUTION,
        }
    }

    pub fn distance(volume: &DdgiVolume) -> Self {
        Self {
            grid: volume.grid(),
            cascades_count: volume.cascades_count(),
            resolution: Self::DISTANCE_RESOLUTION,
        }
    }

    /// Size of a single probe's block, including the border.
    pub fn block_size(&self) -> u32 {
        self.resolution + 2
    }

    /// Size of the entire atlas, in texels.
    pub fn size(&self) -> UVec2 {
        self.grid.atlas_blocks(self.cascades_count) * self.block_size()
    }

    /// Returns the top-left texel of given probe's block.
    pub fn block_origin(&self, cascade_idx: u32, probe_idx: u32) -> UVec2 {
        self.grid.index_to_texel_origin(cascade_idx, probe_idx)
            * self.block_size()
    }

    /// Returns the top-left texel of given probe's interior (i.e. its block
    /// without the border).
    pub fn interior_origin(&self, cascade_idx: u32, probe_idx: u32) -> UVec2 {
        self.block_origin(cascade_idx, probe_idx) + uvec2(1, 1)
    }

    /// Returns normalized atlas coordinates for given probe and octahedral
    /// coordinates (in `<-1.0, 1.0>`).
    ///
    /// The returned point always lies within the probe's interior, so that
    /// hardware filtering never reaches past the border.
    pub fn probe_uv(
        &self,
        cascade_idx: u32,
        probe_idx: u32,
        octahedral: Vec2,
    ) -> Vec2 {
        let block_size = self.block_size() as f32;

        let block_origin = self
            .grid
            .index_to_texel_origin(cascade_idx, probe_idx)
            .as_vec2();

        let uv = block_origin * block_size
            + block_size * 0.5
            + octahedral * (self.resolution as f32 * 0.5);

        uv / self.size().as_vec2()
    }
}
