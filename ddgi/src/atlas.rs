use derivative::Derivative;
use glam::{uvec2, vec4, UVec2, Vec2, Vec3, Vec4};
use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::{gpu, DdgiError};

/// CPU-side atlas of probe data, sampled the same way a GPU texture with
/// linear filtering and clamp-to-edge addressing would be.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ProbeAtlas {
    size: UVec2,

    #[derivative(Debug = "ignore")]
    texels: Vec<Vec4>,
}

impl ProbeAtlas {
    pub fn new(size: UVec2) -> Self {
        Self::filled(size, Vec4::ZERO)
    }

    pub fn filled(size: UVec2, value: Vec4) -> Self {
        Self {
            size,
            texels: vec![value; (size.x * size.y) as usize],
        }
    }

    /// Creates an atlas out of texels laid out row by row.
    pub fn from_texels(
        size: UVec2,
        texels: Vec<Vec4>,
    ) -> Result<Self, DdgiError> {
        let expected = (size.x * size.y) as usize;

        if texels.len() != expected {
            return Err(DdgiError::BufferSizeMismatch {
                expected,
                actual: texels.len(),
            });
        }

        Ok(Self { size, texels })
    }

    /// Creates a probe-state atlas (one texel per probe) with all probes set
    /// to `data`.
    pub fn probe_states(
        volume: &gpu::DdgiVolume,
        data: gpu::ProbeData,
    ) -> Self {
        let size = volume.grid().atlas_blocks(volume.cascades_count());

        Self::filled(size, data.serialize())
    }

    /// Creates an empty distance atlas.
    pub fn probe_distances(volume: &gpu::DdgiVolume) -> Self {
        Self::new(gpu::AtlasLayout::distance(volume).size())
    }

    /// Creates an empty irradiance atlas.
    pub fn probe_irradiance(volume: &gpu::DdgiVolume) -> Self {
        Self::new(gpu::AtlasLayout::irradiance(volume).size())
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Returns texels in the `Rgba32Float` layout, ready to be uploaded into a
    /// GPU texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Reads given texel; coordinates past the edge get clamped to it, while
    /// an empty atlas reads as zero.
    pub fn get(&self, texel: UVec2) -> Vec4 {
        if self.is_empty() {
            return Vec4::ZERO;
        }

        let texel = texel.min(self.size - UVec2::ONE);

        self.texels[(texel.y * self.size.x + texel.x) as usize]
    }

    /// Writes given texel; writes past the edge are ignored.
    pub fn set(&mut self, texel: UVec2, value: Vec4) {
        if texel.cmpge(self.size).any() {
            return;
        }

        let idx = (texel.y * self.size.x + texel.x) as usize;

        self.texels[idx] = value;
    }

    pub fn fill(&mut self, value: Vec4) {
        self.texels.fill(value);
    }

    /// Stores state of given probe; `self` must be a probe-state atlas.
    pub fn write_probe_data(
        &mut self,
        grid: gpu::ProbeGrid,
        cascade_idx: u32,
        probe_idx: u32,
        data: gpu::ProbeData,
    ) {
        self.set(
            grid.index_to_texel_origin(cascade_idx, probe_idx),
            data.serialize(),
        );
    }

    /// Fills given probe's octahedral map by evaluating `f` for the direction
    /// of each interior texel and then refreshes the probe's border.
    pub fn write_probe(
        &mut self,
        layout: gpu::AtlasLayout,
        cascade_idx: u32,
        probe_idx: u32,
        mut f: impl FnMut(Vec3) -> Vec4,
    ) {
        let interior = layout.interior_origin(cascade_idx, probe_idx);

        for y in 0..layout.resolution {
            for x in 0..layout.resolution {
                let dir = gpu::Octahedral::texel_direction(
                    uvec2(x, y),
                    layout.resolution,
                );

                self.set(interior + uvec2(x, y), f(dir));
            }
        }

        self.write_probe_border(layout, cascade_idx, probe_idx);
    }

    /// Copies interior texels of given probe onto its border, so that
    /// bilinear filtering wraps around the octahedral map.
    ///
    /// Edges get mirrored copies of the adjacent interior row (or column),
    /// corners get the diagonally opposite interior texel.
    pub fn write_probe_border(
        &mut self,
        layout: gpu::AtlasLayout,
        cascade_idx: u32,
        probe_idx: u32,
    ) {
        let origin = layout.block_origin(cascade_idx, probe_idx);
        let res = layout.resolution;
        let last = res + 1;

        for i in 1..=res {
            let mirrored = res + 1 - i;

            self.copy(origin, uvec2(mirrored, 1), uvec2(i, 0));
            self.copy(origin, uvec2(mirrored, res), uvec2(i, last));
            self.copy(origin, uvec2(1, mirrored), uvec2(0, i));
            self.copy(origin, uvec2(res, mirrored), uvec2(last, i));
        }

        self.copy(origin, uvec2(res, res), uvec2(0, 0));
        self.copy(origin, uvec2(1, res), uvec2(last, 0));
        self.copy(origin, uvec2(res, 1), uvec2(0, last));
        self.copy(origin, uvec2(1, 1), uvec2(last, last));
    }

    fn copy(&mut self, origin: UVec2, src: UVec2, dst: UVec2) {
        self.set(origin + dst, self.get(origin + src));
    }

    /// Checks whether this atlas has the size `expected` by given volume.
    pub fn validate(
        &self,
        atlas: &'static str,
        expected: UVec2,
    ) -> Result<(), DdgiError> {
        if self.size == expected {
            Ok(())
        } else {
            Err(DdgiError::AtlasSizeMismatch {
                atlas,
                expected,
                actual: self.size,
            })
        }
    }

    pub fn from_image(image: &Rgba32FImage) -> Self {
        let texels = image
            .pixels()
            .map(|Rgba([r, g, b, a])| vec4(*r, *g, *b, *a))
            .collect();

        Self {
            size: uvec2(image.width(), image.height()),
            texels,
        }
    }

    pub fn to_image(&self) -> Rgba32FImage {
        Rgba32FImage::from_fn(self.size.x, self.size.y, |x, y| {
            Rgba(self.get(uvec2(x, y)).to_array())
        })
    }

    /// Returns an 8-bit rendition of this atlas, with colors divided by
    /// `exposure` and alpha ignored.
    pub fn to_preview(&self, exposure: f32) -> RgbaImage {
        RgbaImage::from_fn(self.size.x, self.size.y, |x, y| {
            let color = (self.get(uvec2(x, y)).truncate() / exposure)
                .clamp(Vec3::ZERO, Vec3::ONE)
                * 255.0;

            Rgba([color.x as u8, color.y as u8, color.z as u8, 255])
        })
    }
}

impl gpu::AtlasSampler for ProbeAtlas {
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.is_empty() {
            return Vec4::ZERO;
        }

        let max = (self.size - UVec2::ONE).as_vec2();
        let pos = uv * self.size.as_vec2() - 0.5;
        let p0 = pos.floor();
        let t = pos - p0;

        let texel = |offset: Vec2| {
            self.get((p0 + offset).clamp(Vec2::ZERO, max).as_uvec2())
        };

        let s00 = texel(Vec2::new(0.0, 0.0));
        let s10 = texel(Vec2::new(1.0, 0.0));
        let s01 = texel(Vec2::new(0.0, 1.0));
        let s11 = texel(Vec2::new(1.0, 1.0));

        s00.lerp(s10, t.x).lerp(s01.lerp(s11, t.x), t.y)
    }

    fn load(&self, texel: UVec2) -> Vec4 {
        self.get(texel)
    }
}
