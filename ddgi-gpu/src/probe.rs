use glam::{ivec3, uvec2, uvec3, IVec3, UVec2, UVec3, Vec3, Vec4, Vec4Swizzles};

/// Dimensions of a probe grid, shared by all cascades of a volume.
///
/// Probes are flattened plane-by-plane: each Y coordinate selects a plane and
/// each plane is a row-major X×Z grid. This way a single flat index maps onto
/// a simple 2D tiling of the atlases, with planes laid side-by-side along X and
/// cascades stacked along Y.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeGrid {
    counts: UVec3,
}

impl ProbeGrid {
    pub fn new(counts: UVec3) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> UVec3 {
        self.counts
    }

    /// Returns the largest valid probe coordinates.
    pub fn coords_end(&self) -> UVec3 {
        self.counts - UVec3::ONE
    }

    pub fn len(&self) -> u32 {
        self.counts.x * self.counts.y * self.counts.z
    }

    pub fn probes_per_plane(&self) -> u32 {
        self.counts.x * self.counts.z
    }

    pub fn coords_to_index(&self, coords: UVec3) -> u32 {
        let plane_idx = coords.y;
        let idx_in_plane = coords.x + self.counts.x * coords.z;

        plane_idx * self.probes_per_plane() + idx_in_plane
    }

    /// See: [`Self::coords_to_index()`].
    pub fn index_to_coords(&self, idx: u32) -> UVec3 {
        uvec3(
            idx % self.counts.x,
            idx / self.probes_per_plane(),
            (idx / self.counts.x) % self.counts.z,
        )
    }

    /// Returns position of given probe's block within an atlas, counted in
    /// blocks (i.e. to get texels, multiply it by the block size).
    pub fn index_to_texel_origin(&self, cascade_idx: u32, idx: u32) -> UVec2 {
        let plane_idx = idx / self.probes_per_plane();
        let x = idx % self.counts.x + plane_idx * self.counts.x;
        let y = (idx / self.counts.x) % self.counts.z
            + cascade_idx * self.counts.z;

        uvec2(x, y)
    }

    /// Returns the atlas slot occupied by a probe at given logical coordinates,
    /// taking into account the toroidal scroll of its cascade.
    ///
    /// Logical coordinates stay put relative to the (moving) grid, while the
    /// slots stay put in memory - scrolling just rotates which slot represents
    /// which logical probe.
    pub fn scrolling_index(&self, scroll_offset: IVec3, coords: UVec3) -> u32 {
        let counts = self.counts.as_ivec3();
        let coords = coords.as_ivec3() + scroll_offset + counts;

        let wrapped = ivec3(
            coords.x.rem_euclid(counts.x),
            coords.y.rem_euclid(counts.y),
            coords.z.rem_euclid(counts.z),
        );

        self.coords_to_index(wrapped.as_uvec3())
    }

    /// Returns size of an atlas storing one block per probe, counted in
    /// blocks.
    pub fn atlas_blocks(&self, cascades_count: u32) -> UVec2 {
        uvec2(
            self.counts.x * self.counts.y,
            self.counts.z * cascades_count,
        )
    }
}

/// Per-probe record kept in the probe-state atlas by the update pass.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeData {
    /// Displacement applied to the probe so that it doesn't get stuck inside
    /// geometry
    pub relocation: Vec3,

    /// One of `Self::STATE_*`
    pub state: u32,
}

impl ProbeData {
    pub const STATE_INACTIVE: u32 = 0;
    pub const STATE_ACTIVE: u32 = 1;

    pub fn active(relocation: Vec3) -> Self {
        Self {
            relocation,
            state: Self::STATE_ACTIVE,
        }
    }

    pub fn inactive() -> Self {
        Self {
            relocation: Vec3::ZERO,
            state: Self::STATE_INACTIVE,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != Self::STATE_INACTIVE
    }

    pub fn serialize(&self) -> Vec4 {
        self.relocation.extend(self.state as f32)
    }

    pub fn deserialize(d0: Vec4) -> Self {
        Self {
            relocation: d0.xyz(),
            state: (d0.w + 0.5).max(0.0) as u32,
        }
    }
}
