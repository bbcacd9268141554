use core::f32::consts::PI;

use glam::{uvec3, Vec2, Vec3, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    AtlasLayout, AtlasSampler, CascadeSelector, DdgiCascade, DdgiVolume,
    F32Ext, Octahedral, ProbeData, Vec3Ext,
};

/// Factors that decide how much a single probe contributes to a shading
/// point.
pub struct ProbeWeight;

impl ProbeWeight {
    /// Lowest weight a probe can get before the low-weight boost and the
    /// trilinear factor are applied.
    pub const MIN_WEIGHT: f32 = 0.000001;

    /// Weights below this threshold are crushed by a cubic curve.
    pub const CRUSH_THRESHOLD: f32 = 0.2;

    /// Lowest value of the visibility factor; probes are never entirely
    /// occluded.
    pub const MIN_VISIBILITY: f32 = 0.05;

    /// Lowest value of the trilinear factor.
    pub const MIN_TRILINEAR: f32 = 0.001;

    /// Smooth backface test: `1.0` for probes in front of the surface, going
    /// down to `0.0` for probes directly behind it.
    pub fn backface(dir_to_probe: Vec3, normal: Vec3) -> f32 {
        (dir_to_probe.dot(normal) * 0.5 + 0.5).sqr()
    }

    /// Chebyshev visibility test - estimates probability that the probe can
    /// see a point that's `distance` units away from it, knowing mean and
    /// mean-squared distance to the geometry in that direction.
    pub fn visibility(distance: f32, moments: Vec2) -> f32 {
        let mean = moments.x;

        if distance <= mean {
            return 1.0;
        }

        let variance = (mean.sqr() - moments.y).abs();
        let denom = variance + (distance - mean).sqr();

        let chebyshev = if denom > 0.0 { variance / denom } else { 0.0 };

        chebyshev.cube().max(Self::MIN_VISIBILITY)
    }

    /// Combines all factors into the final weight; always positive.
    pub fn combine(backface: f32, visibility: f32, trilinear: Vec3) -> f32 {
        let mut weight = (backface * visibility).max(Self::MIN_WEIGHT);

        if weight < Self::CRUSH_THRESHOLD {
            weight *= weight.sqr() / Self::CRUSH_THRESHOLD.sqr();
        }

        let trilinear = trilinear.x * trilinear.y * trilinear.z;

        weight * trilinear.max(Self::MIN_TRILINEAR)
    }
}

/// Computes irradiance at arbitrary points by blending probes of a volume.
pub struct IrradianceBlender<'a, A> {
    volume: &'a DdgiVolume,
    probe_states: &'a A,
    probe_distances: &'a A,
    probe_irradiance: &'a A,
}

impl<'a, A> IrradianceBlender<'a, A>
where
    A: AtlasSampler,
{
    pub fn new(
        volume: &'a DdgiVolume,
        probe_states: &'a A,
        probe_distances: &'a A,
        probe_irradiance: &'a A,
    ) -> Self {
        Self {
            volume,
            probe_states,
            probe_distances,
            probe_irradiance,
        }
    }

    /// Returns irradiance arriving at given surface point.
    ///
    /// Points not covered by any cascade get volume's fallback irradiance.
    pub fn sample(
        &self,
        world_pos: Vec3,
        world_normal: Vec3,
        bias: f32,
        dither: f32,
    ) -> Vec3 {
        match CascadeSelector::select(self.volume, world_pos, dither) {
            Some(cascade) => self.blend(cascade, world_pos, world_normal, bias),
            None => self.volume.fallback_irradiance(),
        }
    }

    /// Returns irradiance arriving at given surface point, as seen by the
    /// eight probes of given cascade enclosing it.
    ///
    /// Returns zero if none of those probes is active.
    pub fn blend(
        &self,
        cascade: DdgiCascade,
        world_pos: Vec3,
        world_normal: Vec3,
        bias: f32,
    ) -> Vec3 {
        let distance_layout = AtlasLayout::distance(self.volume);
        let irradiance_layout = AtlasLayout::irradiance(self.volume);
        let irradiance_oct = Octahedral::encode(world_normal);
        let coords_end = cascade.grid.coords_end();

        // Probes roughly behind the viewer tend to get self-shadowed, so we
        // push the point towards the camera as well
        let biased_pos = world_pos + world_normal * bias
            - self.volume.view_direction() * (bias * 4.0);

        let base_coords = cascade.base_probe_coords(world_pos);
        let base_pos = cascade.probe_world_position(base_coords);

        let bias_alpha = ((biased_pos - base_pos) / cascade.spacing)
            .clamp(Vec3::ZERO, Vec3::ONE);

        let mut irradiance_sum = Vec3::ZERO;
        let mut weight_sum = 0.0;
        let mut corner = 0;

        while corner < 8 {
            let offset =
                uvec3(corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);

            corner += 1;

            let probe_coords = (base_coords + offset).min(coords_end);
            let probe_idx = cascade.probe_index(probe_coords);

            let probe = ProbeData::deserialize(self.probe_states.load(
                cascade.grid.index_to_texel_origin(cascade.idx, probe_idx),
            ));

            if !probe.is_active() {
                continue;
            }

            let probe_pos = base_pos
                + (probe_coords - base_coords).as_vec3() * cascade.spacing
                + probe.relocation;

            let backface = ProbeWeight::backface(
                (probe_pos - world_pos).normalize_or_zero(),
                world_normal,
            );

            let visibility = {
                let biased_to_probe = probe_pos - biased_pos;

                let uv = distance_layout.probe_uv(
                    cascade.idx,
                    probe_idx,
                    Octahedral::encode(-biased_to_probe.normalize_or_zero()),
                );

                // Distances are stored at half-scale
                let moments = self.probe_distances.sample(uv).xy() * 2.0;

                ProbeWeight::visibility(biased_to_probe.length(), moments)
            };

            let trilinear =
                (Vec3::ONE - bias_alpha).mix(bias_alpha, offset.as_vec3());

            let weight = ProbeWeight::combine(backface, visibility, trilinear);

            let irradiance = {
                let uv = irradiance_layout.probe_uv(
                    cascade.idx,
                    probe_idx,
                    irradiance_oct,
                );

                let irradiance = self.probe_irradiance.sample(uv).xyz();

                // Leave a gamma-2 curve in, so that probes get blended in a
                // perceptual space; squared back after normalization
                if self.volume.is_gamma_blending() {
                    irradiance.powf(self.volume.irradiance_gamma() * 0.5)
                } else {
                    irradiance
                }
            };

            irradiance_sum += irradiance * weight;
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return Vec3::ZERO;
        }

        let mut irradiance = irradiance_sum / weight_sum;

        if self.volume.is_gamma_blending() {
            irradiance *= irradiance;
        }

        // Probes store the cosine-weighted average, so to get irradiance we
        // multiply by the area of the hemisphere
        irradiance * 2.0 * PI
    }
}

/// Returns indirect irradiance arriving at given surface point; see
/// [`IrradianceBlender::sample()`].
#[allow(clippy::too_many_arguments)]
pub fn sample_irradiance<A>(
    volume: &DdgiVolume,
    probe_states: &A,
    probe_distances: &A,
    probe_irradiance: &A,
    world_pos: Vec3,
    world_normal: Vec3,
    bias: f32,
    dither: f32,
) -> Vec3
where
    A: AtlasSampler,
{
    IrradianceBlender::new(
        volume,
        probe_states,
        probe_distances,
        probe_irradiance,
    )
    .sample(world_pos, world_normal, bias, dither)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec4, vec2, vec3, vec4, UVec2, Vec4};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const EPSILON: f32 = 0.000001;

    struct TestAtlas {
        value: Vec4,
        overrides: Vec<(UVec2, Vec4)>,
    }

    impl TestAtlas {
        fn uniform(value: Vec4) -> Self {
            Self {
                value,
                overrides: Default::default(),
            }
        }
    }

    impl AtlasSampler for TestAtlas {
        fn sample(&self, _: Vec2) -> Vec4 {
            self.value
        }

        fn load(&self, texel: UVec2) -> Vec4 {
            self.overrides
                .iter()
                .find(|(t, _)| *t == texel)
                .map(|(_, v)| *v)
                .unwrap_or(self.value)
        }
    }

    fn volume() -> DdgiVolume {
        let mut volume = DdgiVolume {
            probes_counts: uvec4(2, 2, 2, 1),
            params: vec4(5.0, 1.0, 1000.0, 0.97),
            view_direction: vec4(0.0, 0.0, 1.0, 0.0),
            fallback_irradiance: vec4(0.3, 0.2, 0.1, 0.0),
            ..Default::default()
        };

        volume.cascades_origin[0] = vec4(0.0, 0.0, 0.0, 2.0);
        volume
    }

    fn normals() -> [Vec3; 5] {
        [
            Vec3::Y,
            -Vec3::Y,
            Vec3::X,
            vec3(0.3, -0.5, 0.8).normalize(),
            vec3(-1.0, -1.0, -1.0).normalize(),
        ]
    }

    fn active_probes() -> TestAtlas {
        TestAtlas::uniform(ProbeData::active(Vec3::ZERO).serialize())
    }

    fn unoccluded_distances() -> TestAtlas {
        // mean = 100, mean² = 10000, stored at half-scale
        TestAtlas::uniform(vec4(50.0, 5000.0, 0.0, 0.0))
    }

    #[test]
    fn backface() {
        assert_eq!(1.0, ProbeWeight::backface(Vec3::Y, Vec3::Y));
        assert_eq!(0.25, ProbeWeight::backface(Vec3::X, Vec3::Y));
        assert_eq!(0.0, ProbeWeight::backface(-Vec3::Y, Vec3::Y));
    }

    #[test]
    fn visibility() {
        // Closer than the mean distance: fully visible
        assert_eq!(1.0, ProbeWeight::visibility(5.0, vec2(10.0, 100.0)));
        assert_eq!(1.0, ProbeWeight::visibility(10.0, vec2(10.0, 100.0)));

        // variance = 1.0, distance past mean = 0.5
        assert_relative_eq!(
            0.8f32.cube(),
            ProbeWeight::visibility(1.5, vec2(1.0, 2.0)),
        );

        // Heavily occluded probes get clamped at the minimum
        assert_eq!(
            ProbeWeight::MIN_VISIBILITY,
            ProbeWeight::visibility(2.0, vec2(1.0, 1.25)),
        );

        // Zero variance exactly at the occluder
        assert_eq!(
            ProbeWeight::MIN_VISIBILITY,
            ProbeWeight::visibility(1.0 + f32::EPSILON, vec2(1.0, 1.0)),
        );

        // Corrupted moments (mean² > mean-squared) still yield a valid weight
        let weight = ProbeWeight::visibility(3.0, vec2(2.0, 3.0));

        assert!(weight > 0.0 && weight <= 1.0);
    }

    #[test]
    fn combine() {
        assert_eq!(1.0, ProbeWeight::combine(1.0, 1.0, Vec3::ONE));
        assert_eq!(0.125, ProbeWeight::combine(1.0, 1.0, vec3(0.5, 0.5, 0.5)));

        // Low weights get crushed by the cubic curve
        assert_relative_eq!(
            0.1 * 0.1 * 0.1 / 0.04,
            ProbeWeight::combine(0.1, 1.0, Vec3::ONE),
            epsilon = 0.00001,
        );

        // ... but never down to zero
        assert!(ProbeWeight::combine(0.0, 0.0, Vec3::ZERO) > 0.0);
    }

    #[test]
    fn weight_is_positive_and_bounded() {
        let mut rng = StdRng::seed_from_u64(1234);

        for _ in 0..10_000 {
            let normal = vec3(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
            .normalize_or_zero();

            let dir = vec3(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
            .normalize_or_zero();

            let distance = rng.gen_range(0.0..200.0);
            let mean = rng.gen_range(0.0..100.0);
            let mean_sq = rng.gen_range(0.0..20000.0);

            let trilinear = vec3(
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
            );

            let backface = ProbeWeight::backface(dir, normal);
            let visibility =
                ProbeWeight::visibility(distance, vec2(mean, mean_sq));

            let weight = ProbeWeight::combine(backface, visibility, trilinear);

            assert!(backface >= 0.0 && backface <= 1.0 + EPSILON);
            assert!(visibility > 0.0 && visibility <= 1.0);
            assert!(weight > 0.0, "weight = {weight}");
            assert!(weight <= 1.0 + EPSILON, "weight = {weight}");
        }
    }

    #[test]
    fn uniform_field() {
        let volume = volume();
        let states = active_probes();
        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(vec4(0.25, 0.5, 1.0, 1.0));

        for normal in normals() {
            for bias in [0.0, 0.1] {
                let actual = sample_irradiance(
                    &volume,
                    &states,
                    &distances,
                    &irradiance,
                    Vec3::ZERO,
                    normal,
                    bias,
                    0.0,
                );

                assert_relative_eq!(0.25 * 2.0 * PI, actual.x, epsilon = 0.0001);
                assert_relative_eq!(0.5 * 2.0 * PI, actual.y, epsilon = 0.0001);
                assert_relative_eq!(1.0 * 2.0 * PI, actual.z, epsilon = 0.0001);
            }
        }
    }

    #[test]
    fn uniform_field_with_gamma_blending() {
        let mut volume = volume();

        volume.params.x = 2.0;
        volume.payload.y = DdgiVolume::FLAG_GAMMA_BLENDING;

        let states = active_probes();
        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(vec4(0.5, 0.5, 0.5, 1.0));

        let actual = sample_irradiance(
            &volume,
            &states,
            &distances,
            &irradiance,
            vec3(0.2, -0.3, 0.1),
            Vec3::Y,
            0.05,
            0.0,
        );

        // 0.5 ^ (gamma / 2), blended, then squared
        assert_relative_eq!(0.25 * 2.0 * PI, actual.x, epsilon = 0.0001);
    }

    #[test]
    fn all_probes_inactive() {
        let volume = volume();
        let states = TestAtlas::uniform(ProbeData::inactive().serialize());
        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(Vec4::ONE);

        for normal in normals() {
            for bias in [0.0, 0.1, 1.0] {
                let actual = sample_irradiance(
                    &volume,
                    &states,
                    &distances,
                    &irradiance,
                    vec3(0.1, 0.2, -0.3),
                    normal,
                    bias,
                    0.0,
                );

                assert_eq!(Vec3::ZERO, actual);
            }
        }
    }

    #[test]
    fn inactive_probes_dont_darken() {
        let volume = volume();
        let grid = volume.grid();
        let mut states = active_probes();

        for coords in [uvec3(0, 0, 0), uvec3(1, 1, 0), uvec3(0, 1, 1)] {
            let idx = grid.coords_to_index(coords);

            states.overrides.push((
                grid.index_to_texel_origin(0, idx),
                ProbeData::inactive().serialize(),
            ));
        }

        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(Vec4::ONE);

        let actual = sample_irradiance(
            &volume,
            &states,
            &distances,
            &irradiance,
            Vec3::ZERO,
            Vec3::Y,
            0.1,
            0.0,
        );

        assert_relative_eq!(2.0 * PI, actual.x, epsilon = 0.0001);
    }

    #[test]
    fn outside_of_all_cascades() {
        let volume = volume();
        let states = active_probes();
        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(Vec4::ONE);

        for pos in [
            vec3(2.5, 0.0, 0.0),
            vec3(0.0, -10.0, 0.0),
            vec3(100.0, 100.0, 100.0),
        ] {
            for dither in [0.0, 0.5, 0.99] {
                let actual = sample_irradiance(
                    &volume,
                    &states,
                    &distances,
                    &irradiance,
                    pos,
                    Vec3::Y,
                    0.1,
                    dither,
                );

                assert_eq!(volume.fallback_irradiance(), actual);
            }
        }
    }

    #[test]
    fn relocated_probe_is_read_from_its_slot() {
        let volume = volume();
        let grid = volume.grid();
        let mut states = TestAtlas::uniform(ProbeData::inactive().serialize());

        // Only one probe is active, so the result must be its irradiance no
        // matter where it has been relocated
        states.overrides.push((
            grid.index_to_texel_origin(0, grid.coords_to_index(uvec3(1, 0, 1))),
            ProbeData::active(vec3(-0.2, 0.1, 0.3)).serialize(),
        ));

        let distances = unoccluded_distances();
        let irradiance = TestAtlas::uniform(vec4(0.1, 0.2, 0.3, 0.0));

        let actual = sample_irradiance(
            &volume,
            &states,
            &distances,
            &irradiance,
            vec3(0.5, 0.5, 0.5),
            Vec3::Y,
            0.1,
            0.0,
        );

        assert_relative_eq!(0.1 * 2.0 * PI, actual.x, epsilon = 0.0001);
        assert_relative_eq!(0.2 * 2.0 * PI, actual.y, epsilon = 0.0001);
        assert_relative_eq!(0.3 * 2.0 * PI, actual.z, epsilon = 0.0001);
    }
}
