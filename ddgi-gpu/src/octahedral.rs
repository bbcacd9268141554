use glam::{vec2, vec3, UVec2, Vec2, Vec3, Vec3Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

pub struct Octahedral;

impl Octahedral {
    /// Maps a direction onto the `<-1.0, 1.0>` square using the octahedral
    /// projection; the lower hemisphere gets folded over the diagonals.
    ///
    /// A zero-length direction maps onto the center of the square.
    pub fn encode(dir: Vec3) -> Vec2 {
        let l1 = dir.x.abs() + dir.y.abs() + dir.z.abs();

        if l1 == 0.0 {
            return Vec2::ZERO;
        }

        let n = dir / l1;

        if n.z >= 0.0 {
            n.xy()
        } else {
            let t = Vec2::ONE - n.yx().abs();

            vec2(
                if n.x >= 0.0 { t.x } else { -t.x },
                if n.y >= 0.0 { t.y } else { -t.y },
            )
        }
    }

    /// See: [`Self::encode()`].
    pub fn decode(uv: Vec2) -> Vec3 {
        let mut n = vec3(uv.x, uv.y, 1.0 - uv.x.abs() - uv.y.abs());
        let t = (-n.z).max(0.0);

        n.x -= t.copysign(n.x);
        n.y -= t.copysign(n.y);
        n.normalize()
    }

    /// Returns direction passing through the center of given interior texel
    /// of a `resolution`-sized octahedral map.
    pub fn texel_direction(texel: UVec2, resolution: u32) -> Vec3 {
        let uv = (texel.as_vec2() + 0.5) / (resolution as f32);

        Self::decode(uv * 2.0 - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn encode() {
        assert_eq!(vec2(0.0, 0.0), Octahedral::encode(Vec3::Z));
        assert_eq!(vec2(1.0, 0.0), Octahedral::encode(Vec3::X));
        assert_eq!(vec2(0.0, -1.0), Octahedral::encode(-Vec3::Y));
        assert_eq!(Vec2::ZERO, Octahedral::encode(Vec3::ZERO));

        // -Z lands in the corners of the square
        assert_eq!(1.0, Octahedral::encode(-Vec3::Z).x.abs());
        assert_eq!(1.0, Octahedral::encode(-Vec3::Z).y.abs());
    }

    #[test]
    fn decode() {
        for dir in [
            vec3(0.26, 0.53, 0.80),
            vec3(-0.7, 0.1, -0.3),
            vec3(0.0, -1.0, -1.0),
            vec3(-1.0, -1.0, -1.0),
        ] {
            let dir = dir.normalize();
            let uv = Octahedral::encode(dir);

            assert!(uv.abs().max_element() <= 1.0);

            let actual = Octahedral::decode(uv);

            assert_relative_eq!(dir.x, actual.x, epsilon = EPSILON);
            assert_relative_eq!(dir.y, actual.y, epsilon = EPSILON);
            assert_relative_eq!(dir.z, actual.z, epsilon = EPSILON);
        }
    }

    #[test]
    fn texel_direction() {
        let dir = Octahedral::texel_direction(uvec2(3, 3), 6);

        // Texel (3, 3) of a 6x6 map sits just off the center of the square,
        // so its direction points (almost) straight up the Z axis
        assert!(dir.z > 0.9);
        assert_relative_eq!(1.0, dir.length(), epsilon = EPSILON);
    }
}
