use glam::Vec3;

pub trait Vec3Ext
where
    Self: Sized,
{
    /// Interpolates between `self` and `other`, using a separate factor for
    /// each axis.
    fn mix(self, other: Self, t: Self) -> Self;
}

impl Vec3Ext for Vec3 {
    fn mix(self, other: Self, t: Self) -> Self {
        self + (other - self) * t
    }
}
