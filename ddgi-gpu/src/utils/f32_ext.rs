pub trait F32Ext
where
    Self: Sized,
{
    fn sqr(self) -> Self;
    fn cube(self) -> Self;
    fn saturate(self) -> Self;
}

impl F32Ext for f32 {
    fn sqr(self) -> Self {
        self * self
    }

    fn cube(self) -> Self {
        self * self * self
    }

    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }
}
