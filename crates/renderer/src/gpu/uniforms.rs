use bytemuck::{Pod, Zeroable};
use modulation::{Uniform, UniformValue};

/// CPU mirror of the `SinestesiaParams` block injected by `compile`.
///
/// std140: two `vec2`s then eight scalars, 48 bytes with no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct RegionUniforms {
    pub frame: [f32; 2],
    pub resolution: [f32; 2],
    pub time: f32,
    pub flower_density: f32,
    pub noise_amount: f32,
    pub swirl_intensity: f32,
    pub x_offset: f32,
    pub xpos: f32,
    pub ypos: f32,
    pub size: f32,
}

impl RegionUniforms {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame: [frame_width as f32, frame_height as f32],
            ..Self::default()
        }
    }

    /// Stores `value` in the field backing `uniform`.
    ///
    /// Returns `false` when the value's shape does not match the uniform.
    pub fn set(&mut self, uniform: Uniform, value: UniformValue) -> bool {
        match (uniform, value) {
            (Uniform::Resolution, UniformValue::Vec2(v)) => self.resolution = v,
            (Uniform::Resolution, UniformValue::Float(_)) => return false,
            (_, UniformValue::Vec2(_)) => return false,
            (Uniform::Time, UniformValue::Float(v)) => self.time = v,
            (Uniform::FlowerDensity, UniformValue::Float(v)) => self.flower_density = v,
            (Uniform::NoiseAmount, UniformValue::Float(v)) => self.noise_amount = v,
            (Uniform::SwirlIntensity, UniformValue::Float(v)) => self.swirl_intensity = v,
            (Uniform::XOffset, UniformValue::Float(v)) => self.x_offset = v,
            (Uniform::XPos, UniformValue::Float(v)) => self.xpos = v,
            (Uniform::YPos, UniformValue::Float(v)) => self.ypos = v,
            (Uniform::Size, UniformValue::Float(v)) => self.size = v,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_std140_block_size() {
        assert_eq!(std::mem::size_of::<RegionUniforms>(), 48);
    }

    #[test]
    fn set_writes_matching_field() {
        let mut uniforms = RegionUniforms::new(1920, 1080);
        assert!(uniforms.set(Uniform::Resolution, UniformValue::Vec2([640.0, 1080.0])));
        assert!(uniforms.set(Uniform::SwirlIntensity, UniformValue::Float(12.5)));
        assert!(uniforms.set(Uniform::XOffset, UniformValue::Float(640.0)));
        assert_eq!(uniforms.frame, [1920.0, 1080.0]);
        assert_eq!(uniforms.resolution, [640.0, 1080.0]);
        assert_eq!(uniforms.swirl_intensity, 12.5);
        assert_eq!(uniforms.x_offset, 640.0);
    }

    #[test]
    fn set_rejects_mismatched_shape() {
        let mut uniforms = RegionUniforms::new(800, 600);
        assert!(!uniforms.set(Uniform::Resolution, UniformValue::Float(1.0)));
        assert!(!uniforms.set(Uniform::Time, UniformValue::Vec2([1.0, 2.0])));
        assert_eq!(uniforms, RegionUniforms::new(800, 600));
    }
}
