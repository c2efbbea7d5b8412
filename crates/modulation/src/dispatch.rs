use sceneconfig::{ModulationMode, ResolvedRegion};
use sensor::{ChannelState, CHANNEL_MAX};

use crate::params::{map, RegionParameters};

/// Divisor applied to raw readings for `xpos`/`ypos` in direct mode.
pub const DIRECT_POSITION_SCALE: f32 = 300.0;

/// Pixel rectangle of one region, origin at the top-left of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Splits the frame into `regions` equal vertical bands.
///
/// Band width is `frame_width / regions` with integer truncation; the
/// remaining `frame_width % regions` pixels on the right are left unrendered.
pub fn partition(frame_width: u32, frame_height: u32, regions: usize) -> Vec<Viewport> {
    let Ok(count) = u32::try_from(regions) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let width = frame_width / count;
    (0..count)
        .map(|index| Viewport {
            x: index * width,
            y: 0,
            width,
            height: frame_height,
        })
        .collect()
}

/// Uniforms the dispatcher knows how to feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Resolution,
    Time,
    FlowerDensity,
    NoiseAmount,
    SwirlIntensity,
    XOffset,
    XPos,
    YPos,
    Size,
}

impl Uniform {
    pub const ALL: [Uniform; 9] = [
        Uniform::Resolution,
        Uniform::Time,
        Uniform::FlowerDensity,
        Uniform::NoiseAmount,
        Uniform::SwirlIntensity,
        Uniform::XOffset,
        Uniform::XPos,
        Uniform::YPos,
        Uniform::Size,
    ];

    /// Name the uniform is declared under in fragment shaders.
    pub fn glsl_name(self) -> &'static str {
        match self {
            Uniform::Resolution => "resolution",
            Uniform::Time => "time",
            Uniform::FlowerDensity => "u_flowerDensity",
            Uniform::NoiseAmount => "u_noiseAmount",
            Uniform::SwirlIntensity => "u_swirlIntensity",
            Uniform::XOffset => "u_xOffset",
            Uniform::XPos => "xpos",
            Uniform::YPos => "ypos",
            Uniform::Size => "uSize",
        }
    }

    pub fn from_glsl_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|uniform| uniform.glsl_name() == name)
    }

    pub fn glsl_type(self) -> &'static str {
        match self {
            Uniform::Resolution => "vec2",
            _ => "float",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

/// Which channels feed a region's left/right inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBinding {
    pub left_channel: usize,
    pub right_channel: usize,
}

impl From<&ResolvedRegion> for RegionBinding {
    fn from(region: &ResolvedRegion) -> Self {
        Self {
            left_channel: region.left_channel,
            right_channel: region.right_channel,
        }
    }
}

/// Renderer side of the dispatcher.
pub trait FrameTarget {
    /// Colour the frame is cleared to before any region draws.
    fn clear(&mut self, color: [f32; 4]);
    /// Selects the program and viewport used by the following uploads.
    fn bind_region(&mut self, region: usize, viewport: Viewport);
    /// Returns `false` when the bound program does not declare `uniform`.
    fn upload(&mut self, uniform: Uniform, value: UniformValue) -> bool;
    /// Draws a fullscreen pass restricted to the bound viewport.
    fn draw(&mut self);
}

/// Maps channels to uniforms for every region and forwards them to `target`.
///
/// Returns the parameters used per region (rest values in direct mode).
pub fn dispatch<T: FrameTarget + ?Sized>(
    frame_width: u32,
    frame_height: u32,
    elapsed: f32,
    mode: ModulationMode,
    channels: &ChannelState,
    regions: &[RegionBinding],
    target: &mut T,
) -> Vec<RegionParameters> {
    target.clear(clear_color(mode, channels));

    let viewports = partition(frame_width, frame_height, regions.len());
    let mut applied = Vec::with_capacity(regions.len());
    for (index, (binding, viewport)) in regions.iter().zip(viewports).enumerate() {
        target.bind_region(index, viewport);

        let resolution = UniformValue::Vec2([viewport.width as f32, viewport.height as f32]);
        let x_offset = UniformValue::Float(viewport.x as f32);
        let (params, uploads) = match mode {
            ModulationMode::Regimes => {
                let params = map(
                    channels.normalized(binding.left_channel),
                    channels.normalized(binding.right_channel),
                );
                let uploads = [
                    (Uniform::Resolution, resolution),
                    (Uniform::Time, UniformValue::Float(elapsed * params.time_scale)),
                    (Uniform::FlowerDensity, UniformValue::Float(params.density)),
                    (Uniform::NoiseAmount, UniformValue::Float(params.noise)),
                    (Uniform::SwirlIntensity, UniformValue::Float(params.swirl)),
                    (Uniform::XOffset, x_offset),
                ];
                (params, uploads)
            }
            ModulationMode::Direct => {
                let xpos = f32::from(channels.raw(binding.left_channel)) / DIRECT_POSITION_SCALE;
                let ypos = f32::from(channels.raw(binding.right_channel)) / DIRECT_POSITION_SCALE;
                let uploads = [
                    (Uniform::Resolution, resolution),
                    (Uniform::Time, UniformValue::Float(elapsed)),
                    (Uniform::XPos, UniformValue::Float(xpos)),
                    (Uniform::YPos, UniformValue::Float(ypos)),
                    (Uniform::Size, UniformValue::Float(1.0)),
                    (Uniform::XOffset, x_offset),
                ];
                (RegionParameters::REST, uploads)
            }
        };

        let skipped: Vec<&'static str> = uploads
            .into_iter()
            .filter(|(uniform, value)| !target.upload(*uniform, *value))
            .map(|(uniform, _)| uniform.glsl_name())
            .collect();
        if !skipped.is_empty() {
            tracing::trace!(region = index, ?skipped, "program does not declare uniforms");
        }

        target.draw();
        applied.push(params);
    }
    applied
}

fn clear_color(mode: ModulationMode, channels: &ChannelState) -> [f32; 4] {
    match mode {
        ModulationMode::Regimes => [0.0, 0.0, 0.0, 1.0],
        ModulationMode::Direct => {
            let scale = |channel: usize| {
                (f32::from(channels.raw(channel)) / f32::from(CHANNEL_MAX)).clamp(0.0, 1.0)
            };
            [scale(3), scale(4), scale(5), scale(2)]
        }
    }
}
