//! Turns sensor channels into per-region shader uniforms.
//!
//! ```text
//!   ChannelState ──▶ map(leftN, rightN) ──▶ RegionParameters
//!                                               │
//!   partition(width, height, N) ──▶ Viewport ───┴─▶ FrameTarget uploads + draw
//! ```

mod dispatch;
mod params;

pub use dispatch::{
    dispatch, partition, FrameTarget, RegionBinding, Uniform, UniformValue, Viewport,
    DIRECT_POSITION_SCALE,
};
pub use params::{
    map, Regime, RegionParameters, BASE_DENSITY, BASE_NOISE, MAX_DENSITY, MAX_NOISE, MAX_SWIRL,
    MAX_TIME_SCALE, MIN_NOISE, MIN_TIME_SCALE,
};
pub use sceneconfig::ModulationMode;
