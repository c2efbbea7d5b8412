//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and surface and reconfigures
//!   the swapchain on resize.
//! - `pipeline` builds one render pipeline and uniform buffer per region,
//!   swapping in the fallback program when a shader does not compile.
//! - `uniforms` mirrors the injected uniform block.
//! - `state` implements `FrameTarget`, records a frame's draws and encodes
//!   them as one clear pass plus one viewport-restricted pass per region.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
