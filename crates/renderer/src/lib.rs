//! Renderer crate for Sinestesia.
//!
//! Opens a window, compiles one fragment shader per region, and every frame
//! hands a [`FrameTarget`] to the caller's [`FrameSource`] so it can decide
//! the clear colour, uniforms and draws:
//!
//! ```text
//!   Renderer::run ──▶ winit event loop ──▶ RedrawRequested
//!                                              │
//!        FrameSource::render_frame(time, size, &mut GpuState)
//!                                              │
//!                 clear / bind_region / upload / draw ──▶ wgpu passes
//! ```
//!
//! Fragment shaders are written in desktop GLSL with loose `uniform`
//! declarations; `compile` rewrites them into Vulkan-flavoured GLSL so `wgpu`
//! can consume them, and records which known uniforms each program declares.

mod compile;
mod gpu;
mod input;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use modulation::FrameTarget;
pub use runtime::TimeSample;
pub use types::RendererConfig;

/// Per-frame driver supplied by the application.
pub trait FrameSource {
    /// Issues one frame worth of calls against `target`.
    ///
    /// `frame_size` is the current surface size in physical pixels.
    fn render_frame(
        &mut self,
        time: TimeSample,
        frame_size: (u32, u32),
        target: &mut dyn FrameTarget,
    );
}

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and drives `source` until the window closes.
    ///
    /// Fails when the window, surface or GPU device cannot be created.
    pub fn run<S>(&mut self, source: S) -> Result<()>
    where
        S: FrameSource + 'static,
    {
        window::run(&self.config, source)
    }
}
