use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::input::EscapeCounter;
use crate::runtime::SystemTimeSource;
use crate::types::RendererConfig;
use crate::FrameSource;

/// GPU state and the window it renders into.
///
/// Field order matters: the surface must drop before the window.
struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, &config.shader_paths)?;
        Ok(Self { gpu, window })
    }

    fn frame_size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }
}

/// Opens the window and drives `source` once per redraw until it closes.
pub(crate) fn run<S>(config: &RendererConfig, mut source: S) -> Result<()>
where
    S: FrameSource + 'static,
{
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let mut builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size);
    if config.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = builder
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state =
        WindowState::new(window, config).context("failed to initialise renderer")?;
    let mut escape = EscapeCounter::new(config.escape_presses);
    let mut clock = SystemTimeSource::new();

    info!(
        regions = config.shader_paths.len(),
        width = state.frame_size().width,
        height = state.frame_size().height,
        fullscreen = config.fullscreen,
        "window ready"
    );
    state.window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed
                            && !event.repeat
                            && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                        {
                            let exit = escape.register_press();
                            debug!(presses = escape.presses(), "escape pressed");
                            if exit {
                                info!("escape limit reached; closing window");
                                elwt.exit();
                            }
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        state.gpu.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        let _ = inner_size_writer.request_inner_size(state.frame_size());
                    }
                    WindowEvent::RedrawRequested => {
                        let size = state.frame_size();
                        if size.width == 0 || size.height == 0 {
                            return;
                        }

                        source.render_frame(
                            clock.sample(),
                            (size.width, size.height),
                            &mut state.gpu,
                        );
                        if let Err(err) = state.gpu.render() {
                            match err {
                                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                    state.gpu.reconfigure();
                                }
                                wgpu::SurfaceError::OutOfMemory => {
                                    error!("surface out of memory; exiting");
                                    elwt.exit();
                                }
                                wgpu::SurfaceError::Timeout => {
                                    warn!("surface timeout; retrying next frame");
                                }
                                other => {
                                    warn!(error = ?other, "surface error; retrying next frame");
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window.request_redraw();
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
