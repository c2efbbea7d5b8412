use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use modulation::{FrameTarget, Uniform, UniformValue, Viewport};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, trace, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, RegionPipeline};
use super::uniforms::RegionUniforms;

/// Draw recorded during [`FrameTarget::draw`] and encoded by [`GpuState::render`].
#[derive(Debug, Clone, Copy)]
struct RegionDraw {
    region: usize,
    viewport: Viewport,
    uniforms: RegionUniforms,
}

/// Owns the GPU objects for every region and records one frame at a time.
pub(crate) struct GpuState {
    context: GpuContext,
    _layouts: PipelineLayouts,
    regions: Vec<RegionPipeline>,
    clear_color: wgpu::Color,
    bound: Option<RegionDraw>,
    draws: Vec<RegionDraw>,
    frame_count: u64,
    frames_since_last_update: u32,
    last_fps_update: Instant,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        shader_paths: &[PathBuf],
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let layouts = PipelineLayouts::new(&context.device);

        let regions = shader_paths
            .iter()
            .enumerate()
            .map(|(region, path)| {
                RegionPipeline::new(
                    &context.device,
                    &layouts,
                    context.surface_format,
                    region,
                    path,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let fallbacks = regions.iter().filter(|region| region.fallback).count();
        debug!(
            regions = regions.len(),
            fallbacks, "region pipelines ready"
        );

        Ok(Self {
            context,
            _layouts: layouts,
            regions,
            clear_color: wgpu::Color::BLACK,
            bound: None,
            draws: Vec::new(),
            frame_count: 0,
            frames_since_last_update: 0,
            last_fps_update: Instant::now(),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Encodes the recorded clear and region draws, then presents.
    ///
    /// Recorded draws are consumed even when the surface is unavailable.
    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let draws = std::mem::take(&mut self.draws);
        self.bound = None;

        let frame = self.context.surface.get_current_texture()?;
        self.update_stats(draws.len());

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }

        for draw in &draws {
            self.encode_region(&mut encoder, &view, draw);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn encode_region(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draw: &RegionDraw,
    ) {
        let Some(pipeline) = self.regions.get(draw.region) else {
            return;
        };
        let viewport = clamp_viewport(draw.viewport, self.context.size);
        if viewport.is_empty() {
            return;
        }

        // Stage per pass so regions sharing a frame never see each other's values.
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("region uniform staging"),
                contents: bytemuck::bytes_of(&draw.uniforms),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &pipeline.uniform_buffer,
            0,
            std::mem::size_of::<RegionUniforms>() as u64,
        );

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("region pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&pipeline.pipeline);
        render_pass.set_bind_group(0, &pipeline.bind_group, &[]);
        render_pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);
        render_pass.draw(0..3, 0..1);
    }

    fn update_stats(&mut self, draws: usize) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.frames_since_last_update += 1;

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = fps.round(),
                frame_count = self.frame_count,
                draws,
                "render stats"
            );
        }
    }
}

impl FrameTarget for GpuState {
    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn bind_region(&mut self, region: usize, viewport: Viewport) {
        if region >= self.regions.len() {
            warn!(region, "no pipeline for region; ignoring its draws");
            self.bound = None;
            return;
        }
        self.bound = Some(RegionDraw {
            region,
            viewport,
            uniforms: RegionUniforms::new(self.context.size.width, self.context.size.height),
        });
    }

    fn upload(&mut self, uniform: Uniform, value: UniformValue) -> bool {
        let Some(bound) = self.bound.as_mut() else {
            return false;
        };
        let Some(pipeline) = self.regions.get(bound.region) else {
            return false;
        };
        if !pipeline.declared.contains(uniform) {
            trace!(
                region = bound.region,
                uniform = uniform.glsl_name(),
                shader = %pipeline.shader_path.display(),
                "uniform not declared by program"
            );
            return false;
        }
        bound.uniforms.set(uniform, value)
    }

    fn draw(&mut self) {
        if let Some(bound) = self.bound {
            self.draws.push(bound);
        }
    }
}

/// Keeps a viewport inside the surface so `set_viewport` stays valid while a
/// resize is in flight.
fn clamp_viewport(viewport: Viewport, size: PhysicalSize<u32>) -> Viewport {
    let x = viewport.x.min(size.width);
    let y = viewport.y.min(size.height);
    Viewport {
        x,
        y,
        width: viewport.width.min(size.width - x),
        height: viewport.height.min(size.height - y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_inner_viewport() {
        let viewport = Viewport {
            x: 640,
            y: 0,
            width: 640,
            height: 1080,
        };
        assert_eq!(
            clamp_viewport(viewport, PhysicalSize::new(1920, 1080)),
            viewport
        );
    }

    #[test]
    fn clamp_trims_viewport_past_surface() {
        let viewport = Viewport {
            x: 1280,
            y: 0,
            width: 640,
            height: 1080,
        };
        let clamped = clamp_viewport(viewport, PhysicalSize::new(1600, 900));
        assert_eq!(clamped.width, 320);
        assert_eq!(clamped.height, 900);

        let outside = clamp_viewport(viewport, PhysicalSize::new(1000, 900));
        assert!(outside.is_empty());
    }
}
