use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use wgpu::util::DeviceExt;

use crate::compile::{
    compile_fragment_shader, compile_vertex_shader, load_shader_source, wrap_fragment,
    DeclaredUniforms, WrappedShader, FALLBACK_FRAGMENT,
};

use super::uniforms::RegionUniforms;

/// Objects shared by every region pipeline.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("region uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("region pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = compile_vertex_shader(device);

        Self {
            uniform_layout,
            pipeline_layout,
            vertex_module,
        }
    }
}

/// Compiled program plus the uniform buffer owned by one region.
pub(crate) struct RegionPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub declared: DeclaredUniforms,
    pub shader_path: PathBuf,
    pub fallback: bool,
}

impl RegionPipeline {
    /// Builds the program at `shader_path`, substituting the fallback program
    /// when the source cannot be read or fails validation.
    ///
    /// Only a failing fallback is an error.
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        region: usize,
        shader_path: &Path,
    ) -> Result<Self> {
        let label = format!("region {region} fragment");
        let wrapped = wrap_fragment(&load_shader_source(shader_path));

        let (pipeline, declared, fallback) =
            match build_pipeline(device, layouts, surface_format, &label, &wrapped) {
                Ok(pipeline) => (pipeline, wrapped.declared, false),
                Err(err) => {
                    tracing::error!(
                        region,
                        shader = %shader_path.display(),
                        error = %err,
                        "shader failed to compile; drawing fallback"
                    );
                    dump_wrapped_source(region, &wrapped);
                    let fallback = wrap_fragment(FALLBACK_FRAGMENT);
                    let pipeline = build_pipeline(
                        device,
                        layouts,
                        surface_format,
                        "fallback fragment",
                        &fallback,
                    )
                    .map_err(|err| anyhow::anyhow!("fallback shader failed to compile: {err}"))?;
                    (pipeline, fallback.declared, true)
                }
            };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("region uniform buffer"),
            contents: bytemuck::bytes_of(&RegionUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("region uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        if !fallback {
            tracing::info!(region, shader = %shader_path.display(), "compiled region shader");
        }

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            declared,
            shader_path: shader_path.to_path_buf(),
            fallback,
        })
    }
}

/// Compiles and links inside a validation error scope so a bad shader comes
/// back as an error instead of tripping the device's uncaptured handler.
fn build_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
    label: &str,
    wrapped: &WrappedShader,
) -> Result<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let fragment_module = compile_fragment_shader(device, label, wrapped);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        bail!("{err}");
    }
    Ok(pipeline)
}

fn dump_wrapped_source(region: usize, wrapped: &WrappedShader) {
    let path = std::env::temp_dir().join(format!("sinestesia_region{region}_wrapped.frag"));
    match std::fs::write(&path, &wrapped.source) {
        Ok(()) => tracing::debug!(path = %path.display(), "dumped wrapped shader source"),
        Err(err) => tracing::debug!(error = %err, "failed to dump wrapped shader source"),
    }
}
