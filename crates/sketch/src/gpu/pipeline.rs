use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::compile::{create_shader_module, AdaptedSources};
use crate::geometry::QuadGeometry;
use crate::types::ShaderStageKind;
use crate::uniforms::{UniformLayout, UNIFORM_BINDING};

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x2,
    offset: 0,
    shader_location: QuadGeometry::ATTRIBUTE_LOCATION,
}];

/// Linked program plus the uniform buffer sized for its block.
pub struct SketchPipeline {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) uniform_bind_group: wgpu::BindGroup,
    layout: UniformLayout,
}

impl SketchPipeline {
    pub(crate) fn new(
        device: &wgpu::Device,
        sources: &AdaptedSources,
        layout: &UniformLayout,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        quad_stride: u64,
    ) -> Result<Self> {
        let vertex_module = create_shader_module(
            device,
            "sketch vertex",
            ShaderStageKind::Vertex,
            &sources.vertex,
        )?;
        let fragment_module = create_shader_module(
            device,
            "sketch fragment",
            ShaderStageKind::Fragment,
            &sources.fragment,
        )?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sketch uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sketch uniforms"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sketch uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sketch pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sketch pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: quad_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &QUAD_ATTRIBUTES,
                }],
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
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("failed to link sketch pipeline: {err}");
        }

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            layout: layout.clone(),
        })
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }
}

/// The fullscreen quad resident in a vertex buffer.
pub struct QuadBuffer {
    pub(crate) buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl QuadBuffer {
    pub(crate) fn new(device: &wgpu::Device, quad: &QuadGeometry) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sketch quad"),
            contents: quad.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            buffer,
            vertex_count: quad.vertex_count(),
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
