use crate::{data_structures::texture::Texture, render::AttributeSlot};

/// WGSL source of the scene program.
pub const SHADER_SOURCE: &str = include_str!("scene.wgsl");

/// Vertex input of one attribute slot: format and stride of its buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotFormat {
    pub format: wgpu::VertexFormat,
    pub stride: wgpu::BufferAddress,
}

impl SlotFormat {
    /// Input used when a primitive has no data for `slot`: a constant zero
    /// read from a stride 0 buffer.
    pub fn constant(slot: AttributeSlot) -> Self {
        let format = match slot {
            AttributeSlot::Position | AttributeSlot::Normal => wgpu::VertexFormat::Float32x3,
            AttributeSlot::TexCoord => wgpu::VertexFormat::Float32x2,
        };
        Self { format, stride: 0 }
    }
}

/// Everything that differs between the render pipelines of two primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub slots: [SlotFormat; 3],
    pub topology: wgpu::PrimitiveTopology,
    pub strip_index_format: Option<wgpu::IndexFormat>,
}

pub fn mk_scene_pipeline_layout(
    device: &wgpu::Device,
    parameter_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[parameter_layout, texture_layout],
        push_constant_ranges: &[],
    })
}

pub fn mk_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = AttributeSlot::ALL
        .iter()
        .zip(key.slots.iter())
        .map(|(slot, input)| {
            [wgpu::VertexAttribute {
                format: input.format,
                offset: 0,
                shader_location: slot.location(),
            }]
        })
        .collect();
    let vertex_layouts: Vec<wgpu::VertexBufferLayout> = key
        .slots
        .iter()
        .zip(attributes.iter())
        .map(|(input, attributes)| wgpu::VertexBufferLayout {
            array_stride: input.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    mk_render_pipeline(
        device,
        layout,
        color_format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(Texture::DEPTH_FORMAT),
        &vertex_layouts,
        shader,
        key.topology,
        key.strip_index_format,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
    topology: wgpu::PrimitiveTopology,
    strip_index_format: Option<wgpu::IndexFormat>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
