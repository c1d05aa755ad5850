//! The wgpu implementation of [`Backend`].
//!
//! [`Context`] owns the window surface, device and queue, the depth buffer,
//! the uniform buffer of the scene program and one render pipeline per
//! distinct vertex layout. Vertex arrays are ids into a table of configured
//! primitives; each configured primitive keeps its own handles to the vertex
//! buffers it reads, so the buffers outlive the binder's references to them.
//!
//! A frame lives from `begin_frame` to `end_frame` in [`Frame`], which holds
//! the render pass for the whole scene traversal.

use std::{collections::HashMap, iter, sync::Arc};

use anyhow::{Context as _, bail};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    data_structures::{
        document::{BufferTarget, ComponentType, Mode},
        parameters::ParameterBlock,
        texture,
    },
    pipelines::scene::{
        PipelineKey, SHADER_SOURCE, SlotFormat, mk_scene_pipeline, mk_scene_pipeline_layout,
    },
    render::{AttributeSlot, Backend, DrawElements, PrimitiveKey, PrimitiveLayout, TextureUpload},
    resources::texture::{parameter_layout, texture_layout, to_rgba8},
};

/// A colour texture together with the bind group that exposes it to the
/// program.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: texture::Texture,
    pub bind_group: wgpu::BindGroup,
}

/// Handle of a vertex array created by [`Context`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct VertexArrayId(u64);

#[derive(Debug)]
struct Program {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
}

#[derive(Debug)]
struct ConfiguredPrimitive {
    pipeline: PipelineKey,
    vertex_buffers: [(Arc<wgpu::Buffer>, wgpu::BufferAddress); 3],
    index_format: wgpu::IndexFormat,
}

struct Frame {
    output: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
    pass: wgpu::RenderPass<'static>,
    vertex_array: Option<u64>,
    index_buffer: Option<Arc<wgpu::Buffer>>,
}

pub struct Context {
    pub(crate) window: Arc<Window>,
    runtime: tokio::runtime::Handle,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
    depth_texture: texture::Texture,
    texture_layout: wgpu::BindGroupLayout,
    parameter_layout: wgpu::BindGroupLayout,
    parameter_buffer: wgpu::Buffer,
    parameter_bind_group: wgpu::BindGroup,
    fallback_texture: GpuTexture,
    zero_buffer: Arc<wgpu::Buffer>,
    program: Option<Program>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    vertex_arrays: HashMap<u64, HashMap<PrimitiveKey, ConfiguredPrimitive>>,
    next_vertex_array: u64,
    frame: Option<Frame>,
}

impl Context {
    /// Set up wgpu for `window`. `runtime` drives the futures wgpu hands out
    /// after start-up, such as shader validation results.
    pub async fn new(window: Arc<Window>, runtime: tokio::runtime::Handle) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can draw to this window")?;
        log::info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The program writes linear colour; an sRGB surface does the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let parameter_layout = parameter_layout(&device);
        let texture_layout = texture_layout(&device);

        let parameter_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Parameter Buffer"),
            contents: ParameterBlock::default().as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let parameter_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &parameter_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: parameter_buffer.as_entire_binding(),
            }],
            label: Some("parameter_bind_group"),
        });

        let fallback = texture::Texture::create_fallback(&device, &queue);
        let fallback_texture = GpuTexture {
            bind_group: fallback.bind_group(&device, &texture_layout)?,
            texture: fallback,
        };

        let zero_buffer = Arc::new(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Zero Vertex Buffer"),
            contents: &[0u8; 16],
            usage: wgpu::BufferUsages::VERTEX,
        }));

        Ok(Self {
            window,
            runtime,
            surface,
            device,
            queue,
            config,
            clear_colour: wgpu::Color::BLACK,
            depth_texture,
            texture_layout,
            parameter_layout,
            parameter_buffer,
            parameter_bind_group,
            fallback_texture,
            zero_buffer,
            program: None,
            pipelines: HashMap::new(),
            vertex_arrays: HashMap::new(),
            next_vertex_array: 0,
            frame: None,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
    }

    fn slot_input(
        &self,
        key: PrimitiveKey,
        layout: &PrimitiveLayout<Arc<wgpu::Buffer>>,
        slot: AttributeSlot,
    ) -> (SlotFormat, Arc<wgpu::Buffer>, wgpu::BufferAddress) {
        let constant = (SlotFormat::constant(slot), self.zero_buffer.clone(), 0);
        let Some(binding) = layout.attributes.iter().find(|a| a.slot == slot) else {
            return constant;
        };
        let Some(format) =
            vertex_format(binding.component_type, binding.components, binding.normalized)
        else {
            log::warn!(
                "{:?} of primitive {} of mesh {}: {} x {:?} (normalized: {}) is not a supported vertex format",
                slot,
                key.primitive,
                key.mesh,
                binding.components,
                binding.component_type,
                binding.normalized
            );
            return constant;
        };
        let alignment = wgpu::VERTEX_STRIDE_ALIGNMENT as usize;
        if binding.byte_stride % alignment != 0 || binding.byte_offset % alignment != 0 {
            log::warn!(
                "{:?} of primitive {} of mesh {}: stride {} / offset {} are not {}-byte aligned",
                slot,
                key.primitive,
                key.mesh,
                binding.byte_stride,
                binding.byte_offset,
                alignment
            );
            return constant;
        }
        (
            SlotFormat {
                format,
                stride: binding.byte_stride as wgpu::BufferAddress,
            },
            binding.buffer.clone(),
            binding.byte_offset as wgpu::BufferAddress,
        )
    }
}

impl Backend for Context {
    type Buffer = Arc<wgpu::Buffer>;
    type Texture = GpuTexture;
    type VertexArray = VertexArrayId;

    fn compile_program(&mut self) -> anyhow::Result<()> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
            });
        let layout =
            mk_scene_pipeline_layout(&self.device, &self.parameter_layout, &self.texture_layout);
        if let Some(error) = self.runtime.block_on(self.device.pop_error_scope()) {
            bail!("The scene program failed to compile: {}", error);
        }
        self.pipelines.clear();
        self.program = Some(Program { shader, layout });
        log::info!("Scene program compiled");
        Ok(())
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> Self::Buffer {
        let usage = match target {
            BufferTarget::ArrayBuffer => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArrayBuffer => wgpu::BufferUsages::INDEX,
        };
        Arc::new(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match target {
                BufferTarget::ArrayBuffer => "Vertex Buffer",
                BufferTarget::ElementArrayBuffer => "Index Buffer",
            }),
            contents,
            usage,
        }))
    }

    fn release_buffer(&mut self, buffer: Self::Buffer) {
        // Vertex arrays may still share the buffer; it is freed with the last handle.
        drop(buffer);
    }

    fn create_vertex_array(&mut self) -> Self::VertexArray {
        let id = self.next_vertex_array;
        self.next_vertex_array += 1;
        self.vertex_arrays.insert(id, HashMap::new());
        VertexArrayId(id)
    }

    fn configure_primitive(
        &mut self,
        vertex_array: &Self::VertexArray,
        key: PrimitiveKey,
        layout: PrimitiveLayout<Self::Buffer>,
    ) {
        let Some(topology) = topology(layout.mode) else {
            log::warn!(
                "Primitive {} of mesh {} uses {:?}, which cannot be drawn",
                key.primitive,
                key.mesh,
                layout.mode
            );
            return;
        };
        let Some(index_type) = layout.index_type else {
            return;
        };
        let Some(index_format) = index_format(index_type) else {
            log::warn!(
                "Primitive {} of mesh {} has {:?} indices, which cannot be drawn",
                key.primitive,
                key.mesh,
                index_type
            );
            return;
        };
        let Some(program) = &self.program else {
            log::error!("Primitives configured before the program was compiled");
            return;
        };

        let [position, normal, tex_coords] =
            AttributeSlot::ALL.map(|slot| self.slot_input(key, &layout, slot));
        let pipeline = PipelineKey {
            slots: [position.0, normal.0, tex_coords.0],
            topology,
            strip_index_format: topology.is_strip().then_some(index_format),
        };
        if !self.pipelines.contains_key(&pipeline) {
            log::debug!("Building a render pipeline for {:?}", pipeline);
            let render_pipeline = mk_scene_pipeline(
                &self.device,
                &program.layout,
                &program.shader,
                self.config.format,
                &pipeline,
            );
            self.pipelines.insert(pipeline, render_pipeline);
        }

        let primitive = ConfiguredPrimitive {
            pipeline,
            vertex_buffers: [
                (position.1, position.2),
                (normal.1, normal.2),
                (tex_coords.1, tex_coords.2),
            ],
            index_format,
        };
        match self.vertex_arrays.get_mut(&vertex_array.0) {
            Some(primitives) => {
                primitives.insert(key, primitive);
            }
            None => log::warn!("Vertex array {} was already deleted", vertex_array.0),
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray) {
        self.vertex_arrays.remove(&vertex_array.0);
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> anyhow::Result<Self::Texture> {
        let rgba = to_rgba8(upload)?;
        let texture =
            texture::Texture::from_rgba(&self.device, &self.queue, &rgba, Some("scene texture"));
        Ok(GpuTexture {
            bind_group: texture.bind_group(&self.device, &self.texture_layout)?,
            texture,
        })
    }

    fn begin_frame(&mut self, parameters: &ParameterBlock) -> anyhow::Result<bool> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for a surface texture");
                return Ok(false);
            }
            Err(e) => return Err(e).context("Unable to acquire a surface texture"),
        };

        self.queue
            .write_buffer(&self.parameter_buffer, 0, parameters.as_bytes());

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            })
            .forget_lifetime();
        pass.set_bind_group(0, &self.parameter_bind_group, &[]);

        self.frame = Some(Frame {
            output,
            encoder,
            pass,
            vertex_array: None,
            index_buffer: None,
        });
        Ok(true)
    }

    fn bind_vertex_array(&mut self, vertex_array: &Self::VertexArray) {
        if let Some(frame) = self.frame.as_mut() {
            frame.vertex_array = Some(vertex_array.0);
        }
    }

    fn bind_index_buffer(&mut self, buffer: &Self::Buffer) {
        if let Some(frame) = self.frame.as_mut() {
            frame.index_buffer = Some(buffer.clone());
        }
    }

    fn bind_texture(&mut self, texture: Option<&Self::Texture>) {
        if let Some(frame) = self.frame.as_mut() {
            let texture = texture.unwrap_or(&self.fallback_texture);
            frame.pass.set_bind_group(1, &texture.bind_group, &[]);
        }
    }

    fn draw_elements(&mut self, draw: &DrawElements) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let Some(primitive) = frame
            .vertex_array
            .and_then(|id| self.vertex_arrays.get(&id))
            .and_then(|primitives| primitives.get(&draw.key))
        else {
            log::trace!("{:?} was not configured; skipping its draw", draw.key);
            return;
        };
        let (Some(pipeline), Some(index_buffer)) =
            (self.pipelines.get(&primitive.pipeline), frame.index_buffer.as_ref())
        else {
            return;
        };
        if index_format(draw.index_type) != Some(primitive.index_format) {
            log::warn!(
                "{:?} is drawn with {:?} indices but was configured for {:?}",
                draw.key,
                draw.index_type,
                primitive.index_format
            );
            return;
        }

        frame.pass.set_pipeline(pipeline);
        for (slot, (buffer, offset)) in primitive.vertex_buffers.iter().enumerate() {
            frame.pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
        }
        frame.pass.set_index_buffer(
            index_buffer.slice(draw.byte_offset as wgpu::BufferAddress..),
            primitive.index_format,
        );
        frame.pass.draw_indexed(0..draw.count as u32, 0, 0..1);
    }

    fn unbind_vertex_array(&mut self) {
        if let Some(frame) = self.frame.as_mut() {
            frame.vertex_array = None;
            frame.index_buffer = None;
        }
    }

    fn end_frame(&mut self) -> anyhow::Result<()> {
        let Some(Frame {
            output,
            encoder,
            pass,
            ..
        }) = self.frame.take()
        else {
            return Ok(());
        };
        drop(pass);
        self.queue.submit(iter::once(encoder.finish()));
        self.window.pre_present_notify();
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }
}

fn topology(mode: Mode) -> Option<wgpu::PrimitiveTopology> {
    match mode {
        Mode::Points => Some(wgpu::PrimitiveTopology::PointList),
        Mode::Lines => Some(wgpu::PrimitiveTopology::LineList),
        Mode::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        Mode::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
        Mode::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        Mode::LineLoop | Mode::TriangleFan => None,
    }
}

fn index_format(component_type: ComponentType) -> Option<wgpu::IndexFormat> {
    match component_type {
        ComponentType::U16 => Some(wgpu::IndexFormat::Uint16),
        ComponentType::U32 => Some(wgpu::IndexFormat::Uint32),
        _ => None,
    }
}

fn vertex_format(
    component_type: ComponentType,
    components: usize,
    normalized: bool,
) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat::*;
    match (component_type, components, normalized) {
        (ComponentType::F32, 1, _) => Some(Float32),
        (ComponentType::F32, 2, _) => Some(Float32x2),
        (ComponentType::F32, 3, _) => Some(Float32x3),
        (ComponentType::F32, 4, _) => Some(Float32x4),
        (ComponentType::U8, 2, true) => Some(Unorm8x2),
        (ComponentType::U8, 4, true) => Some(Unorm8x4),
        (ComponentType::I8, 2, true) => Some(Snorm8x2),
        (ComponentType::I8, 4, true) => Some(Snorm8x4),
        (ComponentType::U16, 2, true) => Some(Unorm16x2),
        (ComponentType::U16, 4, true) => Some(Unorm16x4),
        (ComponentType::I16, 2, true) => Some(Snorm16x2),
        (ComponentType::I16, 4, true) => Some(Snorm16x4),
        _ => None,
    }
}
