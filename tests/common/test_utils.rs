use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use gltf_viewer::{
    data_structures::{
        document::{
            Accessor, BufferTarget, BufferView, ComponentType, Document, ElementType, Image, Mesh,
            Mode, Node, Primitive, Scene, Texture,
        },
        parameters::ParameterBlock,
    },
    render::{
        Backend, DrawElements, PixelFormat, PrimitiveKey, PrimitiveLayout, SampleType,
        TextureUpload,
    },
};
use instant::{Duration, Instant};

/// One call made on a [`RecordingBackend`]. Handles are plain numbers.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CompileProgram,
    CreateBuffer {
        handle: u32,
        target: BufferTarget,
        contents: Vec<u8>,
    },
    ReleaseBuffer(u32),
    CreateVertexArray(u32),
    ConfigurePrimitive {
        vertex_array: u32,
        key: PrimitiveKey,
        layout: PrimitiveLayout<u32>,
    },
    DeleteVertexArray(u32),
    CreateTexture {
        handle: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        sample_type: SampleType,
    },
    BeginFrame(ParameterBlock),
    BindVertexArray(u32),
    BindIndexBuffer(u32),
    BindTexture(Option<u32>),
    DrawElements(DrawElements),
    UnbindVertexArray,
    EndFrame,
    Resize(u32, u32),
}

/// Shared view on the commands of a backend, still readable after the
/// backend itself was dropped.
#[derive(Clone, Default)]
pub struct CommandLog(Rc<RefCell<Vec<Command>>>);

impl CommandLog {
    pub fn commands(&self) -> Vec<Command> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn draws(&self) -> Vec<DrawElements> {
        self.0
            .borrow()
            .iter()
            .filter_map(|command| match command {
                Command::DrawElements(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Handles and targets of every created buffer, in creation order.
    pub fn created_buffers(&self) -> Vec<(u32, BufferTarget)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|command| match command {
                Command::CreateBuffer { handle, target, .. } => Some((*handle, *target)),
                _ => None,
            })
            .collect()
    }

    pub fn released_buffers(&self) -> Vec<u32> {
        self.0
            .borrow()
            .iter()
            .filter_map(|command| match command {
                Command::ReleaseBuffer(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn configured(&self) -> Vec<(PrimitiveKey, PrimitiveLayout<u32>)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|command| match command {
                Command::ConfigurePrimitive { key, layout, .. } => Some((*key, layout.clone())),
                _ => None,
            })
            .collect()
    }

    fn push(&self, command: Command) {
        self.0.borrow_mut().push(command);
    }
}

/// A [`Backend`] that records every call instead of talking to a GPU.
#[derive(Default)]
pub struct RecordingBackend {
    log: CommandLog,
    next_handle: u32,
    /// Make `compile_program` fail.
    pub fail_compile: bool,
    /// Make `create_texture` fail.
    pub fail_textures: bool,
    /// Make `begin_frame` report that no surface frame is available.
    pub no_frames: bool,
    pub buffers: HashMap<u32, Vec<u8>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Backend for RecordingBackend {
    type Buffer = u32;
    type Texture = u32;
    type VertexArray = u32;

    fn compile_program(&mut self) -> anyhow::Result<()> {
        self.log.push(Command::CompileProgram);
        if self.fail_compile {
            anyhow::bail!("program rejected");
        }
        Ok(())
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> u32 {
        let handle = self.handle();
        self.buffers.insert(handle, contents.to_vec());
        self.log.push(Command::CreateBuffer {
            handle,
            target,
            contents: contents.to_vec(),
        });
        handle
    }

    fn release_buffer(&mut self, buffer: u32) {
        self.buffers.remove(&buffer);
        self.log.push(Command::ReleaseBuffer(buffer));
    }

    fn create_vertex_array(&mut self) -> u32 {
        let handle = self.handle();
        self.log.push(Command::CreateVertexArray(handle));
        handle
    }

    fn configure_primitive(
        &mut self,
        vertex_array: &u32,
        key: PrimitiveKey,
        layout: PrimitiveLayout<u32>,
    ) {
        self.log.push(Command::ConfigurePrimitive {
            vertex_array: *vertex_array,
            key,
            layout,
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: u32) {
        self.log.push(Command::DeleteVertexArray(vertex_array));
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> anyhow::Result<u32> {
        if self.fail_textures {
            anyhow::bail!("texture rejected");
        }
        let handle = self.handle();
        self.log.push(Command::CreateTexture {
            handle,
            width: upload.width,
            height: upload.height,
            format: upload.format,
            sample_type: upload.sample_type,
        });
        Ok(handle)
    }

    fn begin_frame(&mut self, parameters: &ParameterBlock) -> anyhow::Result<bool> {
        if self.no_frames {
            return Ok(false);
        }
        self.log.push(Command::BeginFrame(parameters.clone()));
        Ok(true)
    }

    fn bind_vertex_array(&mut self, vertex_array: &u32) {
        self.log.push(Command::BindVertexArray(*vertex_array));
    }

    fn bind_index_buffer(&mut self, buffer: &u32) {
        self.log.push(Command::BindIndexBuffer(*buffer));
    }

    fn bind_texture(&mut self, texture: Option<&u32>) {
        self.log.push(Command::BindTexture(texture.copied()));
    }

    fn draw_elements(&mut self, draw: &DrawElements) {
        self.log.push(Command::DrawElements(*draw));
    }

    fn unbind_vertex_array(&mut self) {
        self.log.push(Command::UnbindVertexArray);
    }

    fn end_frame(&mut self) -> anyhow::Result<()> {
        self.log.push(Command::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.push(Command::Resize(width, height));
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn now(&self) -> Instant {
        self.0.get()
    }

    pub fn boxed(&self) -> Box<dyn Fn() -> Instant> {
        let clock = self.0.clone();
        Box::new(move || clock.get())
    }
}

pub fn node(mesh: Option<usize>, children: Vec<usize>) -> Node {
    Node {
        name: None,
        mesh,
        children,
    }
}

pub fn view(offset: usize, length: usize, target: Option<BufferTarget>) -> BufferView {
    BufferView {
        buffer: 0,
        byte_offset: offset,
        byte_length: length,
        byte_stride: None,
        target,
    }
}

pub fn accessor(
    view: usize,
    count: usize,
    component_type: ComponentType,
    element_type: ElementType,
) -> Accessor {
    Accessor {
        buffer_view: Some(view),
        byte_offset: 0,
        count,
        component_type,
        element_type,
        normalized: false,
    }
}

pub fn primitive(attributes: &[(&str, usize)], indices: Option<usize>) -> Primitive {
    Primitive {
        attributes: attributes
            .iter()
            .map(|(semantic, accessor)| (semantic.to_string(), *accessor))
            .collect::<BTreeMap<_, _>>(),
        indices,
        mode: Mode::Triangles,
    }
}

/// One triangle: 3 positions in view 0 and three u16 indices in view 1.
pub fn triangle_bytes() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bytes = bytemuck::cast_slice(&positions).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes
}

/// Node 0 has no mesh and one child, node 1, whose mesh has one indexed
/// triangle.
pub fn two_node_document() -> Document {
    Document {
        nodes: vec![node(None, vec![1]), node(Some(0), vec![])],
        meshes: vec![Mesh {
            name: Some("triangle".to_owned()),
            primitives: vec![primitive(&[("POSITION", 0)], Some(1))],
        }],
        accessors: vec![
            accessor(0, 3, ComponentType::F32, ElementType::Vec3),
            accessor(1, 3, ComponentType::U16, ElementType::Scalar),
        ],
        buffer_views: vec![
            view(0, 36, Some(BufferTarget::ArrayBuffer)),
            view(36, 6, Some(BufferTarget::ElementArrayBuffer)),
        ],
        buffers: vec![triangle_bytes()],
        scenes: vec![Scene { nodes: vec![0] }],
        default_scene: Some(0),
        ..Default::default()
    }
}

/// [`two_node_document`] plus one `width` x `height` image behind texture 0.
pub fn textured_document(components: u8, bits: u8) -> Document {
    let (width, height) = (2, 2);
    let size = width as usize * height as usize * components as usize * (bits as usize / 8);
    Document {
        images: vec![Image {
            width,
            height,
            components,
            bits,
            pixels: vec![255; size],
        }],
        textures: vec![Texture { source: Some(0) }],
        ..two_node_document()
    }
}
