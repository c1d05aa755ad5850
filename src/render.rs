//! The GPU backend seam.
//!
//! Scene binding, scene drawing and the frame loop are written against the
//! [`Backend`] trait instead of a concrete graphics API. The trait models the
//! explicit state machine those algorithms need: buffers keyed by handle, an
//! opaque vertex array that remembers how each primitive reads its vertex
//! attributes, one bound texture and indexed draw calls. [`crate::context`]
//! implements it on top of wgpu; the integration tests implement it with a
//! recorder.
//!
//! # Key types
//!
//! - [`Backend`] is the trait itself
//! - [`PrimitiveLayout`] / [`AttributeBinding`] describe vertex attribute state
//! - [`DrawElements`] is one indexed draw call
//! - [`TextureUpload`] is a decoded image on its way to the GPU

use crate::data_structures::{
    document::{BufferTarget, ComponentType, Mode},
    parameters::ParameterBlock,
};

/// Identifies a primitive by its position in the document: the mesh index and
/// the primitive index within that mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveKey {
    pub mesh: usize,
    pub primitive: usize,
}

/// Vertex attribute slots the program reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeSlot {
    Position,
    Normal,
    TexCoord,
}

impl AttributeSlot {
    pub const ALL: [AttributeSlot; 3] = [
        AttributeSlot::Position,
        AttributeSlot::Normal,
        AttributeSlot::TexCoord,
    ];

    /// `POSITION` → 0, `NORMAL` → 1, `TEXCOORD_0` → 2. Every other semantic has
    /// no slot.
    pub fn from_semantic(semantic: &str) -> Option<Self> {
        match semantic {
            "POSITION" => Some(AttributeSlot::Position),
            "NORMAL" => Some(AttributeSlot::Normal),
            "TEXCOORD_0" => Some(AttributeSlot::TexCoord),
            _ => None,
        }
    }

    /// Shader location of the slot.
    pub fn location(self) -> u32 {
        match self {
            AttributeSlot::Position => 0,
            AttributeSlot::Normal => 1,
            AttributeSlot::TexCoord => 2,
        }
    }
}

/// How one attribute slot reads its data from a vertex buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeBinding<B> {
    pub slot: AttributeSlot,
    pub buffer: B,
    pub components: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub byte_stride: usize,
    pub byte_offset: usize,
}

/// Everything the backend needs to know to draw one primitive later on.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveLayout<B> {
    pub mode: Mode,
    pub index_type: Option<ComponentType>,
    pub attributes: Vec<AttributeBinding<B>>,
}

/// One indexed draw call, reading `count` indices of `index_type` starting
/// `byte_offset` bytes into the currently bound index buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawElements {
    pub key: PrimitiveKey,
    pub mode: Mode,
    pub count: usize,
    pub index_type: ComponentType,
    pub byte_offset: usize,
}

/// Channel layout of an uploaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    R,
    Rg,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::R => 1,
            PixelFormat::Rg => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Storage type of one channel of an uploaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
}

impl SampleType {
    pub fn size(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub sample_type: SampleType,
    pub pixels: &'a [u8],
}

/// GPU operations used by the binder, the renderer and the frame loop.
///
/// All calls happen on the rendering thread. Handles are owned by the caller
/// and must be handed back through `release_buffer` / `delete_vertex_array`
/// while the backend is still alive.
pub trait Backend {
    type Buffer: Clone;
    type Texture;
    type VertexArray;

    /// Prepare the shader program and everything derived from it.
    fn compile_program(&mut self) -> anyhow::Result<()>;

    /// Allocate a buffer for `target` and upload `contents` into it.
    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> Self::Buffer;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    fn create_vertex_array(&mut self) -> Self::VertexArray;

    /// Record how the primitive `key` reads its vertex attributes. The layout
    /// keeps its own handles to the buffers it references.
    fn configure_primitive(
        &mut self,
        vertex_array: &Self::VertexArray,
        key: PrimitiveKey,
        layout: PrimitiveLayout<Self::Buffer>,
    );

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> anyhow::Result<Self::Texture>;

    /// Start a frame: clear colour and depth and upload the parameter block.
    ///
    /// Returns `Ok(false)` when no frame can be drawn right now; the caller
    /// must then skip every draw call until the next `begin_frame`.
    fn begin_frame(&mut self, parameters: &ParameterBlock) -> anyhow::Result<bool>;

    fn bind_vertex_array(&mut self, vertex_array: &Self::VertexArray);

    fn bind_index_buffer(&mut self, buffer: &Self::Buffer);

    /// Bind `texture`, or the backend's neutral texture for `None`.
    fn bind_texture(&mut self, texture: Option<&Self::Texture>);

    fn draw_elements(&mut self, draw: &DrawElements);

    fn unbind_vertex_array(&mut self);

    /// Submit and present the frame started by `begin_frame`.
    fn end_frame(&mut self) -> anyhow::Result<()>;

    fn resize(&mut self, width: u32, height: u32);
}
