//! In-memory glTF 2.0 document.
//!
//! [`Document`] is a flat arena: every collection is an ordered `Vec` and all
//! cross references (node children, mesh of a node, accessor of an attribute,
//! buffer view of an accessor, ...) are plain indices into those vectors. This
//! is the shape the glTF JSON already has, so the loader in
//! [`crate::resources`] converts one-to-one and tests can build documents by
//! hand.
//!
//! The document is immutable once loaded. Lookups through the accessor
//! methods (`node`, `mesh`, ...) treat an out-of-range index as a broken
//! document and panic with the offending index.

use std::collections::BTreeMap;

/// Intended GPU usage of a buffer view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`, 34962).
    ArrayBuffer,
    /// Index data (`ELEMENT_ARRAY_BUFFER`, 34963).
    ElementArrayBuffer,
}

/// Scalar type of each component of an accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

/// Shape of one accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    /// Number of components per element.
    pub fn components(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 | ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }
}

/// Primitive topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

/// One drawable unit of a mesh.
///
/// `attributes` maps a semantic name (`POSITION`, `NORMAL`, `TEXCOORD_0`, ...)
/// to an accessor index, exactly like the JSON object it comes from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub mode: Mode,
}

/// Typed view into a buffer view.
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub normalized: bool,
}

impl Accessor {
    /// Size of one tightly packed element in bytes.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.element_type.components()
    }

    /// Distance between two consecutive elements: the view's explicit stride,
    /// or the element size when the data is tightly packed.
    pub fn byte_stride(&self, view: &BufferView) -> usize {
        view.byte_stride.unwrap_or_else(|| self.element_size())
    }
}

/// A byte range of a buffer, tagged with its intended GPU usage.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
}

/// Decoded image pixels.
///
/// `components` is the number of channels per pixel and `bits` the bit depth
/// of each channel; `pixels` holds the rows tightly packed, channels in native
/// byte order.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub bits: u8,
    pub pixels: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    pub source: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

/// A parsed glTF document with its buffers and images resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Vec<u8>>,
    pub images: Vec<Image>,
    pub textures: Vec<Texture>,
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
}

impl Document {
    /// The scene to display: the declared default, or the first scene when
    /// the document declares none.
    pub fn default_scene(&self) -> Option<&Scene> {
        match self.default_scene {
            Some(index) => Some(self.scenes.get(index).unwrap_or_else(|| {
                panic!(
                    "default scene {} is out of range ({} scenes)",
                    index,
                    self.scenes.len()
                )
            })),
            None => self.scenes.first(),
        }
    }

    pub fn node(&self, index: usize) -> &Node {
        self.nodes.get(index).unwrap_or_else(|| {
            panic!("node {} is out of range ({} nodes)", index, self.nodes.len())
        })
    }

    pub fn mesh(&self, index: usize) -> &Mesh {
        self.meshes.get(index).unwrap_or_else(|| {
            panic!("mesh {} is out of range ({} meshes)", index, self.meshes.len())
        })
    }

    pub fn accessor(&self, index: usize) -> &Accessor {
        self.accessors.get(index).unwrap_or_else(|| {
            panic!(
                "accessor {} is out of range ({} accessors)",
                index,
                self.accessors.len()
            )
        })
    }

    pub fn buffer_view(&self, index: usize) -> &BufferView {
        self.buffer_views.get(index).unwrap_or_else(|| {
            panic!(
                "buffer view {} is out of range ({} buffer views)",
                index,
                self.buffer_views.len()
            )
        })
    }

    pub fn image(&self, index: usize) -> &Image {
        self.images.get(index).unwrap_or_else(|| {
            panic!("image {} is out of range ({} images)", index, self.images.len())
        })
    }

    /// The bytes `[byte_offset, byte_offset + byte_length)` of the buffer the
    /// view points into.
    pub fn view_bytes(&self, index: usize) -> &[u8] {
        let view = self.buffer_view(index);
        let buffer = self.buffers.get(view.buffer).unwrap_or_else(|| {
            panic!(
                "buffer view {} references buffer {} which is out of range ({} buffers)",
                index,
                view.buffer,
                self.buffers.len()
            )
        });
        let end = view.byte_offset + view.byte_length;
        buffer.get(view.byte_offset..end).unwrap_or_else(|| {
            panic!(
                "buffer view {} spans {}..{} but buffer {} holds {} bytes",
                index,
                view.byte_offset,
                end,
                view.buffer,
                buffer.len()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(offset: usize, length: usize) -> BufferView {
        BufferView {
            buffer: 0,
            byte_offset: offset,
            byte_length: length,
            byte_stride: None,
            target: None,
        }
    }

    #[test]
    fn stride_falls_back_to_element_size() {
        let accessor = Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            count: 3,
            component_type: ComponentType::F32,
            element_type: ElementType::Vec3,
            normalized: false,
        };
        assert_eq!(accessor.byte_stride(&view(0, 36)), 12);

        let mut interleaved = view(0, 96);
        interleaved.byte_stride = Some(32);
        assert_eq!(accessor.byte_stride(&interleaved), 32);
    }

    #[test]
    fn view_bytes_slices_the_owning_buffer() {
        let document = Document {
            buffers: vec![(0u8..16).collect()],
            buffer_views: vec![view(4, 8)],
            ..Default::default()
        };
        assert_eq!(document.view_bytes(0), &[4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    #[should_panic(expected = "holds 4 bytes")]
    fn view_past_the_end_of_its_buffer_panics() {
        let document = Document {
            buffers: vec![vec![0; 4]],
            buffer_views: vec![view(2, 8)],
            ..Default::default()
        };
        document.view_bytes(0);
    }

    #[test]
    fn first_scene_is_the_default_when_none_is_declared() {
        let document = Document {
            scenes: vec![Scene { nodes: vec![3] }, Scene::default()],
            ..Default::default()
        };
        assert_eq!(document.default_scene().map(|s| s.nodes.clone()), Some(vec![3]));
    }
}
