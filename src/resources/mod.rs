//! Loading glTF files into a [`Document`].
//!
//! The `gltf` crate parses the JSON, resolves buffers (files, data URIs and
//! the GLB blob) and decodes images. This module flattens its result into the
//! index-based [`Document`] the binder walks.

use std::path::Path;

use anyhow::Context;

use crate::data_structures::document::{
    Accessor, BufferTarget, BufferView, ComponentType, Document, ElementType, Image, Mesh, Mode,
    Node, Primitive, Scene, Texture,
};

pub mod texture;

/// Load the `.gltf` or `.glb` file at `path` with all its buffers and images.
pub fn load_document(path: impl AsRef<Path>) -> anyhow::Result<Document> {
    let path = path.as_ref();
    let (gltf, buffers, images) = gltf::import(path)
        .with_context(|| format!("Failed to load glTF file {}", path.display()))?;
    let document = convert(&gltf, buffers, images);
    log::info!("Loaded glTF: {}", path.display());
    Ok(document)
}

/// Like [`load_document`] for a file that is already in memory. External
/// file references cannot be resolved; data URIs and GLB blobs can.
pub fn load_document_from_slice(bytes: &[u8]) -> anyhow::Result<Document> {
    let (gltf, buffers, images) =
        gltf::import_slice(bytes).context("Failed to load glTF from memory")?;
    let document = convert(&gltf, buffers, images);
    log::info!("Loaded glTF: <memory>");
    Ok(document)
}

fn convert(
    gltf: &gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
) -> Document {
    let mut document = Document {
        nodes: gltf.nodes().map(|node| convert_node(&node)).collect(),
        meshes: gltf.meshes().map(|mesh| convert_mesh(&mesh)).collect(),
        accessors: gltf.accessors().map(|accessor| convert_accessor(&accessor)).collect(),
        buffer_views: gltf.views().map(|view| convert_view(&view)).collect(),
        buffers: buffers.into_iter().map(|data| data.0).collect(),
        images: images.into_iter().map(convert_image).collect(),
        textures: gltf
            .textures()
            .map(|texture| Texture {
                source: Some(texture.source().index()),
            })
            .collect(),
        scenes: gltf
            .scenes()
            .map(|scene| Scene {
                nodes: scene.nodes().map(|node| node.index()).collect(),
            })
            .collect(),
        default_scene: gltf.default_scene().map(|scene| scene.index()),
    };
    infer_targets(&mut document);
    document
}

fn convert_node(node: &gltf::Node) -> Node {
    Node {
        name: node.name().map(str::to_owned),
        mesh: node.mesh().map(|mesh| mesh.index()),
        children: node.children().map(|child| child.index()).collect(),
    }
}

fn convert_mesh(mesh: &gltf::Mesh) -> Mesh {
    let primitives = mesh
        .primitives()
        .map(|primitive| Primitive {
            attributes: primitive
                .attributes()
                .map(|(semantic, accessor)| (semantic_name(&semantic), accessor.index()))
                .collect(),
            indices: primitive.indices().map(|accessor| accessor.index()),
            mode: convert_mode(primitive.mode()),
        })
        .collect();
    Mesh {
        name: mesh.name().map(str::to_owned),
        primitives,
    }
}

fn semantic_name(semantic: &gltf::Semantic) -> String {
    use gltf::Semantic::*;
    match semantic {
        Positions => "POSITION".to_owned(),
        Normals => "NORMAL".to_owned(),
        Tangents => "TANGENT".to_owned(),
        Colors(set) => format!("COLOR_{}", set),
        TexCoords(set) => format!("TEXCOORD_{}", set),
        Joints(set) => format!("JOINTS_{}", set),
        Weights(set) => format!("WEIGHTS_{}", set),
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

fn convert_mode(mode: gltf::mesh::Mode) -> Mode {
    match mode {
        gltf::mesh::Mode::Points => Mode::Points,
        gltf::mesh::Mode::Lines => Mode::Lines,
        gltf::mesh::Mode::LineLoop => Mode::LineLoop,
        gltf::mesh::Mode::LineStrip => Mode::LineStrip,
        gltf::mesh::Mode::Triangles => Mode::Triangles,
        gltf::mesh::Mode::TriangleStrip => Mode::TriangleStrip,
        gltf::mesh::Mode::TriangleFan => Mode::TriangleFan,
    }
}

fn convert_accessor(accessor: &gltf::Accessor) -> Accessor {
    use gltf::accessor::{DataType, Dimensions};
    let component_type = match accessor.data_type() {
        DataType::I8 => ComponentType::I8,
        DataType::U8 => ComponentType::U8,
        DataType::I16 => ComponentType::I16,
        DataType::U16 => ComponentType::U16,
        DataType::U32 => ComponentType::U32,
        DataType::F32 => ComponentType::F32,
    };
    let element_type = match accessor.dimensions() {
        Dimensions::Scalar => ElementType::Scalar,
        Dimensions::Vec2 => ElementType::Vec2,
        Dimensions::Vec3 => ElementType::Vec3,
        Dimensions::Vec4 => ElementType::Vec4,
        Dimensions::Mat2 => ElementType::Mat2,
        Dimensions::Mat3 => ElementType::Mat3,
        Dimensions::Mat4 => ElementType::Mat4,
    };
    Accessor {
        buffer_view: accessor.view().map(|view| view.index()),
        byte_offset: accessor.offset(),
        count: accessor.count(),
        component_type,
        element_type,
        normalized: accessor.normalized(),
    }
}

fn convert_view(view: &gltf::buffer::View) -> BufferView {
    BufferView {
        buffer: view.buffer().index(),
        byte_offset: view.offset(),
        byte_length: view.length(),
        byte_stride: view.stride(),
        target: view.target().map(|target| match target {
            gltf::buffer::Target::ArrayBuffer => BufferTarget::ArrayBuffer,
            gltf::buffer::Target::ElementArrayBuffer => BufferTarget::ElementArrayBuffer,
        }),
    }
}

fn convert_image(data: gltf::image::Data) -> Image {
    use gltf::image::Format;
    let (components, bits) = match data.format {
        Format::R8 => (1, 8),
        Format::R8G8 => (2, 8),
        Format::R8G8B8 => (3, 8),
        Format::R8G8B8A8 => (4, 8),
        Format::R16 => (1, 16),
        Format::R16G16 => (2, 16),
        Format::R16G16B16 => (3, 16),
        Format::R16G16B16A16 => (4, 16),
        Format::R32G32B32FLOAT => (3, 32),
        Format::R32G32B32A32FLOAT => (4, 32),
    };
    Image {
        width: data.width,
        height: data.height,
        components,
        bits,
        pixels: data.pixels,
    }
}

/// Give buffer views that primitives read from but that declare no target the
/// target their use implies.
fn infer_targets(document: &mut Document) {
    let mut inferred = Vec::new();
    for mesh in &document.meshes {
        for primitive in &mesh.primitives {
            if let Some(indices) = primitive.indices {
                inferred.push((indices, BufferTarget::ElementArrayBuffer));
            }
            for &accessor in primitive.attributes.values() {
                inferred.push((accessor, BufferTarget::ArrayBuffer));
            }
        }
    }
    for (accessor, target) in inferred {
        let Some(view) = document
            .accessors
            .get(accessor)
            .and_then(|accessor| accessor.buffer_view)
        else {
            continue;
        };
        if let Some(view_data) = document.buffer_views.get_mut(view) {
            if view_data.target.is_none() {
                log::debug!("Buffer view {} is used as {:?}", view, target);
                view_data.target = Some(target);
            }
        }
    }
}
