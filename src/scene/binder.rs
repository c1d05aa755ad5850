//! Load-time upload of a document's buffers, attribute layouts and texture.

use std::collections::BTreeMap;

use crate::{
    data_structures::document::{BufferTarget, Document, Primitive},
    render::{
        AttributeBinding, AttributeSlot, Backend, PixelFormat, PrimitiveKey, PrimitiveLayout,
        SampleType, TextureUpload,
    },
    scene::{BoundScene, walk_primitives},
};

/// Upload `document` through `backend` and return the GPU state needed to draw
/// it every frame.
///
/// Buffer views without a target are skipped with a warning. Every vertex
/// buffer is released again once all primitives are configured; index buffers
/// are kept in the returned [`BoundScene`].
pub fn bind<B: Backend>(backend: &mut B, document: &Document) -> BoundScene<B> {
    let mut buffers: BTreeMap<usize, (BufferTarget, B::Buffer)> = BTreeMap::new();
    for (index, view) in document.buffer_views.iter().enumerate() {
        match view.target {
            Some(target) => {
                let buffer = backend.create_buffer(target, document.view_bytes(index));
                buffers.insert(index, (target, buffer));
            }
            None => log::warn!(
                "Buffer view {} has no vertex or index target and is not uploaded",
                index
            ),
        }
    }

    let vertex_array = backend.create_vertex_array();
    walk_primitives(document, |key, primitive| {
        let layout = primitive_layout(document, &buffers, key, primitive);
        backend.configure_primitive(&vertex_array, key, layout);
    });

    let texture = bind_texture(backend, document);

    let mut index_buffers = BTreeMap::new();
    for (index, (target, buffer)) in buffers {
        match target {
            BufferTarget::ElementArrayBuffer => {
                index_buffers.insert(index, buffer);
            }
            BufferTarget::ArrayBuffer => backend.release_buffer(buffer),
        }
    }

    log::info!(
        "Bound {} index buffers and {} texture(s)",
        index_buffers.len(),
        usize::from(texture.is_some())
    );
    BoundScene {
        vertex_array,
        index_buffers,
        texture,
    }
}

fn primitive_layout<Buf: Clone>(
    document: &Document,
    buffers: &BTreeMap<usize, (BufferTarget, Buf)>,
    key: PrimitiveKey,
    primitive: &Primitive,
) -> PrimitiveLayout<Buf> {
    let mut attributes = Vec::new();
    for (semantic, &accessor_index) in &primitive.attributes {
        let Some(slot) = AttributeSlot::from_semantic(semantic) else {
            log::warn!(
                "Unsupported vertex attribute {} on primitive {} of mesh {}",
                semantic,
                key.primitive,
                key.mesh
            );
            continue;
        };
        let accessor = document.accessor(accessor_index);
        let Some(view_index) = accessor.buffer_view else {
            log::warn!(
                "Accessor {} for {} has no buffer view and is skipped",
                accessor_index,
                semantic
            );
            continue;
        };
        let Some((_, buffer)) = buffers.get(&view_index) else {
            log::warn!(
                "{} of primitive {} of mesh {} reads buffer view {} which was not uploaded",
                semantic,
                key.primitive,
                key.mesh,
                view_index
            );
            continue;
        };
        log::debug!(
            "{:?} slot {} <- accessor {} ({} x {:?})",
            slot,
            slot.location(),
            accessor_index,
            accessor.element_type.components(),
            accessor.component_type
        );
        attributes.push(AttributeBinding {
            slot,
            buffer: buffer.clone(),
            components: accessor.element_type.components(),
            component_type: accessor.component_type,
            normalized: accessor.normalized,
            byte_stride: accessor.byte_stride(document.buffer_view(view_index)),
            byte_offset: accessor.byte_offset,
        });
    }

    let index_type = primitive
        .indices
        .map(|indices| document.accessor(indices).component_type);
    if index_type.is_none() {
        log::warn!(
            "Primitive {} of mesh {} has no indices and will not be drawn",
            key.primitive,
            key.mesh
        );
    }

    PrimitiveLayout {
        mode: primitive.mode,
        index_type,
        attributes,
    }
}

/// Upload the image of the first texture. Only one texture is used for the
/// whole document.
fn bind_texture<B: Backend>(backend: &mut B, document: &Document) -> Option<B::Texture> {
    let texture = document.textures.first()?;
    let Some(source) = texture.source else {
        log::warn!("Texture 0 has no image source");
        return None;
    };
    let image = document.image(source);

    let format = match image.components {
        1 => PixelFormat::R,
        2 => PixelFormat::Rg,
        3 => PixelFormat::Rgb,
        _ => PixelFormat::Rgba,
    };
    let sample_type = match image.bits {
        8 => SampleType::U8,
        16 => SampleType::U16,
        bits => {
            log::warn!(
                "Image {} has {} bits per channel; uploading it as 8 bit",
                source,
                bits
            );
            SampleType::U8
        }
    };

    let upload = TextureUpload {
        width: image.width,
        height: image.height,
        format,
        sample_type,
        pixels: &image.pixels,
    };
    match backend.create_texture(&upload) {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("Image {} could not be uploaded: {:#}", source, e);
            None
        }
    }
}
