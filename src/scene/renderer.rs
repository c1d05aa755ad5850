//! Per-frame traversal issuing one indexed draw per primitive.

use crate::{
    data_structures::document::Document,
    render::{Backend, DrawElements},
    scene::{BoundScene, walk_primitives},
};

/// Draw every primitive of `scene` in binding order.
///
/// Primitives without indices are skipped. A primitive whose index buffer view
/// was never bound means binder and renderer disagree about the document, and
/// panics naming the view.
pub fn draw<B: Backend>(backend: &mut B, scene: &BoundScene<B>, document: &Document) {
    backend.bind_vertex_array(&scene.vertex_array);
    walk_primitives(document, |key, primitive| {
        let Some(indices) = primitive.indices else {
            log::trace!("Skipping unindexed primitive {:?}", key);
            return;
        };
        let accessor = document.accessor(indices);
        let view = accessor.buffer_view.unwrap_or_else(|| {
            panic!(
                "index accessor {} of primitive {} of mesh {} has no buffer view",
                indices, key.primitive, key.mesh
            )
        });
        let buffer = scene.index_buffers.get(&view).unwrap_or_else(|| {
            panic!(
                "primitive {} of mesh {} reads indices from buffer view {} which was never bound",
                key.primitive, key.mesh, view
            )
        });

        backend.bind_index_buffer(buffer);
        backend.bind_texture(scene.texture.as_ref());
        backend.draw_elements(&DrawElements {
            key,
            mode: primitive.mode,
            count: accessor.count,
            index_type: accessor.component_type,
            byte_offset: accessor.byte_offset,
        });
    });
    backend.unbind_vertex_array();
}
