//! Binding a document to the GPU and drawing it.
//!
//! Both halves walk the default scene in the same depth-first order through
//! [`walk_primitives`]: the binder configures every primitive it meets and the
//! renderer draws them in that same order. The GPU-side result of binding is a
//! [`BoundScene`], which the orchestrator owns and hands back to the backend on
//! teardown.
//!
//! # Key types
//!
//! - [`BoundScene`] is the vertex array, the retained index buffers and the texture
//! - [`binder::bind`] builds it from a [`Document`]
//! - [`renderer::draw`] issues the draw calls for it

use std::collections::BTreeMap;

use crate::{
    data_structures::document::{Document, Node, Primitive},
    render::{Backend, PrimitiveKey},
};

pub mod binder;
pub mod renderer;

/// GPU state produced by [`binder::bind`].
///
/// `index_buffers` maps a buffer-view index to the index buffer uploaded from
/// it. Vertex buffers are not kept here: the vertex array holds on to them.
pub struct BoundScene<B: Backend> {
    pub vertex_array: B::VertexArray,
    pub index_buffers: BTreeMap<usize, B::Buffer>,
    pub texture: Option<B::Texture>,
}

impl<B: Backend> BoundScene<B> {
    /// Hand every GPU object back to `backend`.
    pub fn release(self, backend: &mut B) {
        for (_, buffer) in self.index_buffers {
            backend.release_buffer(buffer);
        }
        backend.delete_vertex_array(self.vertex_array);
        drop(self.texture);
    }
}

/// Visit every node reachable from the default scene, depth first, parents
/// before children.
///
/// Panics on an out-of-range node index and on a node that is its own
/// ancestor.
pub fn walk_scene<'d>(document: &'d Document, mut visit: impl FnMut(usize, &'d Node)) {
    let Some(scene) = document.default_scene() else {
        log::warn!("The document has no scene; nothing to walk");
        return;
    };
    let mut on_path = vec![false; document.nodes.len()];
    for &root in &scene.nodes {
        visit_node(document, root, &mut on_path, &mut visit);
    }
}

fn visit_node<'d>(
    document: &'d Document,
    index: usize,
    on_path: &mut [bool],
    visit: &mut impl FnMut(usize, &'d Node),
) {
    let node = document.node(index);
    assert!(
        !on_path[index],
        "node {} is its own ancestor: the node graph has a cycle",
        index
    );
    on_path[index] = true;
    visit(index, node);
    for &child in &node.children {
        visit_node(document, child, on_path, visit);
    }
    on_path[index] = false;
}

/// Visit every primitive of every meshed node reachable from the default
/// scene, in [`walk_scene`] order.
pub fn walk_primitives<'d>(
    document: &'d Document,
    mut visit: impl FnMut(PrimitiveKey, &'d Primitive),
) {
    walk_scene(document, |_, node| {
        let Some(mesh) = node.mesh else {
            return;
        };
        for (primitive, data) in document.mesh(mesh).primitives.iter().enumerate() {
            visit(PrimitiveKey { mesh, primitive }, data);
        }
    });
}
