use crate::common::test_utils::*;
use gltf_viewer::{
    data_structures::document::{BufferTarget, ComponentType, ElementType, Mesh, Mode, Scene},
    render::PrimitiveKey,
    scene::{binder::bind, renderer::draw},
};

mod common;

#[test]
fn child_mesh_is_drawn_exactly_once() {
    let document = two_node_document();
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let scene = bind(&mut backend, &document);
    let index_buffer = scene.index_buffers[&1];
    log.clear();

    draw(&mut backend, &scene, &document);

    let draws = log.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(
        draws[0].key,
        PrimitiveKey {
            mesh: 0,
            primitive: 0
        }
    );
    assert_eq!(draws[0].mode, Mode::Triangles);
    assert_eq!(draws[0].count, 3);
    assert_eq!(draws[0].index_type, ComponentType::U16);
    assert_eq!(draws[0].byte_offset, 0);

    assert_eq!(
        log.commands(),
        vec![
            Command::BindVertexArray(scene.vertex_array),
            Command::BindIndexBuffer(index_buffer),
            Command::BindTexture(None),
            Command::DrawElements(draws[0]),
            Command::UnbindVertexArray,
        ]
    );
}

#[test]
fn the_bound_texture_is_bound_before_each_draw() {
    let mut document = textured_document(4, 8);
    document.nodes[0].mesh = Some(0);
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let scene = bind(&mut backend, &document);
    let texture = scene.texture;
    assert!(texture.is_some());
    log.clear();

    draw(&mut backend, &scene, &document);

    let commands = log.commands();
    assert_eq!(log.draws().len(), 2);
    for (position, command) in commands.iter().enumerate() {
        if let Command::DrawElements(_) = command {
            assert_eq!(commands[position - 1], Command::BindTexture(texture));
        }
    }
}

#[test]
fn every_primitive_with_a_targeted_index_view_is_drawn() {
    // Three meshes reached through a small tree; mesh 2 has two primitives
    // sharing one index view at different offsets.
    let mut document = two_node_document();
    document.buffers[0].extend_from_slice(bytemuck::cast_slice(&[2u16, 1, 0, 0, 2, 1]));
    document
        .buffer_views
        .push(view(42, 12, Some(BufferTarget::ElementArrayBuffer)));
    document.accessors.push(accessor(2, 3, ComponentType::U16, ElementType::Scalar));
    let mut second_half = accessor(2, 3, ComponentType::U16, ElementType::Scalar);
    second_half.byte_offset = 6;
    document.accessors.push(second_half);
    document.meshes.push(Mesh {
        name: None,
        primitives: vec![primitive(&[("POSITION", 0)], Some(2))],
    });
    document.meshes.push(Mesh {
        name: None,
        primitives: vec![
            primitive(&[("POSITION", 0)], Some(1)),
            primitive(&[("POSITION", 0)], Some(3)),
        ],
    });
    document.nodes[1].children = vec![2];
    document.nodes.push(node(Some(1), vec![]));
    document.nodes.push(node(Some(2), vec![]));
    document.scenes = vec![Scene { nodes: vec![0, 3] }];

    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let scene = bind(&mut backend, &document);
    log.clear();
    draw(&mut backend, &scene, &document);

    let drawn: Vec<(usize, usize, usize)> = log
        .draws()
        .iter()
        .map(|draw| (draw.key.mesh, draw.key.primitive, draw.byte_offset))
        .collect();
    assert_eq!(drawn, vec![(0, 0, 0), (1, 0, 0), (2, 0, 0), (2, 1, 6)]);
}

#[test]
fn unindexed_primitives_are_skipped() {
    let mut document = two_node_document();
    document.meshes[0]
        .primitives
        .push(primitive(&[("POSITION", 0)], None));

    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let scene = bind(&mut backend, &document);
    assert_eq!(log.configured().len(), 2);
    log.clear();
    draw(&mut backend, &scene, &document);

    let draws = log.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].key.primitive, 0);
}

#[test]
fn documents_without_a_scene_draw_nothing() {
    let mut document = two_node_document();
    document.scenes.clear();
    document.default_scene = None;

    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let scene = bind(&mut backend, &document);
    log.clear();
    draw(&mut backend, &scene, &document);

    assert!(log.draws().is_empty());
}

#[test]
#[should_panic(expected = "buffer view 1 which was never bound")]
fn indices_from_an_unbound_view_panic() {
    let mut document = two_node_document();
    document.buffer_views[1].target = None;

    let mut backend = RecordingBackend::new();
    let scene = bind(&mut backend, &document);
    draw(&mut backend, &scene, &document);
}

#[test]
#[should_panic(expected = "node 5 is out of range")]
fn dangling_children_panic() {
    let mut document = two_node_document();
    document.nodes[1].children.push(5);

    let mut backend = RecordingBackend::new();
    bind(&mut backend, &document);
}
