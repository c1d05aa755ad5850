use std::{cell::RefCell, rc::Rc};

use crate::common::test_utils::*;
use gltf_viewer::{
    data_structures::parameters::ShaderParameters,
    metrics::FrameMetrics,
    viewer::{Projection, Viewer},
};
use instant::Duration;

mod common;

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {} but got {}",
        expected,
        actual
    );
}

fn running_viewer() -> (Viewer<RecordingBackend>, CommandLog) {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 800);
    viewer
        .on_init_document(two_node_document())
        .expect("init succeeds");
    log.clear();
    (viewer, log)
}

/// Parameters uploaded by the most recent `begin_frame`.
fn uploaded(log: &CommandLog) -> ShaderParameters {
    log.commands()
        .into_iter()
        .rev()
        .find_map(|command| match command {
            Command::BeginFrame(block) => Some(*block.parameters()),
            _ => None,
        })
        .expect("a frame was started")
}

#[test]
fn idle_viewer_renders_nothing() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 800);

    assert!(!viewer.is_running());
    assert!(!viewer.on_render().expect("idle render"));
    assert!(log.commands().is_empty());
    assert_eq!(viewer.metrics().total_frames, 0);
}

#[test]
fn missing_files_leave_the_viewer_idle() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 800);

    let error = viewer
        .on_init("does/not/exist.gltf")
        .expect_err("loading fails");
    assert!(format!("{:#}", error).contains("does/not/exist.gltf"));
    assert!(!viewer.is_running());
    assert!(viewer.scene().is_none());
    assert_eq!(log.commands(), vec![Command::CompileProgram]);
    assert!(!viewer.on_render().expect("idle render"));
}

#[test]
fn program_failures_are_reported() {
    let mut backend = RecordingBackend::new();
    backend.fail_compile = true;
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 800);

    assert!(viewer.on_init_document(two_node_document()).is_err());
    assert!(!viewer.is_running());
    assert!(log.created_buffers().is_empty());
}

#[test]
fn one_frame_issues_the_full_command_sequence() {
    let (mut viewer, log) = running_viewer();
    let scene = viewer.scene().expect("running");
    let vertex_array = scene.vertex_array;
    let index_buffer = scene.index_buffers[&1];

    assert!(viewer.on_render().expect("render"));

    let commands = log.commands();
    assert_eq!(commands.len(), 7);
    assert!(matches!(commands[0], Command::BeginFrame(_)));
    assert_eq!(commands[1], Command::BindVertexArray(vertex_array));
    assert_eq!(commands[2], Command::BindIndexBuffer(index_buffer));
    assert_eq!(commands[3], Command::BindTexture(None));
    assert!(matches!(commands[4], Command::DrawElements(_)));
    assert_eq!(commands[5], Command::UnbindVertexArray);
    assert_eq!(commands[6], Command::EndFrame);
    assert_eq!(viewer.metrics().total_frames, 1);
}

#[test]
fn default_lighting_reaches_the_program() {
    let (mut viewer, log) = running_viewer();
    viewer.on_render().expect("render");

    let parameters = uploaded(&log);
    assert_eq!(parameters.sun_light_coef, 160.0);
    assert_eq!(parameters.ambient_light_coef, 150.0);
    assert_eq!(parameters.spotlight_coef, 10.0);
    assert_close(parameters.sun_position[0], 0.9);
    assert_close(parameters.sun_position[1], 2.0);
    assert_close(parameters.sun_position[2], 0.1);
    assert_eq!(parameters.sun_color, [1.0, 1.0, 1.0]);
    assert_eq!(parameters.spotlight_color, [1.0, 1.0, 1.0]);
    assert_close(parameters.spotlight_first_cos, 35f32.to_radians().cos());
    assert_close(parameters.spotlight_second_cos, 70f32.to_radians().cos());
    assert_eq!(parameters.morphing_progress, 0.0);
    assert_eq!(parameters.spotlight_position, [9.5, 0.0, 1.0]);
    assert_eq!(parameters.spotlight_direction, [-1.0, 0.0, 0.0]);
    assert_eq!(parameters.model[0], [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(parameters.model[3], [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn setters_are_scaled_before_upload() {
    let (mut viewer, log) = running_viewer();
    viewer.set_light_x(-50.0);
    viewer.set_light_z(25.0);
    viewer.set_morphing_progress(40.0);
    viewer.set_sun(500.0);
    viewer.set_ambient(0.0);
    viewer.set_spot(999.0);
    viewer.set_spotlight_angles(20.0, 90.0);
    viewer.on_render().expect("render");

    let parameters = uploaded(&log);
    assert_close(parameters.sun_position[0], -0.5);
    assert_close(parameters.sun_position[2], 0.25);
    assert_close(parameters.morphing_progress, 0.4);
    assert_eq!(parameters.sun_light_coef, 500.0);
    assert_eq!(parameters.ambient_light_coef, 0.0);
    assert_eq!(parameters.spotlight_coef, 999.0);
    assert_close(parameters.spotlight_first_cos, 10f32.to_radians().cos());
    assert_close(parameters.spotlight_second_cos, 45f32.to_radians().cos());
    assert_eq!(viewer.parameters().parameters(), &parameters);
}

#[test]
fn still_viewers_do_not_ask_for_another_frame() {
    let (mut viewer, log) = running_viewer();
    viewer.set_animated(false);
    assert!(!viewer.on_render().expect("render"));
    assert_eq!(log.draws().len(), 1);
}

#[test]
fn unavailable_frames_skip_drawing() {
    let mut backend = RecordingBackend::new();
    backend.no_frames = true;
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 800);
    viewer
        .on_init_document(two_node_document())
        .expect("init succeeds");
    log.clear();

    assert!(viewer.on_render().expect("render"));
    assert!(log.commands().is_empty());
    assert_eq!(viewer.metrics().total_frames, 0);
}

#[test]
fn the_camera_moves_between_frames() {
    let (mut viewer, log) = running_viewer();
    viewer.camera_mut().wheel(1.0);
    viewer.on_render().expect("render");
    assert_close(uploaded(&log).spotlight_position[0], 9.2);
}

#[test]
fn configured_start_and_projection_apply_on_init() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut viewer = Viewer::new(backend, 800, 400);
    viewer.set_camera_start(cgmath::Point3::new(0.0, 1.0, 5.0));
    viewer.set_projection(Projection {
        fov_degrees: 90.0,
        near: 1.0,
        far: 10.0,
    });
    viewer
        .on_init_document(two_node_document())
        .expect("init succeeds");
    viewer.on_render().expect("render");

    let parameters = uploaded(&log);
    assert_eq!(parameters.spotlight_position, [0.0, 1.0, 5.0]);
    assert_eq!(viewer.camera().aspect(), 2.0);
    // A 90° field of view scales y by exactly one.
    assert_close(parameters.projection[1][1], 1.0);
}

#[test]
fn a_second_init_is_ignored() {
    let (mut viewer, log) = running_viewer();
    viewer
        .on_init_document(two_node_document())
        .expect("ignored");
    assert!(log.commands().is_empty());
    assert!(viewer.is_running());
}

#[test]
fn resize_reaches_backend_and_camera() {
    let (mut viewer, log) = running_viewer();
    viewer.on_resize(800, 400);
    viewer.on_resize(0, 400);
    viewer.on_resize(800, 0);

    assert_eq!(log.commands(), vec![Command::Resize(800, 400)]);
    assert_eq!(viewer.camera().aspect(), 2.0);
}

#[test]
fn teardown_releases_the_scene_and_goes_idle() {
    let (mut viewer, log) = running_viewer();
    let scene = viewer.scene().expect("running");
    let vertex_array = scene.vertex_array;
    let index_buffer = scene.index_buffers[&1];

    viewer.teardown();
    assert!(!viewer.is_running());
    assert_eq!(
        log.commands(),
        vec![
            Command::ReleaseBuffer(index_buffer),
            Command::DeleteVertexArray(vertex_array)
        ]
    );
    assert!(viewer.backend().buffers.is_empty());

    viewer.teardown();
    assert_eq!(log.commands().len(), 2);
    assert!(!viewer.on_render().expect("idle render"));
}

#[test]
fn dropping_a_running_viewer_releases_the_scene() {
    let (viewer, log) = running_viewer();
    let vertex_array = viewer.scene().expect("running").vertex_array;
    drop(viewer);

    let commands = log.commands();
    assert_eq!(commands.len(), 2);
    assert!(matches!(commands[0], Command::ReleaseBuffer(_)));
    assert_eq!(commands[1], Command::DeleteVertexArray(vertex_array));
}

#[test]
fn fps_listeners_receive_samples() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut viewer =
        Viewer::new(backend, 800, 800).with_metrics(FrameMetrics::with_clock(clock.boxed()));
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    viewer.on_fps_updated(move |fps| sink.borrow_mut().push(fps));
    viewer
        .on_init_document(two_node_document())
        .expect("init succeeds");

    viewer.on_render().expect("render");
    assert!(received.borrow().is_empty());

    clock.advance(Duration::from_millis(1000));
    viewer.on_render().expect("render");
    assert_eq!(*received.borrow(), vec![2]);
    assert_eq!(viewer.metrics().frames_since_sample, 0);
    assert_eq!(viewer.metrics().total_frames, 2);
}
