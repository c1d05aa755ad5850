//! gltf-viewer
//!
//! An interactive glTF viewer. A loaded document is uploaded to the GPU once
//! and drawn every frame with a fly-through camera, sun, ambient and spot
//! lighting and a vertex morph towards the unit sphere. The scene algorithms
//! are written against a small GL-like [`render::Backend`] trait; wgpu
//! implements it for the window and tests implement it with a recorder.
//!
//! High-level modules
//! - `camera`: fly-through camera integrating drag, wheel and pan input
//! - `config`: TOML configuration for window, camera and lighting
//! - `context`: wgpu device, surface and pipelines behind the backend trait
//! - `controls`: keyboard stand-in for the lighting sliders
//! - `data_structures`: the loaded document, shader parameters and textures
//! - `flow`: winit event loop driving the viewer
//! - `metrics`: frame counters and FPS telemetry
//! - `pipelines`: render pipeline construction and the WGSL program
//! - `render`: the backend trait and the commands crossing it
//! - `resources`: glTF loading and pixel conversion
//! - `scene`: binding a document to the GPU and drawing it
//! - `viewer`: the frame orchestrator
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod metrics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewer;
