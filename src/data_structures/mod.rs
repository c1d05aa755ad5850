//! Viewer data structures: the loaded document, shader parameters and textures.
//!
//! - `document` is the in-memory glTF document the binder and renderer walk
//! - `parameters` holds the uniform block, its named slots and the lighting state
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod document;
pub mod parameters;
pub mod texture;
