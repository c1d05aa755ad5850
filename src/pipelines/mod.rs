//! Render pipeline construction for the scene program.

pub mod scene;
