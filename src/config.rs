//! Viewer configuration with TOML file support.
//!
//! Every section uses `#[serde(default)]`, so a file that only sets
//! `[lighting]` keeps the defaults for everything else. Lighting values are in
//! slider units, the same units the setters of [`Viewer`] take.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cgmath::Point3;
use serde::{Deserialize, Serialize};

use crate::{
    camera::Camera,
    data_structures::parameters::{
        AMBIENT_RANGE, LIGHT_X_RANGE, LIGHT_Z_RANGE, MORPH_RANGE, SPOT_ANGLE_RANGE, SPOT_RANGE,
        SUN_RANGE,
    },
    render::Backend,
    viewer::{Projection, Viewer},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// glTF file shown at start-up.
    pub model: Option<PathBuf>,
    /// Redraw continuously instead of only on input.
    pub animated: bool,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model: None,
            animated: true,
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Load a configuration from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Push every setting that lives in the viewer into `viewer`.
    pub fn apply<B: Backend>(&self, viewer: &mut Viewer<B>) {
        viewer.set_animated(self.animated);
        viewer.set_camera_start(Point3::from(self.camera.position));
        viewer.set_projection(Projection {
            fov_degrees: self.camera.fov_degrees,
            near: self.camera.near,
            far: self.camera.far,
        });

        let lighting = &self.lighting;
        viewer.set_morphing_progress(MORPH_RANGE.clamp(lighting.morph));
        viewer.set_light_x(LIGHT_X_RANGE.clamp(lighting.light_x));
        viewer.set_light_z(LIGHT_Z_RANGE.clamp(lighting.light_z));
        viewer.set_sun(SUN_RANGE.clamp(lighting.sun));
        viewer.set_ambient(AMBIENT_RANGE.clamp(lighting.ambient));
        viewer.set_spot(SPOT_RANGE.clamp(lighting.spot));
        let first = SPOT_ANGLE_RANGE.clamp(lighting.spot_angle);
        viewer.set_spotlight_angles(first, first + SPOT_ANGLE_RANGE.default);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "glTF viewer".to_owned(),
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let projection = Projection::default();
        Self {
            position: Camera::DEFAULT_POSITION.into(),
            fov_degrees: projection.fov_degrees,
            near: projection.near,
            far: projection.far,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub morph: f32,
    pub light_x: f32,
    pub light_z: f32,
    pub sun: f32,
    pub ambient: f32,
    pub spot: f32,
    pub spot_angle: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            morph: MORPH_RANGE.default,
            light_x: LIGHT_X_RANGE.default,
            light_z: LIGHT_Z_RANGE.default,
            sun: SUN_RANGE.default,
            ambient: AMBIENT_RANGE.default,
            spot: SPOT_RANGE.default,
            spot_angle: SPOT_ANGLE_RANGE.default,
        }
    }
}
