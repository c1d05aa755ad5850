//! Shader parameters and the lighting state that feeds them.
//!
//! The program reads a single uniform block, mirrored here by
//! [`ShaderParameters`]. Members are addressed by name through
//! [`ParameterBlock::location`], which hands out a [`ParameterSlot`] or `None`
//! for a name the program does not declare. Writes through `None` are dropped
//! silently, so a renamed uniform simply stops receiving values.
//!
//! [`Lighting`] is the plain mutable state the UI writes into between frames:
//! light intensities, light position, colours, spotlight cone and the morph
//! factor. The setters apply the same scaling the sliders expect.

use std::mem::{offset_of, size_of};

use cgmath::{Matrix4, Point3, Vector3};

/// Uniform block of the scene program. Field order and padding follow WGSL's
/// uniform layout rules: every `vec3` is paired with a trailing `f32`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderParameters {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub sun_position: [f32; 3],
    pub sun_light_coef: f32,
    pub sun_color: [f32; 3],
    pub ambient_light_coef: f32,
    pub spotlight_position: [f32; 3],
    pub spotlight_coef: f32,
    pub spotlight_color: [f32; 3],
    pub spotlight_first_cos: f32,
    pub spotlight_direction: [f32; 3],
    pub spotlight_second_cos: f32,
    pub morphing_progress: f32,
    // The WGSL struct rounds its size up to a multiple of 16.
    pub _padding: [f32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    Scalar,
    Vector3,
    Matrix4,
}

impl ParameterKind {
    fn size(self) -> usize {
        match self {
            ParameterKind::Scalar => size_of::<f32>(),
            ParameterKind::Vector3 => size_of::<[f32; 3]>(),
            ParameterKind::Matrix4 => size_of::<[[f32; 4]; 4]>(),
        }
    }
}

/// Location of one named member inside the uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterSlot {
    offset: usize,
    kind: ParameterKind,
}

impl ParameterSlot {
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }
}

const MEMBERS: &[(&str, usize, ParameterKind)] = &[
    ("model", offset_of!(ShaderParameters, model), ParameterKind::Matrix4),
    ("view", offset_of!(ShaderParameters, view), ParameterKind::Matrix4),
    ("projection", offset_of!(ShaderParameters, projection), ParameterKind::Matrix4),
    ("sun_position", offset_of!(ShaderParameters, sun_position), ParameterKind::Vector3),
    ("sun_light_coef", offset_of!(ShaderParameters, sun_light_coef), ParameterKind::Scalar),
    ("sun_color", offset_of!(ShaderParameters, sun_color), ParameterKind::Vector3),
    ("ambient_light_coef", offset_of!(ShaderParameters, ambient_light_coef), ParameterKind::Scalar),
    ("spotlight_position", offset_of!(ShaderParameters, spotlight_position), ParameterKind::Vector3),
    ("spotlight_coef", offset_of!(ShaderParameters, spotlight_coef), ParameterKind::Scalar),
    ("spotlight_color", offset_of!(ShaderParameters, spotlight_color), ParameterKind::Vector3),
    ("spotlight_first_cos", offset_of!(ShaderParameters, spotlight_first_cos), ParameterKind::Scalar),
    ("spotlight_direction", offset_of!(ShaderParameters, spotlight_direction), ParameterKind::Vector3),
    ("spotlight_second_cos", offset_of!(ShaderParameters, spotlight_second_cos), ParameterKind::Scalar),
    ("morphing_progress", offset_of!(ShaderParameters, morphing_progress), ParameterKind::Scalar),
];

/// A value that can be written into a parameter slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParameterValue {
    Scalar(f32),
    Vector3([f32; 3]),
    Matrix4([[f32; 4]; 4]),
}

impl ParameterValue {
    fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Scalar(_) => ParameterKind::Scalar,
            ParameterValue::Vector3(_) => ParameterKind::Vector3,
            ParameterValue::Matrix4(_) => ParameterKind::Matrix4,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            ParameterValue::Scalar(v) => bytemuck::bytes_of(v),
            ParameterValue::Vector3(v) => bytemuck::bytes_of(v),
            ParameterValue::Matrix4(v) => bytemuck::bytes_of(v),
        }
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Scalar(value)
    }
}

impl From<Vector3<f32>> for ParameterValue {
    fn from(value: Vector3<f32>) -> Self {
        ParameterValue::Vector3(value.into())
    }
}

impl From<Point3<f32>> for ParameterValue {
    fn from(value: Point3<f32>) -> Self {
        ParameterValue::Vector3(value.into())
    }
}

impl From<Matrix4<f32>> for ParameterValue {
    fn from(value: Matrix4<f32>) -> Self {
        ParameterValue::Matrix4(value.into())
    }
}

/// CPU-side copy of the uniform block, written slot by slot and uploaded
/// whole once per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterBlock {
    data: ShaderParameters,
}

impl Default for ParameterBlock {
    fn default() -> Self {
        Self {
            data: bytemuck::Zeroable::zeroed(),
        }
    }
}

impl ParameterBlock {
    /// Find the member called `name`. Unknown names yield `None`.
    pub fn location(name: &str) -> Option<ParameterSlot> {
        MEMBERS
            .iter()
            .find(|(member, _, _)| *member == name)
            .map(|&(_, offset, kind)| ParameterSlot { offset, kind })
    }

    /// Names of every member, in block order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        MEMBERS.iter().map(|(name, _, _)| *name)
    }

    /// Write `value` into `slot`. A `None` slot is ignored.
    pub fn set(&mut self, slot: Option<ParameterSlot>, value: impl Into<ParameterValue>) {
        let Some(slot) = slot else {
            return;
        };
        let value = value.into();
        if value.kind() != slot.kind {
            log::warn!(
                "Ignoring {:?} written to a {:?} shader parameter at offset {}",
                value.kind(),
                slot.kind,
                slot.offset
            );
            return;
        }
        let end = slot.offset + slot.kind.size();
        bytemuck::bytes_of_mut(&mut self.data)[slot.offset..end].copy_from_slice(value.bytes());
    }

    pub fn parameters(&self) -> &ShaderParameters {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.data)
    }
}

/// Bounds and start value of a slider, in slider units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl SliderRange {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

pub const MORPH_RANGE: SliderRange = SliderRange { min: 0.0, max: 100.0, default: 0.0 };
pub const LIGHT_X_RANGE: SliderRange = SliderRange { min: -100.0, max: 100.0, default: 90.0 };
pub const LIGHT_Z_RANGE: SliderRange = SliderRange { min: -100.0, max: 100.0, default: 10.0 };
pub const SPOT_RANGE: SliderRange = SliderRange { min: 0.0, max: 1000.0, default: 10.0 };
pub const AMBIENT_RANGE: SliderRange = SliderRange { min: 0.0, max: 1000.0, default: 150.0 };
pub const SUN_RANGE: SliderRange = SliderRange { min: 0.0, max: 1000.0, default: 160.0 };
pub const SPOT_ANGLE_RANGE: SliderRange = SliderRange { min: 10.0, max: 100.0, default: 70.0 };

/// Height of the sun above the scene; the sliders only move it in x and z.
pub const LIGHT_Y: f32 = 2.0;

/// Lighting and morph state written by the UI and read once per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Lighting {
    pub sun: f32,
    pub ambient: f32,
    pub spot: f32,
    pub light_position: Vector3<f32>,
    pub sun_color: Vector3<f32>,
    pub spotlight_color: Vector3<f32>,
    /// Full inner cone angle in degrees.
    pub spotlight_first_angle: f32,
    /// Full outer cone angle in degrees.
    pub spotlight_second_angle: f32,
    pub morphing_progress: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        let mut lighting = Self {
            sun: 0.0,
            ambient: 0.0,
            spot: 0.0,
            light_position: Vector3::new(0.0, LIGHT_Y, 0.0),
            sun_color: Vector3::new(1.0, 1.0, 1.0),
            spotlight_color: Vector3::new(1.0, 1.0, 1.0),
            spotlight_first_angle: 0.0,
            spotlight_second_angle: 0.0,
            morphing_progress: 0.0,
        };
        lighting.set_sun(SUN_RANGE.default);
        lighting.set_ambient(AMBIENT_RANGE.default);
        lighting.set_spot(SPOT_RANGE.default);
        lighting.set_light_x(LIGHT_X_RANGE.default);
        lighting.set_light_z(LIGHT_Z_RANGE.default);
        lighting.set_morphing_progress(MORPH_RANGE.default);
        lighting.set_spotlight_angles(
            SPOT_ANGLE_RANGE.default,
            SPOT_ANGLE_RANGE.default + SPOT_ANGLE_RANGE.default,
        );
        lighting
    }
}

impl Lighting {
    pub fn set_light_x(&mut self, value: f32) {
        self.light_position.x = value / 100.0;
    }

    pub fn set_light_z(&mut self, value: f32) {
        self.light_position.z = value / 100.0;
    }

    pub fn set_morphing_progress(&mut self, value: f32) {
        self.morphing_progress = value / 100.0;
    }

    pub fn set_sun(&mut self, value: f32) {
        self.sun = value;
    }

    pub fn set_ambient(&mut self, value: f32) {
        self.ambient = value;
    }

    pub fn set_spot(&mut self, value: f32) {
        self.spot = value;
    }

    pub fn set_spotlight_angles(&mut self, first: f32, second: f32) {
        self.spotlight_first_angle = first;
        self.spotlight_second_angle = second;
    }

    /// Cosines of the inner and outer half-angles of the spotlight cone.
    pub fn spotlight_cosines(&self) -> (f32, f32) {
        // The angles are full cone apertures; the program compares against
        // the cosine of the half angle.
        let half_cos = |angle: f32| (angle.to_radians() / 2.0).cos();
        (
            half_cos(self.spotlight_first_angle),
            half_cos(self.spotlight_second_angle),
        )
    }
}
