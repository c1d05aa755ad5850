//! Fly-through camera driven by mouse drags, the wheel and keyboard panning.
//!
//! Input handlers only accumulate deltas: rotation from drags, movement from
//! the wheel and [`Camera::pan`]. [`Camera::update`] consumes everything that
//! accumulated since the previous frame, rebuilds the view and projection and
//! leaves the pending deltas at zero.
//!
//! Drag rotation is sign-only: every cursor event turns the camera by the same
//! fixed angle no matter how far the cursor travelled.

use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix, Matrix4, Point2, Point3, Quaternion, Rad, Rotation3,
    SquareMatrix, Vector3, perspective,
};

/// Converts OpenGL clip space depth (-1..1) into wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Radians turned per drag event.
pub const ROTATION_STEP: f32 = 0.01;
/// Distance moved per wheel notch.
pub const WHEEL_STEP: f32 = 3.0 * 0.1;

// |cos| of the smallest angle allowed between orientation and up (~2.5°).
const MAX_UP_ALIGNMENT: f32 = 0.999;

/// Matrices and facing direction for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub direction: Vector3<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    orientation: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    pending_yaw: f32,
    pending_pitch: f32,
    movement: Vector3<f32>,
    aspect: f32,
    cursor: Point2<f32>,
}

impl Camera {
    pub const DEFAULT_POSITION: Point3<f32> = Point3::new(9.5, 0.0, 1.0);

    /// A camera at `position` looking down -x, for a surface of the given size.
    pub fn new(position: Point3<f32>, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position,
            orientation: Vector3::new(-1.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            right: Vector3::unit_x(),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            movement: Vector3::new(0.0, 0.0, 0.0),
            aspect: 1.0,
            cursor: Point2::new(0.0, 0.0),
        };
        camera.resize(width, height);
        camera
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Unit facing direction.
    pub fn orientation(&self) -> Vector3<f32> {
        self.orientation
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Yaw and pitch in radians accumulated since the last update.
    ///
    /// Yaw turns about the up vector and pitch about the right axis
    /// (`orientation × up`).
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.pending_yaw, self.pending_pitch)
    }

    /// Strafe, vertical and forward movement accumulated since the last update.
    pub fn pending_movement(&self) -> Vector3<f32> {
        self.movement
    }

    /// Remember where a drag starts.
    pub fn mouse_press(&mut self, x: f32, y: f32) {
        self.cursor = Point2::new(x, y);
    }

    /// Turn by one step per axis the cursor moved along, while the primary
    /// button is held.
    pub fn mouse_move(&mut self, x: f32, y: f32, primary_held: bool) {
        if !primary_held {
            return;
        }
        let dx = sign(x - self.cursor.x);
        let dy = sign(y - self.cursor.y);
        self.cursor = Point2::new(x, y);
        // The drag moves the world: dragging right turns left, dragging down
        // looks up.
        self.pending_yaw += dx * ROTATION_STEP;
        self.pending_pitch += dy * ROTATION_STEP;
    }

    /// Move forward for a positive delta, backward for a negative one.
    pub fn wheel(&mut self, delta: f32) {
        self.movement.z += sign(delta) * WHEEL_STEP;
    }

    /// Move sideways along the camera's right vector and vertically along the
    /// world up axis.
    pub fn pan(&mut self, strafe: f32, vertical: f32) {
        self.movement.x += strafe;
        self.movement.y += vertical;
    }

    /// Track the surface aspect ratio. A zero height is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Apply pending input and compute this frame's matrices.
    pub fn update(&mut self, fov_degrees: f32, near: f32, far: f32, frame: usize) -> CameraMatrices {
        let model = Matrix4::identity();

        self.apply_rotation();

        let view = Matrix4::look_at_rh(self.position, self.position + self.orientation, self.up);

        let right = (view.transpose() * self.right.extend(1.0))
            .truncate()
            .normalize();
        self.position += self.movement.z * self.orientation;
        self.position += self.movement.x * right;
        self.position += Vector3::new(0.0, self.movement.y, 0.0);
        self.movement = Vector3::new(0.0, 0.0, 0.0);

        let projection = OPENGL_TO_WGPU_MATRIX * perspective(Deg(fov_degrees), self.aspect, near, far);

        log::trace!(
            "frame {}: camera at {:?} facing {:?}",
            frame,
            self.position.to_vec(),
            self.orientation
        );
        CameraMatrices {
            model,
            view,
            projection,
            direction: self.orientation,
        }
    }

    fn apply_rotation(&mut self) {
        let up = self.up.normalize();
        let mut orientation = self.orientation;

        if self.pending_pitch != 0.0 {
            let axis = orientation.cross(up).normalize();
            let pitched = Quaternion::from_axis_angle(axis, Rad(self.pending_pitch)) * orientation;
            if pitched.normalize().dot(up).abs() <= MAX_UP_ALIGNMENT {
                orientation = pitched;
            }
        }
        if self.pending_yaw != 0.0 {
            orientation = Quaternion::from_axis_angle(up, Rad(self.pending_yaw)) * orientation;
        }

        self.orientation = orientation.normalize();
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
    }
}

/// -1, 0 or 1. Unlike `f32::signum`, zero maps to zero.
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
