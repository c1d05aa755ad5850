//! The frame orchestrator.
//!
//! A [`Viewer`] is either idle or running. [`Viewer::on_init`] compiles the
//! program, loads and binds a document and starts running; from then on every
//! [`Viewer::on_render`] advances the camera, writes the shader parameters and
//! draws the bound scene. The viewer owns every GPU object it creates and
//! hands them back to the backend in [`Viewer::teardown`], which also runs on
//! drop while the backend is still alive.
//!
//! UI code talks to the viewer through the setters and receives FPS values
//! through [`Viewer::on_fps_updated`].

use std::path::Path;

use anyhow::Context as _;
use cgmath::Point3;

use crate::{
    camera::{Camera, CameraMatrices},
    data_structures::{
        document::Document,
        parameters::{Lighting, ParameterBlock, ParameterSlot},
    },
    metrics::{FrameMetrics, Telemetry},
    render::Backend,
    resources,
    scene::{BoundScene, binder, renderer},
};

/// Perspective settings passed to the camera every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Slots of every parameter written per frame. Missing members stay `None`
/// and their writes are dropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterSlots {
    model: Option<ParameterSlot>,
    view: Option<ParameterSlot>,
    projection: Option<ParameterSlot>,
    sun_position: Option<ParameterSlot>,
    sun_light_coef: Option<ParameterSlot>,
    sun_color: Option<ParameterSlot>,
    ambient_light_coef: Option<ParameterSlot>,
    spotlight_position: Option<ParameterSlot>,
    spotlight_coef: Option<ParameterSlot>,
    spotlight_color: Option<ParameterSlot>,
    spotlight_first_cos: Option<ParameterSlot>,
    spotlight_direction: Option<ParameterSlot>,
    spotlight_second_cos: Option<ParameterSlot>,
    morphing_progress: Option<ParameterSlot>,
}

impl ParameterSlots {
    pub fn locate() -> Self {
        let slot = |name: &str| {
            let slot = ParameterBlock::location(name);
            if slot.is_none() {
                log::warn!("The program declares no parameter named {}", name);
            }
            slot
        };
        Self {
            model: slot("model"),
            view: slot("view"),
            projection: slot("projection"),
            sun_position: slot("sun_position"),
            sun_light_coef: slot("sun_light_coef"),
            sun_color: slot("sun_color"),
            ambient_light_coef: slot("ambient_light_coef"),
            spotlight_position: slot("spotlight_position"),
            spotlight_coef: slot("spotlight_coef"),
            spotlight_color: slot("spotlight_color"),
            spotlight_first_cos: slot("spotlight_first_cos"),
            spotlight_direction: slot("spotlight_direction"),
            spotlight_second_cos: slot("spotlight_second_cos"),
            morphing_progress: slot("morphing_progress"),
        }
    }

    fn write(
        &self,
        block: &mut ParameterBlock,
        lighting: &Lighting,
        camera_position: Point3<f32>,
        matrices: &CameraMatrices,
    ) {
        let (first_cos, second_cos) = lighting.spotlight_cosines();
        block.set(self.model, matrices.model);
        block.set(self.view, matrices.view);
        block.set(self.projection, matrices.projection);
        block.set(self.sun_position, lighting.light_position);
        block.set(self.sun_light_coef, lighting.sun);
        block.set(self.sun_color, lighting.sun_color);
        block.set(self.ambient_light_coef, lighting.ambient);
        block.set(self.spotlight_position, camera_position);
        block.set(self.spotlight_coef, lighting.spot);
        block.set(self.spotlight_color, lighting.spotlight_color);
        block.set(self.spotlight_first_cos, first_cos);
        block.set(self.spotlight_direction, matrices.direction);
        block.set(self.spotlight_second_cos, second_cos);
        block.set(self.morphing_progress, lighting.morphing_progress);
    }
}

pub enum Stage<B: Backend> {
    Idle,
    Running {
        document: Document,
        scene: BoundScene<B>,
        slots: ParameterSlots,
    },
}

pub struct Viewer<B: Backend> {
    stage: Stage<B>,
    camera: Camera,
    camera_start: Point3<f32>,
    lighting: Lighting,
    parameters: ParameterBlock,
    metrics: FrameMetrics,
    telemetry: Telemetry,
    animated: bool,
    projection: Projection,
    size: (u32, u32),
    // Dropped last so teardown can still reach it.
    backend: B,
}

impl<B: Backend> Viewer<B> {
    /// An idle viewer drawing to a surface of `width` x `height`.
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self {
            stage: Stage::Idle,
            camera: Camera::new(Camera::DEFAULT_POSITION, width, height),
            camera_start: Camera::DEFAULT_POSITION,
            lighting: Lighting::default(),
            parameters: ParameterBlock::default(),
            metrics: FrameMetrics::default(),
            telemetry: Telemetry::default(),
            animated: true,
            projection: Projection::default(),
            size: (width, height),
            backend,
        }
    }

    /// Replace the frame counters, e.g. with ones reading a different clock.
    pub fn with_metrics(mut self, metrics: FrameMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Where the camera starts when a document is bound.
    pub fn set_camera_start(&mut self, position: Point3<f32>) {
        self.camera_start = position;
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.stage, Stage::Running { .. })
    }

    /// Compile the program, load the glTF file at `path` and start running.
    ///
    /// On a load error the viewer stays idle and the error is returned.
    pub fn on_init(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        if self.is_running() {
            log::warn!("The viewer is already running; ignoring a second initialisation");
            return Ok(());
        }
        self.backend
            .compile_program()
            .context("Failed to prepare the shader program")?;
        let document = match resources::load_document(path.as_ref()) {
            Ok(document) => document,
            Err(e) => {
                log::error!("{:#}", e);
                return Err(e);
            }
        };
        self.enter_running(document);
        Ok(())
    }

    /// Like [`Viewer::on_init`] for a document that is already in memory.
    pub fn on_init_document(&mut self, document: Document) -> anyhow::Result<()> {
        if self.is_running() {
            log::warn!("The viewer is already running; ignoring a second initialisation");
            return Ok(());
        }
        self.backend
            .compile_program()
            .context("Failed to prepare the shader program")?;
        self.enter_running(document);
        Ok(())
    }

    fn enter_running(&mut self, document: Document) {
        let scene = binder::bind(&mut self.backend, &document);
        let slots = ParameterSlots::locate();
        let (width, height) = self.size;
        self.camera = Camera::new(self.camera_start, width, height);
        self.stage = Stage::Running {
            document,
            scene,
            slots,
        };
        log::info!("Viewer running");
    }

    /// Draw one frame. Returns whether another frame should be scheduled.
    ///
    /// An idle viewer draws nothing and returns `false`.
    pub fn on_render(&mut self) -> anyhow::Result<bool> {
        let Self {
            stage,
            camera,
            lighting,
            parameters,
            metrics,
            telemetry,
            animated,
            projection,
            backend,
            ..
        } = self;
        let mut metrics = metrics.capture(telemetry);

        let Stage::Running {
            document,
            scene,
            slots,
        } = stage
        else {
            return Ok(false);
        };

        let matrices = camera.update(
            projection.fov_degrees,
            projection.near,
            projection.far,
            metrics.total_frames,
        );
        slots.write(parameters, lighting, camera.position(), &matrices);

        if !backend.begin_frame(parameters)? {
            log::debug!("No surface frame available; skipping");
            return Ok(*animated);
        }
        renderer::draw(backend, scene, document);
        backend.end_frame()?;
        metrics.frame_rendered();

        Ok(*animated)
    }

    /// Follow a surface resize. Zero sizes are ignored.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.backend.resize(width, height);
        self.camera.resize(width, height);
    }

    /// Release every GPU object of the bound scene and go back to idle.
    pub fn teardown(&mut self) {
        if let Stage::Running { scene, .. } = std::mem::replace(&mut self.stage, Stage::Idle) {
            scene.release(&mut self.backend);
            log::info!("Viewer torn down");
        }
    }

    pub fn on_fps_updated(&mut self, listener: impl FnMut(u32) + 'static) {
        self.telemetry.subscribe(listener);
    }

    pub fn set_light_x(&mut self, value: f32) {
        self.lighting.set_light_x(value);
    }

    pub fn set_light_z(&mut self, value: f32) {
        self.lighting.set_light_z(value);
    }

    pub fn set_morphing_progress(&mut self, value: f32) {
        self.lighting.set_morphing_progress(value);
    }

    pub fn set_sun(&mut self, value: f32) {
        self.lighting.set_sun(value);
    }

    pub fn set_ambient(&mut self, value: f32) {
        self.lighting.set_ambient(value);
    }

    pub fn set_spot(&mut self, value: f32) {
        self.lighting.set_spot(value);
    }

    pub fn set_spotlight_angles(&mut self, first: f32, second: f32) {
        self.lighting.set_spotlight_angles(first, second);
    }

    pub fn set_animated(&mut self, animated: bool) {
        self.animated = animated;
    }

    pub fn animated(&self) -> bool {
        self.animated
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn parameters(&self) -> &ParameterBlock {
        &self.parameters
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn scene(&self) -> Option<&BoundScene<B>> {
        match &self.stage {
            Stage::Running { scene, .. } => Some(scene),
            Stage::Idle => None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: Backend> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
