//! Application event loop.
//!
//! This module owns the winit side of the viewer: it opens the window, sets up
//! the wgpu [`Context`] on a tokio runtime, and routes window events into the
//! [`Viewer`]. Pointer input goes to the camera, keys go to the
//! [`SliderPanel`], and redraws are requested again after every frame while
//! the viewer is animated.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window, the context and the viewer and loads the model
//! 2. window events update the camera and the lighting between frames
//! 3. `RedrawRequested` renders one frame and schedules the next if animated
//! 4. `CloseRequested` tears the viewer down before the loop exits

use std::sync::Arc;

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{config::ViewerConfig, context::Context, controls::SliderPanel, viewer::Viewer};

/// Everything that exists once the window is open.
struct AppState {
    window: Arc<Window>,
    viewer: Viewer<Context>,
    panel: SliderPanel,
    primary_held: bool,
    cursor: PhysicalPosition<f64>,
}

impl AppState {
    fn new(
        event_loop: &ActiveEventLoop,
        async_runtime: &tokio::runtime::Runtime,
        config: &ViewerConfig,
    ) -> anyhow::Result<Self> {
        let window_attributes = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create the window")?,
        );

        let ctx = async_runtime.block_on(Context::new(
            window.clone(),
            async_runtime.handle().clone(),
        ))?;
        let size = window.inner_size();
        let mut viewer = Viewer::new(ctx, size.width, size.height);
        config.apply(&mut viewer);

        let title = config.window.title.clone();
        let title_window = window.clone();
        viewer.on_fps_updated(move |fps| {
            title_window.set_title(&format!("{} FPS:{}", title, fps));
        });

        match &config.model {
            Some(model) => {
                if let Err(e) = viewer.on_init(model) {
                    log::warn!("Showing an empty scene: {:#}", e);
                }
            }
            None => log::warn!("No model given; showing an empty scene"),
        }

        Ok(Self {
            window,
            viewer,
            panel: SliderPanel::from_config(&config.lighting),
            primary_held: false,
            cursor: PhysicalPosition::new(0.0, 0.0),
        })
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    state: Option<AppState>,
}

impl App {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
        Ok(Self {
            async_runtime,
            config,
            state: None,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match AppState::new(event_loop, &self.async_runtime, &self.config) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                state.viewer.teardown();
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => state.viewer.on_resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match state.viewer.on_render() {
                    Ok(true) => state.window.request_redraw(),
                    Ok(false) => (),
                    Err(e) => log::error!("Unable to render {:#}", e),
                }
                return;
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                state.primary_held = button_state.is_pressed();
                if state.primary_held {
                    state
                        .viewer
                        .camera_mut()
                        .mouse_press(state.cursor.x as f32, state.cursor.y as f32);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.cursor = position;
                let primary_held = state.primary_held;
                state
                    .viewer
                    .camera_mut()
                    .mouse_move(position.x as f32, position.y as f32, primary_held);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                state.viewer.camera_mut().wheel(delta);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape {
                    state.viewer.teardown();
                    event_loop.exit();
                    return;
                }
                if !state.panel.handle_key(code, &mut state.viewer) {
                    return;
                }
            }
            _ => return,
        }

        // Input changed something; a still viewer only redraws on demand.
        if !state.viewer.animated() {
            state.window.request_redraw();
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new().context("Failed to create an event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
