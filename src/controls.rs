//! Keyboard controls standing in for the slider panel.
//!
//! Digits `1`-`7` select a slider, the up/down arrows move it by one step
//! within its range and push the new value through the matching setter.
//! `W`/`S` move forward and back like the wheel, `A`/`D` strafe and
//! `Space`/`Shift` move vertically.

use winit::keyboard::KeyCode;

use crate::{
    config::LightingConfig,
    data_structures::parameters::{
        AMBIENT_RANGE, LIGHT_X_RANGE, LIGHT_Z_RANGE, MORPH_RANGE, SPOT_ANGLE_RANGE, SPOT_RANGE,
        SUN_RANGE, SliderRange,
    },
    render::Backend,
    viewer::Viewer,
};

/// Distance moved per strafe or vertical key press.
pub const PAN_STEP: f32 = 0.1;

// Each arrow press moves a slider by this fraction of its range.
const STEPS_PER_RANGE: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slider {
    Morph,
    LightX,
    LightZ,
    Sun,
    Ambient,
    Spot,
    SpotAngle,
}

impl Slider {
    pub const ALL: [Slider; 7] = [
        Slider::Morph,
        Slider::LightX,
        Slider::LightZ,
        Slider::Sun,
        Slider::Ambient,
        Slider::Spot,
        Slider::SpotAngle,
    ];

    pub fn range(self) -> SliderRange {
        match self {
            Slider::Morph => MORPH_RANGE,
            Slider::LightX => LIGHT_X_RANGE,
            Slider::LightZ => LIGHT_Z_RANGE,
            Slider::Sun => SUN_RANGE,
            Slider::Ambient => AMBIENT_RANGE,
            Slider::Spot => SPOT_RANGE,
            Slider::SpotAngle => SPOT_ANGLE_RANGE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slider::Morph => "Morph",
            Slider::LightX => "Light X",
            Slider::LightZ => "Light Z",
            Slider::Sun => "Sun",
            Slider::Ambient => "Ambient",
            Slider::Spot => "Spot",
            Slider::SpotAngle => "Spot angle",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Forward `value` to the setter behind this slider.
    pub fn apply<B: Backend>(self, value: f32, viewer: &mut Viewer<B>) {
        match self {
            Slider::Morph => viewer.set_morphing_progress(value),
            Slider::LightX => viewer.set_light_x(value),
            Slider::LightZ => viewer.set_light_z(value),
            Slider::Sun => viewer.set_sun(value),
            Slider::Ambient => viewer.set_ambient(value),
            Slider::Spot => viewer.set_spot(value),
            Slider::SpotAngle => {
                viewer.set_spotlight_angles(value, value + SPOT_ANGLE_RANGE.default)
            }
        }
    }
}

/// Current position of every slider plus the one arrow keys move.
#[derive(Clone, Debug, PartialEq)]
pub struct SliderPanel {
    values: [f32; 7],
    selected: Slider,
}

impl Default for SliderPanel {
    fn default() -> Self {
        Self::from_config(&LightingConfig::default())
    }
}

impl SliderPanel {
    pub fn from_config(lighting: &LightingConfig) -> Self {
        let mut values = [
            lighting.morph,
            lighting.light_x,
            lighting.light_z,
            lighting.sun,
            lighting.ambient,
            lighting.spot,
            lighting.spot_angle,
        ];
        for slider in Slider::ALL {
            values[slider.index()] = slider.range().clamp(values[slider.index()]);
        }
        Self {
            values,
            selected: Slider::Morph,
        }
    }

    pub fn selected(&self) -> Slider {
        self.selected
    }

    pub fn value(&self, slider: Slider) -> f32 {
        self.values[slider.index()]
    }

    pub fn select(&mut self, slider: Slider) {
        self.selected = slider;
        log::info!(
            "{} selected ({} in {}..={})",
            slider.label(),
            self.value(slider),
            slider.range().min,
            slider.range().max
        );
    }

    /// Move the selected slider by `steps` and return its new value.
    pub fn step(&mut self, steps: f32) -> f32 {
        let range = self.selected.range();
        let step = (range.max - range.min) / STEPS_PER_RANGE;
        let value = range.clamp(self.value(self.selected) + steps * step);
        self.values[self.selected.index()] = value;
        value
    }

    /// React to a key press. Returns whether the key was used.
    pub fn handle_key<B: Backend>(&mut self, key: KeyCode, viewer: &mut Viewer<B>) -> bool {
        let digit = match key {
            KeyCode::Digit1 => Some(0),
            KeyCode::Digit2 => Some(1),
            KeyCode::Digit3 => Some(2),
            KeyCode::Digit4 => Some(3),
            KeyCode::Digit5 => Some(4),
            KeyCode::Digit6 => Some(5),
            KeyCode::Digit7 => Some(6),
            _ => None,
        };
        if let Some(index) = digit {
            self.select(Slider::ALL[index]);
            return true;
        }

        match key {
            KeyCode::ArrowUp | KeyCode::ArrowRight => {
                let value = self.step(1.0);
                self.selected.apply(value, viewer);
            }
            KeyCode::ArrowDown | KeyCode::ArrowLeft => {
                let value = self.step(-1.0);
                self.selected.apply(value, viewer);
            }
            KeyCode::KeyW => viewer.camera_mut().wheel(1.0),
            KeyCode::KeyS => viewer.camera_mut().wheel(-1.0),
            KeyCode::KeyA => viewer.camera_mut().pan(-PAN_STEP, 0.0),
            KeyCode::KeyD => viewer.camera_mut().pan(PAN_STEP, 0.0),
            KeyCode::Space => viewer.camera_mut().pan(0.0, PAN_STEP),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => viewer.camera_mut().pan(0.0, -PAN_STEP),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_stays_within_the_range() {
        let mut panel = SliderPanel::default();
        panel.select(Slider::LightX);
        assert_eq!(panel.value(Slider::LightX), 90.0);
        for _ in 0..20 {
            panel.step(1.0);
        }
        assert_eq!(panel.value(Slider::LightX), 100.0);
        assert_eq!(panel.step(-1.0), 96.0);
    }

    #[test]
    fn configured_values_are_clamped() {
        let panel = SliderPanel::from_config(&LightingConfig {
            sun: 5000.0,
            spot_angle: 1.0,
            ..Default::default()
        });
        assert_eq!(panel.value(Slider::Sun), 1000.0);
        assert_eq!(panel.value(Slider::SpotAngle), 10.0);
    }
}
