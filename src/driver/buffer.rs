//! The color and brightness buffer behind every LED strip driver

use crate::color::{clamp_component, Rgb, BLACK};

/// Color and brightness state of a strip
///
/// The length is fixed when the buffer is created. All values stored here
/// are already clamped to their valid ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// One color per LED, components from 0.0 to 255.0
    colors: Vec<Rgb>,
    /// One brightness per LED, from 0.0 to 1.0
    brightness: Vec<f32>,
    /// Brightness applied on top of every per-pixel brightness
    global_brightness: f32,
    /// Upper bound for `global_brightness`
    max_global_brightness: f32,
    /// While set, all setters of the owning driver are no-ops
    frozen: bool,
}

impl PixelBuffer {
    /// Create a dark buffer with full per-pixel brightness
    pub fn new(num_leds: usize, max_global_brightness: f32) -> Self {
        let max_global_brightness = max_global_brightness.clamp(0.0, 1.0);
        Self {
            colors: vec![BLACK; num_leds],
            brightness: vec![1.0; num_leds],
            global_brightness: max_global_brightness,
            max_global_brightness,
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn brightness(&self) -> &[f32] {
        &self.brightness
    }

    pub fn color(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied()
    }

    pub fn pixel_brightness(&self, index: usize) -> Option<f32> {
        self.brightness.get(index).copied()
    }

    pub fn global_brightness(&self) -> f32 {
        self.global_brightness
    }

    pub fn max_global_brightness(&self) -> f32 {
        self.max_global_brightness
    }

    /// Effective brightness of one LED: global times per-pixel
    pub fn effective_brightness(&self, index: usize) -> f32 {
        self.global_brightness * self.brightness.get(index).copied().unwrap_or(0.0)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Store a clamped color. Returns false when `index` is out of range.
    pub(crate) fn store_color(&mut self, index: usize, color: Rgb) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = (
                    clamp_component(color.0),
                    clamp_component(color.1),
                    clamp_component(color.2),
                );
                true
            }
            None => false,
        }
    }

    /// Store a clamped per-pixel brightness. Returns false when `index` is out of range.
    pub(crate) fn store_brightness(&mut self, index: usize, value: f32) -> bool {
        match self.brightness.get_mut(index) {
            Some(slot) => {
                *slot = clamp_unit(value);
                true
            }
            None => false,
        }
    }

    /// Store the global brightness clamped to `[0, max_global_brightness]`
    pub(crate) fn store_global_brightness(&mut self, value: f32) -> f32 {
        self.global_brightness = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, self.max_global_brightness)
        };
        self.global_brightness
    }

    /// Rotate colors and brightness as one circular buffer
    pub(crate) fn rotate(&mut self, positions: isize) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let shift = positions.rem_euclid(len as isize) as usize;
        self.colors.rotate_left(shift);
        self.brightness.rotate_left(shift);
    }

    /// Overwrite everything except the frozen flag and the maximum
    pub(crate) fn load(&mut self, colors: &[Rgb], brightness: &[f32], global_brightness: f32) {
        for (index, color) in colors.iter().enumerate() {
            self.store_color(index, *color);
        }
        for (index, value) in brightness.iter().enumerate() {
            self.store_brightness(index, *value);
        }
        self.store_global_brightness(global_brightness);
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
