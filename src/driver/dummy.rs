//! A strip without hardware, for development machines and tests

use super::{LedStrip, PixelBuffer};
use crate::color::Rgb;
use crate::error::Result;

/// Keeps only the buffer and logs it on every `show()`
#[derive(Debug, Clone)]
pub struct DummyStrip {
    buffer: PixelBuffer,
    shows: u64,
    closed: bool,
}

impl DummyStrip {
    pub fn new(num_leds: usize, max_global_brightness: f32) -> Self {
        Self {
            buffer: PixelBuffer::new(num_leds, max_global_brightness),
            shows: 0,
            closed: false,
        }
    }

    /// Number of `show()` calls so far
    pub fn show_count(&self) -> u64 {
        self.shows
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl LedStrip for DummyStrip {
    fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    fn on_color_change(&mut self, _index: usize, _color: Rgb) {}

    fn on_brightness_change(&mut self, _index: usize) {}

    fn show(&mut self) -> Result<()> {
        self.shows += 1;
        tracing::trace!(
            "Dummy strip: brightness {:.2}, colors {:?}",
            self.buffer.global_brightness(),
            self.buffer.colors()
        );
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        tracing::debug!("Closed dummy strip after {} refreshes", self.shows);
    }
}
