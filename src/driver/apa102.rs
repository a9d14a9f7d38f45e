//! Driver for APA102 LED strips (aka "DotStar") and SK9822 clones
//!
//! # Protocol
//!
//! An APA102 LED forwards everything it receives on data-in to data-out.
//! After 32 zero bits it instead takes the next 32-bit frame as its own
//! color, sending zeroes downstream while doing so, which prepares the next
//! LED in the same way. A transmission therefore is:
//!
//! 1. a start frame of 32 zero bits
//! 2. one 4-byte frame per LED: `[0b111bbbbb, c1, c2, c3]` where `bbbbb` is
//!    a 5-bit brightness and `c1..c3` are the color bytes (blue, green, red
//!    on genuine chips)
//! 3. an end frame of extra clock edges
//!
//! Every LED delays the clock by half a bit, so the data for the last LED
//! needs `num_leds / 2` more clock edges to arrive. The end frame sends
//! `ceil(num_leds / 16)` zero bytes for that.
//!
//! SK9822 chips latch the new colors only on the next start frame, so in
//! compatibility mode a second start frame is sent before the end frame.

use super::bus::SpiBus;
use super::{LedStrip, PixelBuffer};
use crate::color::{grayscale_correction, Rgb};
use crate::config::StripConfig;
use crate::error::{Result, StripError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// APA102 strips cannot be longer than this
pub const APA102_MAX_LEDS: usize = 1024;

/// Bytes per LED frame
const FRAME_BYTES: usize = 4;

/// Refresh time the strip needs per LED
const REFRESH_TIME_PER_LED: Duration = Duration::from_micros(25);

/// Order in which the three color bytes follow the brightness prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    /// Native order of genuine APA102 chips
    #[default]
    Bgr,
}

impl ColorOrder {
    /// Arrange corrected red, green and blue bytes in wire order
    pub fn arrange(self, red: u8, green: u8, blue: u8) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [red, green, blue],
            ColorOrder::Rbg => [red, blue, green],
            ColorOrder::Grb => [green, red, blue],
            ColorOrder::Gbr => [green, blue, red],
            ColorOrder::Brg => [blue, red, green],
            ColorOrder::Bgr => [blue, green, red],
        }
    }
}

/// APA102 driver writing to any [`SpiBus`]
pub struct Apa102 {
    buffer: PixelBuffer,
    /// Encoded LED frames, 4 bytes per LED
    leds: Vec<u8>,
    bus: Box<dyn SpiBus>,
    color_order: ColorOrder,
    sk9822_compatibility: bool,
}

impl Apa102 {
    /// Create the driver. Fails for strips longer than [`APA102_MAX_LEDS`].
    pub fn new(num_leds: usize, bus: Box<dyn SpiBus>, config: &StripConfig) -> Result<Self> {
        if num_leds > APA102_MAX_LEDS {
            return Err(StripError::InvalidConfiguration(format!(
                "The APA102 driver does not support strips of more than {} LEDs (got {})",
                APA102_MAX_LEDS, num_leds
            )));
        }

        let mut strip = Self {
            buffer: PixelBuffer::new(num_leds, config.max_global_brightness),
            leds: vec![0; FRAME_BYTES * num_leds],
            bus,
            color_order: config.color_order,
            sk9822_compatibility: config.sk9822_compatibility,
        };
        strip.buffer.store_global_brightness(config.initial_brightness);
        strip.refresh_all();
        Ok(strip)
    }

    /// First byte of an LED frame for a brightness from 0.0 to 1.0
    ///
    /// Structure: `1 1 1 b4 b3 b2 b1 b0` with a 5-bit brightness.
    pub fn led_prefix(brightness: f32) -> u8 {
        let level = grayscale_correction(f64::from(brightness), 1.0, 31) as u8;
        (level & 0b0001_1111) | 0b1110_0000
    }

    /// 32 zero bits
    pub fn start_frame() -> [u8; 4] {
        [0; 4]
    }

    /// Extra clock edges so the last LED receives its data
    pub fn end_frame(num_leds: usize) -> Vec<u8> {
        vec![0; num_leds.div_ceil(16)]
    }

    /// The encoded LED frames as they are sent after the start frame
    pub fn encoded(&self) -> &[u8] {
        &self.leds
    }

    pub fn color_order(&self) -> ColorOrder {
        self.color_order
    }

    pub fn set_sk9822_compatibility(&mut self, enabled: bool) {
        self.sk9822_compatibility = enabled;
    }

    /// The complete byte stream of one `show()`
    pub fn transmission(&self) -> Vec<u8> {
        let num_leds = self.buffer.len();
        let mut out = Vec::with_capacity(self.leds.len() + 8 + num_leds.div_ceil(16));
        out.extend_from_slice(&Self::start_frame());
        out.extend_from_slice(&self.leds);
        if self.sk9822_compatibility {
            out.extend_from_slice(&Self::start_frame());
        }
        out.extend_from_slice(&Self::end_frame(num_leds));
        out
    }
}

impl LedStrip for Apa102 {
    fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    fn on_color_change(&mut self, index: usize, color: Rgb) {
        let start = FRAME_BYTES * index;
        let Some(frame) = self.leds.get_mut(start + 1..start + FRAME_BYTES) else {
            return;
        };

        // the duty cycle for the perceived lightness
        let red = grayscale_correction(f64::from(color.0), 255.0, 255) as u8;
        let green = grayscale_correction(f64::from(color.1), 255.0, 255) as u8;
        let blue = grayscale_correction(f64::from(color.2), 255.0, 255) as u8;

        frame.copy_from_slice(&self.color_order.arrange(red, green, blue));
    }

    fn on_brightness_change(&mut self, index: usize) {
        let brightness = self.buffer.effective_brightness(index);
        if let Some(prefix) = self.leds.get_mut(FRAME_BYTES * index) {
            *prefix = Self::led_prefix(brightness);
        }
    }

    fn show(&mut self) -> Result<()> {
        self.bus.write(&Self::start_frame())?;
        self.bus.write(&self.leds)?;
        if self.sk9822_compatibility {
            self.bus.write(&Self::start_frame())?;
        }
        self.bus.write(&Self::end_frame(self.buffer.len()))
    }

    fn close(&mut self) {
        self.bus.close();
    }

    fn max_refresh_time(&self) -> Duration {
        REFRESH_TIME_PER_LED * self.buffer.len() as u32
    }
}
