//! LED strip drivers
//!
//! All drivers share the [`LedStrip`] trait. A driver only has to keep its
//! [`PixelBuffer`] and react to color and brightness changes by updating its
//! own wire representation; everything the shows call (`set_pixel`,
//! `rotate`, `clear_strip`, ...) is built on top of that.
//!
//! # Components
//!
//! - [`Apa102`] - APA102 / SK9822 ("DotStar") chipset over an SPI bus
//! - [`DummyStrip`] - no hardware, logs the buffer on every `show()`
//! - [`SpiBus`] - the byte sink below a chipset driver
//! - [`SharedStripState`] - the mirror that moves strip state between workers

pub mod apa102;
pub mod buffer;
pub mod bus;
pub mod dummy;
pub mod shared;

pub use apa102::{Apa102, ColorOrder, APA102_MAX_LEDS};
pub use buffer::PixelBuffer;
pub use bus::{MemoryBus, SpiBus, MAX_TRANSFER_BYTES};
#[cfg(target_os = "linux")]
pub use bus::SpidevBus;
pub use dummy::DummyStrip;
pub use shared::{SharedStripState, StripSnapshot};

use crate::color::{color_bytes_to_tuple, Rgb, BLACK};
use crate::config::{DriverKind, StripConfig};
use crate::error::Result;
use std::time::Duration;

/// Unified interface for LED strip drivers
///
/// Implementations must be `Send` so that the driver can be handed to the
/// worker thread of the running show and back.
pub trait LedStrip: Send {
    /// The color and brightness buffer of this strip
    fn buffer(&self) -> &PixelBuffer;

    /// Mutable access to the buffer; callers must invoke the change hooks afterwards
    fn buffer_mut(&mut self) -> &mut PixelBuffer;

    /// Re-derive the wire representation of one pixel's color
    fn on_color_change(&mut self, index: usize, color: Rgb);

    /// Re-derive the wire representation of one pixel's brightness
    fn on_brightness_change(&mut self, index: usize);

    /// Send the buffered state to the strip
    fn show(&mut self) -> Result<()>;

    /// Release the underlying bus
    fn close(&mut self);

    /// Upper bound of the time one `show()` takes
    fn max_refresh_time(&self) -> Duration {
        Duration::ZERO
    }

    fn num_leds(&self) -> usize {
        self.buffer().len()
    }

    fn is_frozen(&self) -> bool {
        self.buffer().is_frozen()
    }

    /// Turn all setters into no-ops until [`LedStrip::unfreeze`]
    fn freeze(&mut self) {
        self.buffer_mut().set_frozen(true);
    }

    fn unfreeze(&mut self) {
        self.buffer_mut().set_frozen(false);
    }

    fn get_pixel(&self, index: usize) -> Option<Rgb> {
        self.buffer().color(index)
    }

    /// Change one pixel in the buffer. Indices past the strip end are ignored.
    ///
    /// To send the buffer to the strip, call [`LedStrip::show`].
    fn set_pixel(&mut self, index: usize, red: f32, green: f32, blue: f32) {
        if self.is_frozen() {
            return;
        }
        if self.buffer_mut().store_color(index, (red, green, blue)) {
            if let Some(color) = self.buffer().color(index) {
                self.on_color_change(index, color);
            }
        }
    }

    /// Like [`LedStrip::set_pixel`] with a packed `0xRRGGBB` color
    fn set_pixel_bytes(&mut self, index: usize, rgb_color: u32) {
        let (r, g, b) = color_bytes_to_tuple(rgb_color);
        self.set_pixel(index, f32::from(r), f32::from(g), f32::from(b));
    }

    /// Set the brightness (0.0 - 1.0) of a single LED
    fn set_brightness(&mut self, index: usize, brightness: f32) {
        if self.is_frozen() {
            return;
        }
        if self.buffer_mut().store_brightness(index, brightness) {
            self.on_brightness_change(index);
        }
    }

    fn global_brightness(&self) -> f32 {
        self.buffer().global_brightness()
    }

    /// Set the brightness applied on top of every LED.
    ///
    /// The value is clamped to `[0, max_global_brightness]`; the stored
    /// value is returned.
    fn set_global_brightness(&mut self, brightness: f32) -> f32 {
        if self.is_frozen() {
            return self.global_brightness();
        }
        let stored = self.buffer_mut().store_global_brightness(brightness);
        for index in 0..self.num_leds() {
            self.on_brightness_change(index);
        }
        stored
    }

    /// Treat the buffer as circular and rotate it by `positions`
    ///
    /// Negative values rotate in the opposite direction.
    fn rotate(&mut self, positions: isize) {
        if self.is_frozen() {
            return;
        }
        self.buffer_mut().rotate(positions);
        self.refresh_all();
    }

    /// Re-derive the wire representation of every pixel
    fn refresh_all(&mut self) {
        for index in 0..self.num_leds() {
            if let Some(color) = self.buffer().color(index) {
                self.on_color_change(index, color);
            }
            self.on_brightness_change(index);
        }
    }

    /// Set every pixel in the buffer to black
    fn clear_buffer(&mut self) {
        for index in 0..self.num_leds() {
            self.set_pixel(index, BLACK.0, BLACK.1, BLACK.2);
        }
    }

    /// Clear the buffer and show it
    fn clear_strip(&mut self) -> Result<()> {
        self.clear_buffer();
        self.show()
    }
}

/// Open the driver described by the strip configuration
pub fn open(config: &StripConfig) -> Result<Box<dyn LedStrip>> {
    match config.driver {
        #[cfg(not(target_os = "linux"))]
        DriverKind::Apa102 => Err(crate::error::StripError::InvalidConfiguration(
            "The apa102 driver needs Linux spidev support".to_string(),
        )),
        #[cfg(target_os = "linux")]
        DriverKind::Apa102 => {
            let bus = SpidevBus::open(&config.spi_device, config.max_clock_speed_hz)?;
            let strip = Apa102::new(config.num_leds, Box::new(bus), config)?;
            tracing::info!(
                "Opened APA102 strip with {} LEDs on {:?}",
                config.num_leds,
                config.spi_device
            );
            Ok(Box::new(strip))
        }
        DriverKind::Dummy => {
            tracing::info!("Using dummy strip with {} LEDs", config.num_leds);
            Ok(Box::new(DummyStrip::new(
                config.num_leds,
                config.max_global_brightness,
            )))
        }
    }
}
