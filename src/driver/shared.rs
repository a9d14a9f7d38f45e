//! Strip state shared between the controller and show workers
//!
//! Every worker gets the driver handed over, but the driver's buffer only
//! travels with it. The mirror keeps the last known state so that the next
//! worker (or a freshly rebuilt driver after a forced stop) starts from
//! what was on the strip, not from a dark buffer.

use super::LedStrip;
use crate::color::Rgb;
use crate::error::{Result, StripError};
use std::sync::{Arc, Mutex, PoisonError};

/// Plain copy of the mirrored state
#[derive(Debug, Clone, PartialEq)]
pub struct StripSnapshot {
    pub colors: Vec<Rgb>,
    pub brightness: Vec<f32>,
    pub global_brightness: f32,
}

/// Thread-safe mirror of one strip's colors and brightness
#[derive(Debug, Clone)]
pub struct SharedStripState {
    inner: Arc<Mutex<StripSnapshot>>,
}

impl SharedStripState {
    /// Mirror the current state of `strip`
    pub fn new(strip: &dyn LedStrip) -> Self {
        let buffer = strip.buffer();
        Self {
            inner: Arc::new(Mutex::new(StripSnapshot {
                colors: buffer.colors().to_vec(),
                brightness: buffer.brightness().to_vec(),
                global_brightness: buffer.global_brightness(),
            })),
        }
    }

    pub fn num_leds(&self) -> usize {
        self.lock().colors.len()
    }

    /// Copy of the mirrored state
    pub fn snapshot(&self) -> StripSnapshot {
        self.lock().clone()
    }

    /// Copy the strip's buffer into the mirror
    pub fn synchronize_up(&self, strip: &dyn LedStrip) {
        let buffer = strip.buffer();
        let mut state = self.lock();
        state.colors.clear();
        state.colors.extend_from_slice(buffer.colors());
        state.brightness.clear();
        state.brightness.extend_from_slice(buffer.brightness());
        state.global_brightness = buffer.global_brightness();
    }

    /// Load the mirrored state into the strip's buffer and re-encode it
    ///
    /// Fails with [`StripError::InvalidStrip`] when the lengths differ. The
    /// strip's frozen flag is left untouched.
    pub fn synchronize_down(&self, strip: &mut dyn LedStrip) -> Result<()> {
        let state = self.lock();
        if state.colors.len() != strip.num_leds() {
            return Err(StripError::InvalidStrip(format!(
                "Shared state holds {} LEDs but the strip has {}",
                state.colors.len(),
                strip.num_leds()
            )));
        }
        strip
            .buffer_mut()
            .load(&state.colors, &state.brightness, state.global_brightness);
        drop(state);
        strip.refresh_all();
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StripSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
