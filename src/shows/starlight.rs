//! Warm white stars that light up at random and fade out
//!
//! Each step a new star appears with a chance of 10 in 101. A star starts
//! at full brightness and fades to dark over [`STAR_LIFETIME`] steps, using
//! the per-LED brightness rather than the color.

use crate::color::Rgb;
use crate::driver::LedStrip;
use crate::show::{ColorCycle, CycleParameters, CycleShow, CycleStep, Show};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Steps from full brightness to dark
pub const STAR_LIFETIME: u64 = 10;

const STAR_COLOR: Rgb = (255.0, 180.0, 50.0);

#[derive(Debug)]
pub struct Starlight {
    /// LED index -> step at which the star is gone
    stars: BTreeMap<usize, u64>,
    rng_state: u64,
}

impl Starlight {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0x2545_f491_4f6c_dd1d);
        Self::with_seed(seed)
    }

    /// Deterministic star positions, for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            stars: BTreeMap::new(),
            // xorshift never leaves 0
            rng_state: seed | 1,
        }
    }

    pub fn boxed() -> Box<dyn Show> {
        CycleShow::boxed(Self::new())
    }

    pub fn num_stars(&self) -> usize {
        self.stars.len()
    }

    /// Draw every star as of step `now` and forget the ones that are gone
    fn paint(&mut self, strip: &mut dyn LedStrip, now: u64) {
        strip.clear_buffer();
        for (&index, &end) in &self.stars {
            let remaining = end.saturating_sub(now);
            strip.set_pixel(index, STAR_COLOR.0, STAR_COLOR.1, STAR_COLOR.2);
            strip.set_brightness(index, remaining as f32 / STAR_LIFETIME as f32);
        }
        self.stars.retain(|_, end| *end > now);
    }

    fn next_random(&mut self) -> u64 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 7;
        self.rng_state ^= self.rng_state << 17;
        self.rng_state
    }
}

impl Default for Starlight {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorCycle for Starlight {
    fn name(&self) -> &'static str {
        "starlight"
    }

    fn default_parameters() -> CycleParameters {
        CycleParameters::new(0.02, Some(255))
    }

    fn before_start(&mut self, _strip: &mut dyn LedStrip) {
        self.stars.clear();
    }

    fn update(&mut self, strip: &mut dyn LedStrip, step: CycleStep) -> bool {
        let now = u64::from(step.step) + step.cycle * 256;

        if self.next_random() % 101 > 90 {
            let index = (self.next_random() % strip.num_leds().max(1) as u64) as usize;
            self.stars.insert(index, now + STAR_LIFETIME);
        }
        self.paint(strip, now);
        true
    }
}
