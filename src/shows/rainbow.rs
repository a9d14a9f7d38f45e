//! Rotate a rainbow color wheel around the strip

use crate::color::wheel;
use crate::driver::LedStrip;
use crate::show::{ColorCycle, CycleParameters, CycleShow, CycleStep, Show};

#[derive(Debug, Default)]
pub struct Rainbow;

impl Rainbow {
    pub fn boxed() -> Box<dyn Show> {
        CycleShow::boxed(Rainbow)
    }
}

impl ColorCycle for Rainbow {
    fn name(&self) -> &'static str {
        "rainbow"
    }

    fn default_parameters() -> CycleParameters {
        CycleParameters::new(0.04, Some(255))
    }

    /// One cycle is one trip through the color wheel. The strip always
    /// shows one full rainbow, whatever its length.
    fn update(&mut self, strip: &mut dyn LedStrip, step: CycleStep) -> bool {
        let num_leds = strip.num_leds();
        let scale_factor = 255.0 / num_leds as f32;
        let start_index = 255.0 / step.steps_per_cycle as f32 * step.step as f32;

        for index in 0..num_leds {
            let (r, g, b) = wheel((start_index + index as f32 * scale_factor) % 255.0);
            strip.set_pixel(index, r, g, b);
        }
        true
    }
}
