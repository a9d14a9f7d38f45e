//! Theater chase: segments of 7 LEDs, 2 dark and 5 lit, moving along the strip
//!
//! The lit color walks through the color wheel once per cycle. For a smooth
//! transition between cycles `num_steps_per_cycle` should be a multiple of 7.

use crate::color::{wheel, BLACK};
use crate::driver::LedStrip;
use crate::show::{ColorCycle, CycleParameters, CycleShow, CycleStep, Show};

const SEGMENT: u32 = 7;

#[derive(Debug, Default)]
pub struct TheaterChase;

impl TheaterChase {
    pub fn boxed() -> Box<dyn Show> {
        CycleShow::boxed(TheaterChase)
    }
}

impl ColorCycle for TheaterChase {
    fn name(&self) -> &'static str {
        "theaterchase"
    }

    fn default_parameters() -> CycleParameters {
        CycleParameters::new(0.04, Some(35))
    }

    fn update(&mut self, strip: &mut dyn LedStrip, step: CycleStep) -> bool {
        let start_index = step.step % SEGMENT;
        let color = wheel((255.0 / step.steps_per_cycle as f32 * step.step as f32).round());

        for index in 0..strip.num_leds() {
            let (r, g, b) = match (index as u32 + start_index) % SEGMENT {
                0 | 1 => BLACK,
                _ => color,
            };
            strip.set_pixel(index, r, g, b);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DummyStrip;

    #[test]
    fn test_dark_pixels_move_with_step() {
        let mut strip = DummyStrip::new(14, 1.0);
        let mut chase = TheaterChase;

        chase.update(&mut strip, CycleStep { step: 0, cycle: 0, steps_per_cycle: 35 });
        assert_eq!(strip.get_pixel(0), Some(BLACK));
        assert_eq!(strip.get_pixel(1), Some(BLACK));
        assert_eq!(strip.get_pixel(2), Some(wheel(0.0)));
        assert_eq!(strip.get_pixel(7), Some(BLACK));

        chase.update(&mut strip, CycleStep { step: 1, cycle: 0, steps_per_cycle: 35 });
        assert_eq!(strip.get_pixel(0), Some(BLACK));
        assert_ne!(strip.get_pixel(1), Some(BLACK));
        assert_eq!(strip.get_pixel(6), Some(BLACK));
    }
}
