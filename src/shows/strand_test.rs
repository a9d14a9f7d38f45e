//! Classic strand test: a run of 9 LEDs wanders along the strip
//!
//! The run changes color every cycle: red, green, blue, then red again.

use crate::driver::LedStrip;
use crate::show::{ColorCycle, CycleParameters, CycleShow, CycleStep, Show};

const RUN_LENGTH: u32 = 9;

#[derive(Debug, Default)]
pub struct StrandTest {
    color: u32,
}

impl StrandTest {
    pub fn boxed() -> Box<dyn Show> {
        CycleShow::boxed(StrandTest::default())
    }
}

impl ColorCycle for StrandTest {
    fn name(&self) -> &'static str {
        "strandtest"
    }

    /// One step per LED
    fn default_parameters() -> CycleParameters {
        CycleParameters::new(0.05, None)
    }

    fn before_start(&mut self, strip: &mut dyn LedStrip) {
        self.color = 0;
        strip.clear_buffer();
    }

    fn update(&mut self, strip: &mut dyn LedStrip, step: CycleStep) -> bool {
        if step.step == 0 {
            // red -> green -> blue -> black
            self.color >>= 8;
        }
        if self.color == 0 {
            self.color = 0xFF_00_00;
        }

        let head = (step.step + RUN_LENGTH) % step.steps_per_cycle;
        strip.set_pixel_bytes(head as usize, self.color);
        strip.set_pixel_bytes(step.step as usize, 0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_sequence() {
        let mut strip = crate::driver::DummyStrip::new(20, 1.0);
        let mut test = StrandTest::default();
        test.before_start(&mut strip);

        let mut colors = Vec::new();
        for cycle in 0..4 {
            test.update(&mut strip, CycleStep { step: 0, cycle, steps_per_cycle: 20 });
            colors.push(test.color);
        }
        assert_eq!(colors, vec![0xFF_00_00, 0x00_FF_00, 0x00_00_FF, 0xFF_00_00]);
        assert_eq!(strip.get_pixel(9), Some((255.0, 0.0, 0.0)));
        assert_eq!(strip.get_pixel(0), Some((0.0, 0.0, 0.0)));
    }
}
