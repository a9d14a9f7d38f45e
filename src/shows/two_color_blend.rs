//! Linear gradient between two colors along the strip

use crate::color::{add_tuples, linear_dim, Rgb};
use crate::driver::LedStrip;
use crate::error::Result;
use crate::params::{preprocess, verify, Parameter, ParameterStore};
use crate::show::{Show, ShowContext};

pub struct TwoColorBlend {
    color1: Parameter<Option<Rgb>>,
    color2: Parameter<Option<Rgb>>,
}

impl TwoColorBlend {
    pub fn new() -> Self {
        Self {
            color1: Parameter::new("color1", None)
                .verified_by(verify::required_rgb_color)
                .preprocessed_by(preprocess::color_from_wire),
            color2: Parameter::new("color2", None)
                .verified_by(verify::required_rgb_color)
                .preprocessed_by(preprocess::color_from_wire),
        }
    }

    pub fn boxed() -> Box<dyn Show> {
        Box::new(Self::new())
    }

    fn paint(&self, ctx: &mut ShowContext<'_>) -> Result<()> {
        let (Some(color1), Some(color2)) = (*self.color1.get(), *self.color2.get()) else {
            return Ok(());
        };

        let strip = ctx.strip();
        let num_leds = strip.num_leds();
        for index in 0..num_leds {
            let distance = index as f32 / num_leds as f32;
            let (r, g, b) = add_tuples(
                linear_dim(color1, 1.0 - distance),
                linear_dim(color2, distance),
            );
            strip.set_pixel(index, r, g, b);
        }
        ctx.show()
    }
}

impl Default for TwoColorBlend {
    fn default() -> Self {
        Self::new()
    }
}

impl Show for TwoColorBlend {
    fn name(&self) -> &'static str {
        "twocolorblend"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new()
            .with(&mut self.color1)
            .with(&mut self.color2)
    }

    fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
        self.color1.verify()?;
        self.color2.verify()?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        self.paint(ctx)
    }

    fn parameters_changed(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        self.paint(ctx)
    }
}
