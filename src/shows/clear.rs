//! Fade the whole strip to black

use crate::color::BLACK;
use crate::driver::LedStrip;
use crate::error::{Result, StripError};
use crate::params::{verify, Parameter, ParameterStore};
use crate::show::{blend_whole_strip_to_color, Show, ShowContext};
use std::time::Duration;

pub struct Clear {
    fadetime_sec: Parameter<f64>,
}

impl Clear {
    pub fn new() -> Self {
        Self {
            fadetime_sec: Parameter::new("fadetime_sec", 1.0)
                .verified_by(|v, name| verify::duration_sec(*v, name))
                .preprocessed_by(crate::params::preprocess::number_from_string),
        }
    }

    pub fn boxed() -> Box<dyn Show> {
        Box::new(Self::new())
    }
}

impl Default for Clear {
    fn default() -> Self {
        Self::new()
    }
}

impl Show for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new().with(&mut self.fadetime_sec)
    }

    fn check_runnable(&self, strip: &dyn LedStrip) -> Result<()> {
        if strip.num_leds() < 1 {
            return Err(StripError::InvalidStrip(
                "\"clear\" needs a strip of at least 1 LED".to_string(),
            ));
        }
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        let fadetime = Duration::from_secs_f64(*self.fadetime_sec.get());
        blend_whole_strip_to_color(ctx, BLACK, fadetime)?;

        // twice, in case a frame got lost on the bus
        for _ in 0..2 {
            ctx.strip().clear_buffer();
            ctx.show()?;
        }
        Ok(())
    }
}
