//! Keep whatever is on the strip
//!
//! The show body returns at once; the lifecycle then refreshes the strip
//! and applies brightness changes until another show starts. This is the
//! usual fallback show.

use crate::driver::LedStrip;
use crate::error::Result;
use crate::params::ParameterStore;
use crate::show::{Show, ShowContext};

#[derive(Debug, Default)]
pub struct Idle;

impl Idle {
    pub fn boxed() -> Box<dyn Show> {
        Box::new(Idle)
    }
}

impl Show for Idle {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new()
    }

    fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        tracing::debug!("Idling with {} LEDs", ctx.num_leds());
        ctx.show()
    }
}
