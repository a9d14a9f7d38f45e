//! Template for step-based animations such as rainbow or theater chase
//!
//! A color cycle paints one step at a time. After every step the runner
//! pauses for `pause_sec`; after `num_steps_per_cycle` steps one cycle is
//! complete. The runner stops after `num_cycles` cycles, or never if that
//! parameter is unset.

use super::{apply_parameter_updates, Show, ShowContext};
use crate::driver::LedStrip;
use crate::error::{Result, StripError};
use crate::params::{verify, Parameter, ParameterStore};
use std::time::Duration;

/// Position of the runner within the animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStep {
    /// 0 to `steps_per_cycle - 1`
    pub step: u32,
    /// Number of completed cycles
    pub cycle: u64,
    pub steps_per_cycle: u32,
}

/// Parameters every color cycle has
pub struct CycleParameters {
    pub pause_sec: Parameter<f64>,
    /// Unset means one step per LED
    pub num_steps_per_cycle: Parameter<Option<u32>>,
    /// Unset means run forever
    pub num_cycles: Parameter<Option<u32>>,
}

impl CycleParameters {
    pub fn new(pause_sec: f64, num_steps_per_cycle: Option<u32>) -> Self {
        Self {
            pause_sec: Parameter::new("pause_sec", pause_sec)
                .verified_by(|v, name| verify::duration_sec(*v, name)),
            num_steps_per_cycle: Parameter::new("num_steps_per_cycle", num_steps_per_cycle)
                .verified_by(|v, name| match v {
                    Some(steps) => verify::positive_integer(i64::from(*steps), name),
                    None => Ok(()),
                }),
            num_cycles: Parameter::new("num_cycles", None).verified_by(|v, name| match v {
                Some(cycles) => verify::positive_integer(i64::from(*cycles), name),
                None => Ok(()),
            }),
        }
    }

    pub fn register<'a>(&'a mut self, store: &mut ParameterStore<'a>) {
        store
            .register(&mut self.pause_sec)
            .register(&mut self.num_steps_per_cycle)
            .register(&mut self.num_cycles);
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_sec.get().max(0.0))
    }

    pub fn steps_per_cycle(&self, num_leds: usize) -> u32 {
        self.num_steps_per_cycle
            .get()
            .unwrap_or(num_leds.try_into().unwrap_or(u32::MAX))
            .max(1)
    }
}

/// One step-based animation
pub trait ColorCycle: Send {
    fn name(&self) -> &'static str;

    /// Default pause and steps of this animation
    fn default_parameters() -> CycleParameters
    where
        Self: Sized;

    /// Minimum strip length
    fn min_leds(&self) -> usize {
        1
    }

    /// Register parameters beyond the common ones
    fn register_parameters<'a>(&'a mut self, _store: &mut ParameterStore<'a>) {}

    /// Prepare the strip before the first step
    fn before_start(&mut self, _strip: &mut dyn LedStrip) {}

    /// Paint one step; returns whether the strip needs a refresh
    fn update(&mut self, strip: &mut dyn LedStrip, step: CycleStep) -> bool;

    /// Called once the show stopped
    fn shutdown(&mut self) {}
}

/// Runs a [`ColorCycle`] as a [`Show`]
pub struct CycleShow<C> {
    cycle: C,
    params: CycleParameters,
}

impl<C: ColorCycle + 'static> CycleShow<C> {
    pub fn new(cycle: C) -> Self {
        Self {
            cycle,
            params: C::default_parameters(),
        }
    }

    pub fn boxed(cycle: C) -> Box<dyn Show> {
        Box::new(Self::new(cycle))
    }

    pub fn cycle(&self) -> &C {
        &self.cycle
    }

    pub fn cycle_parameters(&self) -> &CycleParameters {
        &self.params
    }
}

impl<C: ColorCycle> Show for CycleShow<C> {
    fn name(&self) -> &'static str {
        self.cycle.name()
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        let mut store = ParameterStore::new();
        self.params.register(&mut store);
        self.cycle.register_parameters(&mut store);
        store
    }

    fn check_runnable(&self, strip: &dyn LedStrip) -> Result<()> {
        let min_leds = self.cycle.min_leds();
        if strip.num_leds() < min_leds {
            return Err(StripError::InvalidStrip(format!(
                "\"{}\" needs a strip of at least {} LEDs",
                self.cycle.name(),
                min_leds
            )));
        }
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        self.cycle.before_start(ctx.strip());
        ctx.show()?;

        let mut cycle = 0u64;
        loop {
            let mut step = 0;
            while step < self.params.steps_per_cycle(ctx.num_leds()) {
                let position = CycleStep {
                    step,
                    cycle,
                    steps_per_cycle: self.params.steps_per_cycle(ctx.num_leds()),
                };
                if self.cycle.update(ctx.strip(), position) {
                    ctx.show()?;
                }
                ctx.sleep(self.params.pause())?;
                apply_parameter_updates(self, ctx)?;
                step += 1;
            }

            cycle += 1;
            if let Some(num_cycles) = self.params.num_cycles.get() {
                if cycle >= u64::from(*num_cycles) {
                    tracing::debug!("\"{}\" completed {} cycles", self.cycle.name(), cycle);
                    return Ok(());
                }
            }
        }
    }

    fn cleanup(&mut self, _strip: &mut dyn LedStrip) {
        self.cycle.shutdown();
    }
}
