//! Mock construction helpers

use ledshows::controller::DriverFactory;
use ledshows::driver::{DummyStrip, LedStrip};
use ledshows::error::Result;
use ledshows::params::ParameterStore;
use ledshows::show::{Show, ShowContext};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Factory for dummy strips that counts how often it was called
pub fn counting_factory(num_leds: usize, max_brightness: f32) -> (DriverFactory, Arc<AtomicUsize>) {
    let opened = Arc::new(AtomicUsize::new(0));
    let counter = opened.clone();
    let factory: DriverFactory = Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DummyStrip::new(num_leds, max_brightness)) as Box<dyn LedStrip>)
    });
    (factory, opened)
}

/// Ignores cancellation until [`release_stubborn`] is called
pub struct Stubborn;

static STUBBORN_RELEASED: AtomicBool = AtomicBool::new(false);

pub fn release_stubborn() {
    STUBBORN_RELEASED.store(true, Ordering::SeqCst);
}

impl Stubborn {
    pub fn boxed() -> Box<dyn Show> {
        Box::new(Stubborn)
    }
}

impl Show for Stubborn {
    fn name(&self) -> &'static str {
        "stubborn"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new()
    }

    fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        ctx.strip().set_pixel(0, 1.0, 2.0, 3.0);
        while !STUBBORN_RELEASED.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

/// Records how many instances run at the same time
pub struct Overlap;

pub static OVERLAP_ACTIVE: AtomicUsize = AtomicUsize::new(0);
pub static OVERLAP_MAX: AtomicUsize = AtomicUsize::new(0);

impl Overlap {
    pub fn boxed() -> Box<dyn Show> {
        Box::new(Overlap)
    }
}

impl Show for Overlap {
    fn name(&self) -> &'static str {
        "overlap"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new()
    }

    fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        let active = OVERLAP_ACTIVE.fetch_add(1, Ordering::SeqCst) + 1;
        OVERLAP_MAX.fetch_max(active, Ordering::SeqCst);
        let result = ctx.sleep(Duration::from_secs(60));
        OVERLAP_ACTIVE.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
