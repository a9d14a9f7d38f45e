//! Shows and their lifecycle
//!
//! A show is a named animation with its own parameters. It is constructed
//! by the controller, configured from the start request, checked with
//! [`Show::check_runnable`] and then handed to a worker thread together
//! with the strip driver (see [`lifecycle`]).
//!
//! # States
//!
//! ```text
//! Constructed -> Started -> Running -> Stopping -> Terminated
//!      |
//!      +-> Rejected   (check_runnable failed, no worker)
//! ```

pub mod blend;
pub mod cycle;
pub mod lifecycle;

pub use blend::{blend_whole_strip_to_color, BlendFunction, SmoothBlend};
pub use cycle::{ColorCycle, CycleParameters, CycleShow, CycleStep};
pub use lifecycle::{
    apply_parameter_updates, run_worker, CancellationToken, LeasedStrip, ShowContext,
    ShowStateCell, WorkerEnv,
};

use crate::driver::LedStrip;
use crate::error::Result;
use crate::params::ParameterStore;
use std::collections::BTreeMap;

/// Lifecycle state of a show instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowState {
    Constructed,
    /// The show cannot run with its parameters or on this strip
    Rejected,
    Started,
    Running,
    Stopping,
    Terminated,
}

/// A light show
pub trait Show: Send {
    /// Registry name, also used in topics
    fn name(&self) -> &'static str;

    /// Named view over the show's parameters
    fn parameters(&mut self) -> ParameterStore<'_>;

    /// Fail with `InvalidStrip`, `InvalidConfiguration` or
    /// `InvalidParameters` if the show cannot run
    fn check_runnable(&self, strip: &dyn LedStrip) -> Result<()>;

    /// The show body. Returning `Ok` leaves the strip as it is and keeps
    /// refreshing it until the show is stopped.
    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()>;

    /// Called once after the show stopped. The strip is frozen by then, so
    /// writes made here never reach the LEDs or the shared mirror.
    fn cleanup(&mut self, _strip: &mut dyn LedStrip) {}

    /// React to live parameter updates received after [`Show::run`] returned
    fn parameters_changed(&mut self, _ctx: &mut ShowContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Creates a show with default parameters
pub type ShowConstructor = fn() -> Box<dyn Show>;

/// All shows that can be started by name
#[derive(Clone)]
pub struct ShowRegistry {
    shows: BTreeMap<&'static str, ShowConstructor>,
}

impl ShowRegistry {
    /// A registry without any show
    pub fn empty() -> Self {
        Self {
            shows: BTreeMap::new(),
        }
    }

    /// A registry with every show of this crate
    pub fn with_default_shows() -> Self {
        let mut registry = Self::empty();
        crate::shows::register_all(&mut registry);
        registry
    }

    /// Add a show; an existing show with the same name is replaced
    pub fn register(&mut self, name: &'static str, constructor: ShowConstructor) -> &mut Self {
        if self.shows.insert(name, constructor).is_some() {
            tracing::warn!("Show \"{}\" registered twice, keeping the last one", name);
        }
        self
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Show>> {
        self.shows.get(name).map(|constructor| constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shows.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.shows.keys().copied()
    }
}

impl Default for ShowRegistry {
    fn default() -> Self {
        Self::with_default_shows()
    }
}

impl std::fmt::Debug for ShowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.shows.keys()).finish()
    }
}
