//! Show worker threads and their watchers
//!
//! Every show runs on its own worker thread which owns the strip driver
//! until the show ends. A watcher thread joins the worker and reports the
//! exit to the controller, handing the driver back. A panicking worker
//! loses its driver; the controller then rebuilds it.

use crate::driver::LedStrip;
use crate::error::{Result, ResultExt, StripError};
use crate::show::{run_worker, CancellationToken, Show, ShowState, ShowStateCell, WorkerEnv};
use crossbeam_channel::Sender;
use std::thread;
use std::time::{Duration, Instant};

/// Reported by a watcher once its worker is gone
pub enum WorkerEvent {
    Exited {
        id: u64,
        /// `None` if the worker panicked
        driver: Option<Box<dyn LedStrip>>,
    },
}

impl std::fmt::Debug for WorkerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerEvent::Exited { id, driver } => f
                .debug_struct("Exited")
                .field("id", id)
                .field("driver", &driver.is_some())
                .finish(),
        }
    }
}

/// The controller's handle on one running worker
#[derive(Debug)]
pub struct WorkerHandle {
    id: u64,
    name: &'static str,
    token: CancellationToken,
    state: ShowStateCell,
    started: Instant,
}

impl WorkerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ShowState {
        self.state.get()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Ask the show to stop
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Stop the show and take away its access to the strip
    pub fn revoke(&self) {
        self.token.revoke();
    }
}

/// Start `show` on a new worker thread plus its watcher
///
/// On error the driver is lost and has to be rebuilt.
pub fn spawn_worker(
    id: u64,
    show: Box<dyn Show>,
    strip: Box<dyn LedStrip>,
    env: WorkerEnv,
    events: Sender<WorkerEvent>,
) -> Result<WorkerHandle> {
    let name = show.name();
    let token = env.token.clone();
    let state = env.state.clone();

    let worker = thread::Builder::new()
        .name(format!("show-{}", name))
        .spawn(move || run_worker(show, strip, env))
        .with_context(|| format!("Failed to spawn worker for \"{}\"", name))?;

    let watcher = thread::Builder::new()
        .name(format!("watch-{}", name))
        .spawn(move || {
            let driver = match worker.join() {
                Ok(driver) => Some(driver),
                Err(_) => {
                    tracing::error!("Worker of \"{}\" panicked", name);
                    None
                }
            };
            if let Err(unsent) = events.send(WorkerEvent::Exited { id, driver }) {
                // nobody takes the driver back
                let WorkerEvent::Exited { driver, .. } = unsent.into_inner();
                if let Some(mut driver) = driver {
                    driver.close();
                }
            }
        });

    if let Err(e) = watcher {
        token.revoke();
        return Err(StripError::Io(e)
            .with_context(format!("Failed to spawn watcher for \"{}\"", name)));
    }

    tracing::debug!("Spawned worker {} for \"{}\"", id, name);
    Ok(WorkerHandle {
        id,
        name,
        token,
        state,
        started: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{LocalBroker, Topics};
    use crate::driver::{DummyStrip, SharedStripState};
    use crate::shows::Idle;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;

    #[test]
    fn test_worker_hands_driver_back() {
        let strip = DummyStrip::new(3, 1.0);
        let env = WorkerEnv {
            shared: SharedStripState::new(&strip),
            channel: Arc::new(LocalBroker::new()),
            topics: Topics::new("led", "test"),
            token: CancellationToken::new(),
            state: ShowStateCell::new(ShowState::Constructed),
            refresh_interval: Duration::from_millis(5),
        };
        let (events_tx, events_rx) = unbounded();

        let handle = spawn_worker(7, Idle::boxed(), Box::new(strip), env, events_tx).unwrap();
        assert_eq!(handle.name(), "idle");
        handle.cancel();

        let WorkerEvent::Exited { id, driver } = events_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(id, 7);
        assert_eq!(driver.unwrap().num_leds(), 3);
        assert_eq!(handle.state(), ShowState::Terminated);
    }
}
