//! The show controller
//!
//! The controller owns the strip driver and the shared strip mirror. It
//! listens on the control channel for start and stop requests, runs at most
//! one show at a time on a worker thread and falls back to the configured
//! fallback show whenever a show ends or cannot start.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  start/stop   ┌────────────────┐  driver  ┌──────────────┐
//! │ControlChannel│──────────────▶│ ShowController │─────────▶│ show worker  │
//! └──────────────┘               │                │◀─────────│ (one thread) │
//!        ▲        status         │                │  exit +  └──────────────┘
//!        └───────────────────────│                │  driver         │
//!                                └────────────────┘◀── watcher ─────┘
//! ```
//!
//! Stopping a show is cooperative first: the worker's cancellation token is
//! triggered and the controller waits up to `stop_timeout_ms` for the exit
//! report. A worker that misses the timeout has its lease on the driver
//! revoked, and the controller rebuilds the driver from the configuration
//! and the shared mirror.

pub mod worker;

pub use worker::{spawn_worker, WorkerEvent, WorkerHandle};

use crate::config::{AppConfig, ShowConfig};
use crate::control::{ControlChannel, StartRequest, StopRequest, Topics};
use crate::driver::{self, LedStrip, SharedStripState, StripSnapshot};
use crate::error::{Result, ResultExt, StripError};
use crate::show::{CancellationToken, ShowRegistry, ShowState, ShowStateCell, WorkerEnv};
use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Builds a fresh driver, e.g. after a worker had to be abandoned
pub type DriverFactory = Box<dyn Fn() -> Result<Box<dyn LedStrip>> + Send>;

/// Commands from inside the process
#[derive(Debug, Clone)]
pub enum ControllerCommand {
    StartShow {
        name: String,
        parameters: Map<String, Value>,
    },
    StopShow(StopRequest),
    Shutdown,
}

/// Sends commands to a running [`ShowController`]
///
/// Dropping every handle shuts the controller down.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    command_tx: Sender<ControllerCommand>,
}

impl ControllerHandle {
    pub fn send(&self, command: ControllerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| StripError::Channel("Controller is not running".to_string()))
    }

    pub fn start_show(&self, name: impl Into<String>, parameters: Map<String, Value>) -> Result<()> {
        self.send(ControllerCommand::StartShow {
            name: name.into(),
            parameters,
        })
    }

    pub fn stop_show(&self, request: StopRequest) -> Result<()> {
        self.send(ControllerCommand::StopShow(request))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(ControllerCommand::Shutdown)
    }
}

/// Owns the strip and schedules shows
pub struct ShowController {
    config: ShowConfig,
    topics: Topics,
    channel: Arc<dyn ControlChannel>,
    registry: ShowRegistry,
    factory: DriverFactory,
    /// `None` while a worker holds the driver
    strip: Option<Box<dyn LedStrip>>,
    shared: SharedStripState,
    current: Option<WorkerHandle>,
    /// Workers whose lease was revoked and that have not exited yet
    abandoned: HashSet<u64>,
    next_worker_id: u64,
    event_tx: Sender<WorkerEvent>,
    event_rx: Receiver<WorkerEvent>,
    command_rx: Receiver<ControllerCommand>,
    running: bool,
}

impl ShowController {
    /// Create the controller and open the driver
    ///
    /// Errors from the factory are fatal: without a driver there is
    /// nothing to control.
    pub fn new(
        config: &AppConfig,
        channel: Arc<dyn ControlChannel>,
        registry: ShowRegistry,
        factory: DriverFactory,
    ) -> Result<(Self, ControllerHandle)> {
        let mut strip = factory().context("Failed to open the LED strip")?;
        strip.set_global_brightness(config.strip.initial_brightness);
        let shared = SharedStripState::new(strip.as_ref());

        let (event_tx, event_rx) = unbounded();
        let (command_tx, command_rx) = bounded(64);

        let controller = Self {
            config: config.shows.clone(),
            topics: Topics::new(&config.control.prefix, &config.sys_name),
            channel,
            registry,
            factory,
            strip: Some(strip),
            shared,
            current: None,
            abandoned: HashSet::new(),
            next_worker_id: 1,
            event_tx,
            event_rx,
            command_rx,
            running: true,
        };
        Ok((controller, ControllerHandle { command_tx }))
    }

    /// Controller with every built-in show and the configured driver
    pub fn from_config(
        config: &AppConfig,
        channel: Arc<dyn ControlChannel>,
    ) -> Result<(Self, ControllerHandle)> {
        let strip_config = config.strip.clone();
        let factory: DriverFactory = Box::new(move || driver::open(&strip_config));
        Self::new(config, channel, ShowRegistry::with_default_shows(), factory)
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Name of the show currently holding the strip
    pub fn current_show(&self) -> Option<&'static str> {
        self.current.as_ref().map(WorkerHandle::name)
    }

    pub fn current_state(&self) -> Option<ShowState> {
        self.current.as_ref().map(WorkerHandle::state)
    }

    /// The driver, while no show holds it
    pub fn strip(&self) -> Option<&dyn LedStrip> {
        self.strip.as_deref()
    }

    /// Copy of the shared strip mirror
    pub fn snapshot(&self) -> StripSnapshot {
        self.shared.snapshot()
    }

    /// The shared strip mirror, updated whenever a show stops
    pub fn shared(&self) -> SharedStripState {
        self.shared.clone()
    }

    /// Run the controller on its own thread
    pub fn spawn(mut self) -> Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("controller".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn controller thread")
    }

    /// Main loop: handle control messages, commands and worker exits
    /// until shut down
    pub fn run(&mut self) -> Result<()> {
        let start_requests = self.channel.subscribe(&self.topics.start())?;
        let stop_requests = self.channel.subscribe(&self.topics.stop())?;
        let command_rx = self.command_rx.clone();
        let event_rx = self.event_rx.clone();

        tracing::info!("Show controller started");
        let startup = self.config.startup_show.clone();
        self.start_show(&startup, &Map::new());

        while self.running {
            select! {
                recv(start_requests.receiver()) -> message => match message {
                    Ok(message) => self.on_start_message(&message.payload),
                    Err(_) => self.on_channel_closed(),
                },
                recv(stop_requests.receiver()) -> message => match message {
                    Ok(message) => self.on_stop_message(&message.payload),
                    Err(_) => self.on_channel_closed(),
                },
                recv(command_rx) -> command => match command {
                    Ok(command) => self.handle_command(command),
                    Err(_) => self.running = false,
                },
                recv(event_rx) -> event => {
                    if let Ok(event) = event {
                        self.handle_worker_event(event);
                    }
                },
            }
        }

        self.shutdown();
        tracing::info!("Show controller stopped");
        Ok(())
    }

    /// Handle one command
    pub fn handle_command(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::StartShow { name, parameters } => {
                self.start_show(&name, &parameters);
            }
            ControllerCommand::StopShow(request) => self.stop_show(&request),
            ControllerCommand::Shutdown => self.running = false,
        }
    }

    /// Handle worker exits reported so far without blocking
    pub fn process_worker_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.handle_worker_event(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn on_start_message(&mut self, payload: &str) {
        match StartRequest::parse(payload) {
            Ok(request) => {
                let parameters = Value::Object(request.parameters.clone());
                tracing::debug!("Start request for \"{}\" with {}", request.name, parameters);
                self.start_show(&request.name, &request.parameters);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.notify(&e.to_string());
            }
        }
    }

    fn on_stop_message(&mut self, payload: &str) {
        self.stop_show(&StopRequest::parse(payload));
    }

    fn on_channel_closed(&mut self) {
        tracing::warn!("Control channel closed, shutting down");
        self.running = false;
    }

    /// Stop the running show if the request matches it, then fall back
    pub fn stop_show(&mut self, request: &StopRequest) {
        let Some(running) = self.current_show() else {
            tracing::info!("No show running");
            return;
        };
        if !request.matches(running) {
            tracing::debug!("Stop request {:?} does not match \"{}\"", request, running);
            return;
        }
        if running == self.config.fallback_show {
            tracing::debug!("Fallback show \"{}\" keeps running", running);
            return;
        }

        self.stop_running_show(self.config.stop_timeout());
        self.start_fallback(running);
    }

    /// Stop whatever runs and start `name`
    ///
    /// Unknown shows, rejected parameters and unrunnable shows are logged
    /// and the fallback show is started instead. Returns whether `name`
    /// was started.
    pub fn start_show(&mut self, name: &str, parameters: &Map<String, Value>) -> bool {
        self.stop_running_show(self.config.stop_timeout());

        match self.launch(name, parameters) {
            Ok(()) => {
                self.publish_status(name);
                true
            }
            Err(e) => {
                tracing::error!("Cannot start \"{}\": {}", name, e);
                self.notify(&format!("Cannot start \"{}\": {}", name, e));
                self.start_fallback(name);
                false
            }
        }
    }

    fn start_fallback(&mut self, failed: &str) {
        let fallback = self.config.fallback_show.clone();
        if failed == fallback {
            tracing::error!("Fallback show \"{}\" is not running, giving up", fallback);
        } else if let Err(e) = self.launch(&fallback, &Map::new()) {
            tracing::error!("Cannot start fallback show \"{}\": {}", fallback, e);
        }
        self.publish_status("");
    }

    /// Construct, configure and check a show, then hand it the driver
    fn launch(&mut self, name: &str, parameters: &Map<String, Value>) -> Result<()> {
        let mut show = self
            .registry
            .create(name)
            .ok_or_else(|| StripError::UnknownShow(name.to_string()))?;
        let state = ShowStateCell::new(ShowState::Constructed);

        let strip = self.reclaim_strip()?;
        let applied = show.parameters().apply_all(parameters);
        let checked = applied
            .map_err(StripError::from)
            .and_then(|()| show.check_runnable(strip.as_ref()));
        if let Err(e) = checked {
            state.set(ShowState::Rejected);
            tracing::warn!("Show \"{}\" rejected", name);
            self.strip = Some(strip);
            return Err(e);
        }

        let id = self.next_worker_id;
        self.next_worker_id += 1;
        let env = WorkerEnv {
            shared: self.shared.clone(),
            channel: self.channel.clone(),
            topics: self.topics.clone(),
            token: CancellationToken::new(),
            state,
            refresh_interval: self.config.refresh_interval(),
        };

        let handle = spawn_worker(id, show, strip, env, self.event_tx.clone())?;
        tracing::info!("Started show \"{}\"", name);
        self.current = Some(handle);
        Ok(())
    }

    /// Stop the running show, forcibly after `timeout`
    ///
    /// Returns whether a show was running.
    pub fn stop_running_show(&mut self, timeout: Duration) -> bool {
        let Some(worker) = self.current.take() else {
            return false;
        };

        tracing::info!("Stopping show \"{}\"", worker.name());
        worker.cancel();

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.event_rx.recv_timeout(remaining) {
                Ok(WorkerEvent::Exited { id, driver }) if id == worker.id() => {
                    self.reap(driver);
                    tracing::info!("Show \"{}\" stopped after {:?}", worker.name(), worker.uptime());
                    return true;
                }
                Ok(WorkerEvent::Exited { id, driver }) => self.discard(id, driver),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::error!(
            "Show \"{}\" did not stop within {:?}, terminating it",
            worker.name(),
            timeout
        );
        worker.revoke();
        self.abandoned.insert(worker.id());
        match self.rebuild_strip() {
            Ok(strip) => self.strip = Some(strip),
            Err(e) => tracing::error!("Failed to rebuild the LED strip: {}", e),
        }
        true
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        let WorkerEvent::Exited { id, driver } = event;
        let Some(worker) = self.current.take_if(|worker| worker.id() == id) else {
            self.discard(id, driver);
            return;
        };

        self.reap(driver);
        tracing::info!("Show \"{}\" ended", worker.name());
        self.start_fallback(worker.name());
    }

    /// Take back the driver of the current worker
    fn reap(&mut self, driver: Option<Box<dyn LedStrip>>) {
        let strip = match driver {
            Some(mut strip) => match self.shared.synchronize_down(strip.as_mut()) {
                Ok(()) => Ok(strip),
                Err(e) => Err(e),
            },
            None => self.rebuild_strip(),
        };
        match strip {
            Ok(strip) => self.strip = Some(strip),
            Err(e) => tracing::error!("Lost the LED strip: {}", e),
        }
    }

    /// Close the driver of a worker that is no longer current
    fn discard(&mut self, id: u64, driver: Option<Box<dyn LedStrip>>) {
        if self.abandoned.remove(&id) {
            tracing::info!("Terminated worker {} finally exited", id);
        } else {
            tracing::warn!("Unexpected exit report from worker {}", id);
        }
        if let Some(mut driver) = driver {
            driver.close();
        }
    }

    /// The driver for the next show
    fn reclaim_strip(&mut self) -> Result<Box<dyn LedStrip>> {
        match self.strip.take() {
            Some(strip) => Ok(strip),
            None => self.rebuild_strip(),
        }
    }

    fn rebuild_strip(&self) -> Result<Box<dyn LedStrip>> {
        tracing::warn!("Rebuilding the LED strip driver");
        let mut strip = (self.factory)().context("Failed to rebuild the LED strip")?;
        self.shared.synchronize_down(strip.as_mut())?;
        Ok(strip)
    }

    fn publish_status(&self, name: &str) {
        if let Err(e) = self.channel.publish(&self.topics.current(), name, true) {
            tracing::warn!("Failed to publish status: {}", e);
        }
    }

    fn notify(&self, message: &str) {
        if let Err(e) = self.channel.publish(&self.topics.notification(), message, false) {
            tracing::warn!("Failed to send notification: {}", e);
        }
    }

    /// Stop the running show and close the driver
    pub fn shutdown(&mut self) {
        self.running = false;
        self.stop_running_show(self.config.stop_timeout());
        self.publish_status("");
        if let Some(mut strip) = self.strip.take() {
            strip.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::LocalBroker;
    use crate::driver::DummyStrip;

    fn controller() -> (ShowController, Arc<LocalBroker>) {
        let mut config = AppConfig::default();
        config.strip.num_leds = 4;
        config.shows.refresh_interval_ms = 5;
        config.shows.stop_timeout_ms = 1000;

        let broker = Arc::new(LocalBroker::new());
        let factory: DriverFactory = Box::new(|| Ok(Box::new(DummyStrip::new(4, 0.75)) as Box<dyn LedStrip>));
        let (controller, _handle) =
            ShowController::new(&config, broker.clone(), ShowRegistry::with_default_shows(), factory)
                .unwrap();
        (controller, broker)
    }

    #[test]
    fn test_unknown_show_starts_fallback() {
        let (mut controller, broker) = controller();
        assert!(!controller.start_show("fireworks", &Map::new()));
        assert_eq!(controller.current_show(), Some("idle"));
        assert_eq!(broker.retained(&controller.topics().current()), None);
        controller.shutdown();
    }

    #[test]
    fn test_start_replaces_running_show() {
        let (mut controller, broker) = controller();
        assert!(controller.start_show("idle", &Map::new()));
        assert!(controller.start_show("rainbow", &Map::new()));
        assert_eq!(controller.current_show(), Some("rainbow"));
        assert_eq!(
            broker.retained(&controller.topics().current()).as_deref(),
            Some("rainbow")
        );

        assert!(controller.stop_running_show(Duration::from_secs(1)));
        assert!(controller.strip().is_some());
        assert!(!controller.stop_running_show(Duration::from_secs(1)));
        controller.shutdown();
    }

    #[test]
    fn test_stop_request_must_match() {
        let (mut controller, _broker) = controller();
        controller.start_show("rainbow", &Map::new());
        controller.stop_show(&StopRequest::Named("clear".to_string()));
        assert_eq!(controller.current_show(), Some("rainbow"));

        controller.stop_show(&StopRequest::Named("all".to_string()));
        assert_eq!(controller.current_show(), Some("idle"));
        controller.shutdown();
        assert_eq!(controller.current_show(), None);
    }
}
