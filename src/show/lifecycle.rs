//! Running one show on a worker thread
//!
//! A worker owns the strip driver for as long as its show runs. The
//! sequence is fixed:
//!
//! 1. load the shared mirror into the driver (synchronize down)
//! 2. subscribe to the brightness topic and the show's parameter topic
//! 3. run the show body, then refresh the strip every refresh interval
//! 4. on cancellation or error: freeze, cleanup, synchronize up, unfreeze
//! 5. hand the driver back
//!
//! Cancellation is cooperative through a [`CancellationToken`] checked in
//! [`ShowContext::sleep`] and [`ShowContext::show`]. For workers that never
//! get there, the controller revokes the worker's lease on the driver: the
//! [`LeasedStrip`] then reports itself frozen and refuses to transmit.

use super::{Show, ShowState};
use crate::control::{parse_brightness, parse_parameters, ControlChannel, Subscription, Topics};
use crate::driver::{LedStrip, PixelBuffer, SharedStripState};
use crate::color::Rgb;
use crate::error::{Result, StripError};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

struct TokenInner {
    cancelled: AtomicBool,
    revoked: AtomicBool,
    /// Dropped on cancel, which wakes every `select!` on `woken`
    wake: Mutex<Option<Sender<()>>>,
    woken: Receiver<()>,
}

/// Stop request shared between the controller and one worker
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (wake, woken) = bounded(0);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                revoked: AtomicBool::new(false),
                wake: Mutex::new(Some(wake)),
                woken,
            }),
        }
    }

    /// Ask the worker to stop. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner
            .wake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Cancel and take away the worker's right to write to the strip
    pub fn revoke(&self) {
        self.inner.revoked.store(true, Ordering::SeqCst);
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_revoked(&self) -> bool {
        self.inner.revoked.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StripError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Becomes ready (disconnected) on cancel
    fn woken(&self) -> Receiver<()> {
        self.inner.woken.clone()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

/// Lifecycle state of one show, readable by the controller
#[derive(Debug, Clone)]
pub struct ShowStateCell(Arc<Mutex<ShowState>>);

impl ShowStateCell {
    pub fn new(state: ShowState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub fn get(&self) -> ShowState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, state: ShowState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// The worker's view of the driver, valid until its token is revoked
pub struct LeasedStrip {
    inner: Box<dyn LedStrip>,
    token: CancellationToken,
}

impl LeasedStrip {
    pub fn new(inner: Box<dyn LedStrip>, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> Box<dyn LedStrip> {
        self.inner
    }
}

impl LedStrip for LeasedStrip {
    fn buffer(&self) -> &PixelBuffer {
        self.inner.buffer()
    }

    fn buffer_mut(&mut self) -> &mut PixelBuffer {
        self.inner.buffer_mut()
    }

    fn on_color_change(&mut self, index: usize, color: Rgb) {
        self.inner.on_color_change(index, color);
    }

    fn on_brightness_change(&mut self, index: usize) {
        self.inner.on_brightness_change(index);
    }

    fn show(&mut self) -> Result<()> {
        if self.token.is_revoked() {
            return Err(StripError::Cancelled);
        }
        self.inner.show()
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn max_refresh_time(&self) -> Duration {
        self.inner.max_refresh_time()
    }

    fn is_frozen(&self) -> bool {
        self.token.is_revoked() || self.inner.is_frozen()
    }
}

/// What a running show gets to work with
pub struct ShowContext<'a> {
    strip: &'a mut dyn LedStrip,
    token: CancellationToken,
    brightness: Subscription,
    parameters: Subscription,
    pending: Option<Map<String, Value>>,
}

impl<'a> ShowContext<'a> {
    pub fn new(
        strip: &'a mut dyn LedStrip,
        token: CancellationToken,
        brightness: Subscription,
        parameters: Subscription,
    ) -> Self {
        Self {
            strip,
            token,
            brightness,
            parameters,
            pending: None,
        }
    }

    /// A context without control channel subscriptions
    pub fn detached(strip: &'a mut dyn LedStrip, token: CancellationToken) -> Self {
        Self::new(strip, token, Subscription::never(), Subscription::never())
    }

    pub fn strip(&mut self) -> &mut dyn LedStrip {
        &mut *self.strip
    }

    pub fn num_leds(&self) -> usize {
        self.strip.num_leds()
    }

    pub fn max_refresh_time(&self) -> Duration {
        self.strip.max_refresh_time()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Transmit the buffer, unless the show was cancelled
    pub fn show(&mut self) -> Result<()> {
        self.token.check()?;
        self.strip.show()
    }

    /// Wait for `duration` while handling brightness and parameter messages
    ///
    /// Returns `Err(Cancelled)` as soon as the show is cancelled.
    pub fn sleep(&mut self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let woken = self.token.woken();

        loop {
            self.token.check()?;
            let brightness = self.brightness.receiver().clone();
            let parameters = self.parameters.receiver().clone();
            let timeout = deadline.saturating_duration_since(Instant::now());

            select! {
                recv(woken) -> _ => return Err(StripError::Cancelled),
                recv(brightness) -> message => match message {
                    Ok(message) => self.on_brightness(&message.payload),
                    Err(_) => self.brightness = Subscription::never(),
                },
                recv(parameters) -> message => match message {
                    Ok(message) => self.on_parameters(&message.payload),
                    Err(_) => self.parameters = Subscription::never(),
                },
                default(timeout) => return Ok(()),
            }
        }
    }

    /// Parameter updates received since the last call, merged by name
    pub fn take_parameter_updates(&mut self) -> Option<Map<String, Value>> {
        self.pending.take()
    }

    fn on_brightness(&mut self, payload: &str) {
        let requested = match parse_brightness(payload) {
            Ok(requested) => requested,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };

        let stored = self.strip.set_global_brightness(requested);
        if stored != requested {
            tracing::warn!(
                "Brightness {} clamped to {}",
                requested,
                stored
            );
        } else {
            tracing::debug!("Brightness set to {}", stored);
        }
        if let Err(e) = self.strip.show() {
            tracing::debug!("Brightness refresh failed: {}", e);
        }
    }

    fn on_parameters(&mut self, payload: &str) {
        match parse_parameters(payload) {
            Ok(updates) => self.pending.get_or_insert_with(Map::new).extend(updates),
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

/// Everything a worker needs besides the show and the driver
pub struct WorkerEnv {
    pub shared: SharedStripState,
    pub channel: Arc<dyn ControlChannel>,
    pub topics: Topics,
    pub token: CancellationToken,
    pub state: ShowStateCell,
    pub refresh_interval: Duration,
}

/// Apply queued live parameter updates to `show`
///
/// Returns whether anything was applied.
pub fn apply_parameter_updates(show: &mut dyn Show, ctx: &mut ShowContext<'_>) -> Result<bool> {
    let Some(updates) = ctx.take_parameter_updates() else {
        return Ok(false);
    };
    if show.parameters().apply_many(&updates) == 0 {
        return Ok(false);
    }
    show.parameters_changed(ctx)?;
    Ok(true)
}

/// Run `show` to the end and hand the driver back
pub fn run_worker(mut show: Box<dyn Show>, strip: Box<dyn LedStrip>, env: WorkerEnv) -> Box<dyn LedStrip> {
    let name = show.name();
    let mut strip = LeasedStrip::new(strip, env.token.clone());
    env.state.set(ShowState::Started);

    match start(show.as_mut(), &mut strip, &env) {
        Err(e) if e.is_cancelled() => tracing::info!("Show \"{}\" stopped", name),
        Err(e) => tracing::error!("Show \"{}\" failed: {}", name, e),
        Ok(()) => tracing::info!("Show \"{}\" finished", name),
    }

    env.state.set(ShowState::Stopping);
    strip.freeze();
    show.cleanup(&mut strip);
    if env.token.is_revoked() {
        tracing::debug!("Lease of \"{}\" was revoked, not synchronizing", name);
    } else {
        env.shared.synchronize_up(&strip);
    }
    strip.unfreeze();
    env.state.set(ShowState::Terminated);

    strip.into_inner()
}

fn start(show: &mut dyn Show, strip: &mut LeasedStrip, env: &WorkerEnv) -> Result<()> {
    env.shared.synchronize_down(strip)?;
    let brightness = env.channel.subscribe(&env.topics.brightness())?;
    let parameters = env.channel.subscribe(&env.topics.parameters(show.name()))?;
    let mut ctx = ShowContext::new(strip, env.token.clone(), brightness, parameters);

    env.state.set(ShowState::Running);
    tracing::info!("Show \"{}\" is running", show.name());
    show.run(&mut ctx)?;

    loop {
        ctx.sleep(env.refresh_interval)?;
        apply_parameter_updates(show, &mut ctx)?;
        ctx.show()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::LocalBroker;
    use crate::driver::DummyStrip;
    use crate::params::ParameterStore;
    use std::thread;

    #[test]
    fn test_token_cancel_is_idempotent() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(!token.is_revoked());
        assert!(matches!(token.check(), Err(StripError::Cancelled)));
    }

    #[test]
    fn test_sleep_returns_early_on_cancel() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let mut strip = DummyStrip::new(1, 1.0);
        let mut ctx = ShowContext::detached(&mut strip, token);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        assert!(matches!(ctx.sleep(Duration::from_secs(10)), Err(StripError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_sleep_handles_brightness_and_parameters() {
        let broker = LocalBroker::new();
        let topics = Topics::new("led", "hall");
        let brightness = broker.subscribe(&topics.brightness()).unwrap();
        let parameters = broker.subscribe(&topics.parameters("rainbow")).unwrap();

        let mut strip = DummyStrip::new(2, 0.75);
        let mut ctx = ShowContext::new(&mut strip, CancellationToken::new(), brightness, parameters);

        broker.publish(&topics.brightness(), "1.5", false).unwrap();
        broker.publish(&topics.parameters("rainbow"), r#"{"pause_sec": 1}"#, false).unwrap();
        broker.publish(&topics.parameters("rainbow"), r#"{"num_cycles": 2}"#, false).unwrap();
        ctx.sleep(Duration::ZERO).unwrap();

        assert_eq!(ctx.strip().global_brightness(), 0.75);
        let updates = ctx.take_parameter_updates().unwrap();
        assert_eq!(updates.len(), 2);
        assert!(ctx.take_parameter_updates().is_none());
    }

    #[test]
    fn test_revoked_lease_drops_writes() {
        let token = CancellationToken::new();
        let mut strip = LeasedStrip::new(Box::new(DummyStrip::new(2, 1.0)), token.clone());
        strip.set_pixel(0, 10.0, 0.0, 0.0);
        token.revoke();

        strip.set_pixel(0, 255.0, 255.0, 255.0);
        assert!(strip.is_frozen());
        assert!(matches!(strip.show(), Err(StripError::Cancelled)));
        assert_eq!(strip.into_inner().get_pixel(0), Some((10.0, 0.0, 0.0)));
    }

    struct Painter {
        painted: Sender<PixelBuffer>,
        frozen_in_cleanup: Arc<AtomicBool>,
    }

    impl Show for Painter {
        fn name(&self) -> &'static str {
            "painter"
        }

        fn parameters(&mut self) -> ParameterStore<'_> {
            ParameterStore::new()
        }

        fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
            Ok(())
        }

        fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
            ctx.strip().set_pixel(0, 10.0, 20.0, 30.0);
            ctx.strip().set_pixel(1, 1.0, 2.0, 3.0);
            ctx.strip().set_brightness(1, 0.5);
            let _ = self.painted.send(ctx.strip().buffer().clone());
            Ok(())
        }

        fn cleanup(&mut self, strip: &mut dyn LedStrip) {
            self.frozen_in_cleanup.store(strip.is_frozen(), Ordering::SeqCst);
            strip.set_pixel(0, 255.0, 255.0, 255.0);
            strip.set_brightness(1, 1.0);
            strip.set_global_brightness(0.1);
        }
    }

    #[test]
    fn test_cleanup_writes_never_reach_the_mirror() {
        let (painted, painted_rx) = bounded(1);
        let frozen_in_cleanup = Arc::new(AtomicBool::new(false));
        let show = Box::new(Painter {
            painted,
            frozen_in_cleanup: frozen_in_cleanup.clone(),
        });

        let shared = SharedStripState::new(&DummyStrip::new(2, 1.0));
        let token = CancellationToken::new();
        let state = ShowStateCell::new(ShowState::Constructed);
        let env = WorkerEnv {
            shared: shared.clone(),
            channel: Arc::new(LocalBroker::new()),
            topics: Topics::new("led", "hall"),
            token: token.clone(),
            state: state.clone(),
            refresh_interval: Duration::from_millis(5),
        };

        let worker = thread::spawn(move || run_worker(show, Box::new(DummyStrip::new(2, 1.0)), env));
        let before_cleanup = painted_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        token.cancel();
        let strip = worker.join().unwrap();

        assert!(frozen_in_cleanup.load(Ordering::SeqCst));
        assert_eq!(state.get(), ShowState::Terminated);

        let mirror = shared.snapshot();
        assert_eq!(mirror.colors, before_cleanup.colors());
        assert_eq!(mirror.brightness, before_cleanup.brightness());
        assert_eq!(mirror.global_brightness, before_cleanup.global_brightness());

        assert!(!strip.is_frozen());
        assert_eq!(strip.get_pixel(0), Some((10.0, 20.0, 30.0)));
    }

    #[test]
    fn test_state_cell() {
        let cell = ShowStateCell::new(ShowState::Constructed);
        let other = cell.clone();
        other.set(ShowState::Running);
        assert_eq!(cell.get(), ShowState::Running);
    }
}
