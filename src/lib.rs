//! # ledshows: remotely scheduled light shows for APA102 LED strips
//!
//! A controller that owns an APA102/SK9822 LED strip and runs one light show
//! at a time. Shows are started, stopped and tuned through topic-based control
//! messages, and the controller falls back to an idle show whenever a show
//! ends or cannot run.
//!
//! ## Architecture
//!
//! - **Driver**: Pixel buffer plus the APA102 wire encoding, written to an SPI bus
//! - **Shows**: Parameterized animations running on a dedicated worker thread
//! - **Controller**: Schedules shows, hands the driver between workers and keeps
//!   the shared strip mirror up to date
//! - **Control**: Topic layout, payload parsing and an in-process broker
//! - **Communication**: Crossbeam channels between controller, workers and broker
//!
//! ## Configuration
//!
//! The configuration file is read from the platform-appropriate config directory
//! under `ledshows`:
//!
//! - **Linux**: `~/.config/ledshows/config.toml`
//! - **macOS**: `~/Library/Application Support/ledshows/config.toml`
//! - **Windows**: `%APPDATA%\ledshows\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use ledshows::{
//!     config::AppConfig,
//!     control::{ControlChannel, LocalBroker},
//!     controller::ShowController,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let broker: Arc<dyn ControlChannel> = Arc::new(LocalBroker::new());
//!
//!     let (controller, handle) = ShowController::from_config(&config, broker.clone())?;
//!     let thread = controller.spawn()?;
//!
//!     broker.publish("led/ledstrip/show/start", r#"{"name": "rainbow"}"#, false)?;
//!
//!     handle.shutdown()?;
//!     thread.join().expect("controller panicked")?;
//!     Ok(())
//! }
//! ```

pub mod color;
pub mod config;
pub mod control;
pub mod controller;
pub mod driver;
pub mod error;
pub mod params;
pub mod show;
pub mod shows;

// Re-export commonly used types
pub use color::Rgb;
pub use config::AppConfig;
pub use control::{ControlChannel, LocalBroker, Topics};
pub use controller::{ControllerHandle, ShowController};
pub use driver::{Apa102, DummyStrip, LedStrip};
pub use error::{ParameterError, Result, StripError};
pub use show::{Show, ShowContext, ShowRegistry, ShowState};
