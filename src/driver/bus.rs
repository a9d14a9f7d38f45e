//! Byte sinks below the chipset drivers

use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(target_os = "linux")]
pub use self::spidev_bus::SpidevBus;

/// The spidev driver rejects single transfers larger than its buffer size
pub const MAX_TRANSFER_BYTES: usize = 4096;

/// A write-only serial bus
#[cfg_attr(test, mockall::automock)]
pub trait SpiBus: Send {
    /// Transmit `data` in one or more transfers
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Release the bus; further writes may fail
    fn close(&mut self) {}
}

#[cfg(target_os = "linux")]
mod spidev_bus {
    use super::{SpiBus, MAX_TRANSFER_BYTES};
    use crate::error::{Result, ResultExt, StripError};
    use spidev::{SpiModeFlags, Spidev, SpidevOptions};
    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// A Linux spidev device node, e.g. `/dev/spidev0.1`
    ///
    /// Opening configures mode 0, 8 bits per word and the requested clock.
    pub struct SpidevBus {
        path: PathBuf,
        device: Option<Spidev>,
    }

    impl SpidevBus {
        pub fn open(path: impl AsRef<Path>, clock_speed_hz: u32) -> Result<Self> {
            let path = path.as_ref().to_path_buf();
            let mut device = Spidev::open(&path)
                .with_context(|| format!("Failed to open SPI device {:?}", path))?;

            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(clock_speed_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            device
                .configure(&options)
                .with_context(|| format!("Failed to configure SPI device {:?}", path))?;
            tracing::debug!("SPI device {:?} clocked at {} Hz", path, clock_speed_hz);

            Ok(Self {
                path,
                device: Some(device),
            })
        }
    }

    impl SpiBus for SpidevBus {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            let Some(device) = self.device.as_mut() else {
                return Err(StripError::InvalidConfiguration(format!(
                    "SPI device {:?} is closed",
                    self.path
                )));
            };
            for chunk in data.chunks(MAX_TRANSFER_BYTES) {
                device
                    .write_all(chunk)
                    .with_context(|| format!("SPI transfer to {:?} failed", self.path))?;
            }
            Ok(())
        }

        fn close(&mut self) {
            if self.device.take().is_some() {
                tracing::debug!("Closed SPI device {:?}", self.path);
            }
        }
    }
}

/// An in-memory bus that records every transfer
///
/// Clones share the same recording, so a test can keep one clone while the
/// driver owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    transfers: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transfers so far, split the way the driver issued them
    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Concatenation of all transfers
    pub fn bytes(&self) -> Vec<u8> {
        self.transfers().concat()
    }

    pub fn clear(&self) {
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpiBus for MemoryBus {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut transfers = self.transfers.lock().unwrap_or_else(PoisonError::into_inner);
        for chunk in data.chunks(MAX_TRANSFER_BYTES) {
            transfers.push(chunk.to_vec());
        }
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}
