//! Exclusive ownership of the serial endpoint.
//!
//! The counter has no request ids or multiplexing, so a reply can only be
//! attributed to a command if nothing else touches the line in between. A
//! [`Session`] holds the only handle to the endpoint behind a lock, and every
//! transfer reopens the port, runs to completion and closes it again before
//! the lock is released.

use std::io::{self, Read, Write};
use std::time::Duration;

use parking_lot::Mutex;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to open {endpoint}: {source}")]
pub struct OpenError {
    pub endpoint: String,
    #[source]
    pub source: io::Error,
}

/// Line settings the port is opened with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Total time allowed for a delimited reply to arrive.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl LineConfig {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Blocking bound for a single read or write call on the port.
    pub fn port_timeout(&self) -> Duration {
        self.read_timeout.min(self.write_timeout)
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_millis(1000),
            write_timeout: Duration::from_millis(1000),
        }
    }
}

/// Binds an endpoint name to a byte stream. Dropping the stream closes it.
pub trait PortOpener {
    type Port: Read + Write + Send;

    fn open(&self, endpoint: &str, config: &LineConfig) -> io::Result<Self::Port>;
}

/// Opens real serial ports through `serialport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    type Port = Box<dyn SerialPort>;

    fn open(&self, endpoint: &str, config: &LineConfig) -> io::Result<Self::Port> {
        let port = serialport::new(endpoint, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .timeout(config.port_timeout())
            .open()?;
        Ok(port)
    }
}

pub struct Session<O: PortOpener> {
    endpoint: String,
    config: LineConfig,
    opener: O,
    port: Mutex<Option<O::Port>>,
}

impl<O: PortOpener> Session<O> {
    /// Creates a closed session. Nothing is opened until [`open`](Self::open)
    /// or the first transfer.
    pub fn new<P: Into<String>>(endpoint: P, config: LineConfig, opener: O) -> Self {
        Self {
            endpoint: endpoint.into(),
            config,
            opener,
            port: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// Binds the endpoint and keeps it open. A no-op if already open.
    pub fn open(&self) -> Result<(), OpenError> {
        let mut slot = self.port.lock();
        if slot.is_none() {
            *slot = Some(self.bind()?);
        }
        Ok(())
    }

    /// Releases the endpoint. Closing a closed session does nothing.
    pub fn close(&self) {
        if self.port.lock().take().is_some() {
            log::debug!("closed {}", self.endpoint);
        }
    }

    /// Runs `operation` on a freshly opened port while holding the lock.
    ///
    /// A port left open by [`open`](Self::open) is closed first. The port
    /// used for the transfer is closed before the lock is released, whether
    /// `operation` returns or unwinds.
    pub(crate) fn with_exclusive_access<R>(
        &self,
        operation: impl FnOnce(&mut O::Port) -> R,
    ) -> Result<R, OpenError> {
        let mut slot = self.port.lock();
        if slot.take().is_some() {
            log::debug!("closing held {} before transfer", self.endpoint);
        }
        let mut port = self.bind()?;
        let result = operation(&mut port);
        drop(port);
        Ok(result)
    }

    fn bind(&self) -> Result<O::Port, OpenError> {
        log::trace!("opening {} with {:?}", self.endpoint, self.config);
        self.opener
            .open(&self.endpoint, &self.config)
            .map_err(|source| OpenError {
                endpoint: self.endpoint.clone(),
                source,
            })
    }
}
