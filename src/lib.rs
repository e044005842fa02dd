//! Client for Spectrum Techniques STx radiation counters attached over
//! USB serial.
//!
//! ```no_run
//! let device = stxusb::Device::discover()?;
//! let counts = device.send_command("04")?;
//! println!("counts: {}", counts);
//! # Ok::<(), stxusb::Error>(())
//! ```
//!
//! Replies are returned as opaque strings; their format is defined by the
//! instrument's programming guide.

pub mod catalog;
pub mod codec;
pub mod locator;
pub mod session;

pub use self::catalog::Command;
pub use self::codec::Framing;
pub use self::locator::{Signature, STX_SIGNATURE};
pub use self::session::{LineConfig, PortOpener, SerialOpener, Session};

use self::codec::{LineCodec, ReadLineError, WriteFrameError};
use self::session::OpenError;
use thiserror::Error;

/// A counter reachable at a known endpoint.
///
/// All methods take `&self`; a `Device` can be shared between threads and
/// concurrent commands are serialized.
pub struct Device<O: PortOpener = SerialOpener> {
    session: Session<O>,
    framing: Framing,
}

impl Device<SerialOpener> {
    /// Locates the counter by its USB ids and connects to it.
    pub fn discover() -> Result<Self, Error> {
        let discovery = locator::host_discovery();
        let endpoint = locator::find_endpoint(discovery.as_ref(), &STX_SIGNATURE)?;
        Self::new(endpoint)
    }

    pub fn new<P: Into<String>>(endpoint: P) -> Result<Self, Error> {
        Self::with_opener(endpoint, LineConfig::default(), Framing::default(), SerialOpener)
    }
}

impl<O: PortOpener> Device<O> {
    /// Builds a device over any port implementation.
    ///
    /// The endpoint is opened once and closed again so an unusable port is
    /// reported here rather than on the first command.
    pub fn with_opener<P: Into<String>>(
        endpoint: P,
        config: LineConfig,
        framing: Framing,
        opener: O,
    ) -> Result<Self, Error> {
        let session = Session::new(endpoint, config, opener);
        session.open()?;
        session.close();
        Ok(Self { session, framing })
    }

    pub fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn session(&self) -> &Session<O> {
        &self.session
    }

    /// Sends the command with the given two-digit code and returns its reply.
    ///
    /// Codes outside the catalog are rejected without touching the port.
    pub fn send_command(&self, code: &str) -> Result<String, Error> {
        let command =
            Command::from_code(code).ok_or_else(|| Error::UnknownCommand(code.to_owned()))?;
        self.execute(command)
    }

    /// Writes `command` and reads one delimited reply as a single exclusive
    /// transfer.
    pub fn execute(&self, command: Command) -> Result<String, Error> {
        let frame = self.framing.encode(command.code());
        let delimiter = self.framing.reply_delimiter;
        let read_timeout = self.session.config().read_timeout;

        let result = self
            .session
            .with_exclusive_access(|port| -> Result<Vec<u8>, TransferError> {
                let mut codec = LineCodec::new(port);
                log::trace!("sending {:?}", String::from_utf8_lossy(&frame));
                codec.write_frame(&frame)?;
                let reply = codec.read_line(delimiter, read_timeout)?;
                log::trace!("received {:?}", String::from_utf8_lossy(&reply));
                Ok(reply)
            })
            .map_err(TransferError::from)
            .and_then(|transfer| transfer);

        match result {
            Ok(reply) => Ok(String::from_utf8_lossy(&reply).into_owned()),
            Err(source) => {
                log::warn!("command {} failed: {}", command, source);
                Err(Error::CommandFailed {
                    code: command.code().to_owned(),
                    source,
                })
            }
        }
    }

    /// Closes the endpoint if a caller left it open. Always safe to call.
    pub fn close(&self) {
        self.session.close();
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no serial port matching USB id {0}")]
    DeviceNotFound(Signature),

    #[error("connect failed: {0}")]
    ConnectFailed(#[from] OpenError),

    #[error("unknown command code {0:?}")]
    UnknownCommand(String),

    #[error("command {code} failed: {source}")]
    CommandFailed {
        code: String,
        #[source]
        source: TransferError,
    },
}

impl Error {
    /// Whether this is a command that got no delimited reply in time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::CommandFailed {
                source: TransferError::Read(ReadLineError::TimedOut(_)),
                ..
            }
        )
    }

    /// Whether no session could be established at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DeviceNotFound(_) | Error::ConnectFailed(_))
    }
}

/// Why a single command transfer failed.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("reopen: {0}")]
    Reopen(#[from] OpenError),

    #[error("write: {0}")]
    Write(#[from] WriteFrameError),

    #[error("read: {0}")]
    Read(#[from] ReadLineError),
}
