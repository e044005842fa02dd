use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Upper bound on a single reply line, delimiter excluded.
pub const MAX_LINE_LEN: usize = 1024;

/// Byte sent ahead of the command code.
pub const COMMAND_MARKER: u8 = b'>';

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadLineError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("no delimited reply within {0:?}")]
    TimedOut(Duration),

    #[error("reply exceeded the maximum line length without a delimiter")]
    TooLong,
}

#[derive(Debug, Error)]
pub enum WriteFrameError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// How commands are framed on the wire and how replies are delimited.
///
/// Firmware revisions differ on the command terminator, so both the
/// terminator and the leading `>` marker are configurable. The default is
/// `>NN\r` with replies ending in `\r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub leading_marker: bool,
    pub terminator: &'static [u8],
    pub reply_delimiter: u8,
}

impl Framing {
    /// `>NN\r\n` variant. Replies are still delimited by `\r`.
    pub fn crlf() -> Self {
        Self {
            terminator: b"\r\n",
            ..Self::default()
        }
    }

    /// Raw code followed by the terminator, no `>` marker.
    pub fn unmarked(terminator: &'static [u8]) -> Self {
        Self {
            leading_marker: false,
            terminator,
            ..Self::default()
        }
    }

    /// The exact bytes sent for `code`.
    pub fn encode(&self, code: &str) -> Vec<u8> {
        let mut frame = Vec::with_capacity(1 + code.len() + self.terminator.len());
        if self.leading_marker {
            frame.push(COMMAND_MARKER);
        }
        frame.extend_from_slice(code.as_bytes());
        frame.extend_from_slice(self.terminator);
        frame
    }
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            leading_marker: true,
            terminator: b"\r",
            reply_delimiter: b'\r',
        }
    }
}

pub struct LineCodec<T> {
    inner: T,
}

impl<T> LineCodec<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T> LineCodec<T>
where
    T: Read,
{
    /// Reads until `delimiter`, returning the line without it.
    ///
    /// Read timeouts reported by the underlying port are retried until
    /// `timeout` has elapsed in total. Bytes following the delimiter in the
    /// same read are dropped.
    pub fn read_line(
        &mut self,
        delimiter: u8,
        timeout: Duration,
    ) -> Result<Vec<u8>, ReadLineError> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => {
                    let received = &chunk[..n];
                    if let Some(pos) = received.iter().position(|&b| b == delimiter) {
                        line.extend_from_slice(&received[..pos]);
                        if pos + 1 < n {
                            log::trace!("dropping {} bytes after delimiter", n - pos - 1);
                        }
                        return Ok(line);
                    }
                    line.extend_from_slice(received);
                    if line.len() > MAX_LINE_LEN {
                        return Err(ReadLineError::TooLong);
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err.into()),
            }
            if Instant::now() >= deadline {
                return Err(ReadLineError::TimedOut(timeout));
            }
        }
    }
}

impl<T> LineCodec<T>
where
    T: Write,
{
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), WriteFrameError> {
        self.inner.write_all(frame)?;
        self.inner.flush()?;
        Ok(())
    }
}
