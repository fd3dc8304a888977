//! A mock port, useful to exercise the relay without actual serial ports.
//!
//! Each mock allocates a connected pty pair.
//! The slave side's path is handed out as the "device" for the relay
//! to open; the mock keeps the master side and drives it itself:
//! a timestamped message goes out every `delay`, and anything
//! arriving in between is read and logged.

use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{self, Instant};
use tokio_serial::{SerialPort, SerialStream};
use tracing::info;

use crate::error::Error;

/// One half of a pty pair, periodically emitting timestamped messages.
pub struct MockPort {
    key: String,
    delay: Duration,

    /// Our side of the pair.
    master: SerialStream,

    /// Held unused so the slave path stays valid for the relay to open.
    _slave: SerialStream,

    path: String,
}

impl MockPort {
    /// Allocate a connected pty pair.
    ///
    /// `key` identifies this mock in the messages it generates.
    pub fn open(key: &str, delay: Duration) -> Result<Self, Error> {
        let (master, slave) = SerialStream::pair().map_err(|source| Error::open("pty", source))?;

        let path = slave.name().ok_or_else(|| {
            Error::open(
                "pty",
                tokio_serial::Error::new(tokio_serial::ErrorKind::Unknown, "pty slave has no path"),
            )
        })?;

        Ok(Self {
            key: key.into(),
            delay,
            master,
            _slave: slave,
            path,
        })
    }

    /// The pty path a relay should open to reach this mock.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Drive the mock until an error occurs.
    ///
    /// A message goes out every `delay`, measured from the previous
    /// send; incoming bytes are logged as they arrive and do not
    /// affect the cadence.
    pub async fn run(self) -> Result<(), Error> {
        info!(path = %self.path, delay = ?self.delay, "Mock starting");

        Self::drive(&self.path, &self.key, self.delay, self.master).await
    }

    /// The generator loop, over any transport.
    async fn drive<S>(name: &str, key: &str, delay: Duration, mut stream: S) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut deadline = Instant::now() + delay;
        let mut chunk = [0u8; 32];

        loop {
            tokio::select! {
                result = stream.read(&mut chunk) => {
                    let count = result.map_err(|e| Error::io(name, e))?;

                    // Zero bytes is "nothing right now", not traffic.
                    if count > 0 {
                        info!(path = %name, "Received {:?}", &chunk[..count]);
                    }
                }
                _ = time::sleep_until(deadline) => {
                    let message = Self::message(key);
                    info!(path = %name, "Sending {message:?}");

                    stream
                        .write_all(message.as_bytes())
                        .await
                        .map_err(|e| Error::io(name, e))?;

                    deadline = Instant::now() + delay;
                }
            }
        }
    }

    /// The fixed message format: the mock's key plus the wall clock
    /// as fractional seconds since the epoch, `\r`-terminated.
    fn message(key: &str) -> String {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;

        format!("Message from {key} at {now:.3}\r")
    }
}
