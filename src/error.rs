use thiserror::Error;
use tokio::sync::mpsc;
use tracing::error;

/// Errors that may occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A serial port could not be opened.
    #[error("could not open `{path}`: {source}")]
    Open {
        /// The path that was given, a device path or a mock's pty path.
        path: String,

        /// The underlying serial error.
        #[source]
        source: tokio_serial::Error,
    },

    /// Reading or writing an endpoint failed mid-loop.
    #[error("i/o error on `{endpoint}`: {source}")]
    Io {
        /// The endpoint the error occurred on.
        endpoint: String,

        /// The underlying i/o error.
        #[source]
        source: std::io::Error,
    },

    /// The command line was given an invalid combination of options.
    #[error("{0}")]
    Config(String),
}

impl Error {
    pub(crate) fn open(path: &str, source: tokio_serial::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(endpoint: &str, source: std::io::Error) -> Self {
        Self::Io {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Reports fatal errors from a concurrent unit to the supervisor.
///
/// Only the first report across all holders is delivered.
#[derive(Debug, Clone)]
pub struct FaultSender {
    tx: mpsc::Sender<Error>,
}

impl FaultSender {
    /// Report a fatal error.
    ///
    /// Never blocks.
    /// If another unit already reported, this error is logged and dropped.
    pub fn report(&self, error: Error) {
        if let Err(undelivered) = self.tx.try_send(error) {
            error!(
                "Fault not delivered, another unit failed first: {}",
                undelivered.into_inner()
            );
        }
    }
}

/// A single-slot channel holding the first fatal error from any unit.
///
/// The supervisor blocks on the receiving end and treats the first
/// value as reason to exit the process.
pub fn fault_channel() -> (FaultSender, mpsc::Receiver<Error>) {
    let (tx, rx) = mpsc::channel(1);

    (FaultSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn first_fault_wins() {
        let (faults, mut rx) = fault_channel();

        let other = faults.clone();
        other.report(Error::config("first"));
        faults.report(Error::config("second"));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.to_string(), "first");

        // The second report was dropped, not queued.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn open_error_names_the_path() {
        let source = tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "gone");
        let error = Error::open("/dev/ttyUSB0", source);

        assert!(error.to_string().contains("/dev/ttyUSB0"));
    }
}
