//! The relay forwards bytes between two ports, both directions at once.
//!
//! Bytes read but not yet accepted by the target port wait in a
//! per-direction buffer.
//! A direction's write is only attempted while its buffer is non-empty,
//! so the loop suspends on readiness instead of spinning on a full
//! transmit buffer.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::error::Error;

/// How many bytes a single read may pull off a port.
pub const READ_CHUNK: usize = 8192;

/// Open both ports at `baud` and relay between them until an error occurs.
///
/// `path0` is opened before `path1`.
pub async fn connect_and_run(path0: &str, path1: &str, baud: u32) -> Result<(), Error> {
    let port0 = crate::serial::open(path0, baud)?;
    let port1 = crate::serial::open(path1, baud)?;

    run(path0, port0, path1, port1).await
}

/// Relay bytes between two open streams until an error occurs.
///
/// Within one direction bytes are forwarded in receipt order,
/// with no loss and no duplication.
/// A short write leaves the remainder at the head of that direction's
/// buffer, to be retried when the target is next writable.
/// A read of zero bytes means "nothing right now", never end-of-stream.
///
/// The loop is infinite; the only way out is an i/o error, which is
/// fatal to the relay and not retried.
pub async fn run<S0, S1>(name0: &str, stream0: S0, name1: &str, stream1: S1) -> Result<(), Error>
where
    S0: AsyncRead + AsyncWrite,
    S1: AsyncRead + AsyncWrite,
{
    let (mut read0, mut write0) = tokio::io::split(stream0);
    let (mut read1, mut write1) = tokio::io::split(stream1);

    // Pending bytes per direction, named after the target port.
    let mut pending0 = BytesMut::new();
    let mut pending1 = BytesMut::new();

    let mut chunk0 = vec![0u8; READ_CHUNK];
    let mut chunk1 = vec![0u8; READ_CHUNK];

    info!(port0 = %name0, port1 = %name1, "Relay running");

    loop {
        tokio::select! {
            result = read0.read(&mut chunk0) => {
                let count = result.map_err(|e| Error::io(name0, e))?;

                if count > 0 {
                    pending1.extend_from_slice(&chunk0[..count]);
                    info!(
                        from = %name0,
                        pending = pending1.len(),
                        "Read {count}: {:?}",
                        &chunk0[..count.min(32)]
                    );
                }
            }
            result = read1.read(&mut chunk1) => {
                let count = result.map_err(|e| Error::io(name1, e))?;

                if count > 0 {
                    pending0.extend_from_slice(&chunk1[..count]);
                    info!(
                        from = %name1,
                        pending = pending0.len(),
                        "Read {count}: {:?}",
                        &chunk1[..count.min(32)]
                    );
                }
            }
            result = write0.write(&pending0), if !pending0.is_empty() => {
                let count = result.map_err(|e| Error::io(name0, e))?;

                pending0.advance(count);
                info!(to = %name0, pending = pending0.len(), "Wrote {count}");
            }
            result = write1.write(&pending1), if !pending1.is_empty() => {
                let count = result.map_err(|e| Error::io(name1, e))?;

                pending1.advance(count);
                info!(to = %name1, pending = pending1.len(), "Wrote {count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream, ReadBuf};
    use tokio::time::timeout;

    use super::*;

    async fn read_exactly(stream: &mut DuplexStream, count: usize) -> Vec<u8> {
        let mut received = vec![0u8; count];

        timeout(Duration::from_secs(5), stream.read_exact(&mut received))
            .await
            .expect("relay should deliver in time")
            .expect("read should succeed");

        received
    }

    #[tokio::test]
    async fn round_trip_both_directions() {
        let (stream0, mut far0) = duplex(64 * 1024);
        let (stream1, mut far1) = duplex(64 * 1024);

        tokio::spawn(run("port0", stream0, "port1", stream1));

        far0.write_all(b"hello from zero").await.unwrap();
        let received = read_exactly(&mut far1, 15).await;
        assert_eq!(received, b"hello from zero");

        far1.write_all(b"hello from one").await.unwrap();
        let received = read_exactly(&mut far0, 14).await;
        assert_eq!(received, b"hello from one");
    }

    #[tokio::test]
    async fn order_preserved_across_many_writes() {
        let (stream0, mut far0) = duplex(64 * 1024);
        let (stream1, mut far1) = duplex(64 * 1024);

        tokio::spawn(run("port0", stream0, "port1", stream1));

        let mut sent = Vec::new();
        for index in 0u32..500 {
            let piece = index.to_be_bytes();
            far0.write_all(&piece).await.unwrap();
            sent.extend_from_slice(&piece);
        }

        let received = read_exactly(&mut far1, sent.len()).await;
        assert_eq!(received, sent);
    }

    /// Accepts at most `max` bytes per write call.
    struct Trickle<T> {
        inner: T,
        max: usize,
    }

    impl<T: AsyncRead + Unpin> AsyncRead for Trickle<T> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
        }
    }

    impl<T: AsyncWrite + Unpin> AsyncWrite for Trickle<T> {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            let max = self.max;
            Pin::new(&mut self.get_mut().inner).poll_write(cx, &buf[..buf.len().min(max)])
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_flush(cx)
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn short_writes_drain_in_order() {
        let (stream0, mut far0) = duplex(64 * 1024);
        let (stream1, mut far1) = duplex(64 * 1024);

        // Port 1 accepts only 100 bytes per write call.
        let stream1 = Trickle {
            inner: stream1,
            max: 100,
        };

        tokio::spawn(run("port0", stream0, "port1", stream1));

        let sent: Vec<u8> = (0..20_000u32).map(|index| index as u8).collect();

        let reader = tokio::spawn(async move { read_exactly(&mut far1, 20_000).await });

        far0.write_all(&sent).await.unwrap();

        let received = reader.await.unwrap();
        assert_eq!(received, sent);
    }

    /// Reports one empty read before delegating to the real stream.
    struct ZeroFirst<T> {
        inner: T,
        fired: bool,
    }

    impl<T: AsyncRead + Unpin> AsyncRead for ZeroFirst<T> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();

            if !this.fired {
                this.fired = true;
                // Nothing placed in `buf`: a zero-byte read.
                return Poll::Ready(Ok(()));
            }

            Pin::new(&mut this.inner).poll_read(cx, buf)
        }
    }

    impl<T: AsyncWrite + Unpin> AsyncWrite for ZeroFirst<T> {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_flush(cx)
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn zero_byte_read_is_not_a_close() {
        let (stream0, mut far0) = duplex(64 * 1024);
        let (stream1, mut far1) = duplex(64 * 1024);

        let stream0 = ZeroFirst {
            inner: stream0,
            fired: false,
        };

        tokio::spawn(run("port0", stream0, "port1", stream1));

        // The relay sees the zero-byte read first, then this.
        far0.write_all(b"still alive").await.unwrap();

        let received = read_exactly(&mut far1, 11).await;
        assert_eq!(received, b"still alive");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_failure_names_the_first_port() {
        let error = connect_and_run("/dev/snoop-does-not-exist-0", "/dev/snoop-does-not-exist-1", 9600)
            .await
            .unwrap_err();

        match error {
            Error::Open { path, .. } => assert_eq!(path, "/dev/snoop-does-not-exist-0"),
            other => panic!("expected an open error, got {other}"),
        }
    }
}
