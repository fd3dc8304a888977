use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

use crate::error::Error;

/// Open the port at `path` in non-blocking mode, 8N1, no flow control.
///
/// The returned stream never blocks a read or write; readiness is
/// driven by the runtime.
pub fn open(path: &str, baud: u32) -> Result<SerialStream, Error> {
    debug!(%path, %baud, "Opening port");

    tokio_serial::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|source| Error::open(path, source))
}
