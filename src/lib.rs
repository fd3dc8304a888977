#![deny(missing_docs)]

//! This crate bridges two serial ports on the host machine.
//!
//! Every byte read from one port is written to the other port,
//! in both directions, indefinitely.
//! The relay is content-agnostic: no framing, no interpretation.
//!
//! With `--test`, two mock ports backed by pty pairs stand in for
//! the physical devices.
//! Each mock periodically writes a timestamped message and logs
//! whatever comes back, so the bridge can be observed end to end
//! without hardware.

/// The command line interface.
pub mod cli;

/// Possible errors, and the fault channel units report them through.
pub mod error;

/// Code relating to setting up logging.
pub mod logging;

/// A mock port, useful to exercise the relay without actual serial ports.
pub mod mock;

/// The bidirectional relay between two ports.
pub mod relay;

/// Opening physical serial ports.
pub mod serial;
