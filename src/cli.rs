use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::Error;

/// Baud rates the ports may be opened at.
pub const BAUD_RATES: [u32; 6] = [1200, 2400, 4800, 9600, 19200, 115_200];

fn baud_rate(given: &str) -> Result<u32, String> {
    let baud: u32 = given
        .parse()
        .map_err(|_| format!("`{given}` is not a number"))?;

    if BAUD_RATES.contains(&baud) {
        Ok(baud)
    } else {
        Err(format!("supported baud rates are {BAUD_RATES:?}"))
    }
}

/// The command line interface for serial snoop.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Serial port device name to open.
    #[arg(long, value_name = "devName")]
    pub port0: Option<String>,

    /// Serial port device name to open.
    #[arg(long, value_name = "devName")]
    pub port1: Option<String>,

    /// Serial port baudrate.
    #[arg(long, default_value_t = 9600, value_parser = baud_rate)]
    pub baud: u32,

    /// Run in test mode using pty pairs.
    #[arg(long)]
    pub test: bool,

    /// Delay between messages on the first mock.
    #[arg(long, default_value_t = 11, value_name = "seconds")]
    pub delay0: u64,

    /// Delay between messages on the second mock.
    #[arg(long, default_value_t = 17, value_name = "seconds")]
    pub delay1: u64,

    /// Directory for daily-rolled log files, in addition to stdout.
    #[arg(long, value_name = "dir")]
    pub logfile: Option<PathBuf>,

    /// Enable debug messages.
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    /// Check option combinations clap cannot express on its own.
    ///
    /// Must be called before anything is spawned: a bad combination
    /// is rejected here, synchronously.
    pub fn validate(&self) -> Result<(), Error> {
        if self.test {
            if self.port0.is_some() || self.port1.is_some() {
                return Err(Error::config(
                    "--port0 and --port1 can not be specified with --test",
                ));
            }

            return Ok(());
        }

        let port0 = self
            .port0
            .as_deref()
            .ok_or_else(|| Error::config("--port0 is required unless --test is given"))?;
        let port1 = self
            .port1
            .as_deref()
            .ok_or_else(|| Error::config("--port1 is required unless --test is given"))?;

        for port in [port0, port1] {
            if !Path::new(port).exists() {
                return Err(Error::config(format!("{port} does not exist")));
            }
        }

        Ok(())
    }
}
