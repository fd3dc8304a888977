use std::time::Duration;

use clap::{CommandFactory, Parser};
use serial_snoop::{cli, error::fault_channel, logging, mock::MockPort, relay};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    if let Err(problem) = cli.validate() {
        // Nothing has been spawned yet; reject synchronously.
        cli::Cli::command()
            .error(clap::error::ErrorKind::InvalidValue, problem)
            .exit();
    }

    logging::init(cli.verbose, cli.logfile.clone()).await;

    let (faults, mut fault_receiver) = fault_channel();

    let (port0, port1) = if cli.test {
        let mock0 = open_mock("0", cli.delay0);
        let mock1 = open_mock("1", cli.delay1);
        let paths = (mock0.path().to_owned(), mock1.path().to_owned());

        for mock in [mock0, mock1] {
            let faults = faults.clone();
            tokio::spawn(async move {
                if let Err(fault) = mock.run().await {
                    faults.report(fault);
                }
            });
        }

        paths
    } else {
        let port0 = cli.port0.expect("validated to be present");
        let port1 = cli.port1.expect("validated to be present");

        (port0, port1)
    };

    let baud = cli.baud;
    tokio::spawn(async move {
        if let Err(fault) = relay::connect_and_run(&port0, &port1, baud).await {
            faults.report(fault);
        }
    });

    // All units are daemonic; the first fault from any of them is
    // fatal to the whole process.
    let fault = fault_receiver
        .recv()
        .await
        .expect("a fault sender is held by every unit");

    error!("Fatal: {fault}");
    std::process::exit(1);
}

fn open_mock(key: &str, delay_seconds: u64) -> MockPort {
    match MockPort::open(key, Duration::from_secs(delay_seconds)) {
        Ok(mock) => mock,
        Err(fault) => {
            error!("Fatal: {fault}");
            std::process::exit(1);
        }
    }
}
