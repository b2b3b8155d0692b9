//! Bridge stdin to a serial device, one line at a time.
//!
//! Lines typed on stdin are written to the device; lines read from the device
//! are printed to stdout. Unplug and replug the device to watch the link
//! recover on its own.
//!
//! Run with:
//! ```bash
//! SERIAL_LINK_SERIAL_DEVICE=/dev/ttyUSB0 cargo run --example line_bridge
//! ```

use serial_link::{logging, ConfigLoader, Connection, Message};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loader = ConfigLoader::load()?;
    let config = loader.config();
    logging::init(&config.logging)?;

    if let Some(path) = &loader.config_path {
        info!(path = %path.display(), "loaded configuration");
    }
    info!(device = %config.serial.device, baud = config.serial.baud_rate, "opening");

    let (tx, rx) = mpsc::channel(16);
    let (connection, mut stream) = Connection::open_serial(config, rx).await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            message = stream.recv() => match message {
                Some(Message::Data(line)) => println!("{line}"),
                Some(Message::Err(err)) => eprintln!("link error: {err}"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.close().await?;
    Ok(())
}
