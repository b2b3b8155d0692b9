//! Tests requiring actual serial hardware.
//!
//! These tests are ignored by default and skip themselves when no port is
//! configured.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # Set environment variables
//! export TEST_PORT=/dev/ttyUSB0          # or COM3 on Windows
//! export TEST_BAUD=115200                # optional, default: 115200
//! export TEST_LOOPBACK=1                 # if port has TX-RX loopback
//!
//! # Run tests
//! cargo test --test integration_hardware -- --ignored
//! ```

#[path = "common/mod.rs"]
mod common;

use common::next_message;
use serial_link::{Config, Connection};
use std::env;
use tokio::sync::mpsc;

/// Build a config from environment variables, or `None` to skip.
fn hardware_config() -> Option<Config> {
    let Ok(device) = env::var("TEST_PORT") else {
        println!("⏭️  Skipping hardware test: TEST_PORT not set");
        return None;
    };

    let mut config = Config::default();
    config.serial.device = device;
    if let Some(baud) = env::var("TEST_BAUD").ok().and_then(|s| s.parse().ok()) {
        config.serial.baud_rate = baud;
    }
    config.serial.read_timeout_ms = 100;
    Some(config)
}

fn is_loopback_enabled() -> bool {
    env::var("TEST_LOOPBACK").ok().as_deref() == Some("1")
}

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn test_real_port_open_close() {
    let Some(config) = hardware_config() else {
        return;
    };
    let (_tx, rx) = mpsc::channel(1);

    let (connection, _stream) = Connection::open_serial(&config, rx)
        .await
        .expect("failed to open test port");
    assert_eq!(connection.transport_name(), config.serial.device);

    connection.close().await.expect("failed to close test port");
}

#[tokio::test]
#[ignore]
async fn test_real_port_loopback_line() {
    let Some(config) = hardware_config() else {
        return;
    };
    if !is_loopback_enabled() {
        println!("⏭️  Skipping loopback test: TEST_LOOPBACK not set");
        return;
    }
    let (tx, rx) = mpsc::channel(4);

    let (connection, mut stream) = Connection::open_serial(&config, rx)
        .await
        .expect("failed to open test port");

    tx.send("serial-link loopback".to_string()).await.unwrap();
    let message = next_message(&mut stream).await;
    assert_eq!(message.data(), Some("serial-link loopback"));

    connection.close().await.unwrap();
}
