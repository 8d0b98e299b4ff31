use std::time::Duration;

use circuit_playground::{CircuitPlayground, SerialConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let port = std::env::args()
        .nth(1)
        .expect("usage: getversion <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // The standard Firmata firmware report: the sketch's name and version,
    // not the Circuit Playground library's implementation version.
    println!("Reading firmware version:");
    board.query_firmware(|report| {
        println!("Firmware name: {}", report.name);
        println!("Firmware version: {}", report.version);
    })?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if let Some(version) = board.protocol_version() {
        println!("Firmata protocol version {version}");
    }

    board.close();

    Ok(())
}
