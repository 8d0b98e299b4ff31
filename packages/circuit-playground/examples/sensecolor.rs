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
        .expect("usage: sensecolor <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("Reading color every second, press Ctrl-C to quit...");
    loop {
        cp.sense_color(|r, g, b| println!("Detected red={r} green={g} blue={b}"));
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    board.close();

    Ok(())
}
