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
        .expect("usage: temperature <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    cp.start_temperature(|celsius, raw| log::debug!("thermistor read {raw} ({celsius:.2} C)"));

    println!("Printing temperature (Ctrl-C to quit)...");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        match (cp.read_temperature(), cp.read_temperature_raw()) {
            (Some(celsius), Some(raw)) => {
                println!("Temperature: {celsius:.2} Celsius");
                println!("Raw thermistor ADC value: {raw}");
            }
            _ => println!("Waiting for the first reading..."),
        }
    }

    cp.stop_temperature();
    tokio::time::sleep(Duration::from_millis(100)).await;
    board.close();

    Ok(())
}
