use std::time::Duration;

use circuit_playground::{protocol::command::AccelRange, CircuitPlayground, SerialConfig};

fn print_accel(x: f32, y: f32, z: f32) {
    println!("X = {x:>8.3}  Y = {y:>8.3}  Z = {z:>8.3}  (m/s²)");
}

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
        .expect("usage: accelerometer_streaming <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    cp.set_accel_range(AccelRange::G2.into())?;

    println!("Printing accelerometer data for 2 seconds...");
    cp.start_accel(print_accel);
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("Pausing for 5 seconds...");
    cp.stop_accel();
    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("Printing accelerometer data, press Ctrl-C to quit...");
    cp.start_accel(print_accel);
    tokio::signal::ctrl_c().await?;

    println!("Stopping...");
    cp.stop_accel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    board.close();

    Ok(())
}
