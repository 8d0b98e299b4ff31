use std::time::Duration;

use circuit_playground::{CircuitPlayground, SerialConfig};

const LEFT_BUTTON: u8 = 4;
const RIGHT_BUTTON: u8 = 19;
const SLIDE_SWITCH: u8 = 21;

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
        .expect("usage: buttons <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    board.set_digital_input(LEFT_BUTTON, |_, pressed| {
        if pressed {
            println!("Left button pressed!");
        } else {
            println!("Left button released!");
        }
    })?;
    board.set_digital_input(RIGHT_BUTTON, |_, pressed| {
        if pressed {
            println!("Right button pressed!");
        } else {
            println!("Right button released!");
        }
    })?;
    // High when the switch is on the left.
    board.set_digital_input(SLIDE_SWITCH, |_, left| {
        if left {
            println!("Switch is on the left!");
        } else {
            println!("Switch is on the right!");
        }
    })?;

    println!("Press the left button, right button, or slide switch (Ctrl-C to quit)...");
    tokio::signal::ctrl_c().await?;

    board.close();

    Ok(())
}
