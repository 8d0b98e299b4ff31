use std::time::Duration;

use circuit_playground::{CircuitPlayground, SerialConfig};

const SCALE: [u16; 13] = [262, 294, 330, 349, 392, 440, 494, 440, 392, 349, 330, 294, 262];
const NOTE_MS: u16 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let port = std::env::args().nth(1).expect("usage: tones <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("Playing scale...");
    for note in SCALE {
        cp.tone(note, NOTE_MS);
        tokio::time::sleep(Duration::from_millis(u64::from(NOTE_MS) + 100)).await;
    }

    println!("Playing note, then stopping after 1 second.");
    cp.tone(SCALE[0], 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    cp.no_tone();

    tokio::time::sleep(Duration::from_millis(100)).await;
    board.close();

    Ok(())
}
