use std::time::Duration;

use circuit_playground::{CircuitPlayground, SerialConfig};

const COLORS: [(u8, u8, u8); 7] = [
    (255, 0, 0),
    (255, 128, 0),
    (255, 255, 0),
    (0, 255, 0),
    (0, 0, 255),
    (75, 0, 130),
    (143, 0, 255),
];

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
        .expect("usage: pixels <serial port>");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();

    // Give the board time to come out of reset.
    tokio::time::sleep(Duration::from_secs(2)).await;

    cp.set_pixel_brightness(50)?;

    println!("Animating pixels for 10 seconds...");
    for offset in 0..100 {
        for pixel in 0..10u8 {
            let (r, g, b) = COLORS[(pixel as usize + offset) % COLORS.len()];
            cp.set_pixel(pixel, r, g, b)?;
        }
        // set_pixel only stages colors
        cp.show_pixels();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cp.clear_pixels();
    cp.show_pixels();

    // Let the writer flush before closing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    board.close();

    Ok(())
}
