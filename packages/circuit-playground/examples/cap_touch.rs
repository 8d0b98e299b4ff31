use std::time::Duration;

use circuit_playground::{CircuitPlayground, SerialConfig};

const PIN: u8 = 10;

fn print_cap(pin: u8, touched: bool, raw: i32) {
    println!("Cap touch value for pin {pin}: {raw}");
    if touched {
        println!("Cap touch pin {pin} is pressed!");
    }
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

    let mut args = std::env::args().skip(1);
    let port = args
        .next()
        .expect("usage: cap_touch <serial port> [--stream]");
    let stream = args.next().is_some_and(|arg| arg == "--stream");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    if stream {
        println!("Streaming cap touch input {PIN} (Ctrl-C to quit)...");
        cp.start_cap_touch(PIN, print_cap)?;
        tokio::signal::ctrl_c().await?;
        cp.stop_cap_touch(PIN)?;
    } else {
        println!("Printing cap touch input {PIN} state (Ctrl-C to quit)...");
        loop {
            cp.read_cap_touch(PIN, print_cap)?;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(2)) => {}
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    board.close();

    Ok(())
}
