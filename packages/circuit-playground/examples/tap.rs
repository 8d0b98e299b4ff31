use std::time::Duration;

use circuit_playground::{protocol::command::TapType, CircuitPlayground, SerialConfig};

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
    let port = args.next().expect("usage: tap <serial port> [--stream]");
    let stream = args.next().is_some_and(|arg| arg == "--stream");

    let board = CircuitPlayground::open(&port, SerialConfig::default())?;
    let cp = board.router();
    tokio::time::sleep(Duration::from_secs(2)).await;

    cp.set_tap_config(TapType::Double.into(), 80)?;

    let print_tap = |single: bool, double: bool| {
        println!("Single tap: {single}, double tap: {double}");
    };

    if stream {
        println!("Streaming tap data (Ctrl-C to quit)...");
        cp.start_tap(print_tap);
        tokio::signal::ctrl_c().await?;
        cp.stop_tap();
    } else {
        println!("Reading tap data every 2 seconds (Ctrl-C to quit)...");
        loop {
            cp.read_tap(print_tap);
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
