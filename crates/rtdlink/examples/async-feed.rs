//! Tokio receiver: one task per controller connection, fields printed from
//! the main thread.
//!
//! Run with:
//!   cargo run --example async-feed --features async -- path/to/board.itf

use std::sync::mpsc;
use std::sync::Arc;

use rtdlink::board::{
    serve_async, BoardConfig, BoardEvent, FrameHandler, FrameOutcome, Scoreboard,
};
use rtdlink::template::load_itf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let itf = std::env::args()
        .nth(1)
        .ok_or("usage: async-feed <template.itf>")?;

    let scoreboard = Arc::new(Scoreboard::new(Arc::new(load_itf(&itf)?)));
    let handler = FrameHandler::new(scoreboard, BoardConfig::default());

    let address = ("127.0.0.1", rtdlink::transport::DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(address).await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let (tx, rx) = mpsc::channel();
    let server = tokio::spawn(serve_async(listener, handler, tx));

    // Blocking receiver off the runtime threads.
    let _printer = tokio::task::spawn_blocking(move || {
        for event in rx {
            if let BoardEvent::Frame {
                peer,
                outcome: FrameOutcome::Applied(report),
            } = event
            {
                for field in &report.fields {
                    println!("{peer} {}[{}]='{}'", field.name, field.offset, field.value);
                }
            }
        }
    });

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => eprintln!("Shutting down"),
    }
    Ok(())
}
