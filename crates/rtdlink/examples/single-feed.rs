//! Minimal receiver: accepts one controller and prints every field it changes.
//!
//! Run with:
//!   cargo run --example single-feed -- path/to/board.itf
//!
//! In another terminal:
//!   cargo run --features cli -- send --address 127.0.0.1 --port 17410 \
//!     --offset 0 --text 123 --wait-ack

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use rtdlink::board::{BoardConfig, BoardEvent, BoardListener, FrameHandler, FrameOutcome, Scoreboard};
use rtdlink::template::load_itf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let itf = std::env::args()
        .nth(1)
        .ok_or("usage: single-feed <template.itf>")?;

    let template = load_itf(&itf)?;
    eprintln!(
        "Loaded {} fields ({} bytes)",
        template.len(),
        template.total_size()
    );

    let scoreboard = Arc::new(Scoreboard::new(Arc::new(template)));
    let handler = FrameHandler::new(scoreboard, BoardConfig::default());
    let listener = BoardListener::bind("127.0.0.1", rtdlink::transport::DEFAULT_PORT, handler)?;
    eprintln!("Listening on {}", listener.local_addr());

    // Accept one controller and report until it disconnects.
    let conn = listener.accept()?;
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || conn.run(&tx));

    for event in rx {
        match event {
            BoardEvent::Frame {
                outcome: FrameOutcome::Applied(report),
                ..
            } => {
                for field in report.fields {
                    println!("{}[{}]='{}'", field.name, field.offset, field.value);
                }
            }
            BoardEvent::Disconnected { peer, error } => {
                eprintln!("{peer} disconnected: {}", error.as_deref().unwrap_or("eof"));
            }
            _ => {}
        }
    }

    worker.join().map_err(|_| "connection thread panicked")??;
    Ok(())
}
