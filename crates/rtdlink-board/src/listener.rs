use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rtdlink_transport::{RtdStream, TcpTransport};
use tracing::{debug, warn};

use crate::connection::{BoardEvent, Connection};
use crate::error::Result;
use crate::handler::FrameHandler;

/// Pause after a failed accept. Most failures (descriptor exhaustion, a
/// peer that reset before accept) clear once other connections close.
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts TCP feeds and runs each one on its own thread.
pub struct BoardListener {
    transport: TcpTransport,
    handler: FrameHandler,
}

impl BoardListener {
    /// Bind to `address:port`. Port 0 picks an ephemeral port.
    pub fn bind(address: &str, port: u16, handler: FrameHandler) -> Result<Self> {
        let transport = TcpTransport::bind(address, port)?;
        Ok(Self { transport, handler })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn handler(&self) -> &FrameHandler {
        &self.handler
    }

    /// Accept the next connection.
    pub fn accept(&self) -> Result<Connection<RtdStream, RtdStream>> {
        let stream = self.transport.accept()?;
        Connection::from_stream(stream, self.handler.clone())
    }

    /// Accept connections until `running` is cleared.
    ///
    /// `running` is checked between accepts, so a pending `accept` must be
    /// woken (for example by a loopback connect) before this returns. A
    /// failed accept or thread spawn costs only that connection.
    pub fn serve(&self, events: Sender<BoardEvent>, running: Arc<AtomicBool>) {
        accept_loop(|| self.accept(), &events, &running);
    }

    /// Wake a blocking [`serve`](Self::serve) so it can observe shutdown.
    pub fn wake(&self) {
        let addr = self.local_addr();
        if let Err(err) = TcpTransport::connect(&addr.ip().to_string(), addr.port()) {
            warn!(error = %err, "failed to wake listener");
        }
    }
}

fn accept_loop<F>(mut accept: F, events: &Sender<BoardEvent>, running: &AtomicBool)
where
    F: FnMut() -> Result<Connection<RtdStream, RtdStream>>,
{
    while running.load(Ordering::SeqCst) {
        let conn = match accept() {
            Ok(conn) => conn,
            Err(_) if !running.load(Ordering::SeqCst) => break,
            Err(err) => {
                warn!(error = %err, "accept failed");
                thread::sleep(ACCEPT_BACKOFF);
                continue;
            }
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let peer = conn.peer().to_string();
        let events = events.clone();
        let spawned = thread::Builder::new()
            .name(format!("rtd-{peer}"))
            .spawn(move || {
                if let Err(err) = conn.run(&events) {
                    debug!(error = %err, "connection thread finished with error");
                }
            });
        if let Err(err) = spawned {
            warn!(peer, error = %err, "failed to start connection thread");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read, Write};
    use std::sync::mpsc;

    use bytes::BytesMut;
    use rtdlink_frame::{encode_frame, ACK_FRAME};
    use rtdlink_template::Template;
    use rtdlink_transport::TransportError;

    use super::*;
    use crate::handler::{BoardConfig, FrameOutcome};
    use crate::scoreboard::Scoreboard;

    fn listener() -> BoardListener {
        let template = Template::load([("A", 4), ("B", 6)]).unwrap();
        let handler = FrameHandler::new(
            Arc::new(Scoreboard::new(Arc::new(template))),
            BoardConfig::default(),
        );
        BoardListener::bind("127.0.0.1", 0, handler).unwrap()
    }

    fn send(port: u16, offset: usize, text: &[u8]) -> Vec<u8> {
        let mut stream = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut buf = BytesMut::new();
        encode_frame(offset, text, &mut buf).unwrap();
        stream.write_all(&buf).unwrap();
        let mut ack = vec![0u8; ACK_FRAME.len()];
        stream.read_exact(&mut ack).unwrap();
        ack
    }

    #[test]
    fn accept_and_ack_one_frame() {
        let listener = listener();
        let port = listener.local_addr().port();
        let handler = listener.handler().clone();

        let server = thread::spawn(move || {
            let (tx, _rx) = mpsc::channel();
            listener.accept().unwrap().run(&tx).unwrap();
        });

        assert_eq!(send(port, 0, b"HOME"), ACK_FRAME);
        server.join().unwrap();
        assert_eq!(handler.scoreboard().snapshot(), b"HOME      ");
    }

    #[test]
    fn two_clients_share_one_scoreboard() {
        let listener = Arc::new(listener());
        let port = listener.local_addr().port();
        let handler = listener.handler().clone();
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel();

        let server = {
            let listener = Arc::clone(&listener);
            let running = Arc::clone(&running);
            thread::spawn(move || listener.serve(tx, running))
        };

        let a = thread::spawn(move || send(port, 0, b"HOME"));
        let b = thread::spawn(move || send(port, 4, b"GUESTS"));
        assert_eq!(a.join().unwrap(), ACK_FRAME);
        assert_eq!(b.join().unwrap(), ACK_FRAME);

        let mut applied = 0;
        while applied < 2 {
            if let BoardEvent::Frame {
                outcome: FrameOutcome::Applied(_),
                ..
            } = rx.recv_timeout(Duration::from_secs(5)).unwrap()
            {
                applied += 1;
            }
        }
        assert_eq!(handler.scoreboard().snapshot(), b"HOMEGUESTS");

        running.store(false, Ordering::SeqCst);
        listener.wake();
        server.join().unwrap();
    }

    #[test]
    fn accept_failures_do_not_stop_the_listener() {
        let listener = Arc::new(listener());
        let port = listener.local_addr().port();
        let running = Arc::new(AtomicBool::new(true));
        let (tx, _rx) = mpsc::channel();

        let server = {
            let listener = Arc::clone(&listener);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut failures = 3;
                let accept = || -> Result<Connection<RtdStream, RtdStream>> {
                    if failures > 0 {
                        failures -= 1;
                        // EMFILE: the process ran out of descriptors.
                        return Err(TransportError::Accept(io::Error::from_raw_os_error(24)).into());
                    }
                    listener.accept()
                };
                accept_loop(accept, &tx, &running);
            })
        };

        assert_eq!(send(port, 0, b"HOME"), ACK_FRAME);
        assert_eq!(send(port, 4, b"GUESTS"), ACK_FRAME);
        assert_eq!(listener.handler().scoreboard().snapshot(), b"HOMEGUESTS");

        running.store(false, Ordering::SeqCst);
        listener.wake();
        server.join().unwrap();
    }
}
