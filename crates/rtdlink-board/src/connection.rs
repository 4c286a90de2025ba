use std::io::{Read, Write};
use std::sync::mpsc::Sender;

use rtdlink_frame::{FrameError, FrameReader, FrameWriter};
use rtdlink_transport::RtdStream;
use tracing::{debug, info, warn};

use crate::error::{BoardError, Result};
use crate::handler::{FrameHandler, FrameOutcome};

/// Progress reported by connections while they run.
#[derive(Debug)]
pub enum BoardEvent {
    Connected { peer: String },
    Frame { peer: String, outcome: FrameOutcome },
    Disconnected { peer: String, error: Option<String> },
}

/// One inbound feed: a frame reader, an ACK writer and the shared handler.
pub struct Connection<R, W> {
    peer: String,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    handler: FrameHandler,
}

impl<R: Read, W: Write> Connection<R, W> {
    pub fn new(peer: impl Into<String>, reader: R, writer: W, handler: FrameHandler) -> Self {
        let scan = handler.config().scan.clone();
        Self {
            peer: peer.into(),
            reader: FrameReader::with_config(reader, scan),
            writer: FrameWriter::new(writer),
            handler,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Read and handle the next frame, acknowledging it when required.
    ///
    /// Returns `Err(BoardError::Frame(FrameError::ConnectionClosed))` at end
    /// of stream.
    pub fn process_next(&mut self) -> Result<FrameOutcome> {
        let raw = self.reader.read_frame()?;
        let outcome = self.handler.handle(&raw, &self.peer);
        if outcome.requires_ack() {
            self.writer.send_ack()?;
            debug!(peer = %self.peer, "ack sent");
        }
        Ok(outcome)
    }

    /// Handle frames until the peer disconnects or the stream fails.
    ///
    /// A clean close is `Ok(())`. Only this connection ends on error; the
    /// scoreboard and other connections are unaffected.
    pub fn run(mut self, events: &Sender<BoardEvent>) -> Result<()> {
        info!(peer = %self.peer, "connection opened");
        let _ = events.send(BoardEvent::Connected {
            peer: self.peer.clone(),
        });

        let result = loop {
            match self.process_next() {
                Ok(outcome) => {
                    let _ = events.send(BoardEvent::Frame {
                        peer: self.peer.clone(),
                        outcome,
                    });
                }
                Err(BoardError::Frame(FrameError::ConnectionClosed)) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        match &result {
            Ok(()) => info!(peer = %self.peer, "connection closed"),
            Err(err) => warn!(peer = %self.peer, error = %err, "connection failed"),
        }
        let _ = events.send(BoardEvent::Disconnected {
            peer: self.peer.clone(),
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }
}

impl Connection<RtdStream, RtdStream> {
    /// Split a TCP or serial stream into reader and writer halves.
    pub fn from_stream(stream: RtdStream, handler: FrameHandler) -> Result<Self> {
        let peer = stream.peer_label();
        let reader_stream = stream.try_clone()?;
        reader_stream.set_read_timeout(handler.config().scan.read_timeout)?;
        Ok(Self::new(peer, reader_stream, stream, handler))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::sync::Arc;

    use bytes::BytesMut;
    use rtdlink_frame::{encode_frame, ACK_FRAME};
    use rtdlink_template::Template;

    use super::*;
    use crate::handler::BoardConfig;
    use crate::scoreboard::Scoreboard;

    fn handler() -> FrameHandler {
        let template = Template::load([("A", 4), ("B", 6)]).unwrap();
        FrameHandler::new(
            Arc::new(Scoreboard::new(Arc::new(template))),
            BoardConfig::default(),
        )
    }

    fn wire(frames: &[(usize, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (offset, text) in frames {
            encode_frame(*offset, text, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn acks_each_applied_frame() {
        let handler = handler();
        let input = wire(&[(0, b"HOME"), (4, b"GUESTS")]);
        let mut acks = Vec::new();
        let (tx, rx) = mpsc::channel();

        Connection::new("test", Cursor::new(input), &mut acks, handler.clone())
            .run(&tx)
            .unwrap();

        assert_eq!(acks, [ACK_FRAME, ACK_FRAME].concat());
        assert_eq!(handler.scoreboard().snapshot(), b"HOMEGUESTS");

        let events: Vec<BoardEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(BoardEvent::Connected { .. })));
        assert!(matches!(
            events.last(),
            Some(BoardEvent::Disconnected { error: None, .. })
        ));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn malformed_frame_gets_no_ack_and_stream_continues() {
        let handler = handler();
        let mut input = wire(&[(0, b"HOME")]);
        input[16] = b'X';
        input.extend(wire(&[(4, b"GUESTS")]));
        let mut acks = Vec::new();
        let (tx, _rx) = mpsc::channel();

        Connection::new("test", Cursor::new(input), &mut acks, handler.clone())
            .run(&tx)
            .unwrap();

        assert_eq!(acks, ACK_FRAME);
        assert_eq!(handler.scoreboard().snapshot(), b"    GUESTS");
    }

    #[test]
    fn fragmented_input_is_reassembled() {
        let handler = handler();
        let mut input = b"noise".to_vec();
        input.extend(wire(&[(0, b"HOME")]));
        let mut acks = Vec::new();

        let mut conn = Connection::new("test", Cursor::new(input), &mut acks, handler.clone());
        let outcome = conn.process_next().unwrap();
        assert!(matches!(outcome, FrameOutcome::Applied(_)));
        assert!(matches!(
            conn.process_next(),
            Err(BoardError::Frame(FrameError::ConnectionClosed))
        ));
        drop(conn);
        assert_eq!(acks, ACK_FRAME);
    }
}
