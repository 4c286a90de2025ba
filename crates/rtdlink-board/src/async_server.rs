//! Tokio front end: one task per connection over [`RtdCodec`].

use std::sync::mpsc::Sender;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use rtdlink_frame::{RtdCodec, ACK_FRAME};
use rtdlink_transport::TransportError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::connection::BoardEvent;
use crate::error::{BoardError, Result};
use crate::handler::FrameHandler;
use crate::listener::ACCEPT_BACKOFF;

/// Accept connections forever, spawning a task for each.
///
/// Neither a failed accept nor a failing connection ends the loop. Cancel
/// by dropping the future (e.g. from `tokio::select!`).
pub async fn serve_async(listener: TcpListener, handler: FrameHandler, events: Sender<BoardEvent>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %TransportError::Accept(err), "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let peer = format!("tcp:{addr}");
        if let Err(err) = stream.set_nodelay(true) {
            warn!(peer, error = %err, "failed to set TCP_NODELAY");
        }

        let handler = handler.clone();
        let events = events.clone();
        tokio::spawn(async move {
            if let Err(err) = run_async_connection(stream, &peer, handler, &events).await {
                debug!(peer, error = %err, "connection task finished with error");
            }
        });
    }
}

/// Handle frames from one async stream until it closes.
pub async fn run_async_connection<S>(
    stream: S,
    peer: &str,
    handler: FrameHandler,
    events: &Sender<BoardEvent>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(peer, "connection opened");
    let _ = events.send(BoardEvent::Connected {
        peer: peer.to_string(),
    });

    let mut framed = Framed::new(stream, RtdCodec::with_config(handler.config().scan.clone()));
    let result = async {
        while let Some(raw) = framed.next().await {
            let raw = raw?;
            let outcome = handler.handle(&raw, peer);
            if outcome.requires_ack() {
                framed.send(Bytes::from_static(&ACK_FRAME)).await?;
            }
            let _ = events.send(BoardEvent::Frame {
                peer: peer.to_string(),
                outcome,
            });
        }
        Ok::<(), BoardError>(())
    }
    .await;

    match &result {
        Ok(()) => info!(peer, "connection closed"),
        Err(err) => warn!(peer, error = %err, "connection failed"),
    }
    let _ = events.send(BoardEvent::Disconnected {
        peer: peer.to_string(),
        error: result.as_ref().err().map(ToString::to_string),
    });
    result
}
