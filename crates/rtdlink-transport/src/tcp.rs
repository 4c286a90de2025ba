use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::RtdStream;

/// Default listen address, matching the controller's factory setup.
pub const DEFAULT_ADDRESS: &str = "localhost";

/// Default RTD port.
pub const DEFAULT_PORT: u16 = 17410;

/// TCP listener for scoreboard controllers.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `address:port`.
    ///
    /// Port `0` asks the OS for an ephemeral port; see [`TcpTransport::local_addr`].
    pub fn bind(address: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((address, port)).map_err(|e| TransportError::Bind {
            address: format!("{address}:{port}"),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            address: format!("{address}:{port}"),
            source: e,
        })?;

        info!(%local_addr, "listening for RTD connections");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<RtdStream> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        // Acks are tiny and latency-sensitive.
        stream.set_nodelay(true)?;
        debug!(%addr, "accepted connection");
        Ok(RtdStream::from_tcp(stream))
    }

    /// Connect to a listening RTD endpoint (blocking).
    pub fn connect(address: &str, port: u16) -> Result<RtdStream> {
        let stream = TcpStream::connect((address, port)).map_err(|e| TransportError::Connect {
            address: format!("{address}:{port}"),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        debug!(address, port, "connected to RTD endpoint");
        Ok(RtdStream::from_tcp(stream))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Convert into a tokio listener. Must be called from within a tokio runtime.
    #[cfg(feature = "async")]
    pub fn into_tokio(self) -> Result<tokio::net::TcpListener> {
        self.listener.set_nonblocking(true)?;
        tokio::net::TcpListener::from_std(self.listener).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = listener.local_addr().port();
        assert_ne!(port, 0);

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect("127.0.0.1", port).unwrap();
            client.write_all(b"\x16hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\x16hello");
        assert!(server.peer_label().starts_with("tcp:127.0.0.1:"));
        assert_eq!(server.transport_name(), "tcp");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port that is very likely closed.
        let port = TcpTransport::bind("127.0.0.1", 0).unwrap().local_addr().port();
        let result = TcpTransport::connect("127.0.0.1", port);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_bind_conflict() {
        let first = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = first.local_addr().port();
        let second = TcpTransport::bind("127.0.0.1", port);
        assert!(matches!(second, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_try_clone_shares_connection() {
        let listener = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect("127.0.0.1", port).unwrap();
            client.write_all(b"ping").unwrap();
            let mut reply = [0u8; 4];
            client.read_exact(&mut reply).unwrap();
            reply
        });

        let server = listener.accept().unwrap();
        let mut reader = server.try_clone().unwrap();
        let mut writer = server;

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        writer.write_all(b"pong").unwrap();

        assert_eq!(&buf, b"ping");
        assert_eq!(&handle.join().unwrap(), b"pong");
    }
}
