use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// A connected scoreboard feed: implements `Read + Write`.
///
/// Wraps either an accepted TCP connection or an open serial device. Both
/// carry the same RTD byte stream; the rest of the stack does not care which.
pub struct RtdStream {
    inner: RtdStreamInner,
}

enum RtdStreamInner {
    Tcp(TcpStream),
    Serial { file: File, path: PathBuf },
}

impl Read for RtdStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            RtdStreamInner::Tcp(stream) => stream.read(buf),
            RtdStreamInner::Serial { file, .. } => file.read(buf),
        }
    }
}

impl Write for RtdStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            RtdStreamInner::Tcp(stream) => stream.write(buf),
            RtdStreamInner::Serial { file, .. } => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            RtdStreamInner::Tcp(stream) => stream.flush(),
            RtdStreamInner::Serial { file, .. } => file.flush(),
        }
    }
}

impl RtdStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: RtdStreamInner::Tcp(stream),
        }
    }

    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn from_serial(file: File, path: &Path) -> Self {
        Self {
            inner: RtdStreamInner::Serial {
                file,
                path: path.to_path_buf(),
            },
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Serial devices are configured for blocking reads at open time; the
    /// timeout is ignored for them.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            RtdStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            RtdStreamInner::Serial { .. } => Ok(()),
        }
    }

    /// Set write timeout on the underlying stream (TCP only).
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            RtdStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            RtdStreamInner::Serial { .. } => Ok(()),
        }
    }

    /// Try to clone this stream (duplicates the descriptor).
    ///
    /// Used to split one connection into an independent reader and writer.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            RtdStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            RtdStreamInner::Serial { file, path } => Ok(Self::from_serial(file.try_clone()?, path)),
        }
    }

    /// Human-readable identity of the remote end, for logs.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            RtdStreamInner::Tcp(stream) => match stream.peer_addr() {
                Ok(addr) => format!("tcp:{addr}"),
                Err(_) => "tcp:unknown".to_string(),
            },
            RtdStreamInner::Serial { path, .. } => format!("serial:{}", path.display()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            RtdStreamInner::Tcp(_) => "tcp",
            RtdStreamInner::Serial { .. } => "serial",
        }
    }
}

impl std::fmt::Debug for RtdStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtdStream")
            .field("type", &self.transport_name())
            .field("peer", &self.peer_label())
            .finish()
    }
}
