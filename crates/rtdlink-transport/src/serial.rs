use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::RtdStream;

/// Default baud rate for scoreboard controllers.
pub const DEFAULT_BAUD: u32 = 19200;

/// Serial-line transport.
///
/// Opens a tty in raw 8N1 mode with blocking reads (`VMIN=1`, `VTIME=0`),
/// so a read returns as soon as at least one byte is available.
pub struct SerialPort;

impl SerialPort {
    /// Open `path` and configure it for `baud`.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<RtdStream> {
        let path = path.as_ref();
        let speed = baud_to_speed(baud).ok_or(TransportError::UnsupportedBaud(baud))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|e| TransportError::Serial {
                path: path.to_path_buf(),
                source: e,
            })?;

        configure_raw(file.as_raw_fd(), speed).map_err(|e| TransportError::Serial {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(path = %path.display(), baud, "opened serial device");
        Ok(RtdStream::from_serial(file, path))
    }
}

fn configure_raw(fd: libc::c_int, speed: libc::speed_t) -> std::io::Result<()> {
    // SAFETY: an all-zero `termios` is a valid bit pattern; it is fully
    // overwritten by `tcgetattr` before use.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by the caller and `tio` is a
    // valid writable termios struct.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid termios struct initialised by `tcgetattr`.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: as above; speed is one of the libc `B*` constants.
    let rc = unsafe { libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is fully initialised.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Map a numeric baud rate to its termios constant.
pub(crate) fn baud_to_speed(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    };
    Some(speed)
}
