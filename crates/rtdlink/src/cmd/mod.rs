use clap::{Args, Subcommand};
use std::path::PathBuf;

use rtdlink_frame::DEFAULT_MAX_FRAME_LEN;
use rtdlink_transport::{DEFAULT_ADDRESS, DEFAULT_PORT};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
#[cfg(unix)]
pub mod serial;
pub mod serve;
pub mod template;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive RTD frames over TCP and print changed fields.
    Serve(ServeArgs),
    /// Receive RTD frames from a serial device and print changed fields.
    #[cfg(unix)]
    Serial(SerialArgs),
    /// Encode and send one RTD frame, like a controller would.
    Send(SendArgs),
    /// Print the field layout of a template file.
    Template(TemplateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        #[cfg(unix)]
        Command::Serial(args) => serial::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Template(args) => template::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that maintains a scoreboard.
#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Input template file (ITF) describing the scoreboard fields.
    #[arg(long, value_name = "PATH", env = "RTDLINK_ITF")]
    pub itf: PathBuf,
    /// Drop frames whose checksum does not match instead of applying them.
    #[arg(long)]
    pub strict_checksum: bool,
    /// Largest frame accepted before it is discarded, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_len: usize,
    /// Do not print fields whose value is all spaces.
    #[arg(long)]
    pub hide_blank: bool,
    /// Exit after N frames have been applied.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "RTDLINK_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,
    /// TCP port to listen on.
    #[arg(long, short = 'p', env = "RTDLINK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Serve connections on the tokio runtime instead of one thread each.
    #[cfg(feature = "async")]
    #[arg(long = "async")]
    pub use_async: bool,
    #[command(flatten)]
    pub board: BoardArgs,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    #[arg(long, value_name = "PATH", env = "RTDLINK_SERIAL_DEVICE")]
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, env = "RTDLINK_BAUD", default_value_t = rtdlink_transport::DEFAULT_BAUD)]
    pub baud: u32,
    #[command(flatten)]
    pub board: BoardArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address of the receiving server.
    #[arg(long, env = "RTDLINK_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,
    /// TCP port of the receiving server.
    #[arg(long, short = 'p', env = "RTDLINK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Scoreboard offset to write at (0-9999).
    #[arg(long)]
    pub offset: usize,
    /// Text to write.
    #[arg(long)]
    pub text: String,
    /// Wait for the acknowledgement and verify it.
    #[arg(long)]
    pub wait_ack: bool,
    /// Maximum time to wait for the acknowledgement (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Input template file (ITF).
    #[arg(env = "RTDLINK_ITF")]
    pub itf: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
