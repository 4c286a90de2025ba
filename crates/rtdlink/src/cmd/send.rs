use std::time::Duration;

use bytes::Bytes;
use rtdlink_frame::{FrameReader, FrameWriter, ScanConfig, ACK_FRAME, MAX_OFFSET};
use rtdlink_transport::TcpTransport;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_send, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    if args.offset > MAX_OFFSET {
        return Err(CliError::new(
            USAGE,
            format!("--offset must be at most {MAX_OFFSET}"),
        ));
    }
    let stream = TcpTransport::connect(&args.address, args.port)
        .map_err(|err| transport_error("connect failed", err))?;
    let reader_stream = stream
        .try_clone()
        .map_err(|err| transport_error("connect failed", err))?;

    let mut writer = FrameWriter::with_write_timeout(stream, Some(timeout))
        .map_err(|err| frame_error("connect failed", err))?;
    writer
        .send_frame(args.offset, args.text.as_bytes())
        .map_err(|err| frame_error("send failed", err))?;

    if args.wait_ack {
        let config = ScanConfig {
            read_timeout: Some(timeout),
            ..ScanConfig::default()
        };
        let mut reader = FrameReader::with_config_stream(reader_stream, config)
            .map_err(|err| frame_error("receive failed", err))?;
        let reply = reader
            .read_frame()
            .map_err(|err| frame_error("no acknowledgement", err))?;
        verify_ack(&reply)?;
    }

    let address = format!("{}:{}", args.address, args.port);
    print_send(&address, args.offset, &args.text, args.wait_ack, format);
    Ok(SUCCESS)
}

fn verify_ack(reply: &Bytes) -> CliResult<()> {
    if reply.as_ref() == ACK_FRAME {
        Ok(())
    } else {
        Err(CliError::new(
            DATA_INVALID,
            format!("unexpected reply: {:?}", String::from_utf8_lossy(reply)),
        ))
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
