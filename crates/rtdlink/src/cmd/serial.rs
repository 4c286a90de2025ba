use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use rtdlink_board::Connection;
use rtdlink_transport::SerialPort;

use crate::cmd::serve::{build_handler, install_ctrlc_handler, pump_events};
use crate::cmd::SerialArgs;
use crate::exit::{board_error, io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: SerialArgs, format: OutputFormat) -> CliResult<i32> {
    let handler = build_handler(&args.board)?;
    let stream = SerialPort::open(&args.device, args.baud)
        .map_err(|err| transport_error("failed to open serial device", err))?;
    let conn = Connection::from_stream(stream, handler)
        .map_err(|err| board_error("failed to open serial device", err))?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        install_ctrlc_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("rtd-serial".to_string())
        .spawn(move || conn.run(&tx))
        .map_err(|err| io_error("failed to start serial reader", err))?;

    pump_events(
        &rx,
        &running,
        args.board.count,
        format,
        args.board.hide_blank,
        || worker.is_finished(),
    );

    if worker.is_finished() {
        match worker.join() {
            Ok(Err(err)) => return Err(board_error("serial read failed", err)),
            Ok(Ok(())) => {}
            Err(_) => return Err(CliError::new(INTERNAL, "serial reader panicked")),
        }
    }
    Ok(SUCCESS)
}
