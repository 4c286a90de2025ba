use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rtdlink_board::{BoardConfig, BoardEvent, BoardListener, FrameHandler, FrameOutcome, Scoreboard};
use rtdlink_frame::{ScanConfig, MIN_FRAME_LEN};
use rtdlink_template::load_itf;

use crate::cmd::{BoardArgs, ServeArgs};
use crate::exit::{
    board_error, io_error, template_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE,
};
use crate::output::{print_patch, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let handler = build_handler(&args.board)?;
    let running = Arc::new(AtomicBool::new(true));

    #[cfg(feature = "async")]
    if args.use_async {
        return run_async(&args, handler, running, format);
    }

    let listener = BoardListener::bind(&args.address, args.port, handler)
        .map_err(|err| board_error("bind failed", err))?;
    let listener = Arc::new(listener);

    {
        let listener = Arc::clone(&listener);
        let running = Arc::clone(&running);
        install_ctrlc_handler(move || {
            running.store(false, Ordering::SeqCst);
            listener.wake();
        })?;
    }

    let (tx, rx) = mpsc::channel();
    let server = {
        let listener = Arc::clone(&listener);
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("rtd-accept".to_string())
            .spawn(move || listener.serve(tx, running))
            .map_err(|err| io_error("failed to start listener thread", err))?
    };

    pump_events(
        &rx,
        &running,
        args.board.count,
        format,
        args.board.hide_blank,
        || server.is_finished(),
    );

    if server.is_finished() && server.join().is_err() {
        return Err(CliError::new(INTERNAL, "listener thread panicked"));
    }
    Ok(SUCCESS)
}

#[cfg(feature = "async")]
fn run_async(
    args: &ServeArgs,
    handler: FrameHandler,
    running: Arc<AtomicBool>,
    format: OutputFormat,
) -> CliResult<i32> {
    use crate::exit::transport_error;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let transport = rtdlink_transport::TcpTransport::bind(&args.address, args.port)
        .map_err(|err| transport_error("bind failed", err))?;
    let listener = {
        let _guard = runtime.enter();
        transport
            .into_tokio()
            .map_err(|err| transport_error("bind failed", err))?
    };

    {
        let running = Arc::clone(&running);
        install_ctrlc_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let (tx, rx) = mpsc::channel();
    let server = runtime.spawn(rtdlink_board::serve_async(listener, handler, tx));

    pump_events(
        &rx,
        &running,
        args.board.count,
        format,
        args.board.hide_blank,
        || server.is_finished(),
    );

    let result = if server.is_finished() && runtime.block_on(server).is_err() {
        Err(CliError::new(INTERNAL, "listener task panicked"))
    } else {
        Ok(SUCCESS)
    };
    runtime.shutdown_background();
    result
}

/// Load the template and build the shared frame handler.
pub(crate) fn build_handler(args: &BoardArgs) -> CliResult<FrameHandler> {
    if args.max_frame_len < MIN_FRAME_LEN {
        return Err(CliError::new(
            USAGE,
            format!("--max-frame-len must be at least {MIN_FRAME_LEN}"),
        ));
    }

    let template = load_itf(&args.itf).map_err(|err| template_error("template load failed", err))?;
    let scoreboard = Arc::new(Scoreboard::new(Arc::new(template)));
    let config = BoardConfig {
        strict_checksum: args.strict_checksum,
        scan: ScanConfig {
            max_frame_len: args.max_frame_len,
            ..ScanConfig::default()
        },
    };
    Ok(FrameHandler::new(scoreboard, config))
}

/// Print applied patches until stopped, `count` patches are applied, or
/// `finished` reports the producer is gone. Returns the number applied.
pub(crate) fn pump_events(
    rx: &Receiver<BoardEvent>,
    running: &AtomicBool,
    count: Option<usize>,
    format: OutputFormat,
    hide_blank: bool,
    finished: impl Fn() -> bool,
) -> usize {
    let mut applied = 0usize;
    let reached = |applied: usize| count.is_some_and(|count| applied >= count);

    while running.load(Ordering::SeqCst) && !reached(applied) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => applied += print_event(event, format, hide_blank),
            Err(RecvTimeoutError::Timeout) => {
                if finished() {
                    for event in rx.try_iter() {
                        applied += print_event(event, format, hide_blank);
                    }
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    applied
}

fn print_event(event: BoardEvent, format: OutputFormat, hide_blank: bool) -> usize {
    match event {
        BoardEvent::Frame {
            peer,
            outcome: FrameOutcome::Applied(report),
        } => {
            print_patch(&report, &peer, format, hide_blank);
            1
        }
        _ => 0,
    }
}

pub(crate) fn install_ctrlc_handler(handler: impl FnMut() + Send + 'static) -> CliResult<()> {
    ctrlc::set_handler(handler).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
