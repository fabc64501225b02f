//! # Pitch Monitor
//!
//! Terminal front end for the real-time pitch detector. Captures audio
//! from the default microphone (or replays a WAV file), runs every frame
//! through the analysis pipeline and prints the detected note, frequency,
//! cent deviation and input level.
//!
//! ## Architecture
//! - **Main Thread**: renders reports and owns the pitch history
//! - **Audio Thread**: capture session and analyzer, one report per frame
//! - **Communication**: crossbeam channels for reports and shutdown
//! - **Stopping**: press Enter, reach `--frames`, or reach the end of the WAV

mod source;
mod ui;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use crossbeam_channel::{Receiver, Sender};
use pitch_core::audio::CaptureSession;
use pitch_core::tuning::Notation;
use pitch_core::{Analyzer, DetectorConfig, FrameReport, PitchHistory};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use source::Source;

/// Capacity of the raw frame channel between the device callback and the
/// analyzer. Frames beyond it are dropped, never queued.
const RAW_FRAME_QUEUE: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "pitch-monitor", version, about = "Real-time pitch and note monitor")]
struct Args {
    /// Detector configuration file (JSON); unspecified fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay a WAV file instead of capturing from the microphone
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<usize>,

    /// Print one JSON object per frame instead of a status line
    #[arg(long)]
    json: bool,

    /// Note naming scheme
    #[arg(long, value_enum, default_value_t = NotationArg::Letter)]
    notation: NotationArg,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NotationArg {
    Letter,
    Ascii,
    Solfege,
}

impl From<NotationArg> for Notation {
    fn from(arg: NotationArg) -> Self {
        match arg {
            NotationArg::Letter => Notation::Letter,
            NotationArg::Ascii => Notation::Ascii,
            NotationArg::Solfege => Notation::Solfege,
        }
    }
}

/// Audio worker thread management structure.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<Result<()>>>,
}

impl AudioWorker {
    /// Signals the worker to stop and waits for it.
    fn shutdown(mut self) -> Result<()> {
        // The worker may already have exited and dropped its receiver.
        let _ = self.shutdown_tx.send(());
        match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("audio thread panicked"))?,
            None => Ok(()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DetectorConfig::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = Source::from_arg(args.wav.clone());
    info!(?source, frame_size = config.frame_size, "starting pitch monitor");

    let (report_tx, report_rx) = crossbeam_channel::bounded::<FrameReport>(64);
    let worker = start_audio_processing(source, config.clone(), report_tx);
    // Held here so the render loop never sees a closed stop channel, even
    // after the watcher exits on end of input.
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    spawn_stop_watcher(io::BufReader::new(io::stdin()), stop_tx.clone());

    let mut history = PitchHistory::with_capacity(config.history_capacity);
    let render_result = render_loop(&args, &report_rx, &stop_rx, &mut history);

    // Dropping the receiver unblocks a worker waiting to send.
    drop(report_rx);
    let worker_result = worker.shutdown();

    if !args.json {
        eprintln!("{}", ui::main_display::summary(&history, args.notation.into()));
    }
    render_result?;
    worker_result
}

/// Consumes reports until the worker finishes, the user presses Enter or
/// the frame limit is reached.
fn render_loop(
    args: &Args,
    reports: &Receiver<FrameReport>,
    stop: &Receiver<()>,
    history: &mut PitchHistory,
) -> Result<()> {
    let notation = Notation::from(args.notation);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut rendered = 0usize;

    loop {
        crossbeam_channel::select! {
            recv(reports) -> msg => match msg {
                Ok(report) => {
                    if let Some(sample) = report.detection.to_sample() {
                        history.push(sample);
                    }
                    if args.json {
                        writeln!(out, "{}", serde_json::to_string(&report)?)?;
                    } else {
                        writeln!(out, "{}", ui::main_display::status_line(&report, notation))?;
                    }
                    rendered += 1;
                    if args.frames.is_some_and(|limit| rendered >= limit) {
                        debug!(rendered, "frame limit reached");
                        break;
                    }
                }
                Err(_) => {
                    debug!("report channel closed");
                    break;
                }
            },
            recv(stop) -> _ => {
                info!("stop requested");
                break;
            },
        }
    }
    out.flush()?;
    Ok(())
}

/// Starts the dedicated audio processing thread.
///
/// The thread owns the capture session and the analyzer, and sends one
/// report per frame back over `report_tx`. It exits on a shutdown signal,
/// when the report receiver goes away, or when the source runs dry.
fn start_audio_processing(
    source: Source,
    config: DetectorConfig,
    report_tx: Sender<FrameReport>,
) -> AudioWorker {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let thread_handle = thread::spawn(move || {
        let result = run_worker(source, &config, &report_tx, &shutdown_rx);
        if let Err(e) = &result {
            error!(error = %e, "audio thread failed");
        }
        debug!("audio thread finished");
        result
    });

    AudioWorker {
        shutdown_tx,
        thread_handle: Some(thread_handle),
    }
}

fn run_worker(
    source: Source,
    config: &DetectorConfig,
    report_tx: &Sender<FrameReport>,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let mut analyzer = Analyzer::new(config).context("invalid detector configuration")?;
    info!(
        min_hz = analyzer.range().min_hz,
        max_hz = analyzer.range().max_hz,
        reference_hz = analyzer.mapper().reference_hz(),
        "analyzer ready"
    );
    match source {
        Source::Microphone => run_microphone(&mut analyzer, config, report_tx, shutdown_rx),
        Source::Wav(path) => run_wav(&mut analyzer, config, &path, report_tx, shutdown_rx),
    }
}

fn run_microphone(
    analyzer: &mut Analyzer,
    config: &DetectorConfig,
    report_tx: &Sender<FrameReport>,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(RAW_FRAME_QUEUE);
    let session = CaptureSession::start(config.frame_size, raw_audio_tx)
        .context("starting audio capture")?;
    let sample_rate = session.sample_rate();
    info!(
        device = session.device_name(),
        sample_rate,
        channels = session.channels(),
        "listening; press Enter to stop"
    );

    loop {
        crossbeam_channel::select! {
            recv(raw_audio_rx) -> msg => match msg {
                Ok(frame) => {
                    let report = analyzer.process(&frame, sample_rate);
                    if report_tx.send(report).is_err() {
                        debug!("report receiver gone");
                        break;
                    }
                }
                Err(_) => {
                    warn!("audio channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                debug!("received shutdown signal");
                break;
            },
        }
    }

    session.stop()
}

fn run_wav(
    analyzer: &mut Analyzer,
    config: &DetectorConfig,
    path: &std::path::Path,
    report_tx: &Sender<FrameReport>,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let wav = source::read_wav_frames(path, config.frame_size)?;
    info!(frames = wav.frames.len(), "replaying frames");

    for frame in &wav.frames {
        if shutdown_rx.try_recv().is_ok() {
            debug!("received shutdown signal");
            break;
        }
        let report = analyzer.process(frame, wav.sample_rate);
        if report_tx.send(report).is_err() {
            debug!("report receiver gone");
            break;
        }
    }
    Ok(())
}

/// Sends a stop signal when a line (Enter) arrives on `input`.
///
/// End of input (stdin closed or redirected from /dev/null) is not a stop
/// request; the thread just exits. The caller keeps its own sender alive.
fn spawn_stop_watcher<R>(mut input: R, stop_tx: Sender<()>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => debug!("input closed; stop on Enter disabled"),
            Ok(_) => {
                let _ = stop_tx.try_send(());
            }
            Err(e) => warn!(error = %e, "failed to read input"),
        }
    })
}
