mod cli;
mod fetch;
mod state;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use sk_client::ApiClient;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EVENT_QUEUE_CAPACITY: usize = 256;

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let settings = cli::Settings::from_args(&args)?;

    match args.command {
        Some(command) => {
            init_logging(LogSink::Stderr);
            cli::run(command, &settings).await
        }
        None => {
            init_logging(LogSink::from_env());
            run_dashboard(settings).await
        }
    }
}

async fn run_dashboard(settings: cli::Settings) -> Result<()> {
    let client = ApiClient::new(settings.client.clone())?;
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let fetcher = fetch::Fetcher::new(client, tx, settings.job_limit);
    let mut app = state::App::new(settings.client.clone());
    fetcher.dispatch_all(app.start());
    info!(event = "console_start", api_base = %settings.client.base_url());

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, &fetcher, rx, &settings).await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = &result {
        error!(event = "console_error", error = %err);
    }
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    app: &mut state::App,
    fetcher: &fetch::Fetcher,
    mut rx: mpsc::Receiver<state::AppEvent>,
    settings: &cli::Settings,
) -> Result<()> {
    let mut events = EventStream::new();
    // start() already fetched once, so the first scheduled tick is one period out.
    let mut fleet_ticker = interval_at(
        Instant::now() + settings.fleet_interval,
        settings.fleet_interval,
    );
    let mut job_ticker = interval_at(Instant::now() + settings.job_interval, settings.job_interval);
    fleet_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    job_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fleet_epoch = app.fleet_epoch();
    let mut job_epoch = app.job_epoch();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        if app.should_quit() {
            break;
        }

        tokio::select! {
            _ = fleet_ticker.tick() => {
                fetcher.dispatch_all(app.on_fleet_tick());
            }
            _ = job_ticker.tick() => {
                fetcher.dispatch_all(app.on_job_tick());
            }
            Some(event) = rx.recv() => {
                fetcher.dispatch_all(app.apply(event));
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        fetcher.dispatch_all(app.handle_key(key));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                }
            }
        }

        if app.fleet_epoch() != fleet_epoch {
            fleet_epoch = app.fleet_epoch();
            fleet_ticker.reset();
        }
        if app.job_epoch() != job_epoch {
            job_epoch = app.job_epoch();
            job_ticker.reset();
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogSink {
    Discard,
    Stderr,
    File(PathBuf),
}

impl LogSink {
    /// The dashboard owns the terminal, so logs go nowhere unless redirected.
    fn from_env() -> Self {
        Self::from_values(
            std::env::var("SK_LOG_FILE").ok().as_deref(),
            std::env::var("SK_LOG_STDERR").ok().as_deref(),
        )
    }

    fn from_values(file: Option<&str>, stderr: Option<&str>) -> Self {
        if let Some(path) = file.map(str::trim).filter(|path| !path.is_empty()) {
            return LogSink::File(PathBuf::from(path));
        }
        if matches!(
            stderr,
            Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
        ) {
            LogSink::Stderr
        } else {
            LogSink::Discard
        }
    }
}

fn init_logging(sink: LogSink) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match sink {
        LogSink::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
        }
        LogSink::File(path) => match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            Err(err) => {
                eprintln!("log_file_error: {}: {err}", path.display());
                init_logging(LogSink::Discard);
            }
        },
        LogSink::Discard => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}
