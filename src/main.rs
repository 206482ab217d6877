use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::LevelFilter;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use rowmark::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    cue::{AudioCue, Silent, TerminalBell},
    intake::{ImageAsset, PdfDocument, SystemViewer},
    logging,
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    session::{Session, SessionOptions},
    storage::{AsyncBlobStore, JsonFileKv, SqliteBlobStore},
    ui,
    widget_pos::Size,
};

/// follow a knitting or crochet chart one row at a time
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Load a chart image, drag over the rows you are working, and step through them one highlighted row at a time. A pattern pdf, a stitch counter and a countdown timer sit alongside. Everything is remembered between runs."
)]
pub struct Cli {
    /// number of rows in the selected part of the chart
    #[clap(short = 'r', long)]
    rows: Option<i64>,

    /// timer length in minutes (1-99)
    #[clap(short = 'm', long)]
    minutes: Option<u32>,

    /// chart image to load, replacing the stored one
    #[clap(short = 'i', long)]
    image: Option<PathBuf>,

    /// pattern pdf to load, replacing the stored one
    #[clap(short = 'p', long)]
    pdf: Option<PathBuf>,

    /// keep state, blobs and logs in this directory
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// erase all remembered state before starting
    #[clap(long)]
    reset: bool,

    /// log verbosity (RUST_LOG takes precedence)
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let dirs = match &cli.data_dir {
        Some(root) => AppDirs::rooted_at(root),
        None => AppDirs::resolve(),
    };
    logging::init(&dirs.log_path(), cli.log_level);
    log::info!("rowmark {} starting in {:?}", env!("CARGO_PKG_VERSION"), dirs.state_dir());

    let config_store = FileConfigStore::new();
    let config = config_store.load();
    if !config_store.path().exists() {
        if let Err(e) = config_store.save(&config) {
            log::warn!("could not write default config: {e}");
        }
    }

    let ticker = FixedTicker::new(Duration::from_millis(config.tick_rate_ms.max(10)));
    let runner = Runner::new(CrosstermEventSource::new(), ticker);
    let session = open_session(&cli, &config, &dirs, &runner);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let area = terminal.size()?;
    let mut app = App::new(
        session,
        Box::new(SystemViewer),
        Size::new(area.width, area.height),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    app.session().flush();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    log::info!("rowmark exiting");

    result
}

fn open_session<E: AppEventSource, T: Ticker>(
    cli: &Cli,
    config: &Config,
    dirs: &AppDirs,
    runner: &Runner<E, T>,
) -> Session {
    let kv = JsonFileKv::open(dirs.kv_path());
    let db_path = dirs.blob_db_path();
    let blobs = AsyncBlobStore::spawn_with(move || SqliteBlobStore::open(db_path));
    let audio: Box<dyn AudioCue> = if config.bell {
        Box::new(TerminalBell)
    } else {
        Box::new(Silent)
    };
    let opts = SessionOptions::from_config(config, dirs.cache_dir().to_path_buf());
    let mut session = Session::open(Box::new(kv), blobs, audio, opts);

    if cli.reset {
        session.forget_everything();
    }

    let tx = runner.sender();
    session.request_restore(move |restored| {
        if tx.send(AppEvent::Restored(restored)).is_err() {
            log::debug!("restore arrived after shutdown");
        }
    });

    if let Some(path) = &cli.image {
        match ImageAsset::from_path(path) {
            Ok(asset) => session.replace_image(asset),
            Err(e) => log::warn!("--image {:?}: {}", path, e),
        }
    }
    if let Some(path) = &cli.pdf {
        match PdfDocument::from_path(path) {
            Ok(doc) => session.replace_pdf(doc),
            Err(e) => log::warn!("--pdf {:?}: {}", path, e),
        }
    }
    if let Some(rows) = cli.rows {
        session.set_total_rows(Some(rows));
    }
    if let Some(minutes) = cli.minutes {
        session.set_timer_minutes(minutes);
    }
    session
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    while !app.should_quit() {
        let event = runner.step();
        if app.handle(event, Instant::now()) {
            terminal.draw(|f| ui::draw(app, f))?;
        }
    }

    Ok(())
}
