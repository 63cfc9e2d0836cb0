mod app;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use app::App;
use app::model::Config;

/// Manage onedriver mountpoints from the terminal.
#[derive(Parser)]
#[command(name = "onedriver-launcher", version)]
struct Cli {
    /// Systemd unit template instantiated per mountpoint.
    #[arg(long, default_value = "onedriver@.service")]
    template: String,

    /// Talk to the system service manager instead of the user manager.
    #[arg(long)]
    system: bool,

    /// Log filter, e.g. "info" or "onedriver_launcher=debug".
    #[arg(short, long, default_value = "info")]
    log: String,

    /// Append logs to this file. The terminal belongs to the UI, so
    /// nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid log filter")?)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Config {
        template: cli.template,
        system: cli.system,
    };

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;

    let result = App::new(config).run(&mut terminal);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    result
}
