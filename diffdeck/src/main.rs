//! diffdeck: side-by-side diff viewer for git and jj working trees.
//!
//! Startup order:
//!
//! 1. Parse arguments, start file logging, load `config.toml`. Nothing here
//!    touches the terminal, so errors print normally.
//! 2. Detect the repository and open the session. A revset the provider
//!    cannot start on is reported before the alternate screen is entered.
//! 3. `install_panic_hook()`, `register_sigterm()`, `init_tui()`, then the
//!    event task.
//!
//! The loop exits on `q`, SIGTERM, a closed event stream, or when the session
//! closes itself (an empty diff). `restore_tui()` runs after the loop on every
//! one of those paths; the last goto location is then printed to stdout.

mod app;
mod event;
mod host;
mod logging;
mod theme;
mod tui;
mod ui;
mod vcs;

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use diffdeck_core::config::ConfigFile;
use diffdeck_core::controller::{RefreshOutcome, SessionController};
use diffdeck_core::event::SessionEvent;
use diffdeck_core::model::Revset;
use diffdeck_core::session::Lifecycle;

use crate::app::ViewState;
use crate::event::{AppEvent, EventHandler};
use crate::host::TuiHost;
use crate::theme::Theme;
use crate::ui::keybindings::{self, KeyAction};
use crate::vcs::VcsProviderFactory;

#[derive(Debug, Parser)]
#[command(name = "diffdeck", version, about = "Side-by-side diff viewer for git and jj working trees")]
struct Cli {
    /// Revision to diff against the working tree, or a range `from..to`.
    /// Without it the unstaged working-tree changes are shown.
    #[arg(conflicts_with = "staged")]
    revset: Option<String>,

    /// Show staged changes (index against HEAD).
    #[arg(long)]
    staged: bool,

    /// Start repository discovery here instead of the current directory.
    #[arg(short = 'C', long = "dir", value_name = "PATH")]
    dir: Option<PathBuf>,
}

impl Cli {
    fn revset(&self) -> Revset {
        match &self.revset {
            Some(token) => Revset::Range(token.clone()),
            None if self.staged => Revset::Staged,
            None => Revset::Unstaged,
        }
    }
}

/// `$<var>/diffdeck/<file>`, falling back to `~/<home_suffix>/diffdeck/<file>`.
fn xdg_path(var: &str, home_suffix: &str, file: &str) -> PathBuf {
    xdg_base(env::var_os(var), env::var_os("HOME"), home_suffix)
        .join("diffdeck")
        .join(file)
}

fn xdg_base(xdg: Option<OsString>, home: Option<OsString>, home_suffix: &str) -> PathBuf {
    xdg.filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|h| PathBuf::from(h).join(home_suffix)))
        .unwrap_or_else(|| PathBuf::from(home_suffix))
}

/// Config errors are soft: the viewer starts with defaults and says why in
/// the log.
fn load_config() -> ConfigFile {
    let path = xdg_path("XDG_CONFIG_HOME", ".config", "config.toml");
    match ConfigFile::load(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!("{err}; using default settings");
            ConfigFile::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&xdg_path("XDG_STATE_HOME", ".local/state", "diffdeck.log")) {
        eprintln!("diffdeck: logging disabled: {err:#}");
    }

    let start = match &cli.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to read the current directory")?,
    };
    let Some(root) = diffdeck_core::vcs::detect(&start) else {
        bail!("no git or jj repository found at or above {}", start.display());
    };
    info!(vcs = %root.kind, workdir = %root.workdir.display(), "repository detected");

    let config = load_config();
    let theme = config.theme.as_deref().map(Theme::from_name).unwrap_or_default();

    let (session_tx, mut session_rx) = mpsc::unbounded_channel();
    let factory = VcsProviderFactory::new(&root.workdir);
    let mut controller =
        SessionController::new(TuiHost::new(), Box::new(factory), root.kind, root.workdir, session_tx);
    controller
        .open(cli.revset(), config.session)
        .with_context(|| format!("cannot open a diff session for {}", cli.revset()))?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;
    let mut view = ViewState::default();

    let result = run(&mut terminal, &mut controller, &mut view, &mut rx, &mut session_rx, &term_flag, &theme).await;

    controller.close();
    tui::restore_tui()?;
    result?;

    if let Some(location) = &view.last_goto {
        println!("{location}");
    }
    if let Some(notice) = controller.host_mut().take_notice() {
        eprintln!("diffdeck: {notice}");
    }
    Ok(())
}

/// The event loop. Only draw errors leave it through `?`; every other exit
/// is a `break`, so the caller always reaches `restore_tui()`.
async fn run(
    terminal: &mut tui::Tui,
    controller: &mut SessionController<TuiHost>,
    view: &mut ViewState,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    session_rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    term_flag: &AtomicBool,
    theme: &Theme,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            // SIGTERM is polled here so a quiet terminal still notices it.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            maybe_event = rx.recv() => match maybe_event {
                Some(AppEvent::Render) => {
                    terminal.draw(|frame| ui::render(frame, controller, view, theme))?;
                }
                Some(AppEvent::Key(key)) => {
                    if keybindings::handle_key(key, controller, view) == KeyAction::Quit {
                        break;
                    }
                }
                Some(AppEvent::Mouse(mouse)) => {
                    keybindings::handle_mouse(mouse, controller, view);
                }
                Some(AppEvent::Tick) => view.on_tick(),
                // ratatui picks up the new size from frame.area() on the next Render.
                Some(AppEvent::Resize(..)) => {}
                Some(AppEvent::Quit) | None => break,
            },
            Some(event) = session_rx.recv() => match controller.handle_event(event) {
                Ok(outcome) => {
                    debug!(?outcome, "session event");
                    if matches!(outcome, RefreshOutcome::Opened { .. } | RefreshOutcome::Rerendered { .. }) {
                        view.keep_cursor_visible(controller.session().cursor_row());
                    }
                }
                Err(err) => {
                    error!("refresh failed: {err}");
                    view.set_status(format!("refresh failed: {err}"));
                }
            },
        }

        if term_flag.load(Ordering::Relaxed) {
            info!("SIGTERM received");
            break;
        }
        if controller.lifecycle() == Lifecycle::Closed {
            break;
        }
    }
    Ok(())
}
