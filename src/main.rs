mod api;
mod app;
mod config;
mod dashboard;
mod error;
mod events;
mod form;
mod gate;
mod list;
mod logger;
mod models;
mod parser;
mod session;
mod ui;

use crate::api::ApiClient;
use crate::app::App;
use crate::events::Worker;
use crate::gate::Route;
use crate::session::{FileTokenStore, Session};
use crate::ui::run_app;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load()?;
    let _guard = logger::init_logger(&config.log_dir)?;
    info!(api_url = %config.api_url, "starting crm-tui");

    let api = Arc::new(ApiClient::new(&config.api_url)?);
    let mut session = Session::new(
        Arc::new(FileTokenStore::new(config.token_path())),
        Arc::new(FileTokenStore::new(config.cookie_path())),
    );
    session.boot(api.as_ref()).await;
    info!(authenticated = session.is_authenticated(), "session ready");

    let (worker, mut events) = Worker::new(Arc::clone(&api));
    let mut app = App::new(session, worker);
    app.navigate(Route::Dashboard);

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = run_app(&mut terminal, app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
