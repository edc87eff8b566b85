use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{info, warn};
use bali_core::{Assistant, Config, DataStore, OllamaClient};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = Config::data_dir().and_then(|dir| logging::init(&dir));

    let config_path = Config::config_path().ok();
    let config = match config_path.as_deref().map(Config::load_from) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!(error = %e, "could not read config, using defaults");
            Config::new()
        }
        None => Config::new(),
    };

    let data_path = config.data_file_path()?;
    let store = DataStore::open(&data_path)
        .with_context(|| format!("Could not load assistant data from {}", data_path.display()))?;

    let client = OllamaClient::new(config.ollama_url());
    let mut assistant = Assistant::new(Arc::new(client))
        .with_models(config.model(), config.fallback_model());
    assistant.set_tone(config.tone());

    match &log_path {
        Ok(path) => info!(
            log = %path.display(),
            ollama = config.ollama_url(),
            model = assistant.model(),
            "starting Bali.AI"
        ),
        Err(e) => eprintln!("Logging disabled: {:#}", e),
    }

    let app = App::new(assistant, store, config, config_path);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }

        app.poll_query().await;
    }

    info!("exiting");
    Ok(())
}
