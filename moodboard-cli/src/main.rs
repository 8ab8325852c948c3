//! # Moodboard CLI
//!
//! Command-line host for the moodboard core.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use moodboard_cli::{parse_trace, CliArgs, CliConfig, Command};
use moodboard_core::import::{import_images, DirectoryImageSource, ImageOrigin};
use moodboard_core::{
    spawn_persister, BoardStore, CanvasState, GestureConfig, PersistConfig, PersistHandle,
    Settings,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,moodboard_core=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moodboard_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = CliConfig::from(args);

    let store = Arc::new(
        BoardStore::open(config.boards_dir())
            .with_context(|| format!("Failed to open {}", config.data_dir.display()))?,
    );
    let mut settings = Settings::load(&config.settings_path());

    match command {
        Command::Boards => {
            for board in store.list_boards() {
                let marker = if settings.last_board_id.as_deref() == Some(board.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}\t{}", board.id, board.name);
            }
        }
        Command::NewBoard { name } => {
            let id = store.create_board(&name)?;
            remember_board(&config, &mut settings, &id)?;
            println!("{id}");
        }
        Command::Import { dir } => {
            let board = current_board(&config, &store, &settings)?;
            let mut state = open_canvas(&config, &store, &board)?;
            let persister = attach_persister(&mut state, &store, &board);

            let source = DirectoryImageSource::new(&dir);
            let scene = state.scene();
            let items = import_images(
                &source,
                ImageOrigin::Library,
                settings.default_image_size,
                scene.transform,
                scene.viewport,
            )
            .await;
            let added = state.import_items(items).len();

            let stats = persister.shutdown().await;
            remember_board(&config, &mut settings, &board)?;
            println!("Imported {added} image(s) from {}", dir.display());
            if stats.failures > 0 {
                anyhow::bail!("{} write(s) failed", stats.failures);
            }
        }
        Command::Show { draw } => {
            let board = current_board(&config, &store, &settings)?;
            let state = open_canvas(&config, &store, &board)?;
            let output = if draw {
                serde_json::to_string_pretty(&state.draw_list(settings.grid_style()))?
            } else {
                let scene = state.scene();
                let items: Vec<_> = scene.items().collect();
                serde_json::to_string_pretty(&serde_json::json!({
                    "board": store.board(&board),
                    "transform": scene.transform,
                    "items": items,
                }))?
            };
            println!("{output}");
        }
        Command::Replay { trace } => {
            let board = current_board(&config, &store, &settings)?;
            let json = std::fs::read_to_string(&trace)
                .with_context(|| format!("Failed to read {}", trace.display()))?;
            let events = parse_trace(&json)?;

            let mut state = open_canvas(&config, &store, &board)?;
            let persister = attach_persister(&mut state, &store, &board);

            let mut emitted = 0;
            for event in &events {
                emitted += state.process_event(event).len();
            }
            tracing::info!(input = events.len(), emitted, "Replayed trace");

            let stats = persister.shutdown().await;
            println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
            println!(
                "{} event(s) in, {emitted} board event(s) out, {} write(s), {} failure(s)",
                events.len(),
                stats.writes,
                stats.failures
            );
        }
    }

    Ok(())
}

fn current_board(
    config: &CliConfig,
    store: &BoardStore,
    settings: &Settings,
) -> anyhow::Result<String> {
    let board = config
        .resolve_board(settings)
        .context("No board selected; pass --board or create one with new-board")?;
    if store.board(&board).is_none() {
        anyhow::bail!("Unknown board: {board}");
    }
    Ok(board)
}

fn open_canvas(config: &CliConfig, store: &BoardStore, board: &str) -> anyhow::Result<CanvasState> {
    let state = CanvasState::load(
        store,
        board,
        config.width,
        config.height,
        GestureConfig::default(),
    )?;
    Ok(state)
}

fn attach_persister(state: &mut CanvasState, store: &Arc<BoardStore>, board: &str) -> PersistHandle {
    let rx = state.event_channel();
    spawn_persister(Arc::clone(store), board, rx, PersistConfig::default())
}

fn remember_board(config: &CliConfig, settings: &mut Settings, board: &str) -> anyhow::Result<()> {
    if settings.last_board_id.as_deref() == Some(board) {
        return Ok(());
    }
    settings.last_board_id = Some(board.to_string());
    std::fs::create_dir_all(&config.data_dir)?;
    settings.save(&config.settings_path())?;
    Ok(())
}
