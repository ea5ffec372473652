pub mod cli;
pub mod controller;
pub mod error;
pub mod history;
pub mod locale;
pub mod models;
pub mod reconciler;
pub mod server;
pub mod terminal;
pub mod transport;

use cli::{ Args, Command };
use controller::{ ControllerConfig, ConversationController };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use transport::TransportConfig;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(Command::Serve { addr, chunk_delay_ms }) = &args.command {
        info!("--- Backend Configuration ---");
        info!("Listen Address: {}", addr);
        info!("Chunk Delay: {}ms", chunk_delay_ms);
        info!("-----------------------------");
        let server = Server::new(addr.clone(), Duration::from_millis(*chunk_delay_ms));
        return server.run().await;
    }

    info!("--- Chat Configuration ---");
    info!("Base URL: {}", args.base_url);
    info!("Response Mode: {}", args.mode);
    info!("Stream Route: {}", args.stream_route);
    info!("Batch Route: {}", args.batch_route);
    info!("History Store Type: {}", args.history_type);
    info!("History Dir: {}", args.history_dir);
    info!("Storage Key: {}", args.storage_key);
    info!("Locale: {}", args.locale);
    info!("--------------------------");

    let store = history::create_history_store(&args)?;
    let transport = transport::new_transport(&TransportConfig::from_args(&args))?;
    let (events_tx, events_rx) = mpsc::channel(32);
    let config = ControllerConfig {
        mode: args.mode,
        locale: args.locale,
    };
    let controller = Arc::new(
        ConversationController::new(store, transport, config).await.with_events(events_tx)
    );

    terminal::run_terminal(controller, events_rx).await
}
