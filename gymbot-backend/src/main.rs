use dotenv::dotenv;
use std::sync::Arc;

mod ai;
mod channels;
mod config;
mod db;
mod errors;
mod models;
mod pipeline;

use ai::{AiClient, TextCompleter};
use channels::{CommandDispatcher, TelegramChannel};
use config::Config;
use db::Database;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    log::info!("GymBot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    let completer: Arc<dyn TextCompleter> = Arc::new(AiClient::new(&config));
    let dispatcher = Arc::new(CommandDispatcher::new(db, completer));

    let channel = Arc::new(TelegramChannel::new(config.telegram_bot_token.clone()));
    channel.run(dispatcher).await;

    log::info!("Shutting down");
}
