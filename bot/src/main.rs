use dotenv::dotenv;
use mimalloc::MiMalloc;
use serenity::{Client, all::GatewayIntents};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod bot;
mod commands;
mod completion;
mod config;
mod constants;
mod message;
mod persona;
mod session;

use config::{Env, ServerConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing(Env::from_env());

    let config = ServerConfig::new_from_env();
    let handler =
        bot::DiscordEventHandler::new(&config).expect("couldn't build the completion client");

    // Things we want discord to tell us about.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .expect("couldn't create the Discord client");

    if let Err(e) = client.start().await {
        tracing::error!(error = %e, "Discord client stopped");
    }
}

fn init_tracing(env: Env) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,serenity=warn"));

    match env {
        Env::Production => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}
