use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_client::connection::WsConnector;
use chat_client::terminal::{parse_input, Input, TerminalNotifier, TerminalSurface};
use chat_client::{ChatClient, Config};

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            std::process::exit(2);
        }
    };

    tracing::info!(server_url = %config.server_url, "chat-client configured");

    let (client, handle) = ChatClient::new(
        &config,
        Arc::new(WsConnector),
        Arc::new(TerminalSurface::new()),
        Arc::new(TerminalNotifier),
    );
    let client_task = tokio::spawn(client.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(%err, "failed to read stdin");
                break;
            }
        };

        match parse_input(&line) {
            Input::Message(text) => handle.send_message(text),
            Input::Join(name) => handle.switch_channel(name),
            Input::Create { name, channel_type } => handle.create_channel(name, channel_type),
            Input::Nick(name) => handle.set_username(name),
            Input::Channels => {
                let snapshot = handle.snapshot();
                for (name, channel_type) in &snapshot.channels {
                    let marker = if *name == snapshot.active_channel { "*" } else { " " };
                    println!("{marker} #{name} ({channel_type})");
                }
            }
            Input::Quit => break,
            Input::Empty => {}
            Input::Invalid(reason) => eprintln!("{reason}"),
        }
    }

    handle.shutdown();
    if let Err(err) = client_task.await {
        tracing::error!(%err, "client task failed");
    }
}
