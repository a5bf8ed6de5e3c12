use std::sync::Arc;

use tokio_util::sync::CancellationToken;

mod api;
mod config;
mod handler;
mod media;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

#[tokio::main]
async fn main() -> ! {
    init_logging();

    let config = config::AppConfig::from_env();
    let state = match api::AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Error initializing service: {}", e);
            std::process::exit(1);
        }
    };

    if !state.encoder.is_available() {
        log::warn!("encoder binary not found, service starts degraded");
    }

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    api::start_api_server(state, cancel_clone);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            },
        }
    }

    std::process::exit(0)
}
