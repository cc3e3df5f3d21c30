use dotenv::dotenv;
use nowplaying::models::PlaybackSnapshot;
use nowplaying::source::spotify::Spotify;
use nowplaying::util::config::Config;
use nowplaying::util::headers::generate_headers;
use nowplaying::widget::view::format_time;
use nowplaying::widget::{WidgetHandle, WidgetOptions};
use reqwest::{Client, ClientBuilder};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::main;
use tokio::signal;
use tracing::Level;
use tracing_subscriber::fmt;

#[main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    dotenv().ok();

    let config = match Config::new() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let level = Level::from_str(config.log_level()).unwrap_or(Level::INFO);
    let subscriber = fmt()
        .pretty()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_max_level(level)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global logger: {}", error);
        return ExitCode::FAILURE;
    }

    let http = match build_client() {
        Ok(http) => http,
        Err(error) => {
            tracing::error!("Failed to create reqwest client: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let source = Arc::new(Spotify::new(Some(http), config.spotify()));
    let widget = WidgetHandle::mount(source, WidgetOptions::from(&config.widget()));
    let mut updates = widget.subscribe();
    let mut last_snapshot: Option<PlaybackSnapshot> = None;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.latest_snapshot() != last_snapshot.as_ref() {
                    last_snapshot = state.latest_snapshot().cloned();
                    log_snapshot(last_snapshot.as_ref());
                } else if let Some(PlaybackSnapshot::Playing(track)) = state.latest_snapshot() {
                    tracing::debug!(
                        "{} / {}",
                        format_time(state.displayed_progress_ms()),
                        format_time(track.duration_ms)
                    );
                }
            }
        }
    }

    widget.teardown().await;
    ExitCode::SUCCESS
}

fn build_client() -> Result<Client, Box<dyn std::error::Error>> {
    let headers = generate_headers()?;
    Ok(ClientBuilder::new().default_headers(headers).build()?)
}

fn log_snapshot(snapshot: Option<&PlaybackSnapshot>) {
    match snapshot {
        Some(PlaybackSnapshot::Playing(track)) => tracing::info!(
            "Now playing: {} by {} from {} [{} / {}] {}",
            track.title,
            track.artist,
            track.album,
            format_time(track.progress_ms),
            format_time(track.duration_ms),
            track.track_url
        ),
        Some(PlaybackSnapshot::NotPlaying) => tracing::info!("Not currently playing"),
        None => {}
    }
}
