//! The shunt controller binary: admission engine + REST surface + stats
//! monitor, with a southbound channel pair an OpenFlow 1.3 session attaches
//! to.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use shunt_core::{Config, Controller, NetworkSpec, Topology};

use shunt_control::{api, monitor, southbound, state::AppState, DEFAULT_TOPOLOGY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Config and topology, from TOML files when given.
    let config: Config = match std::env::var("SHUNT_CONFIG") {
        Ok(path) => toml::from_str(&std::fs::read_to_string(&path)?)?,
        Err(_) => Config::default(),
    };
    let spec: NetworkSpec = match std::env::var("SHUNT_TOPOLOGY") {
        Ok(path) => toml::from_str(&std::fs::read_to_string(&path)?)?,
        Err(_) => toml::from_str(DEFAULT_TOPOLOGY)?,
    };
    let (nodes, links) = spec.build()?;
    let topology = Topology::new(&nodes, &links, config.capacity)?;
    tracing::info!(
        nodes = nodes.len(),
        links = links.len(),
        "topology loaded"
    );

    let (handle, southbound_rx) = southbound::channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let state = AppState::new(Controller::new(topology, config, handle));

    tokio::spawn(monitor::run(state.clone()));
    tokio::spawn(monitor::dispatch(state.clone(), reply_rx));
    // An OpenFlow session would consume `southbound_rx` and feed `reply_tx`;
    // until one is attached, messages are drained to the log.
    tokio::spawn(southbound::log_drain(southbound_rx, reply_tx));

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;
    tracing::info!("shunt-control listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
