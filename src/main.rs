//! Fleet tracker daemon

use std::sync::Arc;

use fleet_tracker::{
    aggregator::{DataSourceMode, FleetDataAggregator, FleetDataAggregatorBuilder},
    backend::HttpBackend,
    config::AppConfig,
    credentials::TokenStore,
    demo,
    errors::FleetError,
    models::{LocationSample, PositionReport},
    simulator::{SimulationService, TelemetrySimulator},
    weather::WeatherService,
};
use tokio::{signal, sync::mpsc};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), FleetError> {
    #[cfg(feature = "dotenvy")]
    {
        dotenvy::dotenv().ok();
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let credentials = TokenStore::new(&config.backend.token_path);
    let mut builder = FleetDataAggregatorBuilder::new().credentials(credentials.clone());

    match &config.backend.base_url {
        Some(url) => {
            info!("Using backend at {}", url);
            if credentials.load()?.is_none() {
                warn!(
                    "No token at {} yet, running in demo mode until one is stored",
                    credentials.path().display()
                );
            }
            let backend = HttpBackend::new(url, credentials.clone(), config.backend.timeout)?;
            builder = builder.backend(Arc::new(backend));
        }
        None => info!("No backend configured, running in demo mode"),
    }

    let simulator = TelemetrySimulator::new(&config.simulator, demo::roster());
    let mut simulation = SimulationService::new(simulator);
    let weather = WeatherService::from_config(
        &config.weather,
        config.backend.timeout,
        config.simulator.seed,
    )?;

    let aggregator = Arc::new(
        builder
            .simulator(simulation.simulator())
            .weather(weather)
            .build()?,
    );

    let mode = aggregator.initial_load().await;
    info!("Initial load done: mode={:?}", mode);

    let (tx, rx) = mpsc::channel(100);
    simulation.start(tx);
    let refresh = aggregator.clone().spawn_refresh(config.refresh.interval);

    tokio::select! {
        _ = run_fleet_tracker(aggregator, rx) => {
            info!("Simulation channel closed");
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    simulation.stop().await;
    refresh.stop().await;

    Ok(())
}

/// Feed simulated samples into the aggregator while in demo mode
async fn run_fleet_tracker(
    aggregator: Arc<FleetDataAggregator>,
    mut rx: mpsc::Receiver<LocationSample>,
) {
    while let Some(sample) = rx.recv().await {
        if aggregator.mode().await == DataSourceMode::Local {
            aggregator
                .record_position(PositionReport::from(sample))
                .await;
        }
    }
}
