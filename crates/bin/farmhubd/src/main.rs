//! # farmhubd: farmhub daemon
//!
//! Composition root that wires all adapters together and runs the pipeline.
//!
//! ## Responsibilities
//! - Load configuration (`farmhub.toml`, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Pick the telemetry store and notification sink named by the configuration
//! - Run the MQTT ingest loop, the evaluation scheduler and the retention task
//! - Handle graceful shutdown (SIGTERM/SIGINT), draining the in-flight cycle
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use farmhub_adapter_mqtt::{MqttBroker, MqttConnection};
use farmhub_adapter_storage_sqlite_sqlx::{
    Database, SqliteFarmDirectory, SqliteReadingStore, SqliteRuleRepository,
};
use farmhub_app::control_loop::{ControlLoop, EvaluatorSettings};
use farmhub_app::dispatcher::ActuationDispatcher;
use farmhub_app::ingest::IngestService;
use farmhub_app::notification_bus::InProcessNotificationBus;
use farmhub_app::notifier::NotificationFanout;
use farmhub_app::ports::{NotificationSink, ReadingStore};
use farmhub_app::scheduler::Scheduler;
use farmhub_app::timeseries::InMemoryReadingStore;
use farmhub_domain::telemetry::TelemetryDecoder;
use farmhub_domain::time::{now, saturating_sub};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, NotificationSinkKind, ReadingBackend};

const PURGE_PERIOD: Duration = Duration::from_secs(60 * 60);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = farmhub_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;

    // Broker
    let (broker, connection) = farmhub_adapter_mqtt::connect(&config.mqtt);
    tracing::info!(
        host = %config.mqtt.broker_host,
        port = config.mqtt.broker_port,
        namespace = %config.mqtt.namespace,
        "farmhubd starting"
    );

    match config.storage.readings {
        ReadingBackend::Sqlite => {
            let store = SqliteReadingStore::new(db.pool().clone(), config.recency_window());
            with_store(&config, &db, Arc::new(store), broker, connection).await;
        }
        ReadingBackend::Memory => {
            let store = InMemoryReadingStore::new(config.recency_window());
            with_store(&config, &db, Arc::new(store), broker, connection).await;
        }
    }

    Ok(())
}

async fn with_store<S>(
    config: &Config,
    db: &Database,
    store: Arc<S>,
    broker: MqttBroker,
    connection: MqttConnection,
) where
    S: ReadingStore + Send + Sync + 'static,
{
    match config.notifications.sink {
        NotificationSinkKind::InProcess => {
            let bus = Arc::new(InProcessNotificationBus::new(config.notifications.bus_capacity));
            serve(config, db, store, bus, broker, connection).await;
        }
        NotificationSinkKind::Mqtt => {
            let sink = broker.clone();
            serve(config, db, store, sink, broker, connection).await;
        }
    }
}

async fn serve<S, N>(
    config: &Config,
    db: &Database,
    store: Arc<S>,
    sink: N,
    broker: MqttBroker,
    connection: MqttConnection,
) where
    S: ReadingStore + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Services
    let ingest = Arc::new(IngestService::new(
        TelemetryDecoder::new(config.mqtt.namespace.clone()),
        Arc::clone(&store),
    ));
    let dispatcher = ActuationDispatcher::new(broker, config.mqtt.namespace.clone())
        .with_timeout(config.dispatch_timeout());
    let notifier = NotificationFanout::new(sink).with_timeout(config.dispatch_timeout());
    let control_loop = ControlLoop::new(
        SqliteRuleRepository::new(db.pool().clone()),
        SqliteFarmDirectory::new(db.pool().clone()),
        Arc::clone(&store),
        dispatcher,
        notifier,
        EvaluatorSettings {
            query_timeout: config.query_timeout(),
            max_parallel_farms: config.evaluator.max_parallel_farms,
        },
    );
    let scheduler = Scheduler::new(Arc::new(control_loop), config.evaluation_interval());

    // Tasks
    let mut tasks = JoinSet::new();
    tasks.spawn(connection.run(Arc::clone(&ingest), shutdown_rx.clone()));
    if let Some(retention) = config.retention() {
        tasks.spawn(purge_expired(store, retention, shutdown_rx.clone()));
    }
    tasks.spawn(async move { scheduler.run(shutdown_rx).await });

    shutdown_signal().await;
    tracing::info!("shutdown requested, draining");
    shutdown_tx.send_replace(true);

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::error!(error = %err, "task aborted during shutdown");
        }
    }
    tracing::info!(
        accepted = ingest.stats().accepted(),
        rejected = ingest.stats().rejected(),
        "farmhubd stopped"
    );
}

/// Delete readings older than `retention` once per [`PURGE_PERIOD`].
async fn purge_expired<S>(
    store: Arc<S>,
    retention: chrono::Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: ReadingStore + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(PURGE_PERIOD);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.purge_before(saturating_sub(now(), retention)).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "purged expired readings"),
                    Err(err) => tracing::warn!(error = %err, "failed to purge expired readings"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
