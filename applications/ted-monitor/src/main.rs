use std::sync::Arc;
use ted_monitor::{Config, DeviceGateway, MacroKind, Scheduler, SnapshotStore};
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().skip(1).any(|arg| arg == "--list-macros") {
        for kind in MacroKind::ALL {
            println!("{}.ted:\n\t{}\n", kind.name(), kind.description());
        }
        return Ok(());
    }

    let cfg_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.example.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    let settings = cfg.monitor_settings();

    let default_filter = if settings.debug {
        "ted_monitor=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!(config = %cfg_path, "loaded config");
    info!(
        hostname = %settings.hostname,
        output_dir = %settings.output_dir.display(),
        interval_secs = settings.refresh_interval.as_secs(),
        "starting ted-monitor"
    );
    match settings.solar_max_watts {
        Some(watts) => info!("solar generation capacity: {} W", watts),
        None => info!("no solar_max_watts configured; 'solar-now' output disabled"),
    }
    if let Some(point) = settings.fade_point {
        info!("fading enabled; starting {}% into the list", point * 100.0);
    }
    for kind in MacroKind::ALL {
        debug!(name = kind.name(), "{}", kind.description());
    }

    let gateway = DeviceGateway::connect(
        &settings.hostname,
        settings.port,
        settings.request_timeout,
    )?;
    gateway.probe().await?;

    let store = Arc::new(SnapshotStore::new());
    let scheduler = Scheduler::new(gateway, store, &settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    handle.await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
