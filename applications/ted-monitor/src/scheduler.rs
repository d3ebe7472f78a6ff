//! Refresh loop
//!
//! Runs one fetch-aggregate-render cycle immediately and then once per
//! interval. Cycles run one at a time on the scheduler task; a tick that
//! comes due while a cycle is still running is folded into the next one.

use crate::config::MonitorSettings;
use crate::gateway::DeviceGateway;
use crate::models::EnergyScope;
use crate::output::OutputSink;
use crate::render::{MacroRenderer, RenderOptions};
use crate::snapshot::{FetchedFields, Paired, Snapshot, SnapshotStore};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub fields_refreshed: usize,
    pub circuit_rows: usize,
    pub dashboard_rows: usize,
    pub files_written: usize,
}

pub struct Scheduler<T> {
    gateway: DeviceGateway<T>,
    store: Arc<SnapshotStore>,
    renderer: MacroRenderer,
    sink: OutputSink,
    interval: Duration,
    currency: String,
}

impl<T: Transport> Scheduler<T> {
    pub fn new(gateway: DeviceGateway<T>, store: Arc<SnapshotStore>, settings: &MonitorSettings) -> Self {
        Self {
            gateway,
            store,
            renderer: MacroRenderer::new(RenderOptions {
                fade_point: settings.fade_point,
                solar_max_watts: settings.solar_max_watts,
            }),
            sink: OutputSink::new(settings.output_dir.clone()),
            interval: settings.refresh_interval,
            currency: settings.currency_symbol.clone(),
        }
    }

    pub fn gateway(&self) -> &DeviceGateway<T> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn renderer(&self) -> &MacroRenderer {
        &self.renderer
    }

    /// Run the scheduler loop until `shutdown` flips to true.
    ///
    /// The first tick of the interval fires immediately, which gives the
    /// startup cycle. Shutdown is only observed between cycles.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "TED monitor started (interval: {}s, output: {})",
            self.interval.as_secs(),
            self.sink.dir().display()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("shutdown requested; scheduler stopping");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    tracing::debug!("timer triggered update");
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One full cycle: fetch, publish the new snapshot, write macro files.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        if !self.store.begin_refresh() {
            tracing::warn!("refresh already in progress; skipping tick");
            return None;
        }

        let fetched = self.fetch().await;
        let fields_refreshed = fetched.refreshed_count();
        let snapshot = self.store.publish(fetched, &self.currency);

        if let Some(err) = self.gateway.last_error().filter(|_| fields_refreshed < 5) {
            tracing::warn!(
                cycle = snapshot.cycle,
                last_error = %err,
                "refresh incomplete; keeping previous values for failed fields"
            );
        }

        let files_written = self.write_output(&snapshot).await;

        let report = CycleReport {
            cycle: snapshot.cycle,
            fields_refreshed,
            circuit_rows: snapshot.circuit_rows.len(),
            dashboard_rows: snapshot.dashboard_rows.len(),
            files_written,
        };
        tracing::info!(
            cycle = report.cycle,
            fields = report.fields_refreshed,
            circuits = report.circuit_rows,
            mtus = report.dashboard_rows,
            files = report.files_written,
            "refresh cycle complete"
        );
        Some(report)
    }

    async fn fetch(&self) -> FetchedFields {
        let gw = &self.gateway;
        let scope = EnergyScope::Net;

        let settings = gw.get_settings().await;
        let rates = gw.get_rates().await;

        let circuits = Paired::from_parts(
            gw.get_circuit_usage(false, scope, None).await,
            gw.get_circuit_usage(true, scope, None).await,
        );
        let overview = Paired::from_parts(
            gw.get_system_overview(false, scope, None).await,
            gw.get_system_overview(true, scope, None).await,
        );
        let dashboard = Paired::from_parts(
            gw.get_dashboard(false, scope, None).await,
            gw.get_dashboard(true, scope, None).await,
        );

        FetchedFields {
            settings,
            rates,
            circuits,
            overview,
            dashboard,
        }
    }

    async fn write_output(&self, snapshot: &Snapshot) -> usize {
        if snapshot.settings.is_none() {
            tracing::warn!("no system settings received yet; table macros skipped");
        }
        self.sink.write_all(&self.renderer, snapshot).await
    }
}
