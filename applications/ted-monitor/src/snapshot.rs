//! The readable state of the monitor: the latest device payloads plus the
//! tables derived from them, published as one immutable [`Snapshot`].

use crate::aggregate::{compute_circuit_rows, compute_dashboard_rows, CircuitRow, DashboardRow};
use crate::models::{DashData, Rate, SpyderData, SystemOverview, SystemSettings};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Power- and cost-denominated payloads from the same refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Paired<T> {
    pub power: T,
    pub cost: T,
}

impl<T> Paired<T> {
    /// Both halves, or nothing: a pair never mixes cycles.
    pub fn from_parts(power: Option<T>, cost: Option<T>) -> Option<Self> {
        Some(Self {
            power: power?,
            cost: cost?,
        })
    }
}

/// Everything one refresh cycle managed to fetch. `None` marks a failed field.
#[derive(Debug, Clone, Default)]
pub struct FetchedFields {
    pub settings: Option<SystemSettings>,
    pub rates: Option<Rate>,
    pub circuits: Option<Paired<SpyderData>>,
    pub overview: Option<Paired<SystemOverview>>,
    pub dashboard: Option<Paired<DashData>>,
}

impl FetchedFields {
    pub fn refreshed_count(&self) -> usize {
        [
            self.settings.is_some(),
            self.rates.is_some(),
            self.circuits.is_some(),
            self.overview.is_some(),
            self.dashboard.is_some(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Number of completed refresh cycles behind this snapshot
    pub cycle: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub settings: Option<Arc<SystemSettings>>,
    pub rates: Option<Arc<Rate>>,
    pub circuits: Option<Arc<Paired<SpyderData>>>,
    pub overview: Option<Arc<Paired<SystemOverview>>>,
    pub dashboard: Option<Arc<Paired<DashData>>>,
    pub circuit_rows: Arc<[CircuitRow]>,
    pub dashboard_rows: Arc<[DashboardRow]>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            cycle: 0,
            refreshed_at: None,
            settings: None,
            rates: None,
            circuits: None,
            overview: None,
            dashboard: None,
            circuit_rows: Arc::from(Vec::new()),
            dashboard_rows: Arc::from(Vec::new()),
        }
    }
}

impl Snapshot {
    /// Fold a cycle's results over `previous`: each field that failed keeps
    /// its last good value, then both tables are rebuilt from scratch.
    pub fn next(previous: &Snapshot, fetched: FetchedFields, currency: &str) -> Snapshot {
        let settings = fetched.settings.map(Arc::new).or_else(|| previous.settings.clone());
        let rates = fetched.rates.map(Arc::new).or_else(|| previous.rates.clone());
        let circuits = fetched.circuits.map(Arc::new).or_else(|| previous.circuits.clone());
        let overview = fetched.overview.map(Arc::new).or_else(|| previous.overview.clone());
        let dashboard = fetched.dashboard.map(Arc::new).or_else(|| previous.dashboard.clone());

        let circuit_rows: Arc<[CircuitRow]> = match (&settings, &circuits) {
            (Some(settings), Some(usage)) => {
                compute_circuit_rows(settings, &usage.power, &usage.cost, currency).into()
            }
            _ => Arc::from(Vec::new()),
        };
        let dashboard_rows: Arc<[DashboardRow]> = match (&settings, &overview) {
            (Some(settings), Some(usage)) => {
                compute_dashboard_rows(settings, &usage.power, &usage.cost, currency).into()
            }
            _ => Arc::from(Vec::new()),
        };

        Snapshot {
            cycle: previous.cycle + 1,
            refreshed_at: Some(Utc::now()),
            settings,
            rates,
            circuits,
            overview,
            dashboard,
            circuit_rows,
            dashboard_rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No cycle has completed yet
    Cold,
    /// A cycle is running; readers still see the previous snapshot
    Refreshing,
    Warm,
}

/// Holds the current snapshot. One writer replaces it wholesale; readers
/// clone the `Arc` and never observe a partial update.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    refreshing: AtomicBool,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn state(&self) -> StoreState {
        if self.refreshing.load(Ordering::Acquire) {
            StoreState::Refreshing
        } else if self.current().cycle == 0 {
            StoreState::Cold
        } else {
            StoreState::Warm
        }
    }

    /// Mark a cycle as started. Returns false if one is already running.
    pub fn begin_refresh(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Publish the result of a cycle and leave the refreshing state.
    pub fn publish(&self, fetched: FetchedFields, currency: &str) -> Arc<Snapshot> {
        let previous = self.current();
        let next = Arc::new(Snapshot::next(&previous, fetched, currency));
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = next.clone();
        self.refreshing.store(false, Ordering::Release);
        next
    }
}
